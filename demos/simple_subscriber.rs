//! 简单订阅示例
//!
//! 连接公共 ConnectionManager，把第一台在线机器人的 /chatter 路由到本应用，
//! 并打印收到的每条消息。

use rowma::Rowma;

#[tokio::main]
async fn main() -> rowma::Result<()> {
    let config = rowma::Config::default();
    rowma::infra::logging::init(&config.logging);

    let rowma = Rowma::with_config(config)?;

    // 连接公共网络中的第一台机器人
    let conn_list = rowma.get_current_connection_list().await?;
    let robot = rowma.get_robot_status(&conn_list[0].uuid).await?;
    rowma.connect().await?;
    println!("robot: {}", robot.uuid);
    println!("application: {}", rowma.uuid());

    rowma
        .set_topic_route(&robot.uuid, "application", rowma.uuid().as_str(), "/chatter", None)
        .await?;

    rowma
        .subscribe("/chatter", |msg| {
            Box::pin(async move {
                println!("simple_subscriber: {}", msg);
            })
        })
        .await;

    // 保持连接，等待入站消息
    tokio::signal::ctrl_c().await?;
    rowma.close().await;
    Ok(())
}
