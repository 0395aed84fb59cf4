//! Rowma 客户端门面模块
//!
//! 把身份、编码器、路由表、连接生命周期与目录客户端组装成一个对外的
//! `Rowma` 类型，公开与操作连接机器人相关的方法。
//!
//! # 使用示例
//! ```rust,no_run
//! use rowma::Rowma;
//!
//! # async fn run() -> rowma::Result<()> {
//! let rowma = Rowma::new()?;
//!
//! // 先订阅，再连接，再声明路由
//! rowma.subscribe("/chatter", |msg| {
//!     Box::pin(async move {
//!         println!("{}", msg);
//!     })
//! }).await;
//!
//! rowma.connect().await?;
//!
//! let robots = rowma.get_current_connection_list().await?;
//! rowma.set_topic_route(&robots[0].uuid, "application", rowma.uuid().as_str(), "/chatter", None).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::broker::connection::{ConnectionLifecycle, ConnectionState};
use crate::broker::directory::{DirectoryClient, RobotRecord};
use crate::broker::dispatcher::InboundDispatcher;
use crate::broker::transport::{Transport, WsTransport};
use crate::core::addressing::Destination;
use crate::core::encoder::CommandEncoder;
use crate::core::identity::ParticipantId;
use crate::core::routing::{HandlerFuture, RouteTable};
use crate::infra::config::Config;
use crate::infra::error::Result;

/// Rowma 客户端
///
/// 一个进程内可以创建多个实例，各自持有独立的身份与路由表。
///
/// # 字段说明
/// * `uuid` - 本应用程序的参与者标识（构造时生成一次，不再变化）
/// * `table` - 主题路由表
/// * `lifecycle` - 连接生命周期（独占连接状态）
/// * `directory` - 目录客户端（只读 REST 查询）
pub struct Rowma {
    /// 本应用程序的参与者标识
    uuid: ParticipantId,
    /// 指令编码器
    encoder: CommandEncoder,
    /// 主题路由表
    table: Arc<RouteTable>,
    /// 连接生命周期
    lifecycle: ConnectionLifecycle,
    /// 目录客户端
    directory: DirectoryClient,
}

impl Rowma {
    /// 创建客户端，指向默认的公共 ConnectionManager
    ///
    /// # 返回值
    /// HTTP 客户端构建失败时返回 `Config` 错误
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// 按配置创建客户端，使用默认的 WebSocket 传输
    ///
    /// # 参数说明
    /// * `config` - 客户端配置
    pub fn with_config(config: Config) -> Result<Self> {
        let transport = Arc::new(WsTransport::new(
            &config.broker.base_url,
            &config.broker.namespace,
        ));
        Self::with_transport(transport, config)
    }

    /// 以注入的传输层创建客户端
    ///
    /// 测试中用内存传输替代真实 WebSocket。
    ///
    /// # 参数说明
    /// * `transport` - 传输层实现
    /// * `config` - 客户端配置
    pub fn with_transport(transport: Arc<dyn Transport>, config: Config) -> Result<Self> {
        let uuid = ParticipantId::new();
        let encoder = CommandEncoder::new(uuid.clone());
        let table = Arc::new(RouteTable::new());
        let dispatcher = InboundDispatcher::new(table.clone());
        let lifecycle = ConnectionLifecycle::new(
            transport,
            encoder.clone(),
            dispatcher,
            Duration::from_millis(config.broker.settle_delay_ms),
        );
        let directory = DirectoryClient::new(
            &config.broker.base_url,
            Duration::from_secs(config.broker.request_timeout_secs),
        )?;

        Ok(Self {
            uuid,
            encoder,
            table,
            lifecycle,
            directory,
        })
    }

    /// 本应用程序的参与者标识
    pub fn uuid(&self) -> &ParticipantId {
        &self.uuid
    }

    /// 当前连接状态
    pub async fn state(&self) -> ConnectionState {
        self.lifecycle.state().await
    }

    /// 连接 ConnectionManager 并完成注册
    ///
    /// 重复调用是幂等的 no-op。注意：注册沉降延迟（默认 1 秒）包含在本方法内，
    /// 返回后即可收发。
    pub async fn connect(&self) -> Result<()> {
        self.lifecycle.connect().await
    }

    /// 向指定机器人发布一条主题消息
    ///
    /// # 参数说明
    /// * `destination` - 目标机器人（指向 application 会返回 `UnsupportedDestination`）
    /// * `topic` - 主题名
    /// * `msg` - 主题消息体，由主题类型决定
    ///
    /// # 使用示例
    /// ```rust,no_run
    /// # use rowma::{Destination, Rowma};
    /// # async fn run(rowma: Rowma) -> rowma::Result<()> {
    /// let robot = Destination::robot("xxxx-xxxx-xxxx");
    /// rowma.publish(&robot, "/chatter", serde_json::json!({ "data": "Hello World!" })).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn publish(&self, destination: &Destination, topic: &str, msg: Value) -> Result<()> {
        let message = self.encoder.publish(destination, topic, msg)?;
        self.lifecycle.send(message).await
    }

    /// 声明一条主题路由
    ///
    /// 声明 `dest_uuid` 机器人发布的 `topic` 转发给指定参与者，路由由
    /// ConnectionManager 持久化并执行。
    ///
    /// # 参数说明
    /// * `dest_uuid` - 路由源机器人 UUID（本指令的收件方）
    /// * `topic_dest_type` - 主题转发目的地类型，"robot" 或 "application"
    /// * `topic_dest_uuid` - 主题转发目的地 UUID
    /// * `topic` - 主题名
    /// * `alias` - 接收端的主题别名，`None` 时不出现在载荷中
    pub async fn set_topic_route(
        &self,
        dest_uuid: &str,
        topic_dest_type: &str,
        topic_dest_uuid: &str,
        topic: &str,
        alias: Option<&str>,
    ) -> Result<()> {
        let message =
            self.encoder
                .topic_route(dest_uuid, topic_dest_type, topic_dest_uuid, topic, alias)?;
        self.lifecycle.send(message).await
    }

    /// 在指定机器人上执行 roslaunch
    ///
    /// # 参数说明
    /// * `uuid` - 机器人 UUID
    /// * `command` - roslaunch 参数，如 "my_pkg test.launch"
    pub async fn run_launch(&self, uuid: &str, command: &str) -> Result<()> {
        self.lifecycle.send(self.encoder.run_launch(uuid, command)).await
    }

    /// 在指定机器人上执行 rosrun
    ///
    /// # 参数说明
    /// * `uuid` - 机器人 UUID
    /// * `command` - rosrun 首参数，如 "my_pkg my_node"
    /// * `args` - 其余参数，如 "setting.yml"
    pub async fn run_rosrun(&self, uuid: &str, command: &str, args: Option<&str>) -> Result<()> {
        self.lifecycle
            .send(self.encoder.run_rosrun(uuid, command, args))
            .await
    }

    /// 终止指定机器人上运行的 rosnode
    ///
    /// # 参数说明
    /// * `uuid` - 机器人 UUID
    /// * `rosnodes` - rosnode 名称列表（允许为空）
    pub async fn kill_nodes(&self, uuid: &str, rosnodes: Vec<String>) -> Result<()> {
        self.lifecycle.send(self.encoder.kill_nodes(uuid, rosnodes)).await
    }

    /// 把本应用程序的会话与指定机器人关联
    ///
    /// 用于后续订阅 roslaunch_log / rosrun_log。
    ///
    /// # 参数说明
    /// * `robot_uuid` - 机器人 UUID
    pub async fn set_robot_uuid(&self, robot_uuid: &str) -> Result<()> {
        self.lifecycle.send(self.encoder.rebind(robot_uuid)).await
    }

    /// 注册主题处理器
    ///
    /// 同一主题重复注册时后者覆盖前者。处理器在入站投递路径内被同步等待，
    /// 耗时工作请自行转移到别的任务。
    ///
    /// # 参数说明
    /// * `topic` - 主题名
    /// * `handler` - 处理函数，收到主题消息体
    pub async fn subscribe<F>(&self, topic: &str, handler: F)
    where
        F: Fn(Value) -> HandlerFuture + Send + Sync + 'static,
    {
        self.table.register(topic, handler).await;
    }

    /// 获取当前在线的机器人列表
    pub async fn get_current_connection_list(&self) -> Result<Vec<RobotRecord>> {
        self.directory.list_connections().await
    }

    /// 按 UUID 获取机器人状态
    ///
    /// # 参数说明
    /// * `uuid` - 机器人 UUID
    pub async fn get_robot_status(&self, uuid: &str) -> Result<RobotRecord> {
        self.directory.robot_status(uuid).await
    }

    /// 关闭连接
    pub async fn close(&self) {
        self.lifecycle.close().await;
    }
}
