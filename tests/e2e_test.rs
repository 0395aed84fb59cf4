//! 端到端测试
//!
//! 用内存传输替代真实 WebSocket，模拟 ConnectionManager 的收发两端，
//! 验证从注册、路由声明到入站分发的完整链路。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dotenv::dotenv;
use serde_json::Value;

use rowma::broker::transport::EventCallbackFn;
use rowma::{Config, ConnectionState, Destination, Error, Result, Rowma, Transport};

/// 内存传输：记录出站事件，并允许测试注入入站事件
#[derive(Default)]
struct FakeTransport {
    emitted: Mutex<Vec<(String, Value)>>,
    callbacks: tokio::sync::Mutex<HashMap<String, EventCallbackFn>>,
}

impl FakeTransport {
    fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.lock().unwrap().clone()
    }

    /// 模拟 ConnectionManager 向应用程序中继一条消息
    async fn push_inbound(&self, event: &str, payload: Value) {
        let callback = {
            let callbacks = self.callbacks.lock().await;
            callbacks.get(event).cloned()
        };
        if let Some(callback) = callback {
            callback(payload).await;
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<()> {
        self.emitted
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
        Ok(())
    }

    async fn on(&self, event: &str, callback: EventCallbackFn) {
        self.callbacks
            .lock()
            .await
            .insert(event.to_string(), callback);
    }

    async fn close(&self) {}
}

/// 沉降延迟为零的测试配置（测试不等待真实时钟）
fn test_config() -> Config {
    let mut config = Config::default();
    config.broker.settle_delay_ms = 0;
    config
}

fn test_client() -> (Rowma, Arc<FakeTransport>) {
    let transport = Arc::new(FakeTransport::default());
    let rowma = Rowma::with_transport(transport.clone(), test_config()).unwrap();
    (rowma, transport)
}

#[tokio::test]
async fn test_publish_before_register_fails_with_not_connected() {
    let (rowma, transport) = test_client();
    let robot = Destination::robot("robot-uuid");

    let result = rowma
        .publish(&robot, "/chatter", serde_json::json!({ "data": "hi" }))
        .await;

    assert!(matches!(result, Err(Error::NotConnected(_))));
    assert!(transport.emitted().is_empty());
}

#[tokio::test]
async fn test_connect_then_publish_produces_exactly_one_envelope() {
    let (rowma, transport) = test_client();
    let robot = Destination::robot("robot-uuid");

    rowma.connect().await.unwrap();
    assert_eq!(rowma.state().await, ConnectionState::Registered);

    // 注册前失败的同一调用，注册后成功
    rowma
        .publish(&robot, "/chatter", serde_json::json!({ "data": "hi" }))
        .await
        .unwrap();

    let emitted = transport.emitted();
    assert_eq!(emitted.len(), 2);
    assert_eq!(emitted[0].0, "register_application");
    assert_eq!(emitted[0].1["applicationUuid"], rowma.uuid().as_str());
    assert_eq!(emitted[1].0, "topic_transfer");
    assert_eq!(emitted[1].1["msg"]["op"], "publish");
    assert_eq!(emitted[1].1["msg"]["msg"]["data"], "hi");
}

#[tokio::test]
async fn test_publish_during_settle_window_fails_with_not_connected() {
    let transport = Arc::new(FakeTransport::default());
    let mut config = Config::default();
    config.broker.settle_delay_ms = 300;
    let rowma = Arc::new(Rowma::with_transport(transport.clone(), config).unwrap());
    let robot = Destination::robot("robot-uuid");

    // connect 在沉降窗口内停留在 Connecting，期间的发布必须被拒绝
    let connect_task = {
        let rowma = rowma.clone();
        tokio::spawn(async move { rowma.connect().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(rowma.state().await, ConnectionState::Connecting);

    let result = rowma
        .publish(&robot, "/chatter", serde_json::json!({ "data": "hi" }))
        .await;
    assert!(matches!(result, Err(Error::NotConnected(_))));

    // 沉降结束后，同一调用成功
    connect_task.await.unwrap().unwrap();
    assert_eq!(rowma.state().await, ConnectionState::Registered);
    rowma
        .publish(&robot, "/chatter", serde_json::json!({ "data": "hi" }))
        .await
        .unwrap();

    let emitted = transport.emitted();
    assert_eq!(emitted.len(), 2);
    assert_eq!(emitted[0].0, "register_application");
    assert_eq!(emitted[1].0, "topic_transfer");
}

#[tokio::test]
async fn test_publish_to_application_is_rejected_without_envelope() {
    let (rowma, transport) = test_client();
    rowma.connect().await.unwrap();

    let application = Destination::application("other-app");
    let result = rowma
        .publish(&application, "/chatter", serde_json::json!({}))
        .await;

    assert!(matches!(result, Err(Error::UnsupportedDestination(_))));
    // 只有注册消息，没有产生信封
    assert_eq!(transport.emitted().len(), 1);
}

#[tokio::test]
async fn test_topic_route_without_alias_omits_field_on_wire() {
    let (rowma, transport) = test_client();
    rowma.connect().await.unwrap();

    rowma
        .set_topic_route("robot-uuid", "application", rowma.uuid().as_str(), "/chatter", None)
        .await
        .unwrap();

    let emitted = transport.emitted();
    let (event, payload) = &emitted[1];
    assert_eq!(event, "topic_transfer");
    assert_eq!(payload["destination"]["type"], "robot");
    assert_eq!(payload["destination"]["uuid"], "robot-uuid");
    assert_eq!(payload["msg"]["op"], "subscribe");
    assert_eq!(payload["msg"]["topic"], "/chatter");
    // alias 必须整个字段缺失，而不是 null 或空串
    assert!(payload["msg"].as_object().unwrap().get("alias").is_none());
}

#[tokio::test]
async fn test_route_declaration_and_inbound_relay_end_to_end() {
    let (rowma, transport) = test_client();
    let received = Arc::new(Mutex::new(Vec::<Value>::new()));

    // 参与者 A 注册
    rowma.connect().await.unwrap();

    // 声明路由：机器人 R 的 /chatter 转发给应用程序 A
    rowma
        .set_topic_route("robot-r", "application", rowma.uuid().as_str(), "/chatter", None)
        .await
        .unwrap();

    let received_clone = received.clone();
    rowma
        .subscribe("/chatter", move |msg| {
            let received = received_clone.clone();
            Box::pin(async move {
                received.lock().unwrap().push(msg);
            })
        })
        .await;

    // 模拟机器人 R 侧代理经 ConnectionManager 中继入站消息
    transport
        .push_inbound(
            "topic_to_application",
            serde_json::json!({ "topic": "/chatter", "msg": { "data": "hi" } }),
        )
        .await;

    // 处理器恰好被调用一次，参数是主题消息体
    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], serde_json::json!({ "data": "hi" }));
}

#[tokio::test]
async fn test_second_subscription_wins() {
    let (rowma, transport) = test_client();
    let first = Arc::new(AtomicU32::new(0));
    let second = Arc::new(AtomicU32::new(0));

    rowma.connect().await.unwrap();

    let first_clone = first.clone();
    rowma
        .subscribe("/chatter", move |_msg| {
            let first = first_clone.clone();
            Box::pin(async move {
                first.fetch_add(1, Ordering::SeqCst);
            })
        })
        .await;

    let second_clone = second.clone();
    rowma
        .subscribe("/chatter", move |_msg| {
            let second = second_clone.clone();
            Box::pin(async move {
                second.fetch_add(1, Ordering::SeqCst);
            })
        })
        .await;

    transport
        .push_inbound(
            "topic_to_application",
            serde_json::json!({ "topic": "/chatter", "msg": {} }),
        )
        .await;

    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_inbound_never_reaches_handlers() {
    let (rowma, transport) = test_client();
    let count = Arc::new(AtomicU32::new(0));

    rowma.connect().await.unwrap();

    let count_clone = count.clone();
    rowma
        .subscribe("/chatter", move |_msg| {
            let count = count_clone.clone();
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
            })
        })
        .await;

    // 缺 topic、非对象、空 topic：一律丢弃，不 panic
    transport
        .push_inbound("topic_to_application", serde_json::json!({ "msg": {} }))
        .await;
    transport
        .push_inbound("topic_to_application", serde_json::json!(42))
        .await;
    transport
        .push_inbound(
            "topic_to_application",
            serde_json::json!({ "topic": "", "msg": {} }),
        )
        .await;

    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_kill_nodes_with_empty_list_succeeds() {
    let (rowma, transport) = test_client();
    rowma.connect().await.unwrap();

    rowma.kill_nodes("robot-uuid", vec![]).await.unwrap();

    let emitted = transport.emitted();
    let (event, payload) = &emitted[1];
    assert_eq!(event, "kill_rosnodes");
    assert_eq!(payload["destination"]["uuid"], "robot-uuid");
    assert_eq!(payload["rosnodes"], serde_json::json!([]));
}

#[tokio::test]
async fn test_rosrun_and_rebind_wire_shapes() {
    let (rowma, transport) = test_client();
    rowma.connect().await.unwrap();

    rowma
        .run_rosrun("robot-uuid", "my_pkg my_node", Some("setting.yml"))
        .await
        .unwrap();
    rowma.set_robot_uuid("robot-uuid").await.unwrap();

    let emitted = transport.emitted();
    assert_eq!(emitted[1].0, "run_rosrun");
    assert_eq!(emitted[1].1["args"], "setting.yml");
    assert_eq!(emitted[2].0, "update_application");
    assert_eq!(emitted[2].1["uuid"], rowma.uuid().as_str());
    assert_eq!(emitted[2].1["robotUuid"], "robot-uuid");
}

/// 对真实 ConnectionManager 的目录查询（需要 ROWMA_BASE_URL，缺省跳过）
#[tokio::test]
async fn test_live_directory_query() {
    dotenv().ok();

    let base_url = match std::env::var("ROWMA_BASE_URL") {
        Ok(url) => url,
        Err(_) => {
            println!("⚠️ Skipping live test: ROWMA_BASE_URL not set");
            return;
        }
    };

    let mut config = Config::default();
    config.broker.base_url = base_url;
    let rowma = Rowma::with_config(config).unwrap();

    match rowma.get_current_connection_list().await {
        Ok(robots) => {
            println!("✅ Directory reachable, {} robot(s) online", robots.len());
        }
        Err(e) => {
            println!("⚠️ Directory query failed: {}", e);
            // 不让测试失败，这取决于网络环境
        }
    }
}
