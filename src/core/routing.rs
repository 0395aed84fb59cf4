//! 路由表模块
//!
//! 维护主题名到本地处理器的映射，供入站分发使用。
//!
//! # 行为约定
//! 1. 同一主题重复注册时，后注册的处理器覆盖先前的（约定行为，非错误）
//! 2. 分发时未命中处理器则静默丢弃——取消订阅与在途投递之间存在竞争，
//!    ConnectionManager 送达未订阅的主题是合法的
//! 3. 处理器在投递路径内被同步等待，慢处理器会阻塞后续入站投递（显式背压点）
//!
//! # 使用示例
//! ```rust
//! # use rowma::RouteTable;
//! # async fn run() {
//! let table = RouteTable::new();
//!
//! table.register("/chatter", |msg| {
//!     Box::pin(async move {
//!         println!("{}", msg);
//!     })
//! }).await;
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use serde_json::Value;

use super::message::InboundMessage;

/// 主题处理器 Future 类型
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// 主题处理器函数类型
///
/// `Arc` 使分发时可以把处理器克隆出锁外再等待，处理器内部因此可以安全地
/// 回调 `register` / `unregister`。
pub type TopicHandlerFn = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// 路由表
///
/// 主题名到处理器的注册表。`register`（通常在启动时调用）与 `dispatch`
/// （持续被入站路径调用）可能跨任务竞争，因此用读写锁保护。
#[derive(Clone, Default)]
pub struct RouteTable {
    /// 主题处理器注册表
    handlers: Arc<RwLock<HashMap<String, TopicHandlerFn>>>,
}

impl RouteTable {
    /// 创建新的路由表
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册主题处理器
    ///
    /// 同一主题的旧处理器会被覆盖。
    ///
    /// # 参数说明
    /// * `topic` - 主题名，如 "/chatter"
    /// * `handler` - 处理函数，收到的是主题消息体（`msg` 字段）
    pub async fn register<F>(&self, topic: &str, handler: F)
    where
        F: Fn(Value) -> HandlerFuture + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().await;
        if handlers.insert(topic.to_string(), Arc::new(handler)).is_some() {
            debug!(topic = topic, "主题处理器已覆盖");
        } else {
            debug!(topic = topic, "主题处理器已注册");
        }
    }

    /// 注销主题处理器
    ///
    /// # 参数说明
    /// * `topic` - 主题名
    pub async fn unregister(&self, topic: &str) {
        let mut handlers = self.handlers.write().await;
        handlers.remove(topic);
        debug!(topic = topic, "主题处理器已注销");
    }

    /// 检查主题是否有处理器注册
    pub async fn has_handler(&self, topic: &str) -> bool {
        let handlers = self.handlers.read().await;
        handlers.contains_key(topic)
    }

    /// 分发入站消息
    ///
    /// 按 `msg.topic` 查找处理器并以主题消息体调用；未命中则静默丢弃。
    /// 处理器在当前任务内被等待，不做排队或并行化。
    ///
    /// 查找到的处理器先克隆出锁外再等待，处理器内部重入 `register` /
    /// `unregister` 不会与分发路径互锁。
    ///
    /// # 参数说明
    /// * `message` - 入站消息
    pub async fn dispatch(&self, message: &InboundMessage) {
        let handler = {
            let handlers = self.handlers.read().await;
            handlers.get(&message.topic).cloned()
        };

        if let Some(handler) = handler {
            debug!(topic = %message.topic, "找到主题处理器，开始分发");
            handler(message.msg.clone()).await;
        } else {
            debug!(topic = %message.topic, "未找到主题处理器，丢弃消息");
        }
    }

    /// 获取已注册的主题列表
    pub async fn registered_topics(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        handlers.keys().cloned().collect()
    }
}
