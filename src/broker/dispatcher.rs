//! 入站分发器模块
//!
//! ConnectionManager 转发给应用程序的消息全部经由 `topic_to_application`
//! 事件进入本模块，这是入站数据的唯一通道。分发器解包出 `InboundMessage`
//! 后委托路由表按主题分发。
//!
//! # 容错约定
//! 缺少 `topic` 字段或形状不符的消息记录日志后丢弃（log-and-drop），
//! 畸形数据绝不传播到应用程序的处理器。

use std::sync::Arc;
use tracing::{debug, warn};
use serde_json::Value;

use crate::core::message::InboundMessage;
use crate::core::routing::RouteTable;

/// 入站分发器
///
/// 持有路由表的引用，由连接生命周期在注册完成后安装为传输层回调。
/// 路由表由生命周期实例拥有并以引用传入，避免进程级单例，同一进程内
/// 多个客户端实例互不干扰。
#[derive(Clone)]
pub struct InboundDispatcher {
    /// 路由表
    table: Arc<RouteTable>,
}

impl InboundDispatcher {
    /// 创建入站分发器
    ///
    /// # 参数说明
    /// * `table` - 路由表引用
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self { table }
    }

    /// 处理一条原始入站载荷
    ///
    /// 传输层收到 `topic_to_application` 事件时调用。解析失败或主题为空
    /// 时丢弃消息；解析成功则交给路由表分发。
    ///
    /// # 参数说明
    /// * `payload` - 事件的原始 JSON 载荷
    pub async fn handle_raw(&self, payload: Value) {
        let message: InboundMessage = match serde_json::from_value(payload) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "入站消息格式错误，丢弃");
                return;
            }
        };

        if message.topic.is_empty() {
            warn!("入站消息缺少主题，丢弃");
            return;
        }

        debug!(topic = %message.topic, "收到入站消息");
        self.table.dispatch(&message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_well_formed_message_reaches_handler() {
        let table = Arc::new(RouteTable::new());
        let count = Arc::new(AtomicU32::new(0));

        let count_clone = count.clone();
        table
            .register("/chatter", move |msg| {
                let count = count_clone.clone();
                Box::pin(async move {
                    assert_eq!(msg["data"], "hi");
                    count.fetch_add(1, Ordering::SeqCst);
                })
            })
            .await;

        let dispatcher = InboundDispatcher::new(table);
        dispatcher
            .handle_raw(serde_json::json!({
                "topic": "/chatter",
                "msg": { "data": "hi" }
            }))
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped() {
        let table = Arc::new(RouteTable::new());
        let count = Arc::new(AtomicU32::new(0));

        let count_clone = count.clone();
        table
            .register("/chatter", move |_msg| {
                let count = count_clone.clone();
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            })
            .await;

        let dispatcher = InboundDispatcher::new(table);

        // 缺少 topic 字段
        dispatcher
            .handle_raw(serde_json::json!({ "msg": { "data": "hi" } }))
            .await;
        // 根本不是对象
        dispatcher.handle_raw(serde_json::json!("garbage")).await;
        // topic 为空串
        dispatcher
            .handle_raw(serde_json::json!({ "topic": "", "msg": {} }))
            .await;

        // 任何畸形消息都不应触达处理器
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsubscribed_topic_is_silently_dropped() {
        let table = Arc::new(RouteTable::new());
        let dispatcher = InboundDispatcher::new(table);

        // 取消订阅与在途投递之间存在竞争，未订阅主题的送达是合法的
        dispatcher
            .handle_raw(serde_json::json!({
                "topic": "/never_subscribed",
                "msg": { "data": "hi" }
            }))
            .await;
    }
}
