//! 传输层模块
//!
//! 定义与 ConnectionManager 之间持久双向通道的统一接口，并实现默认的
//! Socket.IO（Engine.IO v4 文本帧）WebSocket 传输。
//!
//! 所有控制与数据消息都复用单一逻辑通道（`/rowma` 命名空间）。
//! 传输层只负责 connect / emit / on / close 四个原语，寻址与路由语义
//! 由上层的连接生命周期与分发器实现。

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::infra::error::{Error, Result};

/// 事件回调 Future 类型
pub type EventFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// 事件回调函数类型
///
/// `Arc` 使分发时可以把回调克隆出锁外再等待，回调内部因此可以安全地
/// 回调 `on` 注册新事件。
pub type EventCallbackFn = Arc<dyn Fn(Value) -> EventFuture + Send + Sync>;

/// 传输层接口
///
/// ConnectionManager 的协作方契约：建立连接、按事件名发送 JSON 载荷、
/// 注册入站事件回调、关闭连接。关闭是唯一的取消原语。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 建立传输层连接（含命名空间握手）
    async fn connect(&self) -> Result<()>;

    /// 发送事件
    ///
    /// 即发即弃：无确认、无重试，顺序仅由底层连接保证。
    ///
    /// # 参数说明
    /// * `event` - 事件名，如 "topic_transfer"
    /// * `payload` - JSON 载荷
    async fn emit(&self, event: &str, payload: Value) -> Result<()>;

    /// 注册入站事件回调
    ///
    /// # 参数说明
    /// * `event` - 事件名，如 "topic_to_application"
    /// * `callback` - 回调函数，在入站投递路径内被同步等待
    async fn on(&self, event: &str, callback: EventCallbackFn);

    /// 关闭连接
    async fn close(&self);
}

/// Socket.IO 数据包
///
/// Engine.IO v4 文本帧中与本客户端相关的包类型
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SioPacket {
    /// 握手 open 包（"0{...}"）
    Open(Value),
    /// 心跳 ping（"2"，服务端发起）
    Ping,
    /// 心跳 pong（"3"）
    Pong,
    /// 命名空间连接确认（"40/ns,{...}"）
    Connected {
        /// 命名空间
        namespace: String,
    },
    /// 命名空间断开（"41/ns,"）
    Disconnect {
        /// 命名空间
        namespace: String,
    },
    /// 事件（"42/ns,[\"event\", {...}]"）
    Event {
        /// 命名空间
        namespace: String,
        /// 事件名
        event: String,
        /// 事件载荷
        payload: Value,
    },
    /// 连接错误（"44/ns,{...}"）
    Error {
        /// 命名空间
        namespace: String,
    },
    /// 其他不关心的包
    Other,
}

/// 拆出包头里的命名空间
///
/// 无命名空间前缀时归属默认命名空间 "/"
fn split_namespace(rest: &str) -> (String, &str) {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => (rest[..idx].to_string(), &rest[idx + 1..]),
            None => (rest.to_string(), ""),
        }
    } else {
        ("/".to_string(), rest)
    }
}

/// 解析一条文本帧
pub(crate) fn decode_packet(text: &str) -> SioPacket {
    if let Some(rest) = text.strip_prefix("40") {
        let (namespace, _) = split_namespace(rest);
        return SioPacket::Connected { namespace };
    }
    if let Some(rest) = text.strip_prefix("41") {
        let (namespace, _) = split_namespace(rest);
        return SioPacket::Disconnect { namespace };
    }
    if let Some(rest) = text.strip_prefix("42") {
        let (namespace, body) = split_namespace(rest);
        // 事件体是 JSON 数组，前面可能还有 ack id（纯数字），跳过到 '[' 为止
        let array_start = match body.find('[') {
            Some(idx) => &body[idx..],
            None => return SioPacket::Other,
        };
        let parsed: Value = match serde_json::from_str(array_start) {
            Ok(v) => v,
            Err(_) => return SioPacket::Other,
        };
        let event = match parsed.get(0).and_then(|e| e.as_str()) {
            Some(e) => e.to_string(),
            None => return SioPacket::Other,
        };
        let payload = parsed.get(1).cloned().unwrap_or(Value::Null);
        return SioPacket::Event {
            namespace,
            event,
            payload,
        };
    }
    if let Some(rest) = text.strip_prefix("44") {
        let (namespace, _) = split_namespace(rest);
        return SioPacket::Error { namespace };
    }
    if let Some(rest) = text.strip_prefix('0') {
        let detail: Value = serde_json::from_str(rest).unwrap_or(Value::Null);
        return SioPacket::Open(detail);
    }
    match text {
        "2" => SioPacket::Ping,
        "3" => SioPacket::Pong,
        _ => SioPacket::Other,
    }
}

/// 编码命名空间连接请求
pub(crate) fn encode_connect(namespace: &str) -> String {
    if namespace == "/" {
        "40".to_string()
    } else {
        format!("40{},", namespace)
    }
}

/// 编码事件
pub(crate) fn encode_event(namespace: &str, event: &str, payload: &Value) -> String {
    let body = serde_json::json!([event, payload]);
    if namespace == "/" {
        format!("42{}", body)
    } else {
        format!("42{},{}", namespace, body)
    }
}

/// 把 HTTP(S) 基础 URL 转换为 Engine.IO WebSocket URL
pub(crate) fn ws_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/socket.io/?EIO=4&transport=websocket", ws_base)
}

type WsStreamInner = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStreamInner, Message>;
type WsStream = SplitStream<WsStreamInner>;

/// 握手超时
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Socket.IO WebSocket 传输
///
/// 默认的传输层实现：建立 WebSocket 连接、完成 Engine.IO 握手并加入
/// 命名空间，之后由后台读取任务解析文本帧、应答心跳并按事件名回调。
pub struct WsTransport {
    /// ConnectionManager URL
    base_url: String,
    /// Socket.IO 命名空间
    namespace: String,
    /// 入站事件回调注册表
    callbacks: Arc<RwLock<HashMap<String, EventCallbackFn>>>,
    /// 发送端（连接建立后可用）
    sink: Arc<Mutex<Option<WsSink>>>,
    /// 停止发送器
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl WsTransport {
    /// 创建 WebSocket 传输
    ///
    /// # 参数说明
    /// * `base_url` - ConnectionManager URL
    /// * `namespace` - Socket.IO 命名空间，如 "/rowma"
    pub fn new(base_url: &str, namespace: &str) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            base_url: base_url.to_string(),
            namespace: namespace.to_string(),
            callbacks: Arc::new(RwLock::new(HashMap::new())),
            sink: Arc::new(Mutex::new(None)),
            shutdown_tx,
        }
    }

    /// 完成 Engine.IO 握手并加入命名空间
    ///
    /// 流程：等待 open 包 -> 发送命名空间连接请求 -> 等待连接确认。
    async fn handshake(&self, sink: &mut WsSink, stream: &mut WsStream) -> Result<()> {
        loop {
            let frame = tokio::time::timeout(HANDSHAKE_TIMEOUT, stream.next())
                .await
                .map_err(|_| Error::Transport("握手超时".to_string()))?;

            let msg = match frame {
                Some(Ok(m)) => m,
                Some(Err(e)) => return Err(Error::Transport(format!("握手读取失败: {}", e))),
                None => return Err(Error::Transport("握手期间连接关闭".to_string())),
            };

            let text = match msg {
                Message::Text(text) => text,
                // 握手阶段忽略非文本帧
                _ => continue,
            };

            match decode_packet(&text) {
                SioPacket::Open(detail) => {
                    debug!(detail = %detail, "收到 Engine.IO open 包");
                    sink.send(Message::Text(encode_connect(&self.namespace)))
                        .await
                        .map_err(|e| Error::Transport(format!("加入命名空间失败: {}", e)))?;
                }
                SioPacket::Connected { namespace } if namespace == self.namespace => {
                    info!(namespace = %namespace, "命名空间连接确认");
                    return Ok(());
                }
                SioPacket::Ping => {
                    sink.send(Message::Text("3".to_string()))
                        .await
                        .map_err(|e| Error::Transport(format!("心跳应答失败: {}", e)))?;
                }
                SioPacket::Error { namespace } => {
                    return Err(Error::Transport(format!("命名空间 {} 连接被拒绝", namespace)));
                }
                other => {
                    debug!(packet = ?other, "握手期间跳过数据包");
                }
            }
        }
    }

    /// 读取和处理 WebSocket 帧
    ///
    /// 无法解析的帧记录日志后丢弃，绝不向回调传播畸形数据。
    async fn read_loop(
        namespace: String,
        callbacks: Arc<RwLock<HashMap<String, EventCallbackFn>>>,
        sink: Arc<Mutex<Option<WsSink>>>,
        mut stream: WsStream,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("收到停止信号，结束读取任务");
                    break;
                }
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            Self::process_frame(&namespace, &callbacks, &sink, &text).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            warn!("收到 Close 帧，连接结束");
                            break;
                        }
                        Some(Ok(_)) => {
                            // 二进制/心跳帧：本协议只使用文本帧
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket 读取错误");
                            break;
                        }
                        None => {
                            warn!("WebSocket 连接关闭");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// 处理单条文本帧
    async fn process_frame(
        namespace: &str,
        callbacks: &Arc<RwLock<HashMap<String, EventCallbackFn>>>,
        sink: &Arc<Mutex<Option<WsSink>>>,
        text: &str,
    ) {
        match decode_packet(text) {
            SioPacket::Ping => {
                // Engine.IO v4 心跳由服务端发起，客户端应答 pong
                let mut guard = sink.lock().await;
                if let Some(sink) = guard.as_mut() {
                    if let Err(e) = sink.send(Message::Text("3".to_string())).await {
                        error!(error = %e, "发送心跳应答失败");
                    }
                }
            }
            SioPacket::Event {
                namespace: packet_ns,
                event,
                payload,
            } => {
                if packet_ns != namespace {
                    debug!(namespace = %packet_ns, event = %event, "跳过其他命名空间的事件");
                    return;
                }
                // 回调克隆出锁外再等待，回调内部重入 on 不会与分发路径互锁
                let callback = {
                    let callbacks = callbacks.read().await;
                    callbacks.get(&event).cloned()
                };
                if let Some(callback) = callback {
                    debug!(event = %event, "分发入站事件");
                    // 回调在投递路径内被等待，由上层决定是否转移耗时工作
                    callback(payload).await;
                } else {
                    debug!(event = %event, "未注册的入站事件，丢弃");
                }
            }
            SioPacket::Disconnect { namespace: ns } => {
                warn!(namespace = %ns, "命名空间被服务端断开");
            }
            SioPacket::Error { namespace: ns } => {
                error!(namespace = %ns, "收到命名空间错误包");
            }
            SioPacket::Open(_) | SioPacket::Connected { .. } | SioPacket::Pong => {}
            SioPacket::Other => {
                warn!(raw = %text, "无法解析的帧，丢弃");
            }
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self) -> Result<()> {
        {
            let guard = self.sink.lock().await;
            if guard.is_some() {
                debug!("传输层已连接，跳过");
                return Ok(());
            }
        }

        let url = ws_url(&self.base_url);
        info!(url = %url, "建立 WebSocket 连接");

        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::Transport(format!("WebSocket 连接失败: {}", e)))?;
        let (mut sink, mut stream) = ws.split();

        self.handshake(&mut sink, &mut stream).await?;

        {
            let mut guard = self.sink.lock().await;
            *guard = Some(sink);
        }

        // 启动后台读取任务
        let namespace = self.namespace.clone();
        let callbacks = self.callbacks.clone();
        let sink_ref = self.sink.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            Self::read_loop(namespace, callbacks, sink_ref, stream, shutdown_rx).await;
        });

        info!("传输层连接建立完成");
        Ok(())
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| Error::Transport("传输层尚未连接".to_string()))?;

        let frame = encode_event(&self.namespace, event, &payload);
        debug!(event = event, "发送出站事件");
        sink.send(Message::Text(frame))
            .await
            .map_err(|e| Error::Transport(format!("发送事件失败: {}", e)))
    }

    async fn on(&self, event: &str, callback: EventCallbackFn) {
        let mut callbacks = self.callbacks.write().await;
        callbacks.insert(event.to_string(), callback);
        debug!(event = event, "入站事件回调已注册");
    }

    async fn close(&self) {
        let _ = self.shutdown_tx.send(());
        let mut guard = self.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            let _ = sink.send(Message::Close(None)).await;
        }
        info!("传输层已关闭");
    }
}
