//! 连接生命周期模块
//!
//! 驱动 transport connect -> register -> ready 流程，并把入站分发器安装为
//! ConnectionManager 中继消息的唯一回调。
//!
//! # 状态机
//! `Disconnected -> Connecting -> Registered`，只进不退；自动重连不在
//! 本层范围内（属于传输层协作方的策略）。注册完成前的任何发送都会被
//! `NotConnected` 拒绝。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::dispatcher::InboundDispatcher;
use super::transport::Transport;
use crate::core::encoder::CommandEncoder;
use crate::core::message::ControlMessage;
use crate::infra::error::{Error, Result};

/// 入站数据事件名：ConnectionManager 中继消息的唯一通道
pub const INBOUND_EVENT: &str = "topic_to_application";

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 未连接
    Disconnected,
    /// 传输层建立中 / 注册中
    Connecting,
    /// 已注册，可以收发
    Registered,
}

/// 连接生命周期
///
/// 独占拥有连接状态；其余组件发送任何信封都必须经过本层的状态门禁。
pub struct ConnectionLifecycle {
    /// 传输层
    transport: Arc<dyn Transport>,
    /// 连接状态
    state: Arc<RwLock<ConnectionState>>,
    /// 指令编码器（用于注册消息）
    encoder: CommandEncoder,
    /// 入站分发器
    dispatcher: InboundDispatcher,
    /// 注册沉降延迟
    ///
    /// ConnectionManager 需要可观测的时间完成会话登记后才会向本参与者路由
    /// 消息。这是经验值而非协议保证，测试中设为零即可跳过。
    settle_delay: Duration,
}

impl ConnectionLifecycle {
    /// 创建连接生命周期
    ///
    /// # 参数说明
    /// * `transport` - 传输层
    /// * `encoder` - 指令编码器
    /// * `dispatcher` - 入站分发器
    /// * `settle_delay` - 注册沉降延迟
    pub fn new(
        transport: Arc<dyn Transport>,
        encoder: CommandEncoder,
        dispatcher: InboundDispatcher,
        settle_delay: Duration,
    ) -> Self {
        Self {
            transport,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            encoder,
            dispatcher,
            settle_delay,
        }
    }

    /// 当前连接状态
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// 建立连接并向 ConnectionManager 注册
    ///
    /// # 流程
    /// 1. 打开传输层，进入 `Connecting`
    /// 2. 等待沉降延迟（可配置，见 `settle_delay`）
    /// 3. 发送 `register_application` 登记本应用程序
    /// 4. 安装入站分发器为 `topic_to_application` 回调
    /// 5. 进入 `Registered`
    ///
    /// 已处于 `Connecting` / `Registered` 时再次调用是幂等的 no-op。
    pub async fn connect(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            let current = *state;
            if current != ConnectionState::Disconnected {
                info!(state = ?current, "连接已建立或建立中，跳过");
                return Ok(());
            }
            *state = ConnectionState::Connecting;
        }

        if let Err(e) = self.transport.connect().await {
            // 连接失败回到初始状态，调用方可以重试
            let mut state = self.state.write().await;
            *state = ConnectionState::Disconnected;
            return Err(e);
        }

        if !self.settle_delay.is_zero() {
            debug!(delay_ms = self.settle_delay.as_millis() as u64, "等待会话登记沉降");
            tokio::time::sleep(self.settle_delay).await;
        }

        // 注册发生在 Registered 之前，直接走传输层而非 send() 的状态门禁
        let register = self.encoder.register();
        self.transport
            .emit(register.event(), register.payload()?)
            .await?;

        let dispatcher = self.dispatcher.clone();
        self.transport
            .on(
                INBOUND_EVENT,
                Arc::new(move |payload| {
                    let dispatcher = dispatcher.clone();
                    Box::pin(async move {
                        dispatcher.handle_raw(payload).await;
                    })
                }),
            )
            .await;

        {
            let mut state = self.state.write().await;
            *state = ConnectionState::Registered;
        }

        info!("已向 ConnectionManager 注册");
        Ok(())
    }

    /// 发送出站控制消息
    ///
    /// 即发即弃：无确认、无重试。
    ///
    /// # 返回值
    /// 未处于 `Registered` 状态返回 `NotConnected`
    pub async fn send(&self, message: ControlMessage) -> Result<()> {
        let state = *self.state.read().await;
        if state != ConnectionState::Registered {
            warn!(state = ?state, event = message.event(), "注册完成前尝试发送");
            return Err(Error::NotConnected(format!(
                "发送 {} 需要先完成注册",
                message.event()
            )));
        }

        self.transport.emit(message.event(), message.payload()?).await
    }

    /// 关闭连接
    ///
    /// 关闭传输层是唯一的取消原语；执行中的处理器不会被打断。
    pub async fn close(&self) {
        self.transport.close().await;
        let mut state = self.state.write().await;
        *state = ConnectionState::Disconnected;
        info!("连接已关闭");
    }
}
