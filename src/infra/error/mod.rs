//! 错误处理模块
//!
//! 错误分为两类传播策略：
//! - 本地前置条件错误（目的地类型非法、状态不符）同步返回给调用方；
//! - 入站消息格式错误在分发器边界被吸收（记录日志后丢弃），不会抛给处理器。

/// 错误类型
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("配置错误: {0}")]
    Config(String),

    /// 参与者类型不在 robot / application 闭集内，构造时立即失败
    #[error("参与者类型无效: {0}")]
    InvalidParticipantKind(String),

    /// 操作与目的地类型不匹配（如向 application 发布主题）
    #[error("不支持的目的地: {0}")]
    UnsupportedDestination(String),

    /// 尚未完成注册就尝试发送
    #[error("尚未连接到 ConnectionManager: {0}")]
    NotConnected(String),

    /// 入站消息无法解析（仅在分发器内部记录，不对外传播）
    #[error("入站消息格式错误: {0}")]
    MalformedInbound(String),

    /// 目录查询失败（网络错误、非 2xx、响应非 JSON）
    #[error("目录服务不可用: {0}")]
    DirectoryUnavailable(String),

    #[error("传输层错误: {0}")]
    Transport(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("IO 错误: {0}")]
    Io(String),
}

/// 结果类型
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
