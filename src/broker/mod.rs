//! ConnectionManager 适配模块
//!
//! 本模块实现与 ConnectionManager（中介服务）交互的全部通道：
//! - transport：传输层接口与 Socket.IO WebSocket 实现
//! - connection：连接生命周期（connect -> register -> ready）
//! - dispatcher：入站消息分发
//! - directory：只读目录查询（REST）

pub mod connection;
pub mod directory;
pub mod dispatcher;
pub mod transport;

// 重新导出常用类型
pub use connection::{ConnectionLifecycle, ConnectionState};
pub use directory::{DirectoryClient, RobotRecord};
pub use dispatcher::InboundDispatcher;
pub use transport::{Transport, WsTransport};
