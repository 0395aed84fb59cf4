//! Rowma 客户端 SDK 库入口
//!
//! 本模块导出所有公共 API。
//!
//! Rowma 是一个机器人消息中介网络：应用程序（Application）与机器人（Robot)
//! 均注册到 ConnectionManager（中介服务），通过它交换基于主题（topic）的消息。
//! 本 crate 实现其中的客户端寻址与路由层：
//! - 参与者身份（进程唯一 UUID）
//! - 目的地模型（robot / application 的类型化寻址）
//! - 出站指令编码（publish、subscribe 路由、roslaunch、rosrun、kill、rebind）
//! - 入站消息按主题分发到本地处理器
//!
//! # 使用示例
//! ```rust,no_run
//! use rowma::Rowma;
//!
//! # async fn run() -> rowma::Result<()> {
//! let rowma = Rowma::new()?;
//! rowma.connect().await?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod broker;
pub mod infra;
pub mod client;

// 重新导出常用类型
pub use crate::broker::connection::ConnectionState;
pub use crate::broker::directory::{DirectoryClient, RobotRecord};
pub use crate::broker::transport::Transport;
pub use crate::client::Rowma;
pub use crate::core::addressing::{destination_for, Destination, ParticipantKind};
pub use crate::core::identity::ParticipantId;
pub use crate::core::message::{ControlMessage, Envelope, InboundMessage, TopicOperation};
pub use crate::core::routing::RouteTable;
pub use crate::infra::config::Config;
pub use crate::infra::error::{Error, Result};
