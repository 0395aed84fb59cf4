//! 目的地模型模块
//!
//! 所有出站消息都必须携带一个类型化的目的地（参与者类型 + UUID）。
//! 参与者类型是闭集（robot / application），未知类型在构造阶段立即报错，
//! 不会延迟到 ConnectionManager 端。

use serde::{Deserialize, Serialize};

use super::identity::ParticipantId;
use crate::infra::error::{Error, Result};

/// 参与者类型
///
/// Rowma 网络中只存在两类参与者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    /// 机器人（运行 rowma_ros 的 ROS 主机）
    Robot,
    /// 应用程序（本 SDK 的使用方）
    Application,
}

impl ParticipantKind {
    /// 从字符串解析参与者类型
    ///
    /// # 参数说明
    /// * `kind` - "robot" 或 "application"
    ///
    /// # 返回值
    /// 解析成功返回对应类型，未知字符串返回 `InvalidParticipantKind`
    pub fn parse(kind: &str) -> Result<Self> {
        match kind {
            "robot" => Ok(Self::Robot),
            "application" => Ok(Self::Application),
            other => Err(Error::InvalidParticipantKind(other.to_string())),
        }
    }

    /// 类型的线上表示
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Robot => "robot",
            Self::Application => "application",
        }
    }
}

impl std::fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 目的地
///
/// 标识一条出站消息的收件方。线上格式为 `{"type": "robot", "uuid": "..."}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// 参与者类型
    #[serde(rename = "type")]
    pub kind: ParticipantKind,
    /// 参与者 UUID
    pub uuid: ParticipantId,
}

impl Destination {
    /// 创建目的地
    pub fn new(kind: ParticipantKind, uuid: impl Into<ParticipantId>) -> Self {
        Self {
            kind,
            uuid: uuid.into(),
        }
    }

    /// 创建指向机器人的目的地
    pub fn robot(uuid: impl Into<ParticipantId>) -> Self {
        Self::new(ParticipantKind::Robot, uuid)
    }

    /// 创建指向应用程序的目的地
    pub fn application(uuid: impl Into<ParticipantId>) -> Self {
        Self::new(ParticipantKind::Application, uuid)
    }
}

/// 根据类型字符串构造目的地
///
/// 纯函数：相同入参总是产生结构相等的目的地。
///
/// # 参数说明
/// * `kind` - "robot" 或 "application"
/// * `uuid` - 参与者 UUID
///
/// # 返回值
/// 构造成功返回目的地，类型非法返回 `InvalidParticipantKind`
pub fn destination_for(kind: &str, uuid: &str) -> Result<Destination> {
    Ok(Destination::new(ParticipantKind::parse(kind)?, uuid))
}
