//! 消息类型定义模块
//!
//! 定义寻址与路由协议中的所有消息结构，包括：
//! - 主题操作（publish / subscribe 路由声明）
//! - 出站信封（目的地 + 操作载荷）
//! - 出站控制消息（事件名 + JSON 载荷）
//! - 入站消息（ConnectionManager 转发给应用程序的消息）
//!
//! # 设计要点
//! 线上载荷用闭合的 `op` 标签和类型（sum type）表达，编码与分发两端都能被编译器
//! 穷尽检查；只有机器人自行解释的 `command` / `args` 字段保留为不透明字符串，
//! 主题消息体保留为不透明 JSON。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::addressing::Destination;
use super::identity::ParticipantId;
use crate::infra::error::Result;

/// 主题操作
///
/// `topic_transfer` 信封内的操作载荷，以 `op` 字段区分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum TopicOperation {
    /// 在目标机器人上发布一条主题消息
    Publish {
        /// 主题名
        topic: String,
        /// 主题消息体（由主题类型决定，客户端不做解释）
        msg: Value,
    },
    /// 声明一条主题路由：源参与者发布的主题转发给 `topic_destination`
    Subscribe {
        /// 主题的转发目的地
        #[serde(rename = "topicDestination")]
        topic_destination: Destination,
        /// 主题名
        topic: String,
        /// 接收端的主题别名；未提供时整个字段从载荷中省略（而非 null / 空串）
        #[serde(skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
}

/// 出站信封
///
/// `topic_transfer` 事件的载荷：目的地 + 主题操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// 收件方
    pub destination: Destination,
    /// 主题操作
    pub msg: TopicOperation,
}

impl Envelope {
    /// 创建出站信封
    pub fn new(destination: Destination, msg: TopicOperation) -> Self {
        Self { destination, msg }
    }
}

/// 出站控制消息
///
/// 每个变体对应一个发往 ConnectionManager 的事件，穷举了协议的全部出站操作。
/// 事件名与载荷形状见 `event()` 与 `payload()`。
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// `register_application`：向 ConnectionManager 登记本应用程序
    RegisterApplication {
        /// 本应用程序的 UUID
        application_uuid: ParticipantId,
    },
    /// `topic_transfer`：携带主题操作的信封
    TopicTransfer(Envelope),
    /// `run_launch`：在目标机器人上执行 roslaunch
    RunLaunch {
        /// 目标机器人
        destination: Destination,
        /// roslaunch 参数，如 "my_pkg test.launch"（机器人端解释，客户端不校验）
        command: String,
    },
    /// `run_rosrun`：在目标机器人上执行 rosrun
    RunRosrun {
        /// 目标机器人
        destination: Destination,
        /// rosrun 首参数，如 "my_pkg my_node"
        command: String,
        /// 其余参数，缺省为空串
        args: String,
    },
    /// `kill_rosnodes`：终止目标机器人上运行的 rosnode
    KillRosnodes {
        /// 目标机器人
        destination: Destination,
        /// rosnode 名称列表（允许为空，机器人端视为 no-op）
        rosnodes: Vec<String>,
    },
    /// `update_application`：把本应用程序的会话与某台机器人关联（rebind）
    ///
    /// 作用于 ConnectionManager 中的会话记录而非某个目的地，
    /// 用于后续订阅 roslaunch_log / rosrun_log。
    UpdateApplication {
        /// 本应用程序的 UUID
        uuid: ParticipantId,
        /// 关联的机器人 UUID
        robot_uuid: ParticipantId,
    },
}

impl ControlMessage {
    /// 消息对应的事件名
    pub fn event(&self) -> &'static str {
        match self {
            Self::RegisterApplication { .. } => "register_application",
            Self::TopicTransfer(_) => "topic_transfer",
            Self::RunLaunch { .. } => "run_launch",
            Self::RunRosrun { .. } => "run_rosrun",
            Self::KillRosnodes { .. } => "kill_rosnodes",
            Self::UpdateApplication { .. } => "update_application",
        }
    }

    /// 消息的 JSON 载荷
    ///
    /// # 返回值
    /// 随事件发送的 JSON 对象
    pub fn payload(&self) -> Result<Value> {
        let payload = match self {
            Self::RegisterApplication { application_uuid } => serde_json::json!({
                "applicationUuid": application_uuid,
            }),
            Self::TopicTransfer(envelope) => serde_json::to_value(envelope)?,
            Self::RunLaunch {
                destination,
                command,
            } => serde_json::json!({
                "destination": destination,
                "command": command,
            }),
            Self::RunRosrun {
                destination,
                command,
                args,
            } => serde_json::json!({
                "destination": destination,
                "command": command,
                "args": args,
            }),
            Self::KillRosnodes {
                destination,
                rosnodes,
            } => serde_json::json!({
                "destination": destination,
                "rosnodes": rosnodes,
            }),
            Self::UpdateApplication { uuid, robot_uuid } => serde_json::json!({
                "uuid": uuid,
                "robotUuid": robot_uuid,
            }),
        };
        Ok(payload)
    }
}

/// 入站消息
///
/// ConnectionManager 通过 `topic_to_application` 事件送达的消息。
/// 除 `topic` 与 `msg` 外的字段原样保留，便于调试。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// 主题名
    pub topic: String,
    /// 主题消息体
    #[serde(default)]
    pub msg: Value,
    /// 其余未建模的字段
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
