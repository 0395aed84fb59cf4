//! 指令编码器模块
//!
//! 把高层意图翻译成一条寻址正确的出站控制消息，并执行各操作特有的形状约束。
//! 编码器本身从不发送——发送由连接生命周期负责。
//!
//! # 操作与目的地约束
//! | 操作 | 目的地类型 | 说明 |
//! |---|---|---|
//! | publish | 仅 robot | 向 application 发布返回 `UnsupportedDestination` |
//! | topic_route | robot（路由源） | alias 未提供时从载荷中省略 |
//! | run_launch / run_rosrun / kill_nodes | robot | command / args 不做客户端校验 |
//! | rebind | 无（作用于自身会话） | `update_application` |

use serde_json::Value;

use super::addressing::{Destination, ParticipantKind};
use super::identity::ParticipantId;
use super::message::{ControlMessage, Envelope, TopicOperation};
use crate::infra::error::{Error, Result};

/// 指令编码器
///
/// 持有本进程的参与者标识，按操作构造出站控制消息
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    /// 本应用程序的参与者标识
    self_uuid: ParticipantId,
}

impl CommandEncoder {
    /// 创建指令编码器
    ///
    /// # 参数说明
    /// * `self_uuid` - 本应用程序的参与者标识
    pub fn new(self_uuid: ParticipantId) -> Self {
        Self { self_uuid }
    }

    /// 编码注册消息
    ///
    /// 连接建立后由生命周期发送，向 ConnectionManager 登记本应用程序。
    pub fn register(&self) -> ControlMessage {
        ControlMessage::RegisterApplication {
            application_uuid: self.self_uuid.clone(),
        }
    }

    /// 编码主题发布
    ///
    /// 只有机器人会执行主题发布，指向 application 的目的地在本地直接拒绝。
    ///
    /// # 参数说明
    /// * `destination` - 目标机器人
    /// * `topic` - 主题名
    /// * `msg` - 主题消息体
    ///
    /// # 返回值
    /// 编码成功返回控制消息；目的地不是机器人返回 `UnsupportedDestination`
    pub fn publish(
        &self,
        destination: &Destination,
        topic: &str,
        msg: Value,
    ) -> Result<ControlMessage> {
        if destination.kind != ParticipantKind::Robot {
            return Err(Error::UnsupportedDestination(format!(
                "publish 只能指向 robot，收到 {}",
                destination.kind
            )));
        }

        let envelope = Envelope::new(
            destination.clone(),
            TopicOperation::Publish {
                topic: topic.to_string(),
                msg,
            },
        );
        Ok(ControlMessage::TopicTransfer(envelope))
    }

    /// 编码主题路由声明
    ///
    /// 路由是有方向的：`subscribe` 信封发往路由的源参与者（通常是机器人），
    /// 由 ConnectionManager 负责持久化与执行，客户端只声明意图。
    ///
    /// # 参数说明
    /// * `source_uuid` - 路由源（本指令的收件机器人）UUID
    /// * `target_kind` - 主题转发目的地类型，"robot" 或 "application"
    /// * `target_uuid` - 主题转发目的地 UUID
    /// * `topic` - 主题名
    /// * `alias` - 接收端的主题别名，未提供时从载荷中省略
    ///
    /// # 返回值
    /// 编码成功返回控制消息；目的地类型非法返回 `InvalidParticipantKind`
    pub fn topic_route(
        &self,
        source_uuid: &str,
        target_kind: &str,
        target_uuid: &str,
        topic: &str,
        alias: Option<&str>,
    ) -> Result<ControlMessage> {
        let topic_destination =
            Destination::new(ParticipantKind::parse(target_kind)?, target_uuid);

        let envelope = Envelope::new(
            Destination::robot(source_uuid),
            TopicOperation::Subscribe {
                topic_destination,
                topic: topic.to_string(),
                alias: alias.map(|a| a.to_string()),
            },
        );
        Ok(ControlMessage::TopicTransfer(envelope))
    }

    /// 编码 roslaunch 指令
    ///
    /// # 参数说明
    /// * `robot_uuid` - 目标机器人 UUID
    /// * `command` - roslaunch 参数，如 "my_pkg test.launch"
    pub fn run_launch(&self, robot_uuid: &str, command: &str) -> ControlMessage {
        ControlMessage::RunLaunch {
            destination: Destination::robot(robot_uuid),
            command: command.to_string(),
        }
    }

    /// 编码 rosrun 指令
    ///
    /// # 参数说明
    /// * `robot_uuid` - 目标机器人 UUID
    /// * `command` - rosrun 首参数，如 "my_pkg my_node"
    /// * `args` - 其余参数，缺省编码为空串
    pub fn run_rosrun(
        &self,
        robot_uuid: &str,
        command: &str,
        args: Option<&str>,
    ) -> ControlMessage {
        ControlMessage::RunRosrun {
            destination: Destination::robot(robot_uuid),
            command: command.to_string(),
            args: args.unwrap_or_default().to_string(),
        }
    }

    /// 编码 rosnode 终止指令
    ///
    /// # 参数说明
    /// * `robot_uuid` - 目标机器人 UUID
    /// * `rosnodes` - rosnode 名称列表，允许为空（机器人端无副作用）
    pub fn kill_nodes(&self, robot_uuid: &str, rosnodes: Vec<String>) -> ControlMessage {
        ControlMessage::KillRosnodes {
            destination: Destination::robot(robot_uuid),
            rosnodes,
        }
    }

    /// 编码会话重绑定
    ///
    /// 把本应用程序在 ConnectionManager 中的会话与指定机器人关联，
    /// 用于后续订阅 roslaunch_log / rosrun_log。
    ///
    /// # 参数说明
    /// * `robot_uuid` - 关联的机器人 UUID
    pub fn rebind(&self, robot_uuid: &str) -> ControlMessage {
        ControlMessage::UpdateApplication {
            uuid: self.self_uuid.clone(),
            robot_uuid: ParticipantId::from(robot_uuid),
        }
    }
}
