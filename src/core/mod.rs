//! 核心路由模块
//!
//! 寻址与路由协议的"大脑"，负责参与者身份、目的地建模、出站指令编码与
//! 入站主题路由等核心功能。
//!
//! # 模块结构
//! - `identity` - 参与者身份（进程唯一 UUID）
//! - `addressing` - 目的地模型（robot / application 类型化寻址）
//! - `message` - 消息类型（出站信封、指令、入站消息）
//! - `encoder` - 指令编码器（意图 -> 出站控制消息）
//! - `routing` - 路由表（主题 -> 本地处理器）

pub mod addressing;
pub mod encoder;
pub mod identity;
pub mod message;
pub mod routing;
