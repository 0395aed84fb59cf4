//! 日志系统模块
//!
//! 本模块提供了统一的日志记录功能，使用 `tracing` 库实现。
//! `LoggingConfig` 即配置文件的 `[logging]` 段，由 `ConfigLoader` 解析后
//! 直接传给 `init`。

use serde::{Deserialize, Serialize};
use tracing::{info, Level};

/// 日志级别
///
/// 从低到高：Trace < Debug < Info < Warn < Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 最详细的日志级别（调试用）
    Trace,
    /// 调试信息
    Debug,
    /// 一般信息
    #[default]
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

/// 日志配置
///
/// 配置文件中的 `[logging]` 段
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
}

/// 初始化日志系统
///
/// # 参数说明
/// * `config` - 日志配置
pub fn init(config: &LoggingConfig) {
    let level_filter = match config.level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level_filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("设置全局日志 subscriber 失败");

    info!(level = ?config.level, "日志系统初始化完成");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parses_from_lowercase() {
        let level: LogLevel = serde_json::from_value(serde_json::json!("debug")).unwrap();

        assert_eq!(level, LogLevel::Debug);
    }

    #[test]
    fn test_default_level_is_info() {
        assert_eq!(LoggingConfig::default().level, LogLevel::Info);
    }
}
