//! 配置管理系统模块
//!
//! 本模块负责加载和管理客户端配置。
//!
//! # 配置文件示例
//! ```toml
//! [broker]
//! base_url = "https://rowma.moriokalab.com"
//! settle_delay_ms = 1000
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{env, fs};

use super::logging::LoggingConfig;

/// 默认的公共 ConnectionManager 地址
pub const DEFAULT_BASE_URL: &str = "https://rowma.moriokalab.com";

/// 默认的 Socket.IO 命名空间
pub const DEFAULT_NAMESPACE: &str = "/rowma";

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// ConnectionManager 配置
    #[serde(default)]
    pub broker: BrokerConfig,
    /// 日志配置（`[logging]` 段，直接传给 `infra::logging::init`）
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// ConnectionManager 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// ConnectionManager URL
    pub base_url: String,
    /// Socket.IO 命名空间
    pub namespace: String,
    /// 注册沉降延迟（毫秒）
    ///
    /// 传输层建立后、宣告 Registered 之前的等待时间，用于等待 ConnectionManager
    /// 完成会话登记。这是一个经验值而非协议保证，测试中可设为 0 关闭。
    pub settle_delay_ms: u64,
    /// 目录查询（REST）超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            settle_delay_ms: 1000,
            request_timeout_secs: 30,
        }
    }
}

/// 配置加载器
#[derive(Debug, Clone)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// 创建新的配置加载器
    pub fn new() -> Self {
        Self
    }

    /// 加载配置
    ///
    /// 文件不存在时回退到默认配置（指向公共 ConnectionManager）。
    pub async fn load(&self, path: &str) -> Result<Config, super::error::Error> {
        tracing::info!(path = path, "加载配置文件");

        // 检查文件是否存在
        if !PathBuf::from(path).exists() {
            tracing::warn!(path = path, "配置文件不存在，使用默认配置");
            return Ok(Config::default());
        }

        // 读取文件内容
        let content = fs::read_to_string(path)
            .map_err(|e| super::error::Error::Config(format!("读取配置文件失败: {}", e)))?;

        // 解析 TOML
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| super::error::Error::Config(format!("解析配置文件失败: {}", e)))?;

        // 环境变量替换
        self.substitute_env_vars(&mut config);

        tracing::info!("配置加载成功");
        Ok(config)
    }

    /// 替换环境变量
    ///
    /// 将 `${VAR_NAME}` 格式的字符串替换为对应的环境变量值
    fn substitute_env_vars(&self, config: &mut Config) {
        config.broker.base_url = self.replace_env_vars(&config.broker.base_url);
        config.broker.namespace = self.replace_env_vars(&config.broker.namespace);
    }

    /// 替换字符串中的环境变量
    fn replace_env_vars(&self, input: &str) -> String {
        let pattern = r"\$\{([^}]+)\}";

        // 使用正则表达式替换环境变量
        let re = regex::Regex::new(pattern).unwrap();
        let result = re.replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
        });

        result.to_string()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
