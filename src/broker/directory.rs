//! 目录查询模块
//!
//! 对 ConnectionManager 的 REST 接口做只读查询：在线机器人列表与单台
//! 机器人状态。查询结果用于构造目的地，但本模块不属于路由核心。
//!
//! # 错误约定
//! 网络失败、非 2xx 状态码、响应体非 JSON 一律归为 `DirectoryUnavailable`
//! 并交给调用方（由调用方决定是否重试），不向外泄露原始解析错误。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

use crate::infra::error::{Error, Result};

/// 机器人记录
///
/// ConnectionManager 目录返回的机器人条目。`uuid` 与 `rosnodes` 之外的
/// 字段原样保留在 `extra` 中。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotRecord {
    /// 机器人 UUID
    pub uuid: String,
    /// 机器人上正在运行的 rosnode 列表
    #[serde(default)]
    pub rosnodes: Vec<String>,
    /// 其余未建模的字段
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// 目录客户端
///
/// ConnectionManager REST 接口的只读客户端
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    /// HTTP 客户端
    http_client: reqwest::Client,
    /// ConnectionManager URL
    base_url: String,
}

impl DirectoryClient {
    /// 创建目录客户端
    ///
    /// # 参数说明
    /// * `base_url` - ConnectionManager URL
    /// * `timeout` - 请求超时（目录查询会阻塞调用方，必须有超时）
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 获取当前在线的机器人列表
    ///
    /// # 返回值
    /// 机器人记录数组
    ///
    /// # 使用示例
    /// ```rust,no_run
    /// # use rowma::DirectoryClient;
    /// # async fn run(directory: DirectoryClient) -> rowma::Result<()> {
    /// let robots = directory.list_connections().await?;
    /// println!("在线机器人: {}", robots.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_connections(&self) -> Result<Vec<RobotRecord>> {
        let url = format!("{}/list_connections", self.base_url);
        debug!(url = %url, "查询在线机器人列表");

        self.get_json(&url, &[]).await
    }

    /// 按 UUID 获取单台机器人状态
    ///
    /// # 参数说明
    /// * `uuid` - 机器人 UUID
    pub async fn robot_status(&self, uuid: &str) -> Result<RobotRecord> {
        let url = format!("{}/robots", self.base_url);
        debug!(url = %url, uuid = uuid, "查询机器人状态");

        self.get_json(&url, &[("uuid", uuid)]).await
    }

    /// 发送 GET 请求并解析 JSON 响应
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::DirectoryUnavailable(format!("目录请求失败: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            error!(url = %url, status = %status, "目录请求返回非 2xx");
            return Err(Error::DirectoryUnavailable(format!(
                "目录请求返回 {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::DirectoryUnavailable(format!("目录响应不是合法 JSON: {}", e)))
    }
}
