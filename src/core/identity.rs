//! 参与者身份模块
//!
//! 每个客户端进程实例持有一个唯一的参与者标识，在构造时生成一次，
//! 进程生命周期内不再变化。

use serde::{Deserialize, Serialize};

/// 参与者标识
///
/// 不透明的字符串标识（UUID v4），进程实例内唯一。
///
/// # 使用示例
/// ```rust
/// use rowma::ParticipantId;
///
/// let id = ParticipantId::new();
/// println!("application: {}", id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// 生成新的参与者标识
    ///
    /// # 返回值
    /// 随机生成的 UUID v4 标识
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// 以字符串形式访问标识
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_is_unique_per_instance() {
        let a = ParticipantId::new();
        let b = ParticipantId::new();

        assert_ne!(a, b);
    }

    #[test]
    fn test_participant_id_serializes_as_plain_string() {
        let id = ParticipantId::from("xxxx-xxxx-xxxx");

        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"xxxx-xxxx-xxxx\"");
    }

    #[test]
    fn test_participant_id_is_valid_uuid() {
        let id = ParticipantId::new();

        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }
}
