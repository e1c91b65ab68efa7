use serde::{Deserialize, Serialize};
use std::fmt;

/// Synchronization group a tab announces to the relay.
///
/// Content scripts never see a real tab id, so a generated token stands in
/// for one. Two uniform draws are concatenated; a collision only means two
/// tabs share volume, which is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn generate() -> Self {
        let high: u64 = rand::random();
        let low: u64 = rand::random();
        Self(format!("{high:016x}{low:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for GroupId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for GroupId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
