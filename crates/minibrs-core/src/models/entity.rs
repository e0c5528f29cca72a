use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::TaskStatus;

/// A value a record field can be filtered on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Id(Uuid),
    Text(String),
    Int(i64),
    Status(TaskStatus),
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Id(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<TaskStatus> for FieldValue {
    fn from(value: TaskStatus) -> Self {
        Self::Status(value)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Status(s) => write!(f, "{}", s.as_str()),
        }
    }
}

/// A persisted record keyed by UUID whose fields can be looked up by name.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const NAME: &'static str;
    /// Field names accepted by [`Entity::field`].
    const FIELDS: &'static [&'static str];

    fn id(&self) -> Uuid;

    fn field(&self, name: &str) -> Option<FieldValue>;
}
