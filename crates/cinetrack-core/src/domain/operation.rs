use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of mutation held in the offline queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation that could not reach the backend when it was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub id: String,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    /// Opaque payload interpreted at replay time.
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(op_type: OperationType, data: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            op_type,
            data,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = PendingOperation::new(OperationType::Create, serde_json::json!({}));
        let b = PendingOperation::new(OperationType::Create, serde_json::json!({}));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_wire_shape() {
        let op = PendingOperation::new(OperationType::Delete, serde_json::json!({"id": "m1"}));
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "delete");
        assert_eq!(json["data"]["id"], "m1");
    }
}
