//! Typed view over the opaque payload of a queued operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cinetrack_core::domain::{MovieUpdate, NewMovie, OperationType, PendingOperation};
use cinetrack_core::ports::MovieBackend;

use crate::error::SyncError;

#[derive(Serialize, Deserialize)]
struct Target {
    id: String,
}

#[derive(Serialize, Deserialize)]
struct Changes {
    id: String,
    #[serde(flatten)]
    changes: MovieUpdate,
}

/// A collection mutation that can be queued and replayed later.
#[derive(Debug, Clone, PartialEq)]
pub enum QueuedMutation {
    Create(NewMovie),
    /// Replayed as `PUT /movies/{id}` carrying only the changed fields.
    Update { id: String, changes: MovieUpdate },
    Delete { id: String },
}

impl QueuedMutation {
    pub fn op_type(&self) -> OperationType {
        match self {
            QueuedMutation::Create(_) => OperationType::Create,
            QueuedMutation::Update { .. } => OperationType::Update,
            QueuedMutation::Delete { .. } => OperationType::Delete,
        }
    }

    /// Payload stored in `PendingOperation::data`.
    pub fn to_data(&self) -> Result<Value, SyncError> {
        let data = match self {
            QueuedMutation::Create(movie) => serde_json::to_value(movie),
            QueuedMutation::Update { id, changes } => serde_json::to_value(Changes {
                id: id.clone(),
                changes: changes.clone(),
            }),
            QueuedMutation::Delete { id } => serde_json::to_value(Target { id: id.clone() }),
        };
        data.map_err(|e| self.malformed(e))
    }

    pub fn from_operation(op: &PendingOperation) -> Result<Self, SyncError> {
        let malformed = |e: serde_json::Error| SyncError::MalformedPayload {
            op_type: op.op_type.to_string(),
            reason: e.to_string(),
        };
        let data = op.data.clone();

        Ok(match op.op_type {
            OperationType::Create => {
                QueuedMutation::Create(serde_json::from_value(data).map_err(malformed)?)
            }
            OperationType::Update => {
                let Changes { id, changes } = serde_json::from_value(data).map_err(malformed)?;
                QueuedMutation::Update { id, changes }
            }
            OperationType::Delete => {
                let Target { id } = serde_json::from_value(data).map_err(malformed)?;
                QueuedMutation::Delete { id }
            }
        })
    }

    /// Execute the mutation against the backend.
    pub async fn apply(&self, backend: &dyn MovieBackend) -> Result<(), SyncError> {
        match self {
            QueuedMutation::Create(movie) => {
                backend.create(movie).await?;
            }
            QueuedMutation::Update { id, changes } => {
                backend.update(id, changes).await?;
            }
            QueuedMutation::Delete { id } => backend.delete(id).await?,
        }
        Ok(())
    }

    fn malformed(&self, e: serde_json::Error) -> SyncError {
        SyncError::MalformedPayload {
            op_type: self.op_type().to_string(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinetrack_core::domain::{MediaType, WatchStatus};
    use serde_json::json;

    #[test]
    fn test_update_payload_is_flat() {
        let mutation = QueuedMutation::Update {
            id: "m1".to_string(),
            changes: MovieUpdate::status(WatchStatus::Completed),
        };

        let data = mutation.to_data().unwrap();
        assert_eq!(data, json!({"id": "m1", "status": "completed"}));

        let op = PendingOperation::new(OperationType::Update, data);
        assert_eq!(QueuedMutation::from_operation(&op).unwrap(), mutation);
    }

    #[test]
    fn test_create_payload_is_the_new_movie() {
        let movie = NewMovie::new("Dune", MediaType::Movie);
        let data = QueuedMutation::Create(movie.clone()).to_data().unwrap();
        assert_eq!(data["title"], "Dune");
        assert_eq!(data["mediaType"], "movie");
    }

    #[test]
    fn test_payload_not_matching_type_is_malformed() {
        let op = PendingOperation::new(OperationType::Delete, json!({"title": "Dune"}));

        let err = QueuedMutation::from_operation(&op).unwrap_err();

        assert!(matches!(err, SyncError::MalformedPayload { ref op_type, .. } if op_type == "delete"));
    }
}
