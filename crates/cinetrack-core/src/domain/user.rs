use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User entity - the authenticated identity.
///
/// Replaced wholesale on every auth event; the client never edits fields in
/// place except through an explicit profile update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
}

impl User {
    /// Minimal user record when nothing but an id and email are known.
    pub fn minimal(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Display name from metadata, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.user_metadata
            .get("full_name")
            .or_else(|| self.user_metadata.get("name"))
            .and_then(Value::as_str)
            .unwrap_or(&self.email)
    }
}

/// Profile changes sent with an explicit update call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_sparse_user() {
        let user: User = serde_json::from_str(r#"{"id":"u1","email":"a@b.com"}"#).unwrap();
        assert_eq!(user.id, "u1");
        assert!(user.created_at.is_none());
        assert!(user.user_metadata.is_empty());
    }

    #[test]
    fn test_display_name_prefers_metadata() {
        let mut user = User::minimal("u1", "a@b.com");
        assert_eq!(user.display_name(), "a@b.com");

        user.user_metadata
            .insert("full_name".to_string(), Value::String("Ada".to_string()));
        assert_eq!(user.display_name(), "Ada");
    }
}
