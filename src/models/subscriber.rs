use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Recipient registered for change notifications.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Subscriber {
    /// Messaging platform user id, also used as the chat id for delivery
    pub id: i64,
    pub name: String,
}

impl Subscriber {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnsubscribeOutcome {
    Removed,
    NotSubscribed,
}
