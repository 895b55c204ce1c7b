use serde::Serialize;

use crate::types::UserData;

/// The body of one chat turn posted to the endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    /// The trimmed text the user sent.
    pub message: String,

    /// The session this turn belongs to.
    pub session_id: String,

    /// Snapshot of the cached user data at the time of sending.
    pub user_data: UserData,
}

impl ChatRequest {
    /// Create a new request.
    pub fn new(
        message: impl Into<String>,
        session_id: impl Into<String>,
        user_data: UserData,
    ) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            user_data,
        }
    }
}
