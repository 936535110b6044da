use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddUserRequest {
    pub nickname: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub nickname: String,
    pub email: String,
    pub password: String,
}

/// User as it appears on the wire. The password never leaves the server,
/// not even hashed.
#[derive(Debug, Clone, Serialize)]
pub struct UserReply {
    pub id: u32,
    pub nickname: String,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserReply {
    /// Number of rows removed by the delete.
    pub user_id: u64,
}

// -- Events --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddEventRequest {
    pub title: String,
    pub content: String,
    pub author_id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEventRequest {
    pub title: String,
    pub content: String,
    pub author_id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteEventRequest {
    pub author_id: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventReply {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub author_id: u32,
    /// Denormalized author, attached on unary replies. Streamed list rows
    /// carry only `author_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<UserReply>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct DeleteEventReply {
    /// Number of rows removed by the delete.
    pub event_id: u64,
    pub author_id: u32,
}
