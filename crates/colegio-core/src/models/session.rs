//! Stored session state.
//!
//! The web layer owns authentication; Colegio only reads and clears the
//! active institution a session carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_key: String,
    /// Institution the user selected, if any.
    pub institution_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    pub user_id: Uuid,
    pub session_key: String,
    pub institution_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}
