//! Wire-level data models for the notes platform API.
//!
//! Every request and response body exchanged with the backend has an explicit
//! schema here, deserialized at the gateway boundary. Unknown fields from the
//! server are ignored; a missing required field is a decode error rather than
//! malformed data leaking into the rest of the client.

use serde::{Deserialize, Serialize};

// ============================================================================
// Identity & Authentication
// ============================================================================

/// Role attached to an authenticated identity. Everything above plain
/// read-only access hangs off `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// The authenticated user as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Identity,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

// ============================================================================
// Categories & Notes
// ============================================================================

/// Category listing entry. `db_name` is the stable key used in note payloads
/// and query strings; `name` is only for display.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub db_name: String,
    pub name: String,
    pub description: String,
    pub notes: u64,
}

/// Note summary as returned by listing and search endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NoteSummary {
    pub id: u64,
    pub title: String,
    pub category: String,
    pub views: u64,
}

/// Full note detail. `content` is server-side HTML and must be sanitized
/// before display.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Note {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub views: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateNote {
    pub title: String,
    pub category: String,
    pub content: String,
}

/// Update payload, shared by the CRUD modal and live-edit saves. Live edits
/// are immediately live, so `is_published` is always true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateNote {
    pub title: String,
    pub category: String,
    pub content: String,
    pub is_published: bool,
}

// ============================================================================
// Admin Dashboard
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AdminStats {
    pub stats: StatCounts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatCounts {
    pub total_notes: u64,
    pub total_users: u64,
    pub total_views: u64,
    #[serde(default)]
    pub last_update: Option<String>,
}

/// One row of the top-viewed-notes dashboard list.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteViewCount {
    pub title: String,
    pub views: u64,
}

// ============================================================================
// Generic Responses
// ============================================================================

/// Message envelope the backend uses for mutations and errors. An empty body
/// decodes to an empty message.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Tests
// ============================================================================
