//! Client library for the notes platform.
//!
//! A terminal-resident client that authenticates against the platform's
//! HTTP API, browses categorized notes, and gives privileged identities
//! in-place editing with auto-save. The crate is organized into:
//!
//! - `models`: typed request/response schemas for every endpoint
//! - `session`: persisted identity + bearer credential (the profile)
//! - `gateway`: outbound requests and credential-rejection recovery
//! - `views`: the single-current-view router
//! - `catalog`: category/note listings, search suggestions, note detail
//! - `editor`: the live-edit state machine and its registry
//! - `admin`: CRUD modal, dashboard, change-password flow
//! - `handlers`: typed command dispatch binding it all together
//! - `render`: text rendering for the terminal surface

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

pub mod admin;
pub mod catalog;
pub mod editor;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod render;
pub mod server_url;
pub mod session;
pub mod views;

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
pub const DEFAULT_PROFILE_DIR: &str = ".notes_client";
pub const SERVER_ENV: &str = "NOTES_SERVER";
pub const PROFILE_ENV: &str = "NOTES_PROFILE_DIR";
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Validated base address of the backend, no trailing slash.
    pub server: String,
    /// Directory of the profile database holding the persisted session.
    pub profile_dir: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, server_url::ServerUrlError> {
        let raw = env::var(SERVER_ENV).unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        let server = server_url::validate_server_url(&raw)?;
        let profile_dir = env::var(PROFILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PROFILE_DIR));
        Ok(Self {
            server,
            profile_dir,
        })
    }
}

// ============================================================================
// Application State
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open profile database: {0}")]
    Profile(#[from] sled::Error),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Shared service handles behind the command dispatcher.
pub struct AppState {
    pub session: Arc<session::SessionStore>,
    pub router: Arc<views::ViewRouter>,
    pub gateway: Arc<gateway::ApiGateway>,
}

impl AppState {
    pub fn new(config: &ClientConfig) -> Result<Self, StartupError> {
        let session = Arc::new(session::SessionStore::open(&config.profile_dir)?);
        let router = Arc::new(views::ViewRouter::new());
        let gateway = Arc::new(gateway::ApiGateway::new(
            &config.server,
            Arc::clone(&session),
            Arc::clone(&router),
        )?);
        Ok(Self {
            session,
            router,
            gateway,
        })
    }
}

// Re-export commonly used types
pub use admin::{CrudModal, Dashboard, FormField, ModalMode, SubmitOutcome};
pub use catalog::{ContentCatalog, MAX_SUGGESTIONS, MIN_SEARCH_LEN};
pub use editor::{EditPhase, EditRegistry, NoteField, FEEDBACK_REVERT_MS};
pub use gateway::{ApiError, ApiGateway, SESSION_EXPIRED_NOTICE};
pub use handlers::{Client, Command, Outcome};
pub use models::{
    AdminStats, ApiMessage, Category, ChangePasswordRequest, CreateNote, Identity, LoginRequest,
    LoginResponse, Note, NoteSummary, NoteViewCount, Role, StatCounts, UpdateNote,
};
pub use server_url::validate_server_url;
pub use session::SessionStore;
pub use views::{View, ViewRouter};
