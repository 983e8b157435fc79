//! Typed command dispatch.
//!
//! Every user action is a [`Command`]; every settled action is an
//! [`Outcome`]. The dispatcher wires the session store, gateway, catalog,
//! editor registry, and CRUD modal together without knowing anything about
//! how outcomes are rendered. Failures are handled at the dispatch site
//! nearest the triggering action: business and transport errors come back as
//! values, while a credential rejection aborts the flow after the gateway
//! has already torn the session down.

use chrono::Utc;
use reqwest::Method;
use std::slice;
use std::sync::Arc;
use tracing::{debug, info};

use crate::admin::{self, CrudModal, Dashboard, FormField, ModalMode, SubmitOutcome};
use crate::catalog::ContentCatalog;
use crate::editor::{EditRegistry, NoteField};
use crate::gateway::{ApiError, ApiGateway};
use crate::models::{
    ApiMessage, Category, Identity, LoginRequest, LoginResponse, Note, NoteSummary,
};
use crate::session::SessionStore;
use crate::views::{View, ViewRouter};
use crate::AppState;

const ACCESS_DENIED: &str = "Access Denied.";

// ============================================================================
// Commands & Outcomes
// ============================================================================

/// A user action, independent of the surface that produced it.
#[derive(Debug, Clone)]
pub enum Command {
    Login { email: String, password: String },
    Logout,
    ShowHome,
    ShowLibrary,
    OpenCategory { key: String },
    OpenNote { id: u64 },
    Search { query: String },
    /// A designated region of a note card lost focus with the given final
    /// serialized content.
    Blur { note_id: u64, field: NoteField, value: String },
    OpenModal { note_id: Option<u64> },
    FormInput { field: FormField, value: String },
    SubmitModal,
    CloseModal,
    RequestDelete,
    ConfirmDelete { confirmed: bool },
    ShowDashboard,
    ChangePassword { current: String, new: String, confirm: String },
}

/// The settled result of one command.
#[derive(Debug)]
pub enum Outcome {
    LoggedIn(Identity),
    LoggedOut,
    ViewChanged(View),
    Categories(Vec<Category>),
    Notes { category: String, notes: Vec<NoteSummary> },
    NoteOpened(Box<Note>),
    Suggestions(Vec<NoteSummary>),
    /// Focus loss produced no request (read-only region or unchanged
    /// content).
    SaveSkipped,
    /// A live-edit save settled; `error` carries the per-action message for
    /// a failed save.
    SaveSettled { note_id: u64, error: Option<String> },
    ModalOpened { mode: ModalMode, categories: Vec<String> },
    ModalClosed,
    Submitted {
        result: SubmitOutcome,
        /// Refreshed listing for the active category, when one is active.
        notes: Option<(String, Vec<NoteSummary>)>,
    },
    DeleteRequested { note_id: u64 },
    Deleted { categories: Vec<Category> },
    Dashboard(Box<Dashboard>),
    Message(String),
    Denied(&'static str),
    Nothing,
}

// ============================================================================
// Client
// ============================================================================

pub struct Client {
    session: Arc<SessionStore>,
    router: Arc<ViewRouter>,
    gateway: Arc<ApiGateway>,
    catalog: ContentCatalog,
    editor: EditRegistry,
    modal: CrudModal,
    current_category: Option<String>,
    current_note: Option<Note>,
    pending_delete: Option<u64>,
}

impl Client {
    pub fn new(state: AppState) -> Self {
        let AppState {
            session,
            router,
            gateway,
        } = state;
        let catalog = ContentCatalog::new(Arc::clone(&gateway));
        let modal = CrudModal::new(Arc::clone(&gateway));
        Self {
            session,
            router,
            gateway,
            catalog,
            editor: EditRegistry::new(),
            modal,
            current_category: None,
            current_note: None,
            pending_delete: None,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    pub fn editor(&self) -> &EditRegistry {
        &self.editor
    }

    pub fn modal(&self) -> &CrudModal {
        &self.modal
    }

    /// Drain the gateway's pending one-time notice, if any.
    pub fn take_notice(&self) -> Option<String> {
        self.gateway.take_notice()
    }

    /// Run one command to completion. On a credential rejection the session
    /// has already been wiped by the gateway; the dispatcher additionally
    /// withdraws edit capability and drops transient per-note state so the
    /// aborted flow cannot resume against stale assumptions.
    pub async fn dispatch(&mut self, command: Command) -> Result<Outcome, ApiError> {
        self.editor.expire_feedback(Utc::now());

        let result = self.run(command).await;
        if matches!(result, Err(ApiError::Unauthorized)) {
            self.editor.deactivate();
            self.current_note = None;
            self.pending_delete = None;
            self.modal.close();
        }
        result
    }

    async fn run(&mut self, command: Command) -> Result<Outcome, ApiError> {
        match command {
            Command::Login { email, password } => self.login(email, password).await,
            Command::Logout => self.logout().await,
            Command::ShowHome => {
                self.close_note();
                self.router.switch_to(View::Home);
                Ok(Outcome::ViewChanged(View::Home))
            }
            Command::ShowLibrary => {
                self.close_note();
                self.current_category = None;
                self.router.switch_to(View::Library);
                let categories = self.catalog.list_categories().await?;
                Ok(Outcome::Categories(categories))
            }
            Command::OpenCategory { key } => {
                self.close_note();
                self.router.switch_to(View::Library);
                self.current_category = Some(key.clone());
                let notes = self.catalog.list_notes(&key).await?;
                Ok(Outcome::Notes {
                    category: key,
                    notes,
                })
            }
            Command::OpenNote { id } => {
                self.router.switch_to(View::Note);
                let note = self.catalog.fetch_note(id).await?;
                self.current_note = Some(note.clone());
                self.editor
                    .sync(slice::from_ref(&note), self.session.is_admin());
                Ok(Outcome::NoteOpened(Box::new(note)))
            }
            Command::Search { query } => {
                let suggestions = self.catalog.search(&query).await?;
                Ok(Outcome::Suggestions(suggestions))
            }
            Command::Blur {
                note_id,
                field,
                value,
            } => self.blur(note_id, field, &value).await,
            Command::OpenModal { note_id } => {
                if !self.session.is_admin() {
                    return Ok(Outcome::Denied(ACCESS_DENIED));
                }
                self.modal.open(note_id).await?;
                Ok(Outcome::ModalOpened {
                    mode: self.modal.mode(),
                    categories: self.modal.categories().to_vec(),
                })
            }
            Command::FormInput { field, value } => {
                self.modal.input(field, &value);
                Ok(Outcome::Nothing)
            }
            Command::SubmitModal => {
                let result = self.modal.submit().await?;
                let notes = match self.current_category.clone() {
                    Some(category) => {
                        let notes = self.catalog.list_notes(&category).await?;
                        Some((category, notes))
                    }
                    None => None,
                };
                Ok(Outcome::Submitted { result, notes })
            }
            Command::CloseModal => {
                self.modal.close();
                Ok(Outcome::ModalClosed)
            }
            Command::RequestDelete => {
                if !self.session.is_admin() {
                    return Ok(Outcome::Denied(ACCESS_DENIED));
                }
                let Some(id) = self.current_note.as_ref().map(|n| n.id) else {
                    return Ok(Outcome::Denied("No note is open."));
                };
                self.pending_delete = Some(id);
                Ok(Outcome::DeleteRequested { note_id: id })
            }
            Command::ConfirmDelete { confirmed } => {
                let Some(id) = self.pending_delete.take() else {
                    return Ok(Outcome::Nothing);
                };
                if !confirmed {
                    // No request, no view change.
                    return Ok(Outcome::Nothing);
                }
                admin::delete_note(&self.gateway, id).await?;
                self.close_note();
                self.current_category = None;
                self.router.switch_to(View::Library);
                let categories = self.catalog.list_categories().await?;
                Ok(Outcome::Deleted { categories })
            }
            Command::ShowDashboard => {
                if !self.session.is_admin() {
                    return Ok(Outcome::Denied(ACCESS_DENIED));
                }
                self.router.switch_to(View::Dashboard);
                let dashboard = admin::fetch_dashboard(&self.gateway).await?;
                Ok(Outcome::Dashboard(Box::new(dashboard)))
            }
            Command::ChangePassword {
                current,
                new,
                confirm,
            } => {
                let message =
                    admin::change_password(&self.gateway, &current, &new, &confirm).await?;
                Ok(Outcome::Message(message))
            }
        }
    }

    async fn login(&mut self, email: String, password: String) -> Result<Outcome, ApiError> {
        let request = LoginRequest { email, password };
        let response: LoginResponse = self
            .gateway
            .request_anonymous(Method::POST, "/api/login", Some(&request))
            .await?;

        self.session.commit(response.user.clone(), &response.token);
        info!(email = %response.user.email, role = %response.user.role, "logged in");

        // Editing capability does not survive a render; re-bind any note
        // that is currently on screen under the new identity.
        if let Some(note) = self.current_note.clone() {
            self.editor
                .sync(slice::from_ref(&note), self.session.is_admin());
        }

        let landing = if response.user.role.is_admin() {
            View::Dashboard
        } else {
            View::Home
        };
        self.router.switch_to(landing);
        Ok(Outcome::LoggedIn(response.user))
    }

    async fn logout(&mut self) -> Result<Outcome, ApiError> {
        if self.session.restore().is_some() {
            // The token lifecycle is client-owned; the logout endpoint is
            // stateless and best-effort.
            let result: Result<ApiMessage, ApiError> = self
                .gateway
                .request_anonymous(Method::POST, "/api/logout", None::<&()>)
                .await;
            if let Err(err) = result {
                debug!(%err, "logout call failed; clearing session anyway");
            }
        }

        self.session.clear();
        self.editor.deactivate();
        self.router.switch_to(View::Home);
        info!("logged out");
        Ok(Outcome::LoggedOut)
    }

    async fn blur(
        &mut self,
        note_id: u64,
        field: NoteField,
        value: &str,
    ) -> Result<Outcome, ApiError> {
        let Some(payload) = self.editor.capture_blur(note_id, field, value) else {
            return Ok(Outcome::SaveSkipped);
        };

        let result: Result<ApiMessage, ApiError> = self
            .gateway
            .put(&format!("/api/note/{}", note_id), &payload)
            .await;
        self.editor.complete_save(note_id, result.is_ok(), Utc::now());

        match result {
            Ok(_) => {
                // Keep the transient cached copy consistent with what the
                // backend just acknowledged.
                if let Some(note) = self.current_note.as_mut().filter(|n| n.id == note_id) {
                    note.title = payload.title.clone();
                    note.content = payload.content.clone();
                }
                Ok(Outcome::SaveSettled {
                    note_id,
                    error: None,
                })
            }
            // The gateway already cleared the session and forced the login
            // view; abort instead of pretending the session is usable.
            Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
            Err(err) => Ok(Outcome::SaveSettled {
                note_id,
                error: Some(err.to_string()),
            }),
        }
    }

    fn close_note(&mut self) {
        self.current_note = None;
        self.editor.sync(&[], self.session.is_admin());
    }
}
