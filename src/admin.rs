//! Structured create/update/delete flows and the admin dashboard.
//!
//! The CRUD modal is the deliberate alternative to live editing: an explicit
//! form, pre-populated in edit mode, validated client-side before any
//! request leaves. Deletion always goes through an explicit confirmation
//! step. The dashboard and change-password flows ride the same gateway.

use std::sync::Arc;
use tracing::info;

use crate::gateway::{ApiError, ApiGateway};
use crate::models::{
    AdminStats, ApiMessage, ChangePasswordRequest, CreateNote, Note, NoteViewCount, StatCounts,
    UpdateNote,
};

/// Minimum accepted password length, mirroring the backend rule.
pub const MIN_PASSWORD_LEN: usize = 6;

// ============================================================================
// CRUD Modal
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    Closed,
    /// Empty form, labeled "Add".
    Create,
    /// Pre-populated form for the given note id.
    Edit(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Category,
    Content,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteForm {
    pub title: String,
    pub category: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    Updated,
}

pub struct CrudModal {
    gateway: Arc<ApiGateway>,
    mode: ModalMode,
    form: NoteForm,
    categories: Vec<String>,
}

impl CrudModal {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self {
            gateway,
            mode: ModalMode::Closed,
            form: NoteForm::default(),
            categories: Vec::new(),
        }
    }

    /// Open the modal. `None` starts a create; `Some(id)` fetches the note
    /// and pre-populates an edit. Either way the category enumeration for
    /// the selection control is fetched fresh.
    pub async fn open(&mut self, note_id: Option<u64>) -> Result<(), ApiError> {
        self.categories = self.gateway.get("/api/categories/all").await?;

        match note_id {
            None => {
                self.mode = ModalMode::Create;
                self.form = NoteForm::default();
            }
            Some(id) => {
                let note: Note = self.gateway.get(&format!("/api/note/{}", id)).await?;
                self.mode = ModalMode::Edit(id);
                self.form = NoteForm {
                    title: note.title,
                    category: note.category,
                    content: note.content,
                };
            }
        }
        Ok(())
    }

    pub fn input(&mut self, field: FormField, value: &str) {
        if self.mode == ModalMode::Closed {
            return;
        }
        match field {
            FormField::Title => self.form.title = value.to_string(),
            FormField::Category => self.form.category = value.to_string(),
            FormField::Content => self.form.content = value.to_string(),
        }
    }

    /// Validate and submit the form. Create mode issues a create request,
    /// edit mode an update keyed by the open note id; success closes the
    /// modal. An empty field never silently succeeds.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, ApiError> {
        let outcome = match self.mode {
            ModalMode::Closed => {
                return Err(ApiError::Invalid("No form is open.".to_string()));
            }
            ModalMode::Create => {
                self.validate_fields()?;
                let payload = CreateNote {
                    title: self.form.title.clone(),
                    category: self.form.category.clone(),
                    content: self.form.content.clone(),
                };
                let _: ApiMessage = self.gateway.post("/api/note", &payload).await?;
                info!(title = %payload.title, "note created");
                SubmitOutcome::Created
            }
            ModalMode::Edit(id) => {
                self.validate_fields()?;
                let payload = UpdateNote {
                    title: self.form.title.clone(),
                    category: self.form.category.clone(),
                    content: self.form.content.clone(),
                    is_published: true,
                };
                let _: ApiMessage = self.gateway.put(&format!("/api/note/{}", id), &payload).await?;
                info!(id, "note updated");
                SubmitOutcome::Updated
            }
        };

        self.close();
        Ok(outcome)
    }

    /// An empty field never silently succeeds.
    fn validate_fields(&self) -> Result<(), ApiError> {
        if self.form.title.trim().is_empty()
            || self.form.category.trim().is_empty()
            || self.form.content.trim().is_empty()
        {
            return Err(ApiError::Invalid(
                "Title, category, and content are required.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn close(&mut self) {
        self.mode = ModalMode::Closed;
        self.form = NoteForm::default();
        self.categories.clear();
    }

    pub fn mode(&self) -> ModalMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.mode != ModalMode::Closed
    }

    pub fn form(&self) -> &NoteForm {
        &self.form
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

// ============================================================================
// Deletion
// ============================================================================

/// Issue the delete request for a note. Confirmation is the caller's
/// responsibility; this function is only reached once the user has
/// explicitly confirmed.
pub async fn delete_note(gateway: &ApiGateway, id: u64) -> Result<(), ApiError> {
    let _: ApiMessage = gateway.delete(&format!("/api/note/{}", id)).await?;
    info!(id, "note deleted");
    Ok(())
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub stats: StatCounts,
    pub top_notes: Vec<NoteViewCount>,
}

pub async fn fetch_dashboard(gateway: &ApiGateway) -> Result<Dashboard, ApiError> {
    let stats: AdminStats = gateway.get("/api/admin_stats").await?;
    let top_notes: Vec<NoteViewCount> = gateway.get("/api/note_views").await?;
    Ok(Dashboard {
        stats: stats.stats,
        top_notes,
    })
}

// ============================================================================
// Change Password
// ============================================================================

/// Change the logged-in user's password. The match and length rules are
/// checked client-side first; the backend re-checks them anyway.
pub async fn change_password(
    gateway: &ApiGateway,
    current: &str,
    new: &str,
    confirm: &str,
) -> Result<String, ApiError> {
    if new != confirm {
        return Err(ApiError::Invalid("New passwords do not match".to_string()));
    }
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Invalid(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    let request = ChangePasswordRequest {
        current_password: current.to_string(),
        new_password: new.to_string(),
        confirm_password: confirm.to_string(),
    };
    let response: ApiMessage = gateway.post("/api/change_password", &request).await?;
    Ok(response.message)
}
