//! Live-edit state machine.
//!
//! Edit capability is tracked in an explicit registry keyed by note id, not
//! re-derived by scanning rendered output. The registry is rebuilt
//! transactionally whenever the rendered note set changes (capability does
//! not survive content replacement), and each entry walks a small state
//! machine:
//!
//! ```text
//! ReadOnly -> Editable            privileged identity at (re)render
//! Editable -> Saving              focus loss with changed content
//! Saving   -> SaveAcknowledged    success response
//! Saving   -> SaveFailed          any error, including credential rejection
//! SaveAcknowledged/SaveFailed -> Editable   after the feedback interval
//! ```
//!
//! Saves are dispatched strictly in focus-loss order. Out-of-order
//! completion is not guarded against; a completion for a note no longer in
//! the registry is a no-op (the response arrived after navigation).

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::models::{Note, UpdateNote};

/// How long the save feedback tint stays before reverting to editable.
pub const FEEDBACK_REVERT_MS: i64 = 800;

// ============================================================================
// Phases & Bindings
// ============================================================================

/// Designated editable regions of a note card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteField {
    Title,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    ReadOnly,
    Editable,
    Saving,
    SaveAcknowledged { revert_at: DateTime<Utc> },
    SaveFailed { revert_at: DateTime<Utc> },
}

impl EditPhase {
    /// Whether the region currently accepts direct manipulation. The
    /// transient feedback states keep the region editable; only `ReadOnly`
    /// withdraws the affordance.
    pub fn accepts_input(&self) -> bool {
        !matches!(self, EditPhase::ReadOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldValues {
    title: String,
    content: String,
}

/// Binding between a rendered note's designated regions and its persisted
/// counterpart. `working` is whatever the user last left in the regions;
/// `synced` is the last content the backend acknowledged.
#[derive(Debug, Clone)]
struct EditBinding {
    category: String,
    working: FieldValues,
    synced: FieldValues,
    phase: EditPhase,
}

// ============================================================================
// Registry
// ============================================================================

pub struct EditRegistry {
    bindings: HashMap<u64, EditBinding>,
}

impl EditRegistry {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Rebuild the registry for the currently rendered notes. Entries for
    /// departed notes are dropped; rendered notes are (re)bound, editable
    /// only for a privileged identity. Must be re-run any time the rendered
    /// set changes, including after login.
    pub fn sync(&mut self, rendered: &[Note], privileged: bool) {
        let keep: HashSet<u64> = rendered.iter().map(|n| n.id).collect();
        self.bindings.retain(|id, _| keep.contains(id));

        for note in rendered {
            let values = FieldValues {
                title: note.title.clone(),
                content: note.content.clone(),
            };
            self.bindings.insert(
                note.id,
                EditBinding {
                    category: note.category.clone(),
                    working: values.clone(),
                    synced: values,
                    phase: if privileged {
                        EditPhase::Editable
                    } else {
                        EditPhase::ReadOnly
                    },
                },
            );
        }
        debug!(bound = self.bindings.len(), privileged, "edit registry synced");
    }

    /// Withdraw edit capability from every binding without dropping the
    /// working copies. Used when the identity loses its privilege.
    pub fn deactivate(&mut self) {
        for binding in self.bindings.values_mut() {
            binding.phase = EditPhase::ReadOnly;
        }
    }

    /// Record the final serialized content of a region on focus loss.
    /// Returns the update payload to persist, or `None` when no request
    /// should be issued: the note is not bound, the region is read-only, or
    /// the content matches what the backend already has.
    pub fn capture_blur(&mut self, note_id: u64, field: NoteField, value: &str) -> Option<UpdateNote> {
        let binding = self.bindings.get_mut(&note_id)?;
        if !binding.phase.accepts_input() {
            return None;
        }

        match field {
            NoteField::Title => binding.working.title = value.to_string(),
            NoteField::Content => binding.working.content = value.to_string(),
        }

        if binding.working == binding.synced {
            return None;
        }

        binding.phase = EditPhase::Saving;
        // The payload carries every designated region of the note, not just
        // the one that blurred, with the category passed through unchanged.
        Some(UpdateNote {
            title: binding.working.title.clone(),
            category: binding.category.clone(),
            content: binding.working.content.clone(),
            is_published: true,
        })
    }

    /// Settle an in-flight save. A failed save keeps the working copy as the
    /// user left it, so a retry operates on the latest edit. Completions for
    /// ids no longer bound, or for bindings no longer in `Saving`, are
    /// no-ops.
    pub fn complete_save(&mut self, note_id: u64, ok: bool, now: DateTime<Utc>) {
        let Some(binding) = self.bindings.get_mut(&note_id) else {
            return;
        };
        if binding.phase != EditPhase::Saving {
            return;
        }

        let revert_at = now + Duration::milliseconds(FEEDBACK_REVERT_MS);
        if ok {
            binding.synced = binding.working.clone();
            binding.phase = EditPhase::SaveAcknowledged { revert_at };
        } else {
            binding.phase = EditPhase::SaveFailed { revert_at };
        }
    }

    /// Revert any expired feedback tint back to `Editable`.
    pub fn expire_feedback(&mut self, now: DateTime<Utc>) {
        for binding in self.bindings.values_mut() {
            match binding.phase {
                EditPhase::SaveAcknowledged { revert_at } | EditPhase::SaveFailed { revert_at }
                    if now >= revert_at =>
                {
                    binding.phase = EditPhase::Editable;
                }
                _ => {}
            }
        }
    }

    pub fn phase(&self, note_id: u64) -> Option<EditPhase> {
        self.bindings.get(&note_id).map(|b| b.phase)
    }

    pub fn is_editable(&self, note_id: u64) -> bool {
        self.bindings
            .get(&note_id)
            .map(|b| b.phase.accepts_input())
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for EditRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "editor_test.rs"]
mod editor_test;
