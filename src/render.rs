//! Text rendering for the terminal surface.
//!
//! Outcomes and fetched data become display strings here; the dispatch layer
//! never formats anything itself. Note content arrives as backend HTML and
//! is sanitized before it is flattened to text.

use chrono::NaiveDateTime;
use regex::Regex;

use crate::admin::{Dashboard, ModalMode, SubmitOutcome};
use crate::handlers::Outcome;
use crate::models::{Category, Identity, Note, NoteSummary};

// ============================================================================
// HTML -> Text
// ============================================================================

/// Sanitize untrusted note HTML and flatten it to plain text.
pub fn html_to_text(html: &str) -> String {
    let clean = ammonia::clean(html);
    let stripped = if let Ok(re) = Regex::new(r"</?[^>]+>") {
        re.replace_all(&clean, " ").into_owned()
    } else {
        clean
    };
    collapse_whitespace(&unescape_entities(&stripped))
}

/// Undo the entity escaping the sanitizer leaves behind. The ampersand goes
/// last so freshly produced entities are not re-expanded.
fn unescape_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Display form of a category key: underscores out, words capitalized.
pub fn category_label(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a raw backend timestamp for display. The backend emits SQL-style
/// timestamps; anything unparseable is shown as-is, and absence is "N/A".
pub fn format_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "N/A".to_string();
    };
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return parsed.format("%Y-%m-%d").to_string();
        }
    }
    raw.to_string()
}

// ============================================================================
// Views
// ============================================================================

pub fn categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories available.".to_string();
    }
    let mut out = String::from("Categories:\n");
    for cat in categories {
        out.push_str(&format!(
            "  [{}] {} — {} ({} notes)\n",
            cat.db_name, cat.name, cat.description, cat.notes
        ));
    }
    out
}

pub fn notes_list(category_key: &str, notes: &[NoteSummary]) -> String {
    let mut out = format!("{}\n", category_label(category_key));
    if notes.is_empty() {
        out.push_str("No notes available.\n");
        return out;
    }
    for note in notes {
        out.push_str(&format!(
            "  #{} {} (views: {})\n",
            note.id, note.title, note.views
        ));
    }
    out
}

pub fn note_detail(note: &Note) -> String {
    let mut out = format!(
        "{}\n[{}] views: {}",
        note.title,
        category_label(&note.category).to_uppercase(),
        note.views
    );
    if note.created_at.is_some() {
        out.push_str(&format!(
            " | created: {}",
            format_timestamp(note.created_at.as_deref())
        ));
    }
    out.push('\n');
    out.push_str(&html_to_text(&note.content));
    out.push('\n');
    out
}

pub fn suggestions(results: &[NoteSummary]) -> String {
    if results.is_empty() {
        return "No suggestions.".to_string();
    }
    let mut out = String::from("Suggestions:\n");
    for item in results {
        out.push_str(&format!("  #{} {}\n", item.id, item.title));
    }
    out
}

pub fn dashboard(dashboard: &Dashboard) -> String {
    let stats = &dashboard.stats;
    let mut out = format!(
        "Admin Dashboard\n  Notes: {}\n  Users: {}\n  Views: {}\n  Last update: {}\n",
        stats.total_notes,
        stats.total_users,
        stats.total_views,
        format_timestamp(stats.last_update.as_deref())
    );
    if !dashboard.top_notes.is_empty() {
        out.push_str("Top notes:\n");
        for row in &dashboard.top_notes {
            out.push_str(&format!("  {} ({})\n", row.title, row.views));
        }
    }
    out
}

pub fn logged_in(user: &Identity) -> String {
    format!("Logged in as {} ({}).", user.email, user.role)
}

// ============================================================================
// Outcome dispatch
// ============================================================================

/// Render one settled outcome. An empty string means nothing to print.
pub fn outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::LoggedIn(user) => logged_in(user),
        Outcome::LoggedOut => "Logged out.".to_string(),
        Outcome::ViewChanged(view) => format!("-- {} --", view.title()),
        Outcome::Categories(cats) => categories(cats),
        Outcome::Notes {
            category,
            notes,
        } => notes_list(category, notes),
        Outcome::NoteOpened(note) => note_detail(note),
        Outcome::Suggestions(results) => suggestions(results),
        Outcome::SaveSkipped => String::new(),
        Outcome::SaveSettled { note_id, error } => match error {
            None => format!("Saved note #{}.", note_id),
            Some(message) => format!("Failed to save changes: {}", message),
        },
        Outcome::ModalOpened { mode, categories } => {
            let header = match mode {
                ModalMode::Create => "Add Note",
                ModalMode::Edit(_) => "Edit Note",
                ModalMode::Closed => "Note",
            };
            format!("{} — categories: {}", header, categories.join(", "))
        }
        Outcome::ModalClosed => "Closed.".to_string(),
        Outcome::Submitted { result, notes } => {
            let mut out = match result {
                SubmitOutcome::Created => "Note created.".to_string(),
                SubmitOutcome::Updated => "Note updated.".to_string(),
            };
            if let Some((category, notes)) = notes {
                out.push('\n');
                out.push_str(&notes_list(category, notes));
            }
            out
        }
        Outcome::DeleteRequested { note_id } => {
            format!("Delete note #{}? (yes/no)", note_id)
        }
        Outcome::Deleted { categories: cats } => {
            format!("Deleted.\n{}", categories(cats))
        }
        Outcome::Dashboard(data) => dashboard(data),
        Outcome::Message(message) => message.clone(),
        Outcome::Denied(reason) => (*reason).to_string(),
        Outcome::Nothing => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_is_sanitized_and_flattened() {
        let html = "<h3>Overview</h3><p>The heart has <b>four</b> chambers.</p>\
                    <script>alert('x')</script>";
        let text = html_to_text(html);
        assert_eq!(text, "Overview The heart has four chambers.");
    }

    #[test]
    fn entities_are_unescaped_once() {
        assert_eq!(html_to_text("<p>a &amp;lt; b</p>"), "a &lt; b");
    }

    #[test]
    fn empty_listing_renders_explicit_state() {
        let out = notes_list("anatomy", &[]);
        assert!(out.contains("No notes available."));
    }

    #[test]
    fn category_labels_read_naturally() {
        assert_eq!(category_label("general_surgery"), "General Surgery");
        assert_eq!(category_label("anatomy"), "Anatomy");
    }

    #[test]
    fn timestamps_degrade_gracefully() {
        assert_eq!(
            format_timestamp(Some("2024-03-05 10:22:01")),
            "2024-03-05"
        );
        assert_eq!(format_timestamp(Some("whenever")), "whenever");
        assert_eq!(format_timestamp(None), "N/A");
    }
}
