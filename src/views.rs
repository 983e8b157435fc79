//! Top-level view routing.
//!
//! Exactly one view is current at any time. Views are a closed enum, so an
//! unknown view is unrepresentable rather than a runtime error. There is no
//! history or back-stack.

use std::sync::Mutex;

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Library,
    Note,
    Dashboard,
    Login,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Library => "Library",
            View::Note => "Note",
            View::Dashboard => "Admin Dashboard",
            View::Login => "Login",
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub struct ViewRouter {
    current: Mutex<View>,
}

impl ViewRouter {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(View::Home),
        }
    }

    /// Replace the current view.
    pub fn switch_to(&self, view: View) {
        *self.current.lock().unwrap() = view;
    }

    /// Recovery entry point used when a credential is rejected.
    pub fn force_login(&self) {
        self.switch_to(View::Login);
    }

    pub fn current(&self) -> View {
        *self.current.lock().unwrap()
    }
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self::new()
    }
}
