//! Interaction modes and the controller that switches between them.
//!
//! Exactly one [`Mode`] is active. Handlers get the shared
//! [`DeviceContext`] and answer with an [`Action`]; the
//! [`ModeController`] applies it (render, full refresh, or a transition
//! running the old mode's exit and the new mode's entry).

use std::time::Instant;

use platform::DisplayError;
use ui::ListSelection;

use crate::document::DocumentError;
use crate::session::{ResourceSession, SessionError};

pub mod context;
pub mod controller;
pub mod file_server;
pub mod picker;
pub mod sleeping;
pub mod typing;

pub use context::DeviceContext;
pub use controller::ModeController;

/// Mode errors.
#[derive(Debug, thiserror::Error)]
pub enum ModeError {
    /// The panel failed.
    #[error("display: {0}")]
    Display(#[from] DisplayError),
    /// Saving or loading a document failed.
    #[error("document: {0}")]
    Document(#[from] DocumentError),
    /// The file-sharing session could not start.
    #[error("file sharing: {0}")]
    Session(#[from] SessionError),
}

/// Mode without its state, for requesting transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// Editing.
    Typing,
    /// Panel asleep, waiting for Ctrl+Q.
    Sleeping,
    /// Choosing a keyboard layout.
    LayoutPicker,
    /// Sharing documents over Bluetooth.
    FileServer,
}

impl ModeKind {
    /// Name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::Sleeping => "sleeping",
            Self::LayoutPicker => "layout-picker",
            Self::FileServer => "file-server",
        }
    }
}

/// The active mode with its per-mode state.
#[derive(Debug)]
pub enum Mode {
    /// Editing.
    Typing,
    /// Panel asleep.
    Sleeping,
    /// Choosing a keyboard layout.
    LayoutPicker {
        /// Highlighted layout.
        selection: ListSelection,
    },
    /// Sharing documents.
    FileServer {
        /// Acquired network resources.
        session: ResourceSession,
        /// When the session came up.
        started: Instant,
    },
}

impl Mode {
    /// Kind of this mode.
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Typing => ModeKind::Typing,
            Self::Sleeping => ModeKind::Sleeping,
            Self::LayoutPicker { .. } => ModeKind::LayoutPicker,
            Self::FileServer { .. } => ModeKind::FileServer,
        }
    }

    /// What this mode shows.
    pub fn screen(&self) -> Screen {
        match self {
            Self::Typing => Screen::Typing,
            Self::Sleeping => Screen::Blank,
            Self::LayoutPicker { selection } => Screen::Picker(*selection),
            Self::FileServer { .. } => Screen::FileServer,
        }
    }
}

/// Full-screen content to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Document page.
    Typing,
    /// Layout list.
    Picker(ListSelection),
    /// File-sharing instructions.
    FileServer,
    /// White.
    Blank,
}

/// What a handler wants done after an event or tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing changed.
    None,
    /// Redraw with a partial refresh.
    Render,
    /// Redraw with a full refresh.
    FullRefresh,
    /// Switch mode.
    Transition(ModeKind),
}
