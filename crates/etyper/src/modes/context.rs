//! State shared by every mode: panel, network backend, documents, editor.

use core::convert::Infallible;
use std::time::Instant;

use platform::config::{APP_NAME, BRIDGE_ADDRESS, FILE_SERVER_TIMEOUT};
use platform::{DisplayError, DisplayState, EpaperPanel, Modifiers, RefreshKind};
use ui::{LayoutId, StatusLine};

use super::Screen;
use crate::display::Frame;
use crate::document::{Document, DocumentError, DocumentStore};
use crate::editor::Editor;
use crate::screens::{BlankScreen, FileServerScreen, PickerScreen, TypingScreen, COLUMNS, PAGE_LINES};

/// Everything a mode handler may touch. Owned by the controller.
#[derive(Debug)]
pub struct DeviceContext<P, B> {
    /// E-paper panel.
    pub panel: P,
    /// Network resources for file sharing.
    pub backend: B,
    /// Documents directory.
    pub store: DocumentStore,
    /// Open document and cursor.
    pub editor: Editor,
    /// Active keyboard layout.
    pub layout: LayoutId,
    /// Held modifier keys.
    pub modifiers: Modifiers,
    frame: Frame,
    last_save: Instant,
    render_pending: bool,
    needs_resync: bool,
}

impl<P: EpaperPanel, B> DeviceContext<P, B> {
    /// Open the last document (or a new one) and the saved layout.
    pub fn new(panel: P, backend: B, store: DocumentStore, now: Instant) -> Result<Self, DocumentError> {
        store.ensure_dir()?;
        let doc = store.open(None)?;
        let layout = store.load_layout().unwrap_or_default();
        tracing::info!(layout = layout.name(), "keyboard layout");
        let frame = Frame::new(panel.info());
        Ok(Self {
            panel,
            backend,
            store,
            editor: Editor::new(doc, COLUMNS, PAGE_LINES),
            layout,
            modifiers: Modifiers::default(),
            frame,
            last_save: now,
            render_pending: false,
            needs_resync: true,
        })
    }

    /// Last frame drawn.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// A render is owed to the panel.
    pub fn render_pending(&self) -> bool {
        self.render_pending
    }

    /// The next render must be a full refresh.
    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Ask for a render at the end of this loop iteration.
    pub fn request_render(&mut self, full: bool) {
        self.render_pending = true;
        self.needs_resync |= full;
    }

    /// Drop a pending render.
    pub(crate) fn cancel_render(&mut self) {
        self.render_pending = false;
    }

    /// When the document was last saved (or the save attempt failed).
    pub fn last_save(&self) -> Instant {
        self.last_save
    }

    /// Save the document.
    pub fn save(&mut self, now: Instant) -> Result<(), DocumentError> {
        self.last_save = now;
        self.store.save(self.editor.document_mut())
    }

    /// Save if there are unsaved changes.
    pub fn save_if_dirty(&mut self, now: Instant) -> Result<(), DocumentError> {
        if self.editor.is_dirty() {
            self.save(now)?;
        }
        Ok(())
    }

    /// Save, then start a fresh document.
    pub fn new_document(&mut self, now: Instant) -> Result<(), DocumentError> {
        self.save(now)?;
        let doc = Document::empty(self.store.new_path());
        tracing::info!(path = %doc.path.display(), "new document");
        self.editor.replace_document(doc);
        Ok(())
    }

    /// Save, then open the next (`forward`) or previous document. Returns
    /// whether another document was opened.
    pub fn switch_document(&mut self, forward: bool, now: Instant) -> Result<bool, DocumentError> {
        self.save(now)?;
        let current = self.editor.document().path.clone();
        let Some(next) = self.store.neighbour(&current, forward)? else {
            return Ok(false);
        };
        let doc = self.store.open(Some(&next))?;
        self.editor.replace_document(doc);
        Ok(true)
    }

    fn status_text(&self) -> String {
        let mut status = StatusLine::default();
        status.set_doc_name(self.editor.document().name());
        status.set_dirty(self.editor.is_dirty());
        status.text(COLUMNS).as_str().to_owned()
    }

    /// Draw `screen` into the frame.
    pub fn draw(&mut self, screen: Screen) {
        let drawn: Result<(), Infallible> = match screen {
            Screen::Typing => {
                let (lines, cursor) = self.editor.page();
                let status = self.status_text();
                TypingScreen {
                    lines: &lines,
                    cursor,
                    status: &status,
                }
                .render(&mut self.frame)
            }
            Screen::Picker(selection) => {
                let names: Vec<&str> = LayoutId::ALL.iter().map(|l| l.name()).collect();
                PickerScreen {
                    items: &names,
                    selection,
                }
                .render(&mut self.frame)
            }
            Screen::FileServer => FileServerScreen {
                alias: APP_NAME,
                address: BRIDGE_ADDRESS,
                auto_off_minutes: FILE_SERVER_TIMEOUT.as_secs() / 60,
            }
            .render(&mut self.frame),
            Screen::Blank => BlankScreen::render(&mut self.frame),
        };
        drawn.unwrap_or_else(|never| match never {});
    }

    /// Draw `screen` and push it to the panel.
    ///
    /// A full refresh is used when asked for, when a resync is owed, or
    /// when the panel is not in partial mode. On failure the render stays
    /// pending and the next attempt starts from a fresh full init.
    pub fn show(&mut self, screen: Screen, full: bool) {
        self.draw(screen);
        let full = full || self.needs_resync || self.panel.state() != DisplayState::PartialReady;
        let result = if full {
            self.panel.force_full_refresh(self.frame.as_bytes())
        } else {
            self.panel.render_partial(self.frame.as_bytes()).map(|kind| {
                if kind == RefreshKind::Full {
                    tracing::debug!("ghosting interval elapsed, full refresh ran");
                }
            })
        };
        match result {
            Ok(()) => {
                self.render_pending = false;
                self.needs_resync = false;
            }
            Err(e) => {
                tracing::warn!(error = %e, full, "render failed, will retry with a full refresh");
                self.render_pending = true;
                self.needs_resync = true;
            }
        }
    }

    /// Clear the panel to white with a full refresh and put it to sleep.
    pub fn blank_and_sleep(&mut self) -> Result<(), DisplayError> {
        self.panel.init_full()?;
        self.frame.clear_white();
        self.panel.render_full(self.frame.as_bytes())?;
        self.panel.sleep()?;
        // Waking goes through a full init.
        self.needs_resync = true;
        Ok(())
    }
}
