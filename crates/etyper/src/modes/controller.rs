//! The cooperative main loop.

use std::time::{Duration, Instant};

use platform::config::{INPUT_WAIT, KEYBOARD_RETRY};
use platform::{BoundedWait, Clock, EpaperPanel, InputDevice, InputEvent, Modifiers, StdDelay, StopFlag};

use super::{file_server, picker, sleeping, typing};
use super::{Action, DeviceContext, Mode, ModeError, ModeKind, Screen};
use crate::session::{NetworkBackend, ResourceSession};

/// How often the keyboard retry pause looks at the stop flag.
const RETRY_POLL: Duration = Duration::from_millis(50);

/// Owns the active [`Mode`] and drives it from key events and time.
///
/// Single-threaded: the only suspension point is the bounded wait on the
/// input device, so a stop request is noticed within [`INPUT_WAIT`].
#[derive(Debug)]
pub struct ModeController<P, I, C, B> {
    ctx: DeviceContext<P, B>,
    input: I,
    clock: C,
    mode: Mode,
    stop: StopFlag,
}

impl<P, I, C, B> ModeController<P, I, C, B>
where
    P: EpaperPanel,
    I: InputDevice,
    C: Clock,
    B: NetworkBackend,
{
    /// Controller in typing mode. Nothing is drawn until [`Self::start`].
    pub fn new(ctx: DeviceContext<P, B>, input: I, clock: C, stop: StopFlag) -> Self {
        Self {
            ctx,
            input,
            clock,
            mode: Mode::Typing,
            stop,
        }
    }

    /// Shared state.
    pub fn context(&self) -> &DeviceContext<P, B> {
        &self.ctx
    }

    /// Mutable shared state.
    pub fn context_mut(&mut self) -> &mut DeviceContext<P, B> {
        &mut self.ctx
    }

    /// Active mode.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Input device.
    pub fn input(&self) -> &I {
        &self.input
    }

    /// Mutable input device.
    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// First full render of the typing screen.
    pub fn start(&mut self) {
        tracing::info!(path = %self.ctx.editor.document().path.display(), "starting in typing mode");
        self.ctx.show(Screen::Typing, true);
    }

    /// Start, loop until the stop flag is set, then shut down.
    ///
    /// The shutdown waits run to their own bounds; the stop request has
    /// already been acted on.
    pub fn run(&mut self) -> Result<(), ModeError> {
        self.start();
        while !self.stop.is_set() {
            self.step();
        }
        tracing::info!("stop requested");
        self.stop.drain();
        self.shutdown()
    }

    /// One loop iteration: wait for a key, dispatch it, render what is
    /// pending, then run the mode's timers.
    pub fn step(&mut self) {
        match self.input.poll_event(INPUT_WAIT) {
            Ok(Some(event)) => self.dispatch(event),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "keyboard unavailable");
                self.ctx.modifiers = Modifiers::default();
                let waited = BoundedWait::new(RETRY_POLL, KEYBOARD_RETRY)
                    .with_stop(self.stop.clone())
                    .sleep(&mut StdDelay);
                if !waited {
                    tracing::debug!("keyboard retry pause cut short by stop request");
                }
            }
        }

        if self.ctx.render_pending() && self.mode.kind() != ModeKind::Sleeping {
            let screen = self.mode.screen();
            self.ctx.show(screen, false);
        }

        let action = self.tick(self.clock.now());
        self.apply(action);
    }

    fn dispatch(&mut self, event: InputEvent) {
        if self.ctx.modifiers.update(&event) || !event.state.is_down() {
            return;
        }
        let now = self.clock.now();
        let result = match &mut self.mode {
            Mode::Typing => typing::handle_key(&mut self.ctx, event, now),
            Mode::Sleeping => Ok(sleeping::handle_key(self.ctx.modifiers, event)),
            Mode::LayoutPicker { selection } => Ok(picker::handle_key(&mut self.ctx, selection, event)),
            Mode::FileServer { .. } => Ok(file_server::handle_key(self.ctx.modifiers, event)),
        };
        match result {
            Ok(action) => self.apply(action),
            Err(e) => {
                tracing::error!(mode = self.mode.kind().as_str(), error = %e, "key handling failed");
                self.apply(Action::Render);
            }
        }
    }

    fn tick(&mut self, now: Instant) -> Action {
        match &self.mode {
            Mode::Typing => typing::tick(&mut self.ctx, now).unwrap_or_else(|e| {
                tracing::error!(error = %e, "autosave failed");
                Action::Render
            }),
            Mode::FileServer { started, .. } => file_server::tick(*started, now),
            Mode::Sleeping | Mode::LayoutPicker { .. } => Action::None,
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Render => self.ctx.request_render(false),
            Action::FullRefresh => self.ctx.request_render(true),
            Action::Transition(to) => self.transition(to),
        }
    }

    /// Leave the active mode and enter `to`. If entering fails the
    /// controller lands in typing mode.
    pub fn transition(&mut self, to: ModeKind) {
        let from = self.mode.kind();
        if from == to {
            return;
        }
        let old = core::mem::replace(&mut self.mode, Mode::Typing);
        self.exit(old);
        self.mode = match self.enter(to) {
            Ok(mode) => mode,
            Err(e) => {
                tracing::error!(mode = to.as_str(), error = %e, "entering mode failed, back to typing");
                self.ctx.show(Screen::Typing, true);
                Mode::Typing
            }
        };
        tracing::info!(from = from.as_str(), to = self.mode.kind().as_str(), "mode changed");
    }

    fn exit(&mut self, mode: Mode) {
        if let Mode::FileServer { mut session, .. } = mode {
            let report = session.teardown(&mut self.ctx.backend);
            if !report.is_clean() {
                tracing::warn!(warnings = report.warnings.len(), "file-sharing teardown incomplete");
            }
        }
    }

    fn enter(&mut self, to: ModeKind) -> Result<Mode, ModeError> {
        match to {
            ModeKind::Typing => {
                self.ctx.show(Screen::Typing, true);
                Ok(Mode::Typing)
            }
            ModeKind::LayoutPicker => {
                let selection = picker::initial_selection(self.ctx.layout);
                self.ctx.show(Screen::Picker(selection), true);
                Ok(Mode::LayoutPicker { selection })
            }
            ModeKind::Sleeping => {
                self.save_before_leaving();
                self.ctx.cancel_render();
                self.ctx.blank_and_sleep()?;
                Ok(Mode::Sleeping)
            }
            ModeKind::FileServer => {
                self.save_before_leaving();
                self.ctx.show(Screen::FileServer, true);
                let session = ResourceSession::acquire(&mut self.ctx.backend)?;
                Ok(Mode::FileServer {
                    session,
                    started: self.clock.now(),
                })
            }
        }
    }

    fn save_before_leaving(&mut self) {
        if let Err(e) = self.ctx.save_if_dirty(self.clock.now()) {
            tracing::error!(error = %e, "save failed");
        }
    }

    /// Leave the active mode, save, blank the panel and put it to sleep.
    /// Every step runs; the first error is returned.
    pub fn shutdown(&mut self) -> Result<(), ModeError> {
        let was_sleeping = self.mode.kind() == ModeKind::Sleeping;
        let old = core::mem::replace(&mut self.mode, Mode::Typing);
        self.exit(old);

        let mut first_error: Option<ModeError> = None;
        let dirty = self.ctx.editor.is_dirty();
        if let Err(e) = self.ctx.save_if_dirty(self.clock.now()) {
            tracing::error!(error = %e, "final save failed");
            first_error = Some(e.into());
        }
        if !(was_sleeping && !dirty) {
            if let Err(e) = self.ctx.blank_and_sleep() {
                tracing::error!(error = %e, "blanking the panel failed");
                first_error.get_or_insert(e.into());
            }
        }
        self.mode = Mode::Sleeping;
        tracing::info!("shutdown complete");
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::DocumentStore;
    use crate::session::{ServerConfig, ServerKind, SystemBackend};
    use platform::config::CERT_DIR_NAME;
    use platform::mocks::{MockClock, MockInput, MockPanel, MockRunner, PanelCall};
    use platform::{DisplayError, KeyCode};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tempfile::TempDir;
    use ui::LayoutId;

    type Controller = ModeController<MockPanel, MockInput, MockClock, SystemBackend<MockRunner>>;

    struct Rig {
        tmp: TempDir,
        clock: MockClock,
        runner: MockRunner,
        stop: StopFlag,
    }

    fn rig() -> Rig {
        Rig {
            tmp: TempDir::new().unwrap(),
            clock: MockClock::new(),
            runner: MockRunner::new(),
            stop: StopFlag::new(),
        }
    }

    impl Rig {
        fn store(&self) -> DocumentStore {
            DocumentStore::new(self.tmp.path())
        }

        fn controller(&self, script: impl FnOnce(&mut MockInput)) -> Controller {
            let servers = ServerConfig {
                bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
                https_port: 0,
                http_port: 0,
            };
            let backend = SystemBackend::new(self.runner.clone(), self.store(), servers);
            let ctx = DeviceContext::new(MockPanel::new(), backend, self.store(), self.clock.now()).unwrap();
            let mut input = MockInput::new()
                .with_clock(self.clock.clone())
                .stop_when_empty(self.stop.clone());
            script(&mut input);
            ModeController::new(ctx, input, self.clock.clone(), self.stop.clone())
        }
    }

    fn drain(c: &mut Controller) {
        while c.input().remaining() > 0 {
            c.step();
        }
    }

    fn text(c: &Controller) -> &str {
        &c.context().editor.document().text
    }

    #[test]
    fn test_typing_renders_partially_after_first_full_refresh() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.tap(KeyCode::H).tap(KeyCode::I);
        });
        c.start();
        assert_eq!(
            c.context().panel.calls(),
            [PanelCall::InitFull, PanelCall::RenderFull, PanelCall::InitPartial]
        );
        c.context_mut().panel.clear_calls();
        drain(&mut c);
        assert_eq!(text(&c), "hi");
        assert_eq!(c.context().panel.calls(), [PanelCall::RenderPartial, PanelCall::RenderPartial]);
        assert!(!c.context().panel.is_blank());
    }

    #[test]
    fn test_release_and_modifier_events_do_not_render() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.push(InputEvent::press(KeyCode::LEFTSHIFT))
                .push(InputEvent::release(KeyCode::LEFTSHIFT))
                .push(InputEvent::release(KeyCode::A));
        });
        c.start();
        c.context_mut().panel.clear_calls();
        drain(&mut c);
        assert!(c.context().panel.calls().is_empty());
    }

    #[test]
    fn test_shifted_characters_use_layout() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.chord(KeyCode::LEFTSHIFT, KeyCode::A).tap(KeyCode::NUM_1);
        });
        c.start();
        drain(&mut c);
        assert_eq!(text(&c), "A1");
    }

    #[test]
    fn test_ctrl_s_saves_to_disk() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.tap(KeyCode::X).chord(KeyCode::LEFTCTRL, KeyCode::S);
        });
        c.start();
        drain(&mut c);
        let doc = c.context().editor.document();
        assert!(!doc.dirty);
        assert_eq!(std::fs::read_to_string(&doc.path).unwrap(), "x");
        assert_eq!(r.store().last_doc(), Some(doc.path.clone()));
    }

    #[test]
    fn test_autosave_after_interval() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.tap(KeyCode::A);
            for _ in 0..19 {
                i.idle();
            }
        });
        c.start();
        drain(&mut c);
        // 19 idle polls of 500 ms: not yet 10 s
        assert!(c.context().editor.is_dirty());
        c.step();
        c.step();
        assert!(!c.context().editor.is_dirty());
        let path = &c.context().editor.document().path;
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a");
    }

    #[test]
    fn test_ctrl_r_forces_full_refresh() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.chord(KeyCode::LEFTCTRL, KeyCode::R);
        });
        c.start();
        c.context_mut().panel.clear_calls();
        drain(&mut c);
        assert_eq!(
            c.context().panel.calls(),
            [PanelCall::InitFull, PanelCall::RenderFull, PanelCall::InitPartial]
        );
    }

    #[test]
    fn test_failed_render_is_retried_with_full_refresh() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.tap(KeyCode::A).tap(KeyCode::B);
        });
        c.start();
        c.context_mut()
            .panel
            .fail_next(PanelCall::RenderPartial, DisplayError::HardwareTimeout { waited_ms: 30_000 });
        c.context_mut().panel.clear_calls();
        drain(&mut c);
        assert_eq!(
            c.context().panel.calls(),
            [
                PanelCall::RenderPartial,
                PanelCall::InitFull,
                PanelCall::RenderFull,
                PanelCall::InitPartial,
                PanelCall::RenderPartial
            ]
        );
        assert!(!c.context().render_pending());
        assert_eq!(text(&c), "ab");
    }

    #[test]
    fn test_sleep_and_wake() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.tap(KeyCode::A)
                .chord(KeyCode::LEFTCTRL, KeyCode::Q)
                .tap(KeyCode::B)
                .repeat(KeyCode::Q);
        });
        c.start();
        drain(&mut c);
        assert_eq!(c.mode().kind(), ModeKind::Sleeping);
        let panel = &c.context().panel;
        assert_eq!(panel.calls().last(), Some(&PanelCall::Sleep));
        assert!(panel.is_blank());
        // Typed while asleep: ignored.
        assert_eq!(text(&c), "a");
        assert!(!c.context().editor.is_dirty());

        c.context_mut().panel.clear_calls();
        c.input.chord(KeyCode::RIGHTCTRL, KeyCode::Q);
        drain(&mut c);
        assert_eq!(c.mode().kind(), ModeKind::Typing);
        assert_eq!(
            c.context().panel.calls(),
            [PanelCall::InitFull, PanelCall::RenderFull, PanelCall::InitPartial]
        );
        assert!(!c.context().panel.is_blank());
    }

    #[test]
    fn test_layout_picker_selects_and_persists() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.chord(KeyCode::LEFTCTRL, KeyCode::K)
                .tap(KeyCode::DOWN)
                .tap(KeyCode::DOWN)
                .tap(KeyCode::ENTER);
        });
        c.start();
        drain(&mut c);
        assert_eq!(c.mode().kind(), ModeKind::Typing);
        let expected = LayoutId::ALL[2];
        assert_eq!(c.context().layout, expected);
        assert_eq!(r.store().load_layout(), Some(expected));
    }

    #[test]
    fn test_layout_picker_escape_keeps_layout() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.chord(KeyCode::LEFTCTRL, KeyCode::K).tap(KeyCode::DOWN);
        });
        c.start();
        drain(&mut c);
        assert!(matches!(c.mode(), Mode::LayoutPicker { selection } if selection.index() == 1));
        c.context_mut().panel.clear_calls();
        c.input.tap(KeyCode::ESC);
        drain(&mut c);
        assert_eq!(c.mode().kind(), ModeKind::Typing);
        assert_eq!(c.context().layout, LayoutId::default());
        // Back to typing always resyncs.
        assert_eq!(c.context().panel.calls().first(), Some(&PanelCall::InitFull));
    }

    #[test]
    fn test_ctrl_n_and_document_switching() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.tap(KeyCode::A);
        });
        c.start();
        drain(&mut c);
        let first = c.context().editor.document().path.clone();

        c.input.chord(KeyCode::LEFTCTRL, KeyCode::N).tap(KeyCode::B);
        drain(&mut c);
        let second = c.context().editor.document().path.clone();
        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "a");

        c.input.chord(KeyCode::LEFTCTRL, KeyCode::LEFT);
        drain(&mut c);
        assert_eq!(c.context().editor.document().path, first);
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "b");
        assert_eq!(text(&c), "a");
    }

    #[test]
    fn test_file_server_failure_falls_back_to_typing() {
        let r = rig();
        r.runner.fail("bluetoothctl power on");
        let mut c = r.controller(|i| {
            i.tap(KeyCode::A).chord(KeyCode::LEFTCTRL, KeyCode::F);
        });
        c.start();
        drain(&mut c);
        assert_eq!(c.mode().kind(), ModeKind::Typing);
        // Saved on the way out of typing.
        assert!(!c.context().editor.is_dirty());
        assert!(c.context().panel.state().is_ready());
    }

    #[test]
    fn test_file_server_session_times_out() {
        let r = rig();
        let ssl = r.tmp.path().join(CERT_DIR_NAME);
        std::fs::create_dir_all(&ssl).unwrap();
        std::fs::write(ssl.join("cert.pem"), include_bytes!("../../tests/fixtures/cert.pem")).unwrap();
        std::fs::write(ssl.join("key.pem"), include_bytes!("../../tests/fixtures/key.pem")).unwrap();

        let mut c = r.controller(|i| {
            i.chord(KeyCode::LEFTCTRL, KeyCode::F);
        });
        c.start();
        drain(&mut c);
        let (plain, tls) = match c.mode() {
            Mode::FileServer { session, .. } => (
                session.server_addr(ServerKind::Plain),
                session.server_addr(ServerKind::Tls),
            ),
            _ => (None, None),
        };
        assert!(plain.is_some());
        assert!(tls.is_some());
        assert!(r.runner.called("dnsmasq"));

        r.clock.advance(Duration::from_secs(300));
        c.step();
        assert_eq!(c.mode().kind(), ModeKind::Typing);
        assert!(r.runner.called("bluetoothctl power off"));
        assert_eq!(r.runner.terminated().len(), 3);
    }

    #[test]
    fn test_run_stops_and_shuts_down() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.tap(KeyCode::Z);
        });
        c.run().unwrap();
        let doc = c.context().editor.document();
        assert_eq!(std::fs::read_to_string(&doc.path).unwrap(), "z");
        let panel = &c.context().panel;
        assert!(panel.is_blank());
        assert_eq!(panel.calls().last(), Some(&PanelCall::Sleep));
        assert_eq!(c.mode().kind(), ModeKind::Sleeping);
    }

    #[test]
    fn test_lost_keyboard_releases_held_ctrl() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.push(InputEvent::press(KeyCode::LEFTCTRL)).lose_device().tap(KeyCode::Q);
        });
        c.start();
        drain(&mut c);
        assert!(!c.context().modifiers.ctrl);
        assert_eq!(c.mode().kind(), ModeKind::Typing);
        assert_eq!(text(&c), "q");
    }

    #[test]
    fn test_stop_request_cuts_keyboard_retry_short() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.lose_device();
        });
        c.start();
        r.stop.set();
        let started = std::time::Instant::now();
        c.step();
        assert!(started.elapsed() < KEYBOARD_RETRY / 2);
        assert!(r.stop.is_set());
    }

    #[test]
    fn test_shutdown_while_sleeping_skips_second_blank() {
        let r = rig();
        let mut c = r.controller(|i| {
            i.chord(KeyCode::LEFTCTRL, KeyCode::Q);
        });
        c.start();
        drain(&mut c);
        c.context_mut().panel.clear_calls();
        c.shutdown().unwrap();
        assert!(c.context().panel.calls().is_empty());
    }
}
