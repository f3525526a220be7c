//! Mock implementations for testing
//!
//! This module provides mock implementations of the platform traits
//! for use in unit and integration tests. Enable the `mocks` feature to use
//! them from another crate's tests.

#![cfg(any(test, feature = "mocks"))]

use core::cell::Cell;
use core::time::Duration;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::display::{DisplayError, DisplayInfo, DisplayState, EpaperPanel, RefreshKind};
use crate::input::{InputDevice, InputError, InputEvent, KeyCode, KeyState};
use crate::process::{ChildProcess, CommandError, CommandOutput, CommandRunner};
use crate::stop::StopFlag;
use crate::time::Clock;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct MockClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl MockClock {
    /// Clock frozen at an arbitrary instant.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get().saturating_add(by));
    }

    /// Time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

const INPUT_QUEUE: usize = 1024;

#[derive(Debug, Clone, Copy)]
enum Scripted {
    Event(InputEvent),
    Idle,
    Lost,
}

/// Scripted keyboard.
///
/// Each queued entry is an event, an idle period or a lost device. When
/// the script runs out every poll is idle; an attached [`MockClock`] is
/// advanced by the poll timeout for each idle poll and an attached
/// [`StopFlag`] is set.
#[derive(Debug, Default)]
pub struct MockInput {
    script: heapless::Deque<Scripted, INPUT_QUEUE>,
    clock: Option<MockClock>,
    stop_when_empty: Option<StopFlag>,
    polls: usize,
}

impl MockInput {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance `clock` on idle polls.
    #[must_use]
    pub fn with_clock(mut self, clock: MockClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set `stop` once the script is exhausted.
    #[must_use]
    pub fn stop_when_empty(mut self, stop: StopFlag) -> Self {
        self.stop_when_empty = Some(stop);
        self
    }

    fn enqueue(&mut self, entry: Scripted) -> &mut Self {
        if self.script.push_back(entry).is_err() {
            tracing::warn!("mock input script full, entry dropped");
        }
        self
    }

    /// Queue a raw event.
    pub fn push(&mut self, event: InputEvent) -> &mut Self {
        self.enqueue(Scripted::Event(event))
    }

    /// Queue one idle poll.
    pub fn idle(&mut self) -> &mut Self {
        self.enqueue(Scripted::Idle)
    }

    /// Queue one [`InputError::DeviceLost`].
    pub fn lose_device(&mut self) -> &mut Self {
        self.enqueue(Scripted::Lost)
    }

    /// Queue press + release of `code`.
    pub fn tap(&mut self, code: KeyCode) -> &mut Self {
        self.push(InputEvent::press(code))
            .push(InputEvent::release(code))
    }

    /// Queue `code` pressed while `modifier` is held.
    pub fn chord(&mut self, modifier: KeyCode, code: KeyCode) -> &mut Self {
        self.push(InputEvent::press(modifier))
            .tap(code)
            .push(InputEvent::release(modifier))
    }

    /// Queue an auto-repeat event for `code`.
    pub fn repeat(&mut self, code: KeyCode) -> &mut Self {
        self.push(InputEvent {
            code,
            state: KeyState::Repeat,
        })
    }

    /// Remaining script entries.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Number of `poll_event` calls so far.
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl InputDevice for MockInput {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, InputError> {
        self.polls += 1;
        match self.script.pop_front() {
            Some(Scripted::Event(event)) => Ok(Some(event)),
            Some(Scripted::Lost) => Err(InputError::DeviceLost(std::io::Error::from(
                std::io::ErrorKind::UnexpectedEof,
            ))),
            entry => {
                if entry.is_none() {
                    if let Some(stop) = &self.stop_when_empty {
                        stop.set();
                    }
                }
                if let Some(clock) = &self.clock {
                    clock.advance(timeout);
                }
                Ok(None)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command runner
// ---------------------------------------------------------------------------

/// Scripted reply for commands matching a prefix.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Finish with this output.
    Output(CommandOutput),
    /// Fail to start (`run` and `spawn`).
    SpawnError,
    /// Exceed the timeout.
    Timeout,
}

#[derive(Debug, Default)]
struct RunnerLog {
    calls: Vec<String>,
    terminated: Vec<String>,
    rules: Vec<(String, MockReply)>,
}

/// Records command lines and answers from a rule table.
///
/// Command lines are `program` and `args` joined by single spaces. The first
/// rule whose prefix matches wins; unmatched `run` calls succeed with empty
/// output. Clones share the same log and rules.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    log: Arc<Mutex<RunnerLog>>,
}

impl MockRunner {
    /// Runner where everything succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_log<T>(&self, f: impl FnOnce(&mut RunnerLog) -> T) -> T {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut log)
    }

    /// Answer commands starting with `prefix` with `reply`.
    pub fn on(&self, prefix: &str, reply: MockReply) -> &Self {
        self.with_log(|log| log.rules.push((prefix.to_owned(), reply)));
        self
    }

    /// Commands starting with `prefix` exit with status 1.
    pub fn fail(&self, prefix: &str) -> &Self {
        self.fail_with(prefix, "mock failure")
    }

    /// Commands starting with `prefix` print `stderr` and exit with status 1.
    pub fn fail_with(&self, prefix: &str, stderr: &str) -> &Self {
        self.on(
            prefix,
            MockReply::Output(CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: stderr.to_owned(),
            }),
        )
    }

    /// Commands starting with `prefix` print `stdout` and succeed.
    pub fn respond(&self, prefix: &str, stdout: &str) -> &Self {
        self.on(prefix, MockReply::Output(CommandOutput::ok(stdout)))
    }

    /// Every command line run or spawned so far.
    pub fn calls(&self) -> Vec<String> {
        self.with_log(|log| log.calls.clone())
    }

    /// Spawned programs that were terminated, in order.
    pub fn terminated(&self) -> Vec<String> {
        self.with_log(|log| log.terminated.clone())
    }

    /// Whether any recorded command line starts with `prefix`.
    pub fn called(&self, prefix: &str) -> bool {
        self.with_log(|log| log.calls.iter().any(|c| c.starts_with(prefix)))
    }

    /// Index of the first command line starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.with_log(|log| log.calls.iter().position(|c| c.starts_with(prefix)))
    }

    fn record(&self, program: &str, args: &[&str]) -> (String, Option<MockReply>) {
        let line = if args.is_empty() {
            program.to_owned()
        } else {
            format!("{program} {}", args.join(" "))
        };
        self.with_log(|log| {
            log.calls.push(line.clone());
            let reply = log
                .rules
                .iter()
                .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                .map(|(_, reply)| reply.clone());
            (line, reply)
        })
    }
}

impl CommandRunner for MockRunner {
    fn run(
        &mut self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let (_, reply) = self.record(program, args);
        match reply {
            None => Ok(CommandOutput::ok("")),
            Some(MockReply::Output(out)) => Ok(out),
            Some(MockReply::SpawnError) => Err(CommandError::Spawn {
                program: program.to_owned(),
                source: io::Error::new(io::ErrorKind::NotFound, "mock spawn failure"),
            }),
            Some(MockReply::Timeout) => Err(CommandError::TimedOut {
                program: program.to_owned(),
                timeout,
            }),
        }
    }

    fn spawn(
        &mut self,
        program: &str,
        args: &[&str],
    ) -> Result<Box<dyn ChildProcess>, CommandError> {
        let (line, reply) = self.record(program, args);
        if matches!(reply, Some(MockReply::SpawnError)) {
            return Err(CommandError::Spawn {
                program: program.to_owned(),
                source: io::Error::new(io::ErrorKind::NotFound, "mock spawn failure"),
            });
        }
        Ok(Box::new(MockChild {
            program: program.to_owned(),
            line,
            running: true,
            log: Arc::clone(&self.log),
        }))
    }
}

/// Child handed out by [`MockRunner::spawn`].
#[derive(Debug)]
pub struct MockChild {
    program: String,
    line: String,
    running: bool,
    log: Arc<Mutex<RunnerLog>>,
}

impl ChildProcess for MockChild {
    fn program(&self) -> &str {
        &self.program
    }

    fn id(&self) -> u32 {
        4242
    }

    fn is_running(&mut self) -> Result<bool, CommandError> {
        Ok(self.running)
    }

    fn terminate(&mut self, _grace: Duration) -> Result<(), CommandError> {
        if self.running {
            self.running = false;
            self.log
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .terminated
                .push(self.line.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// Panel operation recorded by [`MockPanel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCall {
    /// `reset`
    Reset,
    /// `init_full`
    InitFull,
    /// `init_partial`
    InitPartial,
    /// `render_full`
    RenderFull,
    /// `render_partial` that ran a partial refresh
    RenderPartial,
    /// `render_partial` that turned into a full refresh
    RenderPartialAsFull,
    /// `sleep`
    Sleep,
}

/// State-checking panel that keeps the last frame instead of driving glass.
///
/// Follows the same state rules as a real driver. Failures can be injected
/// per operation.
#[derive(Debug)]
pub struct MockPanel {
    info: DisplayInfo,
    state: DisplayState,
    planes_synced: bool,
    partial_count: u32,
    full_due: bool,
    calls: Vec<PanelCall>,
    frame: Vec<u8>,
    fail_next: Option<(PanelCall, DisplayError)>,
}

impl MockPanel {
    /// 400x300 panel, uninitialised.
    pub fn new() -> Self {
        Self::with_info(DisplayInfo {
            width: 400,
            height: 300,
        })
    }

    /// Panel with custom geometry.
    pub fn with_info(info: DisplayInfo) -> Self {
        Self {
            info,
            state: DisplayState::Uninitialized,
            planes_synced: false,
            partial_count: 0,
            full_due: false,
            calls: Vec::new(),
            frame: vec![0xFF; info.buffer_len()],
            fail_next: None,
        }
    }

    /// Make the next `render_partial` report a forced full refresh.
    pub fn set_full_due(&mut self) {
        self.full_due = true;
    }

    /// Fail the next `call` with `error`. The panel drops to
    /// `Uninitialized` like a real driver would.
    pub fn fail_next(&mut self, call: PanelCall, error: DisplayError) {
        self.fail_next = Some((call, error));
    }

    /// Operations so far.
    pub fn calls(&self) -> &[PanelCall] {
        &self.calls
    }

    /// Forget recorded operations.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Last frame pushed to the panel.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Whether the last frame is entirely white.
    pub fn is_blank(&self) -> bool {
        self.frame.iter().all(|&b| b == 0xFF)
    }

    fn begin(&mut self, call: PanelCall) -> Result<(), DisplayError> {
        self.calls.push(call);
        if matches!(self.fail_next, Some((c, _)) if c == call) {
            if let Some((_, error)) = self.fail_next.take() {
                self.state = DisplayState::Uninitialized;
                self.planes_synced = false;
                return Err(error);
            }
        }
        Ok(())
    }

    fn check_buffer(&self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected = self.info.buffer_len();
        if buffer.len() == expected {
            Ok(())
        } else {
            Err(DisplayError::InvalidBuffer {
                expected,
                actual: buffer.len(),
            })
        }
    }
}

impl Default for MockPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl EpaperPanel for MockPanel {
    fn info(&self) -> DisplayInfo {
        self.info
    }

    fn state(&self) -> DisplayState {
        self.state
    }

    fn partial_count(&self) -> u32 {
        self.partial_count
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        self.begin(PanelCall::Reset)?;
        self.state = DisplayState::Uninitialized;
        self.planes_synced = false;
        Ok(())
    }

    fn init_full(&mut self) -> Result<(), DisplayError> {
        self.begin(PanelCall::InitFull)?;
        self.state = DisplayState::FullReady;
        self.planes_synced = false;
        Ok(())
    }

    fn init_partial(&mut self) -> Result<(), DisplayError> {
        if self.state != DisplayState::FullReady || !self.planes_synced {
            return Err(DisplayError::InvalidState {
                op: "init_partial",
                state: self.state,
            });
        }
        self.begin(PanelCall::InitPartial)?;
        self.state = DisplayState::PartialReady;
        self.partial_count = 0;
        Ok(())
    }

    fn render_full(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        if !self.state.is_ready() {
            return Err(DisplayError::InvalidState {
                op: "render_full",
                state: self.state,
            });
        }
        self.check_buffer(buffer)?;
        self.begin(PanelCall::RenderFull)?;
        self.frame.copy_from_slice(buffer);
        self.planes_synced = true;
        self.partial_count = 0;
        Ok(())
    }

    fn render_partial(&mut self, buffer: &[u8]) -> Result<RefreshKind, DisplayError> {
        if self.state != DisplayState::PartialReady {
            return Err(DisplayError::InvalidState {
                op: "render_partial",
                state: self.state,
            });
        }
        self.check_buffer(buffer)?;
        if self.full_due {
            self.full_due = false;
            self.begin(PanelCall::RenderPartialAsFull)?;
            self.frame.copy_from_slice(buffer);
            self.partial_count = 0;
            return Ok(RefreshKind::Full);
        }
        self.begin(PanelCall::RenderPartial)?;
        self.frame.copy_from_slice(buffer);
        self.partial_count = self.partial_count.saturating_add(1);
        Ok(RefreshKind::Partial)
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        self.begin(PanelCall::Sleep)?;
        self.state = DisplayState::Sleeping;
        self.planes_synced = false;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_clones_share_time() {
        let clock = MockClock::new();
        let other = clock.clone();
        let t0 = clock.now();
        other.advance(Duration::from_secs(5));
        assert_eq!(clock.now() - t0, Duration::from_secs(5));
    }

    #[test]
    fn mock_input_replays_script_then_idles() {
        let clock = MockClock::new();
        let stop = StopFlag::new();
        let mut input = MockInput::new()
            .with_clock(clock.clone())
            .stop_when_empty(stop.clone());
        input.tap(KeyCode::A).idle();

        let wait = Duration::from_millis(500);
        assert_eq!(input.poll_event(wait).unwrap(), Some(InputEvent::press(KeyCode::A)));
        assert_eq!(input.poll_event(wait).unwrap(), Some(InputEvent::release(KeyCode::A)));
        assert_eq!(input.poll_event(wait).unwrap(), None);
        assert!(!stop.is_set());
        assert_eq!(clock.elapsed(), wait);
        assert_eq!(input.poll_event(wait).unwrap(), None);
        assert!(stop.is_set());
    }

    #[test]
    fn mock_runner_matches_rules_by_prefix() {
        let mut runner = MockRunner::new();
        runner.fail("ip link del");
        let out = runner
            .run("ip", &["link", "del", "pan0"], Duration::from_secs(1))
            .unwrap();
        assert!(!out.success());
        let out = runner
            .run("ip", &["link", "add", "pan0"], Duration::from_secs(1))
            .unwrap();
        assert!(out.success());
        assert_eq!(runner.calls(), ["ip link del pan0", "ip link add pan0"]);
    }

    #[test]
    fn mock_child_records_termination_once() {
        let mut runner = MockRunner::new();
        let mut child = runner.spawn("dnsmasq", &["--no-daemon"]).unwrap();
        child.terminate(Duration::from_secs(3)).unwrap();
        child.terminate(Duration::from_secs(3)).unwrap();
        assert_eq!(runner.terminated(), ["dnsmasq --no-daemon"]);
    }

    #[test]
    fn mock_panel_enforces_state_rules() {
        let mut panel = MockPanel::new();
        let frame = vec![0xFF; 15_000];
        assert!(panel.render_partial(&frame).is_err());
        panel.init_full().unwrap();
        assert!(panel.init_partial().is_err());
        panel.render_full(&frame).unwrap();
        panel.init_partial().unwrap();
        assert_eq!(panel.render_partial(&frame).unwrap(), RefreshKind::Partial);
        assert_eq!(panel.partial_count(), 1);
    }
}
