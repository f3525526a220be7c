//! Mode controller driving the real SSD1683 driver over the simulated
//! controller: what ends up on the glass.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use eink_specs::displays::WEACT_4_2;
use eink_testing::{SimBusy, SimDc, SimDelay, SimRst, SimSpi, Ssd1683Sim};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use etyper::display::Ssd1683;
use etyper::session::ServerConfig;
use etyper::{DeviceContext, DocumentStore, ModeController, ModeKind, SystemBackend};
use platform::config::{CERT_DIR_NAME, FILE_SERVER_TIMEOUT};
use platform::mocks::{MockClock, MockInput, MockRunner};
use platform::{Clock, DisplayState, EpaperPanel, KeyCode, StopFlag};
use tempfile::TempDir;

type SimPanel = Ssd1683<SimSpi, SimDc, SimRst, SimBusy, SimDelay>;
type Controller = ModeController<SimPanel, MockInput, MockClock, SystemBackend<MockRunner>>;

const FIRST_LINE: Rectangle = Rectangle::new(Point::new(8, 10), Size::new(384, 20));
const STATUS_BAR: Rectangle = Rectangle::new(Point::new(8, 270), Size::new(384, 20));
const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn controller(tmp: &TempDir, sim: &Ssd1683Sim) -> Controller {
    controller_at(tmp, sim, MockClock::new(), StopFlag::new())
}

fn controller_at(tmp: &TempDir, sim: &Ssd1683Sim, clock: MockClock, stop: StopFlag) -> Controller {
    let (spi, dc, rst, busy, delay) = sim.parts();
    let panel = Ssd1683::new(spi, dc, rst, busy, delay, &WEACT_4_2).with_stop(stop.clone());
    let store = DocumentStore::new(tmp.path());
    let servers = ServerConfig {
        bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
        https_port: 0,
        http_port: 0,
    };
    let backend = SystemBackend::new(MockRunner::new(), store.clone(), servers);
    let ctx = DeviceContext::new(panel, backend, store, clock.now()).unwrap();
    let input = MockInput::new().with_clock(clock.clone());
    ModeController::new(ctx, input, clock, stop)
}

fn install_cert(tmp: &TempDir) {
    let ssl = tmp.path().join(CERT_DIR_NAME);
    std::fs::create_dir_all(&ssl).unwrap();
    for file in ["cert.pem", "key.pem"] {
        std::fs::copy(Path::new(FIXTURES).join(file), ssl.join(file)).unwrap();
    }
}

/// Type a line, then open file sharing.
fn enter_file_server(c: &mut Controller) {
    c.start();
    c.input_mut()
        .tap(KeyCode::H)
        .tap(KeyCode::I)
        .chord(KeyCode::LEFTCTRL, KeyCode::F);
    steps(c, 8);
    assert_eq!(c.mode().kind(), ModeKind::FileServer);
}

fn assert_back_to_typing(c: &Controller, sim: &Ssd1683Sim) {
    assert_eq!(c.mode().kind(), ModeKind::Typing);
    assert_eq!(c.context().panel.state(), DisplayState::PartialReady);
    assert_eq!(sim.screen(), c.context().frame().as_bytes());
    sim.assert_region_has_ink(FIRST_LINE).unwrap();
    assert!(sim.protocol_errors().is_empty());
}

fn steps(c: &mut Controller, n: usize) {
    for _ in 0..n {
        c.step();
    }
}

#[test]
fn test_startup_shows_status_bar_with_partial_baseline() {
    let tmp = TempDir::new().unwrap();
    let sim = Ssd1683Sim::new(&WEACT_4_2);
    let mut c = controller(&tmp, &sim);
    c.start();

    assert_eq!(sim.full_refreshes(), 1);
    assert_eq!(c.context().panel.state(), DisplayState::PartialReady);
    sim.assert_region_has_ink(STATUS_BAR).unwrap();
    assert!(sim.protocol_errors().is_empty());
}

#[test]
fn test_typed_text_reaches_the_glass_with_partial_refreshes() {
    let tmp = TempDir::new().unwrap();
    let sim = Ssd1683Sim::new(&WEACT_4_2);
    let mut c = controller(&tmp, &sim);
    c.start();
    let before = sim.ink_in(FIRST_LINE);

    // Cursor block only.
    assert!(before > 0);
    c.input_mut().tap(KeyCode::H).tap(KeyCode::E).tap(KeyCode::Y);
    steps(&mut c, 6);

    assert_eq!(sim.full_refreshes(), 1);
    assert_eq!(sim.partial_refreshes(), 3);
    assert!(sim.ink_in(FIRST_LINE) > before);
    assert_eq!(sim.screen(), c.context().frame().as_bytes());
    assert!(sim.protocol_errors().is_empty());
}

#[test]
fn test_sleep_blanks_and_wake_redraws() {
    let tmp = TempDir::new().unwrap();
    let sim = Ssd1683Sim::new(&WEACT_4_2);
    let mut c = controller(&tmp, &sim);
    c.start();
    c.input_mut().tap(KeyCode::A).chord(KeyCode::LEFTCTRL, KeyCode::Q);
    steps(&mut c, 6);

    assert_eq!(c.mode().kind(), ModeKind::Sleeping);
    assert!(sim.is_asleep());
    assert!(sim.is_white());

    let resets = sim.resets();
    c.input_mut().chord(KeyCode::LEFTCTRL, KeyCode::Q);
    steps(&mut c, 4);

    assert_eq!(c.mode().kind(), ModeKind::Typing);
    assert!(!sim.is_asleep());
    assert!(sim.resets() > resets);
    sim.assert_region_has_ink(FIRST_LINE).unwrap();
    assert_eq!(sim.writes_while_asleep(), 0);
}

#[test]
fn test_busy_timeout_is_recovered_with_full_refresh() {
    let tmp = TempDir::new().unwrap();
    let sim = Ssd1683Sim::new(&WEACT_4_2);
    let mut c = controller(&tmp, &sim);
    c.start();

    sim.set_busy_stuck(true);
    c.input_mut().tap(KeyCode::A);
    c.step();
    assert!(c.context().render_pending());
    assert!(c.context().needs_resync());

    sim.set_busy_stuck(false);
    let fulls = sim.full_refreshes();
    c.step();
    assert!(!c.context().render_pending());
    assert_eq!(sim.full_refreshes(), fulls + 1);
    assert_eq!(c.context().panel.state(), DisplayState::PartialReady);
    assert_eq!(sim.screen(), c.context().frame().as_bytes());
}

#[test]
fn test_shutdown_leaves_glass_white_and_asleep() {
    let tmp = TempDir::new().unwrap();
    let sim = Ssd1683Sim::new(&WEACT_4_2);
    let mut c = controller(&tmp, &sim);
    c.start();
    c.input_mut().tap(KeyCode::Q);
    steps(&mut c, 2);
    c.shutdown().unwrap();

    assert!(sim.is_white());
    assert!(sim.is_asleep());
    let path = &c.context().editor.document().path;
    assert_eq!(std::fs::read_to_string(path).unwrap(), "q");
}

#[test]
fn test_cancelled_file_server_restores_typing_screen() {
    let tmp = TempDir::new().unwrap();
    install_cert(&tmp);
    let sim = Ssd1683Sim::new(&WEACT_4_2);
    let mut c = controller(&tmp, &sim);
    enter_file_server(&mut c);

    c.input_mut().chord(KeyCode::LEFTCTRL, KeyCode::F);
    steps(&mut c, 4);
    assert_back_to_typing(&c, &sim);
}

#[test]
fn test_timed_out_file_server_restores_typing_screen() {
    let tmp = TempDir::new().unwrap();
    install_cert(&tmp);
    let sim = Ssd1683Sim::new(&WEACT_4_2);
    let clock = MockClock::new();
    let mut c = controller_at(&tmp, &sim, clock.clone(), StopFlag::new());
    enter_file_server(&mut c);

    clock.advance(FILE_SERVER_TIMEOUT);
    c.step();
    assert_back_to_typing(&c, &sim);
}

#[test]
fn test_stop_request_still_blanks_the_glass() {
    let tmp = TempDir::new().unwrap();
    let sim = Ssd1683Sim::new(&WEACT_4_2);
    let clock = MockClock::new();
    let stop = StopFlag::new();
    let mut c = controller_at(&tmp, &sim, clock.clone(), stop.clone());
    *c.input_mut() = MockInput::new().with_clock(clock).stop_when_empty(stop.clone());
    c.input_mut().tap(KeyCode::W);

    c.run().unwrap();
    assert!(stop.is_set());
    assert!(sim.is_white());
    assert!(sim.is_asleep());
    assert!(sim.protocol_errors().is_empty());
}
