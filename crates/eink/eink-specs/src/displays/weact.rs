//! WeAct Studio e-paper module specifications

use crate::{Controller, DisplaySpec};

/// WeAct Studio 4.2" (400×300, SSD1683, black/white)
///
/// - Full refresh: ~3s with visible flashing
/// - Partial refresh: ~0.4s, accumulates ghosting
/// - A full refresh at least every 5 minutes keeps ghosting in check
pub const WEACT_4_2: DisplaySpec = DisplaySpec {
    name: "WeAct 4.2\"",
    width: 400,
    height: 300,
    controller: Controller::SSD1683,
    max_partial_interval_s: 300,
    busy_timeout_ms: 30_000,
};
