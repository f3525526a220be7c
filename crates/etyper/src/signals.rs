//! SIGINT/SIGTERM handling: both set the process [`StopFlag`].

use core::ffi::c_int;
use std::sync::OnceLock;

use nix::errno::Errno;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use platform::StopFlag;

static STOP: OnceLock<StopFlag> = OnceLock::new();

extern "C" fn request_stop(_: c_int) {
    // Atomic loads and stores only.
    if let Some(stop) = STOP.get() {
        stop.set();
    }
}

/// Route SIGINT and SIGTERM to `stop`.
///
/// Only the first registered flag is used; later calls keep it and just
/// reinstall the handlers.
pub fn install(stop: &StopFlag) -> Result<(), Errno> {
    if STOP.set(stop.clone()).is_err() {
        tracing::debug!("signal handlers already bound to a stop flag");
    }
    let action = SigAction::new(SigHandler::Handler(request_stop), SaFlags::SA_RESTART, SigSet::empty());
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only touches atomics.
        unsafe { sigaction(signal, &action) }?;
    }
    tracing::debug!("SIGINT/SIGTERM handlers installed");
    Ok(())
}
