//! Linux evdev keyboard input.
//!
//! Reads raw `struct input_event` records from `/dev/input/event*` and keeps
//! only `EV_KEY` events. Keyboards are recognised through the sysfs key
//! capability bitmap (`/sys/class/input/eventN/device/capabilities/key`):
//! anything that can produce both `KEY_A` and `KEY_ENTER` qualifies.

use core::time::Duration;
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::time::Instant;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::config::KEYBOARD_RETRY;
use crate::input::{InputDevice, InputError, InputEvent, KeyCode, KeyState};

/// `EV_KEY` event type.
const EV_KEY: u16 = 0x01;

/// Size of one kernel `struct input_event` on this target.
const EVENT_SIZE: usize = core::mem::size_of::<nix::libc::input_event>();

/// Events read per `read(2)`.
const READ_BATCH: usize = 64;

const DEV_INPUT: &str = "/dev/input";
const SYS_INPUT: &str = "/sys/class/input";

/// Decode one raw `input_event` record, keeping only key events.
///
/// The record ends with `u16 type, u16 code, i32 value` in native byte
/// order, preceded by a `timeval` whose size depends on the target.
pub fn decode_event(record: &[u8]) -> Option<InputEvent> {
    let tail_start = record.len().checked_sub(8)?;
    let tail = record.get(tail_start..)?;
    let kind = u16::from_ne_bytes([*tail.first()?, *tail.get(1)?]);
    if kind != EV_KEY {
        return None;
    }
    let code = u16::from_ne_bytes([*tail.get(2)?, *tail.get(3)?]);
    let value = i32::from_ne_bytes([*tail.get(4)?, *tail.get(5)?, *tail.get(6)?, *tail.get(7)?]);
    Some(InputEvent {
        code: KeyCode(code),
        state: KeyState::from_value(value)?,
    })
}

/// Test bit `code` in a sysfs capability bitmap.
///
/// The bitmap is a list of hex words, most significant first, each
/// `word_bits` wide (the kernel's `unsigned long`).
pub fn has_capability(bitmap: &str, code: u16, word_bits: u32) -> bool {
    let words: Vec<&str> = bitmap.split_whitespace().collect();
    let bits = word_bits as usize;
    let word_from_end = usize::from(code) / bits;
    let Some(index) = words.len().checked_sub(word_from_end + 1) else {
        return false;
    };
    let Some(word) = words.get(index) else {
        return false;
    };
    u64::from_str_radix(word, 16)
        .map(|w| w & (1u64 << (usize::from(code) % bits)) != 0)
        .unwrap_or(false)
}

/// One open evdev keyboard.
#[derive(Debug)]
pub struct EvdevKeyboard {
    file: File,
    path: PathBuf,
    pending: VecDeque<InputEvent>,
}

impl EvdevKeyboard {
    /// Open a specific event node.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        Ok(Self {
            file,
            path,
            pending: VecDeque::new(),
        })
    }

    /// First keyboard under the standard device directories.
    pub fn discover() -> Result<Self, InputError> {
        Self::discover_in(Path::new(DEV_INPUT), Path::new(SYS_INPUT))
    }

    /// First keyboard among `dev_dir/event*`, judged by `sys_dir`.
    pub fn discover_in(dev_dir: &Path, sys_dir: &Path) -> Result<Self, InputError> {
        let mut names: Vec<String> = fs::read_dir(dev_dir)
            .map_err(|_| InputError::NotFound)?
            .filter_map(Result::ok)
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| n.starts_with("event"))
            .collect();
        names.sort_by_key(|n| n.trim_start_matches("event").parse::<u32>().unwrap_or(u32::MAX));

        for name in names {
            let caps = sys_dir.join(&name).join("device/capabilities/key");
            let Ok(bitmap) = fs::read_to_string(&caps) else {
                continue;
            };
            if has_capability(&bitmap, KeyCode::A.0, usize::BITS)
                && has_capability(&bitmap, KeyCode::ENTER.0, usize::BITS)
            {
                let path = dev_dir.join(&name);
                match Self::open(&path) {
                    Ok(kb) => {
                        tracing::info!(path = %path.display(), "keyboard found");
                        return Ok(kb);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "keyboard not readable");
                    }
                }
            }
        }
        Err(InputError::NotFound)
    }

    /// Device node path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fill(&mut self) -> Result<(), InputError> {
        let mut buf = [0u8; EVENT_SIZE * READ_BATCH];
        let n = match self.file.read(&mut buf) {
            Ok(0) => {
                return Err(InputError::DeviceLost(io::Error::from(
                    io::ErrorKind::UnexpectedEof,
                )))
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(InputError::DeviceLost(e)),
        };
        let read = buf.get(..n).unwrap_or_default();
        self.pending
            .extend(read.chunks_exact(EVENT_SIZE).filter_map(decode_event));
        Ok(())
    }
}

impl InputDevice for EvdevKeyboard {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, InputError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        let ms = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(ms)) {
            Ok(0) | Err(Errno::EINTR) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(InputError::DeviceLost(io::Error::from(e))),
        }
        let revents = fds
            .first()
            .and_then(PollFd::revents)
            .unwrap_or(PollFlags::empty());
        if revents.intersects(PollFlags::POLLERR | PollFlags::POLLHUP | PollFlags::POLLNVAL) {
            return Err(InputError::DeviceLost(io::Error::from(
                io::ErrorKind::BrokenPipe,
            )));
        }

        self.fill()?;
        Ok(self.pending.pop_front())
    }
}

/// Keyboard that survives unplugging.
///
/// A lost device is reported once as [`InputError::DeviceLost`] so the
/// caller can drop held modifiers. While no keyboard is attached each poll
/// idles for its timeout and discovery is retried every retry interval.
#[derive(Debug)]
pub struct ReconnectingKeyboard {
    device: Option<EvdevKeyboard>,
    retry: Duration,
    last_attempt: Instant,
    dev_dir: PathBuf,
    sys_dir: PathBuf,
}

impl ReconnectingKeyboard {
    /// Start with whatever keyboard is attached now, if any.
    pub fn new() -> Self {
        Self::with_dirs(DEV_INPUT, SYS_INPUT, KEYBOARD_RETRY)
    }

    /// Custom device directories and retry interval.
    pub fn with_dirs(dev_dir: impl Into<PathBuf>, sys_dir: impl Into<PathBuf>, retry: Duration) -> Self {
        let dev_dir = dev_dir.into();
        let sys_dir = sys_dir.into();
        let device = EvdevKeyboard::discover_in(&dev_dir, &sys_dir).ok();
        if device.is_none() {
            tracing::warn!("no keyboard found, waiting for connection");
        }
        Self {
            device,
            retry,
            last_attempt: Instant::now(),
            dev_dir,
            sys_dir,
        }
    }

    /// Whether a keyboard is currently open.
    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }
}

impl Default for ReconnectingKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl InputDevice for ReconnectingKeyboard {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, InputError> {
        let Some(device) = self.device.as_mut() else {
            std::thread::sleep(timeout.min(self.retry));
            if self.last_attempt.elapsed() >= self.retry {
                self.last_attempt = Instant::now();
                self.device = EvdevKeyboard::discover_in(&self.dev_dir, &self.sys_dir).ok();
            }
            return Ok(None);
        };
        match device.poll_event(timeout) {
            Err(InputError::DeviceLost(e)) => {
                tracing::warn!(path = %device.path().display(), error = %e, "keyboard disconnected, waiting");
                self.device = None;
                self.last_attempt = Instant::now();
                Err(InputError::DeviceLost(e))
            }
            other => other,
        }
    }
}
