//! Runtime configuration from the command line.
//!
//! Defaults match the reference wiring: WeAct 4.2" panel on SPI1 CS1 of an
//! Orange Pi Zero 2W, control lines on `gpiochip1`.

use std::path::PathBuf;

use clap::Parser;

use platform::config::{APP_VERSION, DOCS_DIR_NAME, HTTPS_PORT, HTTP_PORT};

/// etyper - e-paper typewriter
#[derive(Debug, Clone, Parser)]
#[command(name = "etyper")]
#[command(version = APP_VERSION)]
#[command(about = "Minimal e-paper typewriter", long_about = None)]
pub struct DeviceConfig {
    /// Documents directory [default: ~/etyper_docs]
    #[arg(long, value_name = "DIR")]
    pub docs_dir: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (e.g. "info", "etyper=debug")
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(flatten)]
    pub panel: PanelConfig,

    /// HTTPS port of the file server
    #[arg(long, default_value_t = HTTPS_PORT)]
    pub https_port: u16,

    /// Plain HTTP fallback port of the file server
    #[arg(long, default_value_t = HTTP_PORT)]
    pub http_port: u16,
}

/// SPI and GPIO wiring of the panel.
#[derive(Debug, Clone, clap::Args)]
pub struct PanelConfig {
    /// spidev node
    #[arg(long, default_value = "/dev/spidev1.1")]
    pub spi_device: PathBuf,

    /// SPI clock in Hz
    #[arg(long, default_value_t = 4_000_000)]
    pub spi_hz: u32,

    /// GPIO character device holding the control lines
    #[arg(long, default_value = "/dev/gpiochip1")]
    pub gpio_chip: PathBuf,

    /// Data/command line offset
    #[arg(long, default_value_t = 25)]
    pub dc_line: u32,

    /// Chip-select line offset
    #[arg(long, default_value_t = 27)]
    pub cs_line: u32,

    /// Reset line offset
    #[arg(long, default_value_t = 23)]
    pub rst_line: u32,

    /// Busy line offset
    #[arg(long, default_value_t = 24)]
    pub busy_line: u32,
}

impl DeviceConfig {
    /// Documents directory, falling back to `~/etyper_docs` (or
    /// `./etyper_docs` without a home directory).
    pub fn docs_dir(&self) -> PathBuf {
        match &self.docs_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DOCS_DIR_NAME),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_wiring() {
        let cfg = DeviceConfig::try_parse_from(["etyper"]).unwrap();
        assert_eq!(cfg.panel.spi_device, PathBuf::from("/dev/spidev1.1"));
        assert_eq!(cfg.panel.spi_hz, 4_000_000);
        assert_eq!(
            (cfg.panel.dc_line, cfg.panel.cs_line, cfg.panel.rst_line, cfg.panel.busy_line),
            (25, 27, 23, 24)
        );
        assert_eq!((cfg.https_port, cfg.http_port), (443, 8080));
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn version_flag_reports_app_version() {
        use clap::CommandFactory;
        assert_eq!(DeviceConfig::command().get_version(), Some(APP_VERSION));
        let err = DeviceConfig::try_parse_from(["etyper", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn docs_dir_override() {
        let cfg = DeviceConfig::try_parse_from(["etyper", "--docs-dir", "/tmp/docs"]).unwrap();
        assert_eq!(cfg.docs_dir(), PathBuf::from("/tmp/docs"));
    }

    #[test]
    fn default_docs_dir_is_named_etyper_docs() {
        let cfg = DeviceConfig::try_parse_from(["etyper"]).unwrap();
        assert!(cfg.docs_dir().ends_with("etyper_docs"));
    }

    #[test]
    fn pins_can_be_rewired() {
        let cfg = DeviceConfig::try_parse_from(["etyper", "--busy-line", "7", "--spi-hz", "2000000"]).unwrap();
        assert_eq!(cfg.panel.busy_line, 7);
        assert_eq!(cfg.panel.spi_hz, 2_000_000);
    }
}
