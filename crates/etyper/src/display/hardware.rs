//! Panel wiring on the device: spidev + GPIO character device.
//!
//! Chip select is an ordinary GPIO line driven by
//! [`embedded_hal_bus::spi::ExclusiveDevice`], so D/C can be switched
//! between the command byte and its data with CS released in between.

use anyhow::{Context, Result};
use embedded_hal_bus::spi::ExclusiveDevice;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevBus};

use eink_specs::displays::WEACT_4_2;

use super::Ssd1683;
use crate::config::PanelConfig;

const CONSUMER: &str = "etyper";

/// SPI device with the GPIO chip select.
pub type PanelSpi = ExclusiveDevice<SpidevBus, CdevPin, Delay>;

/// The panel driver as wired on the device.
pub type DevicePanel = Ssd1683<PanelSpi, CdevPin, CdevPin, CdevPin, Delay>;

fn output(chip: &mut Chip, line: u32, initial: u8, name: &str) -> Result<CdevPin> {
    let handle = chip
        .get_line(line)
        .and_then(|l| l.request(LineRequestFlags::OUTPUT, initial, CONSUMER))
        .with_context(|| format!("requesting {name} line {line}"))?;
    CdevPin::new(handle).with_context(|| format!("configuring {name} line {line}"))
}

/// Open the SPI bus and control lines and build the driver.
pub fn open_panel(config: &PanelConfig) -> Result<DevicePanel> {
    let mut bus = SpidevBus::open(&config.spi_device)
        .with_context(|| format!("opening {}", config.spi_device.display()))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(config.spi_hz)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    bus.configure(&options)
        .with_context(|| format!("configuring {}", config.spi_device.display()))?;

    let mut chip = Chip::new(&config.gpio_chip)
        .with_context(|| format!("opening {}", config.gpio_chip.display()))?;
    let dc = output(&mut chip, config.dc_line, 1, "dc")?;
    let cs = output(&mut chip, config.cs_line, 1, "cs")?;
    let rst = output(&mut chip, config.rst_line, 1, "rst")?;
    let busy_handle = chip
        .get_line(config.busy_line)
        .and_then(|l| l.request(LineRequestFlags::INPUT, 0, CONSUMER))
        .with_context(|| format!("requesting busy line {}", config.busy_line))?;
    let busy = CdevPin::new(busy_handle).context("configuring busy line")?;

    let spi = ExclusiveDevice::new(bus, cs, Delay).context("claiming chip select")?;

    tracing::info!(
        spi = %config.spi_device.display(),
        hz = config.spi_hz,
        gpio = %config.gpio_chip.display(),
        panel = WEACT_4_2.name,
        controller = ?WEACT_4_2.controller,
        "panel transport ready"
    );
    Ok(Ssd1683::new(spi, dc, rst, busy, Delay, &WEACT_4_2))
}
