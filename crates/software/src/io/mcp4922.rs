//! Driver for the Microchip MCP4922, a dual 12-bit DAC with an SPI interface.
//!
//! Each write is one 16-bit frame, most significant byte first:
//!
//! | bit | 15      | 14  | 13 | 12   | 11..0 |
//! |-----|---------|-----|----|------|-------|
//! |     | channel | BUF | GA | SHDN | code  |
//!
//! This driver always selects an unbuffered reference (BUF = 0), 1x gain (GA = 1) and an active output
//! (SHDN = 1), so the frames start with `0x3` for channel A and `0xB` for channel B.

use super::ControlVoltage;
use crate::cv::DAC_MAX;
use embedded_hal::{digital::OutputPin, spi::SpiBus};
use measurements::Voltage;

const CHANNEL_B: u16 = 1 << 15;
const GAIN_1X: u16 = 1 << 13;
const OUTPUT_ACTIVE: u16 = 1 << 12;

/// One of the two DAC outputs.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Wired to CV-A, the modulation output.
    A,
    /// Wired to CV-B, the pitch output.
    B,
}

/// Builds the two bytes which set `channel` to `code`. Codes above 12 bits are truncated.
pub fn frame(channel: Channel, code: u16) -> [u8; 2] {
    let select = match channel {
        Channel::A => 0,
        Channel::B => CHANNEL_B,
    };
    (select | GAIN_1X | OUTPUT_ACTIVE | (code & DAC_MAX)).to_be_bytes()
}

/// The voltage expected on an output set to `code`, given the DAC's reference voltage.
pub fn voltage(code: u16, reference: Voltage) -> Voltage {
    reference * (f64::from(code & DAC_MAX) / f64::from(DAC_MAX + 1))
}

/// Failure to talk to the DAC.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<S, P> {
    /// The SPI transfer failed.
    Spi(S),
    /// The chip select pin could not be driven.
    ChipSelect(P),
}

/// An MCP4922 on an exclusive SPI bus with its own chip select pin.
pub struct Mcp4922<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> Mcp4922<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    /// Constructs a [`Mcp4922`]. The chip select pin is expected to idle high.
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    /// Sets `channel` to `code`.
    pub fn write(
        &mut self,
        channel: Channel,
        code: u16,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.cs.set_low().map_err(Error::ChipSelect)?;
        let transfer = self
            .spi
            .write(&frame(channel, code))
            .and_then(|_| self.spi.flush());
        // release the chip even when the transfer failed, so the next frame starts clean
        self.cs.set_high().map_err(Error::ChipSelect)?;
        transfer.map_err(Error::Spi)
    }
}

impl<SPI, CS> ControlVoltage for Mcp4922<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    type Error = Error<SPI::Error, CS::Error>;

    fn set_pitch(&mut self, code: u16) -> Result<(), Self::Error> {
        self.write(Channel::B, code)
    }

    fn set_modulation(&mut self, code: u16) -> Result<(), Self::Error> {
        self.write(Channel::A, code)
    }
}
