//! This module provides traits for driving the device's outputs (two control voltages and a gate), along with
//! drivers for the hardware behind them.
//!
//! The MIDI core only ever produces 12-bit codes and gate states; how those reach the synthesizer (channel select
//! bits, byte order, pin polarity) is the business of the implementations found here.

pub mod button;
pub mod gate;
pub mod mcp4922;

/// A trait for sending 12-bit codes to the two control voltage outputs.
pub trait ControlVoltage {
    /// Error type of the underlying hardware.
    type Error;

    /// Sets the pitch output (CV-B).
    fn set_pitch(&mut self, code: u16) -> Result<(), Self::Error>;

    /// Sets the modulation output (CV-A).
    fn set_modulation(&mut self, code: u16) -> Result<(), Self::Error>;
}

/// The two states of a gate signal.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GateState {
    /// When the gate is high, the instrument will sound.
    High,
    /// When the gate is low, the instrument will rest.
    Low,
}

/// A trait for using a gate signal to indicate whether or not an instrument should be in an active state.
pub trait Gate {
    /// Error type of the underlying hardware.
    type Error;

    /// Drives the gate to `state`.
    fn set_gate(&mut self, state: GateState) -> Result<(), Self::Error>;
}

/// Failure to drive one of the outputs.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<C, G> {
    /// A control voltage could not be set.
    ControlVoltage(C),
    /// The gate could not be set.
    Gate(G),
}

/// Everything the MIDI core writes to, bundled so errors from either side surface as one [`Error`].
pub struct Outputs<C, G> {
    /// Pitch and modulation.
    pub control_voltage: C,
    /// Gate and its indicator.
    pub gate: G,
}

impl<C: ControlVoltage, G: Gate> Outputs<C, G> {
    /// Constructs an [`Outputs`].
    pub fn new(control_voltage: C, gate: G) -> Self {
        Self {
            control_voltage,
            gate,
        }
    }

    pub(crate) fn pitch(&mut self, code: u16) -> Result<(), Error<C::Error, G::Error>> {
        self.control_voltage
            .set_pitch(code)
            .map_err(Error::ControlVoltage)
    }

    pub(crate) fn modulation(&mut self, code: u16) -> Result<(), Error<C::Error, G::Error>> {
        self.control_voltage
            .set_modulation(code)
            .map_err(Error::ControlVoltage)
    }

    pub(crate) fn gate(&mut self, state: GateState) -> Result<(), Error<C::Error, G::Error>> {
        self.gate.set_gate(state).map_err(Error::Gate)
    }
}
