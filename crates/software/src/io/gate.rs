//! Gate output paired with a front panel indicator.

use super::{Gate, GateState};
use embedded_hal::digital::OutputPin;

/// Drives the gate jack and its indicator LED from a single call, so the two are always equal.
///
/// Both pins must share an error type; on microcontroller GPIO this is usually [`core::convert::Infallible`].
pub struct CoupledGate<G, L> {
    gate: G,
    indicator: L,
}

impl<G, L> CoupledGate<G, L>
where
    G: OutputPin,
    L: OutputPin<Error = G::Error>,
{
    /// Constructs a [`CoupledGate`]. Both pins are expected to start low.
    pub fn new(gate: G, indicator: L) -> Self {
        Self { gate, indicator }
    }
}

impl<G, L> Gate for CoupledGate<G, L>
where
    G: OutputPin,
    L: OutputPin<Error = G::Error>,
{
    type Error = G::Error;

    fn set_gate(&mut self, state: GateState) -> Result<(), Self::Error> {
        match state {
            GateState::High => {
                self.gate.set_high()?;
                self.indicator.set_high()
            }
            GateState::Low => {
                self.gate.set_low()?;
                self.indicator.set_low()
            }
        }
    }
}
