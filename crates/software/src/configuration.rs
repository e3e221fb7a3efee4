//! This module contains the performer's settings (which MIDI channel to listen to and what drives CV-A), the
//! front panel that produces them, and a trait to make enum-valued settings easier to work with in code.

mod attenuation;
pub use attenuation::*;

mod cc_mode;
pub use cc_mode::*;

pub mod panel;

use num_traits::{FromPrimitive, ToPrimitive};
use wmidi::Channel;

/// A trait which allows infinite cycling of an enum's variants.
///
/// Useful for round-robin scheduling, allowing each call to advance from the current to the next variant,
/// cycling back to the beginning when all variants have been exhausted.
pub trait CycleConfig {
    /// Return the next variant, cycling back to the beginning as needed.
    fn cycle(self) -> Self
    where
        Self: FromPrimitive + ToPrimitive + Sized,
    {
        let index = self
            .to_u8()
            .expect("enum variants should be castable to u8");
        match <Self as FromPrimitive>::from_u8(index + 1) {
            Some(new_selection) => new_selection,
            None => FromPrimitive::from_u8(0).expect("enum should not be empty"),
        }
    }
}

/// A snapshot of the settings which determine how incoming MIDI is interpreted.
///
/// The snapshot is produced outside the MIDI core (see [`panel::Panel`]) once per iteration of the control loop
/// and is only ever read by the core. The channel is consulted when a status byte arrives, so changing it does
/// not affect a message whose status byte has already been accepted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelConfig {
    /// The MIDI channel to listen to; channel messages addressed elsewhere are ignored.
    pub channel: Channel,
    /// Selects which MIDI input, if any, drives CV-A.
    pub cc_mode: CcMode,
    /// Scales CV-A before it reaches the DAC.
    pub attenuation: Attenuation,
}

impl ChannelConfig {
    /// Derives a configuration from the three front panel knobs, each given on a 16-bit scale.
    pub fn from_knobs(channel: u16, cc_mode: u16, attenuation: u16) -> Self {
        Self {
            // a 16-bit value shifted right by 12 always lands in 0..=15
            channel: Channel::from_index((channel >> 12) as u8).unwrap_or(Channel::Ch1),
            cc_mode: CcMode::from_u16(cc_mode >> 14).unwrap_or_default(),
            attenuation: Attenuation::from_percent((u32::from(attenuation) * 101 / 65536) as u8),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel: Channel::Ch1,
            cc_mode: CcMode::default(),
            attenuation: Attenuation::default(),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ChannelConfig {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "ChannelConfig {{ channel: {}, cc_mode: {}, attenuation: {} }}",
            self.channel.number(),
            self.cc_mode,
            self.attenuation
        );
    }
}
