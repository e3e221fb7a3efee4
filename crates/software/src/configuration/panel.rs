//! The front panel: three knobs which produce a [`ChannelConfig`], and a toggle switch selecting whether the
//! device is being set up or is playing.
//!
//! Knobs are read one at a time, round robin, so a single iteration of the control loop costs at most one
//! analog conversion.

use super::{ChannelConfig, CycleConfig};
use num_derive::{FromPrimitive, ToPrimitive};

/// Determines whether the panel or the MIDI input has the device's attention.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelMode {
    /// The configuration follows the knobs and the panic button is live. MIDI input is not read.
    Set,
    /// The configuration is frozen and MIDI input is processed.
    Run,
}

impl PanelMode {
    /// The switch is wired with a pull-up, so an open (high) switch selects [`PanelMode::Set`].
    pub fn from_switch(is_high: bool) -> Self {
        if is_high { Self::Set } else { Self::Run }
    }

    /// A short human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::Run => "RUN",
        }
    }
}

/// Identifies one of the panel's knobs.
#[derive(Debug, Copy, Clone, PartialEq, ToPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KnobId {
    /// Selects the MIDI channel.
    Channel,
    /// Selects the [`CcMode`][super::CcMode].
    CcMode,
    /// Sets the CV-A [`Attenuation`][super::Attenuation].
    Attenuation,
}
impl CycleConfig for KnobId {}

/// A potentiometer reading smoothed with an exponentially weighted average.
///
/// Readings are on a 16-bit scale. Each new reading moves the average a quarter of the way toward it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Knob {
    value: u16,
}

impl Knob {
    /// Seeds the average with a first reading.
    pub fn new(initial: u16) -> Self {
        Self { value: initial }
    }

    /// Folds a new reading into the average.
    pub fn update(&mut self, raw: u16) {
        // arithmetic shift, so a falling reading pulls the average down just as a rising one pulls it up
        let delta = (i32::from(raw) - i32::from(self.value)) >> 2;
        self.value = (i32::from(self.value) + delta) as u16;
    }

    /// Getter.
    pub fn value(&self) -> u16 {
        self.value
    }
}

/// The three knobs, plus the bookkeeping for reading them round robin.
#[derive(Debug, Clone)]
pub struct Panel {
    channel: Knob,
    cc_mode: Knob,
    attenuation: Knob,
    next: KnobId,
}

impl Panel {
    /// Constructs a [`Panel`] from an initial reading of every knob.
    pub fn new(channel: u16, cc_mode: u16, attenuation: u16) -> Self {
        Self {
            channel: Knob::new(channel),
            cc_mode: Knob::new(cc_mode),
            attenuation: Knob::new(attenuation),
            next: KnobId::Channel,
        }
    }

    /// Samples the next knob in turn using `read`, returning which knob was sampled.
    pub fn poll(&mut self, read: impl FnOnce(KnobId) -> u16) -> KnobId {
        let id = self.next;
        let raw = read(id);
        self.knob_mut(id).update(raw);
        self.next = id.cycle();
        id
    }

    /// The configuration currently dialed in.
    pub fn config(&self) -> ChannelConfig {
        ChannelConfig::from_knobs(
            self.channel.value(),
            self.cc_mode.value(),
            self.attenuation.value(),
        )
    }

    fn knob_mut(&mut self, id: KnobId) -> &mut Knob {
        match id {
            KnobId::Channel => &mut self.channel,
            KnobId::CcMode => &mut self.cc_mode,
            KnobId::Attenuation => &mut self.attenuation,
        }
    }
}
