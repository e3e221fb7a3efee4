use num_derive::{FromPrimitive, ToPrimitive};

/// Determines which MIDI input drives CV-A, the modulation output.
///
/// Exactly one source is recognized at a time; CV-A is a single-purpose output rather than a general controller
/// router.
#[derive(Debug, Default, Copy, Clone, PartialEq, ToPrimitive, FromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcMode {
    /// CV-A follows Control Change 1.
    #[default]
    ModWheel,
    /// CV-A follows Control Change 2.
    BreathController,
    /// CV-A follows Channel Pressure.
    Aftertouch,
    /// CV-A follows the velocity of each Note On.
    Velocity,
}

impl CcMode {
    /// Returns the controller number recognized in this mode: one more than the mode's position.
    ///
    /// Channel Pressure is dispatched as a synthetic controller numbered 3, which is why [`CcMode::Aftertouch`]
    /// yields 3 here.
    pub fn controller_number(self) -> u8 {
        self as u8 + 1
    }

    /// Control Change messages are only decoded for CV-A when a controller-based mode is selected.
    pub fn accepts_control_change(self) -> bool {
        matches!(self, Self::ModWheel | Self::BreathController)
    }

    /// Channel Pressure messages are only decoded when [`CcMode::Aftertouch`] is selected.
    pub fn accepts_channel_pressure(self) -> bool {
        self == Self::Aftertouch
    }

    /// A short human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::ModWheel => "Modwheel",
            Self::BreathController => "Breathctrl",
            Self::Aftertouch => "Aftertouch",
            Self::Velocity => "Velocity",
        }
    }
}
