//! Routes controller traffic to CV-A. A single controller number is recognized at a time, chosen by the
//! configured [`CcMode`](crate::configuration::CcMode); Channel Pressure is treated as if it were that controller.

use crate::configuration::ChannelConfig;
use crate::cv;
use wmidi::{ControlFunction, ControlValue};

/// The controller number Channel Pressure is dispatched under.
pub const AFTERTOUCH_CONTROLLER: u8 = 3;

/// The outcome of a controller message.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// Every held note must be forgotten and the gate closed.
    AllNotesOff,
    /// CV-A should be set to this 12-bit code.
    Modulation(u16),
    /// The message has no effect in the current configuration.
    Ignored,
}

/// Handles a Control Change.
pub fn control_change(function: ControlFunction, value: ControlValue, config: &ChannelConfig) -> Dispatch {
    if function == ControlFunction::ALL_NOTES_OFF {
        return if u8::from(value) == 0 {
            Dispatch::AllNotesOff
        } else {
            Dispatch::Ignored
        };
    }

    forward(u8::from(function), value, config)
}

/// Handles Channel Pressure as synthetic controller [`AFTERTOUCH_CONTROLLER`].
pub fn channel_pressure(value: ControlValue, config: &ChannelConfig) -> Dispatch {
    forward(AFTERTOUCH_CONTROLLER, value, config)
}

fn forward(controller: u8, value: ControlValue, config: &ChannelConfig) -> Dispatch {
    if controller == config.cc_mode.controller_number() {
        Dispatch::Modulation(cv::control_to_code(value, config.attenuation))
    } else {
        Dispatch::Ignored
    }
}
