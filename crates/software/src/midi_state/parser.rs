//! Reassembles MIDI messages from an unbuffered serial byte stream, one byte at a time.
//!
//! The parser never fails. Out-of-policy or malformed input is absorbed and the state machine resynchronizes on
//! the next status byte addressed to the configured channel, which is what a live MIDI cable with occasional noise
//! requires.

use crate::configuration::{CcMode, ChannelConfig};
use wmidi::{Channel, ControlFunction, ControlValue, MidiMessage, Note, U7};

/// System common messages (including System Exclusive framing). These cancel running status.
const SYSTEM_COMMON: core::ops::RangeInclusive<u8> = 0xF0..=0xF7;
/// System realtime messages (clock, active sensing, ...). These may arrive between the bytes of another message.
const SYSTEM_REALTIME: core::ops::RangeInclusive<u8> = 0xF8..=0xFF;

const STATUS_BIT: u8 = 0x80;
const CHANNEL_MASK: u8 = 0x0F;
const CATEGORY_MASK: u8 = 0xF0;

/// A decoded message the rest of the device acts on.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Event {
    /// A key was pressed. A velocity of zero means the key was released.
    NoteOn(Note, U7),
    /// A key was released.
    NoteOff(Note),
    /// A controller moved.
    ControlChange(ControlFunction, ControlValue),
    /// Aftertouch applied to the whole channel.
    ChannelPressure(ControlValue),
}

impl Event {
    /// Selects the messages the device acts upon, given the CC mode in effect. Anything else is `None`.
    pub fn from_message(msg: &MidiMessage, cc_mode: CcMode) -> Option<Self> {
        match *msg {
            MidiMessage::NoteOn(_, note, velocity) => Some(Self::NoteOn(note, velocity)),
            MidiMessage::NoteOff(_, note, _) => Some(Self::NoteOff(note)),
            MidiMessage::ControlChange(_, function, value) if cc_mode.accepts_control_change() => {
                Some(Self::ControlChange(function, value))
            }
            MidiMessage::ChannelPressure(_, value) if cc_mode.accepts_channel_pressure() => {
                Some(Self::ChannelPressure(value))
            }
            _ => None,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Event {
    fn format(&self, fmt: defmt::Formatter) {
        match *self {
            Self::NoteOn(note, velocity) => defmt::write!(
                fmt,
                "NoteOn {{ note: {} ({}), velocity: {} }}",
                note.to_str(),
                u8::from(note),
                u8::from(velocity)
            ),
            Self::NoteOff(note) => {
                defmt::write!(fmt, "NoteOff {{ note: {} ({}) }}", note.to_str(), u8::from(note))
            }
            Self::ControlChange(function, value) => defmt::write!(
                fmt,
                "ControlChange {{ controller: {}, value: {} }}",
                u8::from(function),
                u8::from(value)
            ),
            Self::ChannelPressure(value) => {
                defmt::write!(fmt, "ChannelPressure {{ value: {} }}", u8::from(value))
            }
        }
    }
}

/// Where the parser is within a message.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No running status; data bytes are dropped.
    AwaitingStatus,
    /// Running status is set; the next data byte starts a message.
    AwaitingFirstData,
    /// The first data byte of a three-byte message has been captured.
    AwaitingSecondData {
        /// The captured byte (a note or controller number).
        first: u8,
    },
}

/// Byte-at-a-time MIDI parser supporting running status.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ByteStreamParser {
    running_status: Option<u8>,
    phase: Phase,
}

impl Default for ByteStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStreamParser {
    /// Constructs an idle [`ByteStreamParser`].
    pub const fn new() -> Self {
        Self {
            running_status: None,
            phase: Phase::AwaitingStatus,
        }
    }

    /// The status byte in effect, if any.
    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// Getter.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Drops running status and any partially received message.
    pub fn reset(&mut self) {
        self.running_status = None;
        self.phase = Phase::AwaitingStatus;
    }

    /// Consumes one byte, returning an [`Event`] when it completes a message the device acts upon.
    ///
    /// `config.channel` is consulted only when a status byte arrives; `config.cc_mode` only when a message
    /// completes.
    pub fn feed(&mut self, byte: u8, config: &ChannelConfig) -> Option<Event> {
        if SYSTEM_REALTIME.contains(&byte) {
            // leave running status alone so the interrupted message resumes
            trace!("Ignoring realtime byte {=u8:#x}", byte);
            None
        } else if SYSTEM_COMMON.contains(&byte) {
            trace!("System common byte {=u8:#x} cancels running status", byte);
            self.reset();
            None
        } else if byte & STATUS_BIT != 0 {
            self.accept_status(byte, config.channel);
            None
        } else {
            self.accept_data(byte, config.cc_mode)
        }
    }

    fn accept_status(&mut self, status: u8, channel: Channel) {
        if status & CHANNEL_MASK == channel.index() {
            self.running_status = Some(status);
            self.phase = Phase::AwaitingFirstData;
        } else {
            trace!(
                "Ignoring status {=u8:#x}, listening on channel {}",
                status,
                channel.number()
            );
            self.reset();
        }
    }

    fn accept_data(&mut self, data: u8, cc_mode: CcMode) -> Option<Event> {
        // an orphan data byte is dropped; this is how the parser resynchronizes
        let status = self.running_status?;
        match self.phase {
            Phase::AwaitingStatus => None,
            Phase::AwaitingFirstData if is_two_byte(status) => complete(&[status, data], cc_mode),
            Phase::AwaitingFirstData => {
                self.phase = Phase::AwaitingSecondData { first: data };
                None
            }
            Phase::AwaitingSecondData { first } => {
                self.phase = Phase::AwaitingFirstData;
                complete(&[status, first, data], cc_mode)
            }
        }
    }
}

/// Program Change and Channel Pressure carry a single data byte.
fn is_two_byte(status: u8) -> bool {
    matches!(status & CATEGORY_MASK, 0xC0 | 0xD0)
}

fn complete(bytes: &[u8], cc_mode: CcMode) -> Option<Event> {
    let msg = MidiMessage::from_bytes(bytes).ok()?;
    let event = Event::from_message(&msg, cc_mode);
    if event.is_none() {
        trace!(
            "Decoded message with status {=u8:#x} is not used in CC mode {}",
            bytes[0],
            cc_mode
        );
    }
    event
}
