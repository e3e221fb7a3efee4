//! This crate contains architecture-agnostic logic for a MIDI to CV/gate converter, a device which lets a
//! monophonic analog synthesizer be played from any [MIDI](https://midi.org/midi-1-0) source by translating
//! the serial byte stream into two control voltages and a gate, a flavor of
//! [CV/gate](https://en.wikipedia.org/wiki/CV/gate).
//!
//! Data flows one way: raw byte → [`midi_state::ByteStreamParser`] → decoded event →
//! [`midi_state::NoteStack`] or [`midi_state::controller`] → [`cv`] → DAC code → [`io`].

#![deny(missing_docs)]
#![cfg_attr(not(test), no_std)]

// must come first so the logging macros are visible to the modules below
#[macro_use]
mod fmt;

pub mod configuration;

pub mod cv;

pub mod io;

/// Data structures for tracking the MIDI messages the device has received and turning them into voicing.
pub mod midi_state;
