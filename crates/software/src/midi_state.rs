use crate::configuration::{CcMode, ChannelConfig};
use crate::cv;
use crate::io::{self, ControlVoltage, Gate, GateState, Outputs};
use bitmask_enum::bitmask;

mod parser;
pub use parser::*;

mod note_stack;
pub use note_stack::*;

pub mod controller;
use controller::Dispatch;

/// Operations that may be performed during a state update.
#[bitmask(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    /// Indicates the pitch output was written during the last state update.
    NoteChange,
    /// Indicates the gate was written during the last state update.
    GateChange,
    /// Indicates CV-A was written during the last state update.
    ModulationChange,
    /// Indicates every held note was forgotten during the last state update.
    AllNotesOff,
}

/// The device's view of the MIDI stream: the parser's position within the current message and the notes being
/// held.
///
/// Each decoded message is fully applied to the outputs, DAC writes included, before the next byte is accepted.
/// Legato depends on this, since a release must see the true previous note.
#[derive(Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MidiState {
    parser: ByteStreamParser,
    notes: NoteStack,
}

impl MidiState {
    /// Constructs an idle `MidiState`.
    pub const fn new() -> Self {
        Self {
            parser: ByteStreamParser::new(),
            notes: NoteStack::new(),
        }
    }

    /// Feeds one byte off the wire, applying the resulting event (if any) to `outputs`. Returns the
    /// [`Operation`]s performed.
    ///
    /// The parser absorbs any malformed input, so the only failures are those of the output hardware.
    pub fn update<C, G>(
        &mut self,
        byte: u8,
        config: &ChannelConfig,
        outputs: &mut Outputs<C, G>,
    ) -> Result<Operation, io::Error<C::Error, G::Error>>
    where
        C: ControlVoltage,
        G: Gate,
    {
        match self.parser.feed(byte, config) {
            Some(event) => self.handle(event, config, outputs),
            None => Ok(Operation::none()),
        }
    }

    /// Applies a decoded event.
    pub fn handle<C, G>(
        &mut self,
        event: Event,
        config: &ChannelConfig,
        outputs: &mut Outputs<C, G>,
    ) -> Result<Operation, io::Error<C::Error, G::Error>>
    where
        C: ControlVoltage,
        G: Gate,
    {
        debug!("Received {}", event);

        match event {
            Event::NoteOn(note, velocity) => {
                let transition = self.notes.on_note_on(note, velocity);
                self.voice(transition, config, outputs)
            }
            Event::NoteOff(note) => {
                let transition = self.notes.on_note_off(note);
                self.voice(transition, config, outputs)
            }
            Event::ControlChange(function, value) => {
                self.dispatch(controller::control_change(function, value, config), outputs)
            }
            Event::ChannelPressure(value) => {
                self.dispatch(controller::channel_pressure(value, config), outputs)
            }
        }
    }

    /// Forgets every held note and closes the gate, as if Control Change 123 had been received. Unlike the wire
    /// message, this works in every CC mode.
    pub fn panic<C, G>(
        &mut self,
        outputs: &mut Outputs<C, G>,
    ) -> Result<Operation, io::Error<C::Error, G::Error>>
    where
        C: ControlVoltage,
        G: Gate,
    {
        self.dispatch(Dispatch::AllNotesOff, outputs)
    }

    /// The notes currently held, oldest first.
    pub fn notes(&self) -> &NoteStack {
        &self.notes
    }

    /// Getter.
    pub fn parser(&self) -> &ByteStreamParser {
        &self.parser
    }

    fn voice<C, G>(
        &mut self,
        transition: Transition,
        config: &ChannelConfig,
        outputs: &mut Outputs<C, G>,
    ) -> Result<Operation, io::Error<C::Error, G::Error>>
    where
        C: ControlVoltage,
        G: Gate,
    {
        let mut operation = Operation::none();

        match transition {
            Transition::Trigger(note, velocity) => {
                outputs.pitch(cv::pitch_to_code(note))?;
                operation |= Operation::NoteChange;

                if config.cc_mode == CcMode::Velocity {
                    outputs.modulation(cv::control_to_code(velocity, config.attenuation))?;
                    operation |= Operation::ModulationChange;
                }

                outputs.gate(GateState::High)?;
                operation |= Operation::GateChange;
            }
            Transition::Legato(note) => {
                outputs.pitch(cv::pitch_to_code(note))?;
                operation |= Operation::NoteChange;
            }
            Transition::Release => {
                outputs.gate(GateState::Low)?;
                operation |= Operation::GateChange;
            }
            Transition::Unchanged => {}
        }

        debug!("Holding {} notes", self.notes.len());
        Ok(operation)
    }

    fn dispatch<C, G>(
        &mut self,
        dispatch: Dispatch,
        outputs: &mut Outputs<C, G>,
    ) -> Result<Operation, io::Error<C::Error, G::Error>>
    where
        C: ControlVoltage,
        G: Gate,
    {
        match dispatch {
            Dispatch::AllNotesOff => {
                info!("All notes off");
                self.notes.clear();
                outputs.gate(GateState::Low)?;
                Ok(Operation::AllNotesOff | Operation::GateChange)
            }
            Dispatch::Modulation(code) => {
                outputs.modulation(code)?;
                Ok(Operation::ModulationChange)
            }
            Dispatch::Ignored => Ok(Operation::none()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Attenuation;
    use crate::io::gate::CoupledGate;
    use core::cell::Cell;
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorType, OutputPin};
    use std::rc::Rc;
    use wmidi::{Channel, Note, U7};

    #[derive(Default)]
    struct RecordingCv {
        pitch: Vec<u16>,
        modulation: Vec<u16>,
    }

    impl ControlVoltage for RecordingCv {
        type Error = Infallible;

        fn set_pitch(&mut self, code: u16) -> Result<(), Self::Error> {
            self.pitch.push(code);
            Ok(())
        }

        fn set_modulation(&mut self, code: u16) -> Result<(), Self::Error> {
            self.modulation.push(code);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingGate {
        states: Vec<GateState>,
    }

    impl Gate for RecordingGate {
        type Error = Infallible;

        fn set_gate(&mut self, state: GateState) -> Result<(), Self::Error> {
            self.states.push(state);
            Ok(())
        }
    }

    struct Harness {
        state: MidiState,
        config: ChannelConfig,
        outputs: Outputs<RecordingCv, RecordingGate>,
    }

    impl Harness {
        fn new(channel: Channel, cc_mode: CcMode) -> Self {
            Self {
                state: MidiState::new(),
                config: ChannelConfig {
                    channel,
                    cc_mode,
                    attenuation: Attenuation::FULL,
                },
                outputs: Outputs::new(RecordingCv::default(), RecordingGate::default()),
            }
        }

        fn feed(&mut self, bytes: &[u8]) -> Operation {
            let mut operation = Operation::none();
            for &byte in bytes {
                operation |= self
                    .state
                    .update(byte, &self.config, &mut self.outputs)
                    .unwrap();
            }
            operation
        }

        fn pitch(&self) -> &[u16] {
            &self.outputs.control_voltage.pitch
        }

        fn modulation(&self) -> &[u16] {
            &self.outputs.control_voltage.modulation
        }

        fn gate(&self) -> &[GateState] {
            &self.outputs.gate.states
        }
    }

    fn note(n: u8) -> Note {
        Note::from(U7::from_u8_lossy(n))
    }

    mod notes {
        use super::*;

        #[test]
        fn running_status_plays_consecutive_notes() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            let operation = h.feed(&[0x90, 60, 100, 62, 100]);

            assert!(operation.contains(Operation::NoteChange));
            assert!(operation.contains(Operation::GateChange));
            assert_eq!(&[2457, 2594], h.pitch(), "Expected left but got right");
            assert_eq!(&[GateState::High, GateState::High], h.gate());
            assert!(h.modulation().is_empty(), "CV-A only follows velocity in velocity mode");
        }

        #[test]
        fn legato_release_keeps_gate_open() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            h.feed(&[0x90, 60, 100, 64, 100]);

            let operation = h.feed(&[0x80, 64, 0]);
            assert_eq!(Operation::NoteChange, operation, "Expected left but got right");
            assert_eq!(Some(&cv::pitch_to_code(note(60))), h.pitch().last());
            assert_eq!(2, h.gate().len(), "Gate should not have been written");

            h.feed(&[60, 0]);
            assert_eq!(Some(&GateState::Low), h.gate().last());
            assert_eq!(3, h.pitch().len(), "Release should not touch pitch");
        }

        #[test]
        fn note_on_with_zero_velocity_releases() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            h.feed(&[0x90, 48, 90, 48, 0]);
            assert_eq!(&[GateState::High, GateState::Low], h.gate());
            assert!(h.state.notes().is_empty());
        }

        #[test]
        fn releasing_older_note_writes_nothing() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            h.feed(&[0x90, 60, 100, 64, 100]);
            let operation = h.feed(&[0x80, 60, 0]);
            assert!(operation.is_none());
            assert_eq!(2, h.pitch().len());
            assert_eq!(2, h.gate().len());
        }

        #[test]
        fn ninth_note_evicts_oldest() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            h.feed(&[0x90]);
            for n in 60..69 {
                h.feed(&[n, 100]);
            }

            assert_eq!(CAPACITY, h.state.notes().len());
            assert_eq!(Some(&note(61)), h.state.notes().iter().next());

            // the evicted note is gone; releasing it is silent
            let operation = h.feed(&[60, 0]);
            assert!(operation.is_none());
        }

        #[test]
        fn out_of_range_notes_wrap() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            h.feed(&[0x90, 96, 100, 12, 100]);
            assert_eq!(
                &[cv::pitch_to_code(note(84)), cv::pitch_to_code(note(24))],
                h.pitch()
            );
        }

        #[test]
        fn velocity_mode_drives_modulation() {
            let mut h = Harness::new(Channel::Ch1, CcMode::Velocity);
            let operation = h.feed(&[0x90, 60, 100]);
            assert!(operation.contains(Operation::ModulationChange));
            assert_eq!(&[3200], h.modulation(), "Expected left but got right");

            // a release carries no velocity for CV-A
            h.feed(&[60, 0]);
            assert_eq!(1, h.modulation().len());
        }
    }

    mod channel {
        use super::*;

        #[test]
        fn other_channels_are_ignored() {
            let mut h = Harness::new(Channel::Ch2, CcMode::ModWheel);
            assert!(h.feed(&[0x90, 60, 100, 0xB0, 1, 64]).is_none());
            assert!(h.pitch().is_empty());

            h.feed(&[0x91, 60, 100]);
            assert_eq!(&[2457], h.pitch());
        }

        #[test]
        fn orphan_data_bytes_do_nothing() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            assert!(h.feed(&[60, 100, 5]).is_none());
            assert!(h.gate().is_empty());
        }
    }

    mod controllers {
        use super::*;

        #[test]
        fn modwheel() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            let operation = h.feed(&[0xB0, 1, 64, 2, 127]);
            assert_eq!(Operation::ModulationChange, operation);
            assert_eq!(&[64 << 5], h.modulation(), "Breath should be ignored in modwheel mode");
        }

        #[test]
        fn breath_controller() {
            let mut h = Harness::new(Channel::Ch1, CcMode::BreathController);
            h.feed(&[0xB0, 1, 64, 2, 127]);
            assert_eq!(&[127 << 5], h.modulation());
        }

        #[test]
        fn aftertouch() {
            let mut h = Harness::new(Channel::Ch1, CcMode::Aftertouch);
            h.feed(&[0xD0, 100, 50]);
            assert_eq!(&[3200, 1600], h.modulation(), "Expected left but got right");
        }

        #[test]
        fn attenuation_scales_cv_a() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            h.config.attenuation = Attenuation::from_percent(50);
            h.feed(&[0xB0, 1, 127]);
            assert_eq!(&[63 << 5], h.modulation());
        }
    }

    mod all_notes_off {
        use super::*;

        #[test]
        fn from_the_wire() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            h.feed(&[0x90, 60, 100, 64, 100]);

            let operation = h.feed(&[0xB0, 123, 0]);
            assert!(operation.contains(Operation::AllNotesOff));
            assert!(h.state.notes().is_empty());
            assert_eq!(Some(&GateState::Low), h.gate().last());
        }

        #[test]
        fn filtered_outside_controller_modes() {
            let mut h = Harness::new(Channel::Ch1, CcMode::Aftertouch);
            h.feed(&[0x90, 60, 100]);
            assert!(h.feed(&[0xB0, 123, 0]).is_none());
            assert_eq!(1, h.state.notes().len());
        }

        #[test]
        fn panic_works_in_every_mode() {
            for cc_mode in [
                CcMode::ModWheel,
                CcMode::BreathController,
                CcMode::Aftertouch,
                CcMode::Velocity,
            ] {
                let mut h = Harness::new(Channel::Ch1, cc_mode);
                h.feed(&[0x90, 60, 100]);

                let operation = h.state.panic(&mut h.outputs).unwrap();
                assert!(operation.contains(Operation::AllNotesOff), "{:?}", cc_mode);
                assert!(!h.state.notes().gate_active());
                assert_eq!(Some(&GateState::Low), h.gate().last());
            }
        }

        #[test]
        fn panic_leaves_a_message_in_flight_alone() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            h.feed(&[0x90, 60]);

            h.state.panic(&mut h.outputs).unwrap();
            assert_eq!(
                Phase::AwaitingSecondData { first: 60 },
                h.state.parser().phase(),
                "The panic button does not go through the parser"
            );

            h.feed(&[100]);
            assert_eq!(Some(note(60)), h.state.notes().current_pitch());
        }

        #[test]
        fn running_status_survives_panic() {
            let mut h = Harness::new(Channel::Ch1, CcMode::ModWheel);
            h.feed(&[0x90, 60, 100]);
            h.state.panic(&mut h.outputs).unwrap();
            h.feed(&[67, 100]);
            assert_eq!(Some(&note(67)), h.state.notes().iter().next());
        }
    }

    /// An output pin whose level can be observed after it has been moved into a driver.
    #[derive(Clone, Default)]
    struct FakePin(Rc<Cell<bool>>);

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.set(true);
            Ok(())
        }
    }

    #[test]
    fn indicator_follows_gate() {
        let (gate_pin, indicator_pin) = (FakePin::default(), FakePin::default());
        let mut state = MidiState::new();
        let config = ChannelConfig::default();
        let mut outputs = Outputs::new(
            RecordingCv::default(),
            CoupledGate::new(gate_pin.clone(), indicator_pin.clone()),
        );

        for (bytes, expected) in [
            (&[0x90, 60, 100][..], true),
            (&[62, 100][..], true),
            (&[62, 0][..], true),
            (&[60, 0][..], false),
        ] {
            for &byte in bytes {
                state.update(byte, &config, &mut outputs).unwrap();
            }
            assert_eq!(expected, state.notes().gate_active());
            assert_eq!(expected, gate_pin.0.get(), "gate should follow held notes");
            assert_eq!(expected, indicator_pin.0.get(), "indicator should follow the gate");
        }
    }

    #[derive(Debug, PartialEq)]
    struct Broken;

    struct BrokenCv;

    impl ControlVoltage for BrokenCv {
        type Error = Broken;

        fn set_pitch(&mut self, _code: u16) -> Result<(), Self::Error> {
            Err(Broken)
        }

        fn set_modulation(&mut self, _code: u16) -> Result<(), Self::Error> {
            Err(Broken)
        }
    }

    #[test]
    fn output_errors_propagate() {
        let mut state = MidiState::new();
        let config = ChannelConfig::default();
        let mut outputs = Outputs::new(BrokenCv, RecordingGate::default());

        assert_eq!(Ok(Operation::none()), state.update(0x90, &config, &mut outputs));
        assert_eq!(Ok(Operation::none()), state.update(60, &config, &mut outputs));
        assert_eq!(
            Err(io::Error::ControlVoltage(Broken)),
            state.update(100, &config, &mut outputs),
            "Expected left but got right"
        );
        assert!(outputs.gate.states.is_empty(), "Gate must not open after a failed pitch write");
        assert_eq!(1, state.notes().len(), "The note is still held");
    }
}
