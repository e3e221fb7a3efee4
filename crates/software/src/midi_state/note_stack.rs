//! Provides a struct [`NoteStack`] for managing the held notes of a monophonic instrument. The most recently pressed
//! note is voiced (last-note priority); releasing it falls back to the note pressed before it without closing the
//! gate, which is what a performer playing legato expects from a monosynth.

use wmidi::{Note, U7};

/// How many held notes are remembered. Pressing another evicts the least recent.
pub const CAPACITY: usize = 8;

/// What a key press or release means for the outputs.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Transition {
    /// A note was pressed: voice it and open the gate. The velocity is carried along for CV-A.
    Trigger(Note, U7),
    /// The voiced note was released while older notes are still held: voice the previous one, leaving the gate open.
    Legato(Note),
    /// The last held note was released: close the gate. Pitch stays where it was.
    Release,
    /// Nothing audible changed.
    Unchanged,
}

/// A fixed-capacity, time-ordered stack of held notes.
///
/// Slots are always left-packed: the oldest note sits in the first slot and the newest at the highest filled index.
/// Removal is two-step, mirroring how a release is processed: the departing note is flagged, then [`compact`]
/// clears the first slot holding it and closes the hole.
///
/// [`compact`]: NoteStack::compact
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteStack {
    slots: [Option<Note>; CAPACITY],
    filled: usize,
    pending_removal: Option<Note>,
}

impl Default for NoteStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for NoteStack {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "NoteStack {{ ");
        defmt::write!(fmt, "slots: [");
        for (i, &note) in self.iter().enumerate() {
            if i == 0 {
                defmt::write!(fmt, " ");
            } else {
                defmt::write!(fmt, ", ");
            }
            defmt::write!(fmt, "{} ({})", note.to_str(), u8::from(note));
        }
        defmt::write!(fmt, " ]");
        defmt::write!(fmt, " }}");
    }
}

impl NoteStack {
    /// Construct an empty `NoteStack`.
    pub const fn new() -> Self {
        Self {
            slots: [None; CAPACITY],
            filled: 0,
            pending_removal: None,
        }
    }

    /// Registers a key press. A velocity of zero is treated as a release, per MIDI convention.
    ///
    /// A note which is already held moves to the top rather than being held twice, so a later release always
    /// removes the voiced slot.
    pub fn on_note_on(&mut self, note: Note, velocity: U7) -> Transition {
        if u8::from(velocity) == 0 {
            return self.on_note_off(note);
        }

        self.pending_removal = Some(note);
        self.compact();

        if self.filled == CAPACITY {
            self.pending_removal = self.slots[0];
            self.compact();
        }
        self.slots[self.filled] = Some(note);
        self.filled += 1;

        Transition::Trigger(note, velocity)
    }

    /// Registers a key release. Releasing a note which isn't held changes nothing.
    pub fn on_note_off(&mut self, note: Note) -> Transition {
        let held_before = self.filled;
        let releases_voiced_note = self.current_pitch() == Some(note);
        let previous = held_before.checked_sub(2).and_then(|i| self.slots[i]);

        self.pending_removal = Some(note);
        self.compact();

        match previous {
            Some(previous) if releases_voiced_note => Transition::Legato(previous),
            _ if held_before > 0 && self.filled == 0 => Transition::Release,
            _ => Transition::Unchanged,
        }
    }

    /// Removes the flagged note, if it is held, and packs the remaining notes to the left.
    ///
    /// Only the first (oldest) slot holding the flagged note is cleared. The flag is spent either way, so a second
    /// call does nothing.
    pub fn compact(&mut self) {
        for i in 0..CAPACITY {
            if let Some(target) = self.pending_removal {
                if self.slots[i] == Some(target) {
                    self.slots[i] = None;
                    self.pending_removal = None;
                    self.filled -= 1;
                }
            }

            if self.slots[i].is_none() && i + 1 < CAPACITY {
                self.slots[i] = self.slots[i + 1].take();
            }
        }
        self.pending_removal = None;
    }

    /// Forgets every note. Used by the panic controls and at startup.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// The note to voice: the most recently pressed one still held.
    pub fn current_pitch(&self) -> Option<Note> {
        self.filled.checked_sub(1).and_then(|i| self.slots[i])
    }

    /// The gate is open if and only if some note is held.
    pub fn gate_active(&self) -> bool {
        self.filled > 0
    }

    /// Number of held notes.
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Determine if any notes are held.
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Returns an [`Iterator`] over the held notes, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.slots.iter().flatten()
    }
}
