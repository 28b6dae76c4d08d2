//! Error definitions for the chord tables

use crate::chord::Chord;
use crate::controller::Button;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// An input must own exactly one bit
    #[error("Button {button} must map to exactly one chord bit, got {chord}")]
    NotSingleBit { button: Button, chord: Chord },

    #[error("Button {button} reuses chord bit {chord}, which is already taken")]
    BitCollision { button: Button, chord: Chord },

    #[error("Button {0} is mapped more than once")]
    DuplicateButton(Button),

    #[error("Button {0} has no chord bit")]
    UnmappedButton(Button),

    #[error("Chord {0} is bound more than once")]
    DuplicateChord(Chord),

    #[error("Chord {0} uses bits reserved for modifiers")]
    ModifierOverlap(Chord),

    #[error("Cannot bind the empty chord")]
    EmptyChord,

    /// Not a configuration problem: the chord simply has no output
    #[error("No output bound to chord {0}")]
    UnboundChord(Chord),
}
