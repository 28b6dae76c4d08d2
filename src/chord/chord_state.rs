//! Chord accumulation state machine
//!
//! ```text
//!            Down(bit)                       Up(bit)
//!  Keys    |= bit                    Keys    &= !bit
//!  Build   |= Keys                   Trigger  = Build
//!  Trigger  = 0                      Build    = 0
//! ```
//!
//! `Build` collects every input held together since the last release, so a
//! chord can be rolled into key by key and is played on the first release.
//! `Build` and `Trigger` are never both non-zero.

use crate::chord::{Chord, ChordInputMapping};
use crate::controller::{ButtonEvent, ButtonState};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChordModel {
    /// Inputs physically held right now
    pub keys: Chord,
    /// Union of held inputs since the last release
    pub build: Chord,
    /// Completed chord awaiting output, `Chord::NONE` when nothing is pending
    pub trigger: Chord,
}

impl ChordModel {
    pub fn key_down(mut self, bit: Chord) -> Self {
        self.keys |= bit;
        self.build |= self.keys;
        self.trigger = Chord::NONE;
        self
    }

    /// Releasing an input that is not held leaves the model untouched.
    pub fn key_up(mut self, bit: Chord) -> Self {
        if bit.is_empty() || !self.keys.contains(bit) {
            return self;
        }

        self.keys = self.keys.without(bit);
        self.trigger = self.build;
        self.build = Chord::NONE;
        self
    }

    pub fn apply(self, bit: Chord, state: ButtonState) -> Self {
        match state {
            ButtonState::Down => self.key_down(bit),
            ButtonState::Up => self.key_up(bit),
            ButtonState::Hold => self,
        }
    }

    /// The completed chord, if one is waiting to be played
    pub fn pending(&self) -> Option<Chord> {
        (!self.trigger.is_empty()).then_some(self.trigger)
    }

    pub fn is_idle(&self) -> bool {
        self.keys.is_empty() && self.build.is_empty() && self.trigger.is_empty()
    }
}

/// Drives a [`ChordModel`] from button events
///
/// Owned by a single task; the model never leaves it except as a copy.
#[derive(Clone, Debug)]
pub struct ChordMachine {
    mapping: ChordInputMapping,
    model: ChordModel,
}

impl ChordMachine {
    pub fn new(mapping: ChordInputMapping) -> Self {
        Self {
            mapping,
            model: ChordModel::default(),
        }
    }

    pub fn model(&self) -> ChordModel {
        self.model
    }

    /// Applies one event and returns the new model only if it changed
    pub fn apply(&mut self, event: &ButtonEvent) -> Option<ChordModel> {
        let Some(bit) = self.mapping.chord_for(event.button) else {
            warn!("Unbound input button: {}", event.button);
            return None;
        };

        let next = self.model.apply(bit, event.state);
        if next == self.model {
            debug!("Model unchanged by {}", event);
            return None;
        }

        debug!(
            "{} -> keys={} build={} trigger={}",
            event, next.keys, next.build, next.trigger
        );
        self.model = next;
        Some(next)
    }
}
