use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitfield of logical inputs that make up one chord shape
///
/// Each set bit is one input taking part in the chord. The zero value is
/// reserved for "nothing" and is never a playable chord.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Chord(u32);

impl Chord {
    pub const NONE: Chord = Chord(0);

    /// Number of usable bit positions
    pub const WIDTH: u8 = 32;

    pub const fn from_bits(bits: u32) -> Self {
        Chord(bits)
    }

    /// The chord with only bit `index` set, if the index fits
    pub const fn bit(index: u8) -> Option<Self> {
        if index < Self::WIDTH {
            Some(Chord(1 << index))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn is_single_bit(self) -> bool {
        self.0.is_power_of_two()
    }

    /// True when every bit of `other` is also set in `self`
    pub const fn contains(self, other: Chord) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Chord) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn without(self, other: Chord) -> Self {
        Chord(self.0 & !other.0)
    }

    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }
}

impl BitOr for Chord {
    type Output = Chord;

    fn bitor(self, rhs: Chord) -> Chord {
        Chord(self.0 | rhs.0)
    }
}

impl BitOrAssign for Chord {
    fn bitor_assign(&mut self, rhs: Chord) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Chord {
    type Output = Chord;

    fn bitand(self, rhs: Chord) -> Chord {
        Chord(self.0 & rhs.0)
    }
}

impl FromIterator<Chord> for Chord {
    fn from_iter<I: IntoIterator<Item = Chord>>(iter: I) -> Self {
        iter.into_iter().fold(Chord::NONE, |acc, chord| acc | chord)
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}
