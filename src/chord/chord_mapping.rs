use crate::chord::{Chord, MappingError, OutputEvent};
use crate::controller::Button;
use evdev::Key;
use std::collections::HashMap;
use tracing::debug;

/// Assigns each logical button its own chord bit
#[derive(Clone, Debug, Default)]
pub struct ChordInputMapping {
    bits: HashMap<Button, Chord>,
    // Union of all assigned bits
    all: Chord,
}

impl ChordInputMapping {
    pub fn new<I>(bindings: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (Button, Chord)>,
    {
        let mut mapping = Self::default();

        for (button, chord) in bindings {
            if !chord.is_single_bit() {
                return Err(MappingError::NotSingleBit { button, chord });
            }
            if mapping.bits.contains_key(&button) {
                return Err(MappingError::DuplicateButton(button));
            }
            if mapping.all.intersects(chord) {
                return Err(MappingError::BitCollision { button, chord });
            }

            mapping.bits.insert(button, chord);
            mapping.all |= chord;
        }

        debug!("Input mapping covers {} buttons", mapping.bits.len());
        Ok(mapping)
    }

    pub fn chord_for(&self, button: Button) -> Option<Chord> {
        self.bits.get(&button).copied()
    }

    /// The chord formed by pressing all of `buttons` together
    pub fn chord_of(&self, buttons: &[Button]) -> Result<Chord, MappingError> {
        buttons
            .iter()
            .map(|button| {
                self.chord_for(*button)
                    .ok_or(MappingError::UnmappedButton(*button))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

/// A chord input that wraps the resolved output in a held key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Modifier {
    pub bit: Chord,
    pub key: Key,
}

/// Resolves completed chords to output events
///
/// Modifier bits are stripped from a chord before lookup, then every modifier
/// present in the chord is wrapped around the base output. Modifiers nest in
/// declaration order, the first one outermost.
#[derive(Clone, Debug, Default)]
pub struct ChordOutputMapping {
    table: HashMap<Chord, OutputEvent>,
    modifiers: Vec<Modifier>,
    modifier_mask: Chord,
}

impl ChordOutputMapping {
    pub fn new(modifiers: Vec<Modifier>) -> Result<Self, MappingError> {
        let mut modifier_mask = Chord::NONE;
        for modifier in &modifiers {
            if modifier.bit.is_empty() {
                return Err(MappingError::EmptyChord);
            }
            if modifier_mask.intersects(modifier.bit) {
                return Err(MappingError::DuplicateChord(modifier.bit));
            }
            modifier_mask |= modifier.bit;
        }

        Ok(Self {
            table: HashMap::new(),
            modifiers,
            modifier_mask,
        })
    }

    pub fn bind(&mut self, chord: Chord, event: OutputEvent) -> Result<(), MappingError> {
        if chord.is_empty() {
            return Err(MappingError::EmptyChord);
        }
        if chord.intersects(self.modifier_mask) {
            return Err(MappingError::ModifierOverlap(chord));
        }
        if self.table.contains_key(&chord) {
            return Err(MappingError::DuplicateChord(chord));
        }

        debug!("Binding chord {} to {}", chord, event);
        self.table.insert(chord, event);
        Ok(())
    }

    /// The output for a completed chord, modifiers applied
    pub fn resolve(&self, chord: Chord) -> Result<OutputEvent, MappingError> {
        let base = chord.without(self.modifier_mask);
        if base.is_empty() {
            return Err(MappingError::UnboundChord(chord));
        }

        let event = self
            .table
            .get(&base)
            .cloned()
            .ok_or(MappingError::UnboundChord(chord))?;

        Ok(self
            .modifiers
            .iter()
            .rev()
            .filter(|modifier| chord.contains(modifier.bit))
            .fold(event, |inner, modifier| {
                OutputEvent::wrap(modifier.key, inner)
            }))
    }

    /// Every key the table can ever emit, used to size the virtual keyboard
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .table
            .values()
            .flat_map(|event| event.keys())
            .chain(self.modifiers.iter().map(|modifier| modifier.key))
            .collect();
        keys.sort_by_key(|key| key.code());
        keys.dedup();
        keys
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::KeyStroke;

    fn bit(index: u8) -> Chord {
        Chord::bit(index).unwrap()
    }

    fn output_mapping() -> ChordOutputMapping {
        let mut mapping = ChordOutputMapping::new(vec![
            Modifier {
                bit: bit(8),
                key: Key::KEY_RIGHTSHIFT,
            },
            Modifier {
                bit: bit(9),
                key: Key::KEY_RIGHTCTRL,
            },
        ])
        .unwrap();
        mapping
            .bind(bit(0) | bit(1), OutputEvent::Press(Key::KEY_Q))
            .unwrap();
        mapping
            .bind(bit(2), OutputEvent::Press(Key::KEY_E))
            .unwrap();
        mapping
    }

    #[test]
    fn test_input_mapping_rejects_multi_bit_inputs() {
        let result = ChordInputMapping::new([(Button::South, Chord::from_bits(0b11))]);
        assert!(matches!(result, Err(MappingError::NotSingleBit { .. })));

        let result = ChordInputMapping::new([(Button::South, Chord::NONE)]);
        assert!(matches!(result, Err(MappingError::NotSingleBit { .. })));
    }

    #[test]
    fn test_input_mapping_rejects_shared_bits() {
        let result = ChordInputMapping::new([(Button::South, bit(3)), (Button::East, bit(3))]);
        assert_eq!(
            result.unwrap_err(),
            MappingError::BitCollision {
                button: Button::East,
                chord: bit(3)
            }
        );
    }

    #[test]
    fn test_input_mapping_rejects_repeated_button() {
        let result = ChordInputMapping::new([(Button::South, bit(0)), (Button::South, bit(1))]);
        assert_eq!(result.unwrap_err(), MappingError::DuplicateButton(Button::South));
    }

    #[test]
    fn test_chord_of_buttons() {
        let mapping =
            ChordInputMapping::new([(Button::South, bit(0)), (Button::East, bit(4))]).unwrap();
        assert_eq!(
            mapping.chord_of(&[Button::South, Button::East]),
            Ok(Chord::from_bits(0b10001))
        );
        assert_eq!(
            mapping.chord_of(&[Button::North]),
            Err(MappingError::UnmappedButton(Button::North))
        );
    }

    #[test]
    fn test_resolve_plain_chord() {
        let mapping = output_mapping();
        assert_eq!(
            mapping.resolve(Chord::from_bits(0b11)),
            Ok(OutputEvent::Press(Key::KEY_Q))
        );
    }

    #[test]
    fn test_resolve_unbound_and_modifier_only_chords() {
        let mapping = output_mapping();
        assert_eq!(
            mapping.resolve(bit(5)),
            Err(MappingError::UnboundChord(bit(5)))
        );
        assert_eq!(
            mapping.resolve(bit(8)),
            Err(MappingError::UnboundChord(bit(8)))
        );
    }

    #[test]
    fn test_shift_modifier_produces_shifted_event() {
        let mapping = output_mapping();
        let event = mapping.resolve(bit(2) | bit(8)).unwrap();
        assert_eq!(
            event,
            OutputEvent::Shifted(Box::new(OutputEvent::Press(Key::KEY_E)))
        );
    }

    #[test]
    fn test_all_modifiers_nest_first_outermost() {
        let mapping = output_mapping();
        let event = mapping.resolve(bit(2) | bit(8) | bit(9)).unwrap();

        assert_eq!(
            event.keystrokes(),
            vec![
                KeyStroke::Press(Key::KEY_RIGHTSHIFT),
                KeyStroke::Press(Key::KEY_RIGHTCTRL),
                KeyStroke::Press(Key::KEY_E),
                KeyStroke::Settle,
                KeyStroke::Release(Key::KEY_E),
                KeyStroke::Release(Key::KEY_RIGHTCTRL),
                KeyStroke::Release(Key::KEY_RIGHTSHIFT),
            ]
        );
    }

    #[test]
    fn test_bind_rejects_invalid_chords() {
        let mut mapping = output_mapping();
        assert_eq!(
            mapping.bind(Chord::NONE, OutputEvent::Press(Key::KEY_A)),
            Err(MappingError::EmptyChord)
        );
        assert_eq!(
            mapping.bind(bit(2), OutputEvent::Press(Key::KEY_A)),
            Err(MappingError::DuplicateChord(bit(2)))
        );
        assert_eq!(
            mapping.bind(bit(3) | bit(8), OutputEvent::Press(Key::KEY_A)),
            Err(MappingError::ModifierOverlap(bit(3) | bit(8)))
        );
    }

    #[test]
    fn test_keys_include_modifiers() {
        let keys = output_mapping().keys();
        for key in [
            Key::KEY_Q,
            Key::KEY_E,
            Key::KEY_RIGHTSHIFT,
            Key::KEY_RIGHTCTRL,
        ] {
            assert!(keys.contains(&key), "missing {:?}", key);
        }
        assert_eq!(keys.len(), 4);
    }
}
