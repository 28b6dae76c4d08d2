//! Output actions produced by a resolved chord

use evdev::Key;
use std::fmt;

/// The key that turns a wrapped event into a [`OutputEvent::Shifted`]
pub const SHIFT_KEY: Key = Key::KEY_RIGHTSHIFT;

/// What a chord types
///
/// A leaf presses one key. The wrapping variants hold a modifier down around
/// an inner event and may nest to any depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputEvent {
    Press(Key),
    Shifted(Box<OutputEvent>),
    Wrapped {
        modifier: Key,
        inner: Box<OutputEvent>,
    },
}

/// One step of rendering an [`OutputEvent`] onto a keyboard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyStroke {
    Press(Key),
    /// Pause between a leaf press and its release
    Settle,
    Release(Key),
}

impl OutputEvent {
    pub fn shifted(inner: OutputEvent) -> Self {
        OutputEvent::Shifted(Box::new(inner))
    }

    pub fn wrap(modifier: Key, inner: OutputEvent) -> Self {
        if modifier == SHIFT_KEY {
            return OutputEvent::shifted(inner);
        }

        OutputEvent::Wrapped {
            modifier,
            inner: Box::new(inner),
        }
    }

    /// Flattens the event into press and release steps
    ///
    /// Every press is matched by a release in reverse order, so no key is left
    /// down once the sequence has been played.
    pub fn keystrokes(&self) -> Vec<KeyStroke> {
        let mut strokes = Vec::new();
        self.render_into(&mut strokes);
        strokes
    }

    fn render_into(&self, strokes: &mut Vec<KeyStroke>) {
        match self {
            OutputEvent::Press(key) => {
                strokes.push(KeyStroke::Press(*key));
                strokes.push(KeyStroke::Settle);
                strokes.push(KeyStroke::Release(*key));
            }
            OutputEvent::Shifted(inner) => {
                strokes.push(KeyStroke::Press(SHIFT_KEY));
                inner.render_into(strokes);
                strokes.push(KeyStroke::Release(SHIFT_KEY));
            }
            OutputEvent::Wrapped { modifier, inner } => {
                strokes.push(KeyStroke::Press(*modifier));
                inner.render_into(strokes);
                strokes.push(KeyStroke::Release(*modifier));
            }
        }
    }

    /// All keys this event touches
    pub fn keys(&self) -> Vec<Key> {
        match self {
            OutputEvent::Press(key) => vec![*key],
            OutputEvent::Shifted(inner) => {
                let mut keys = inner.keys();
                keys.push(SHIFT_KEY);
                keys
            }
            OutputEvent::Wrapped { modifier, inner } => {
                let mut keys = inner.keys();
                keys.push(*modifier);
                keys
            }
        }
    }
}

impl fmt::Display for OutputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputEvent::Press(key) => write!(f, "{:?}", key),
            OutputEvent::Shifted(inner) => write!(f, "Shift+{}", inner),
            OutputEvent::Wrapped { modifier, inner } => write!(f, "{:?}+{}", modifier, inner),
        }
    }
}
