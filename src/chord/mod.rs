pub mod chord_mapping;
pub mod chord_state;
pub mod chord_types;
pub mod error;
pub mod output_event;

pub use chord_mapping::{ChordInputMapping, ChordOutputMapping, Modifier};
pub use chord_state::{ChordMachine, ChordModel};
pub use chord_types::Chord;
pub use error::MappingError;
pub use output_event::{KeyStroke, OutputEvent, SHIFT_KEY};
