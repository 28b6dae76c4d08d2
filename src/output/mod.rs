pub mod virtual_keyboard;

pub use virtual_keyboard::{render, KeySink, OutputError, UinputKeyboard};
