pub mod chord;
pub mod config;
pub mod controller;
pub mod daemon;
pub mod discovery;
pub mod output;
pub mod pipeline;
