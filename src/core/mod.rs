//! Engine behaviour: content, persistence, the dialogue and choice state
//! machines, and the engine that sequences them.

pub mod choice;
pub mod config;
pub mod content;
pub mod dialogue;
pub mod engine;
pub mod host;
pub mod save;
pub mod store;
