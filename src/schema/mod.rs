//! Plain narrative data: authored scenes and the player's progress.

pub mod scene;
pub mod state;
