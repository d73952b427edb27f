//! Novel Engine — the scene and dialogue state machine behind a visual
//! novel.
//!
//! Walks a player through authored scenes of dialogue lines and branching
//! choices, paces the typed reveal of each line behind a two-stage
//! reveal/advance gate, applies choice outcomes to a flag store, and
//! persists progress so a run can be continued later. Rendering, audio and
//! menus stay with the host, which talks to the engine through a few
//! narrow collaborator traits.

pub mod core;
pub mod schema;
