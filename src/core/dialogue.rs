/// Dialogue advancer — per-line reveal pacing and the two-stage
/// reveal/advance gate.
///
/// A line moves `Idle → Typing → Ready → Idle`. The first signal while
/// typing only completes the reveal; leaving the line always takes a
/// signal received in `Ready`.

use tracing::debug;

use crate::schema::scene::Dialogue;
use crate::schema::state::NarrativeState;

/// Where the current line is in its presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePhase {
    Idle,
    Typing,
    Ready,
}

/// What an advance/skip signal did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The reveal was completed; the line is still showing.
    Revealed,
    /// The line was acknowledged and left.
    Advance,
    /// Nothing was awaiting a signal.
    Ignored,
}

/// What a reveal clock tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// More characters remain; another tick is due.
    Continue,
    /// The last characters were revealed.
    Complete,
    /// No reveal in progress.
    Ignored,
}

/// The character-by-character reveal of one line's text.
///
/// Iterating yields the chunk revealed by each tick. Finite, and
/// restartable with `restart`.
#[derive(Debug, Clone, Default)]
pub struct Reveal {
    chars: Vec<char>,
    shown: usize,
    per_tick: usize,
}

impl Reveal {
    pub fn new(text: &str, per_tick: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            shown: 0,
            per_tick: per_tick.max(1),
        }
    }

    /// The revealed prefix.
    pub fn visible(&self) -> String {
        self.chars[..self.shown].iter().collect()
    }

    pub fn full(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.shown >= self.chars.len()
    }

    /// Show everything, discarding the remaining pacing.
    pub fn finish(&mut self) {
        self.shown = self.chars.len();
    }

    pub fn restart(&mut self) {
        self.shown = 0;
    }
}

impl Iterator for Reveal {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.is_complete() {
            return None;
        }
        let end = (self.shown + self.per_tick).min(self.chars.len());
        let chunk = self.chars[self.shown..end].iter().collect();
        self.shown = end;
        Some(chunk)
    }
}

/// Drives the presentation of dialogue lines.
#[derive(Debug, Clone)]
pub struct DialogueAdvancer {
    phase: LinePhase,
    speaker: Option<String>,
    reveal: Reveal,
    terminal: bool,
    chars_per_tick: usize,
}

impl DialogueAdvancer {
    pub fn new(chars_per_tick: usize) -> Self {
        Self {
            phase: LinePhase::Idle,
            speaker: None,
            reveal: Reveal::default(),
            terminal: false,
            chars_per_tick: chars_per_tick.max(1),
        }
    }

    /// Resolve the line's text against `state` and start typing it.
    ///
    /// Returns `Ready` straight away for empty text.
    pub fn begin_line(&mut self, dialogue: &Dialogue, state: &NarrativeState) -> LinePhase {
        let text = dialogue.text.resolve(state);
        self.speaker = dialogue.speaker.clone();
        self.terminal = dialogue.terminal;
        self.reveal = Reveal::new(&text, self.chars_per_tick);
        self.phase = if self.reveal.is_complete() {
            LinePhase::Ready
        } else {
            LinePhase::Typing
        };
        debug!(speaker = ?self.speaker, chars = text.chars().count(), "line started");
        self.phase
    }

    /// Reveal the next chunk.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != LinePhase::Typing {
            return TickOutcome::Ignored;
        }
        self.reveal.next();
        if self.reveal.is_complete() {
            self.phase = LinePhase::Ready;
            TickOutcome::Complete
        } else {
            TickOutcome::Continue
        }
    }

    /// Complete the reveal without leaving the line. Returns whether
    /// anything was skipped.
    pub fn skip(&mut self) -> bool {
        if self.phase != LinePhase::Typing {
            return false;
        }
        self.reveal.finish();
        self.phase = LinePhase::Ready;
        true
    }

    /// The single advance/skip input.
    pub fn signal(&mut self) -> Gate {
        match self.phase {
            LinePhase::Typing => {
                self.skip();
                Gate::Revealed
            }
            LinePhase::Ready => {
                self.phase = LinePhase::Idle;
                Gate::Advance
            }
            LinePhase::Idle => Gate::Ignored,
        }
    }

    /// Drop the current line without completing it.
    pub fn abandon(&mut self) {
        self.phase = LinePhase::Idle;
        self.speaker = None;
        self.terminal = false;
        self.reveal = Reveal::default();
    }

    pub fn phase(&self) -> LinePhase {
        self.phase
    }

    /// `None` hides the name UI.
    pub fn speaker(&self) -> Option<&str> {
        self.speaker.as_deref()
    }

    pub fn visible_text(&self) -> String {
        self.reveal.visible()
    }

    pub fn full_text(&self) -> String {
        self.reveal.full()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}
