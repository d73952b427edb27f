/// Presentation collaborators the engine signals or waits on.
///
/// The engine never renders anything itself. It tells these
/// collaborators what to do and is resumed by the host through
/// `NovelEngine::transition_complete`, `tick`, `advance` and `select`.

use crate::core::choice::ChoiceView;
use crate::schema::scene::Scene;

/// Whether a transition finished synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStatus {
    Complete,
    /// The host will call `NovelEngine::transition_complete` when done.
    Pending,
}

/// The visual effect played when a scene is entered.
pub trait TransitionEffect {
    fn play(&mut self, scene: &Scene) -> TransitionStatus;
}

/// Paces the reveal of dialogue text.
pub trait RevealClock {
    /// Arrange for `NovelEngine::tick` to be called after `delay` units.
    fn schedule_tick(&mut self, delay: u32);
    /// Forget any scheduled tick.
    fn cancel(&mut self);
}

/// Shows the options of a choice point.
pub trait SelectionUi {
    fn present(&mut self, choice: &ChoiceView);
    fn dismiss(&mut self);
}

/// Completes every transition immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantTransition;

impl TransitionEffect for InstantTransition {
    fn play(&mut self, _scene: &Scene) -> TransitionStatus {
        TransitionStatus::Complete
    }
}

/// Always waits for the host to report completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredTransition;

impl TransitionEffect for DeferredTransition {
    fn play(&mut self, _scene: &Scene) -> TransitionStatus {
        TransitionStatus::Pending
    }
}

/// Does nothing; the host polls `NovelEngine::pending_tick` and drives
/// ticks itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock;

impl RevealClock for ManualClock {
    fn schedule_tick(&mut self, _delay: u32) {}
    fn cancel(&mut self) {}
}

/// Does nothing; the host reads `NovelEngine::pending_choice`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessSelection;

impl SelectionUi for HeadlessSelection {
    fn present(&mut self, _choice: &ChoiceView) {}
    fn dismiss(&mut self) {}
}
