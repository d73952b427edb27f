/// The novel engine: scene transitions, the per-line loop and the
/// title/run lifecycle.
///
/// Single-threaded and signal-driven. The engine suspends in exactly
/// one of `Transitioning`, `Typing`, `Ready` or `Choosing` and is resumed
/// by the host calling the matching signal method. The narrative state is
/// persisted after every line advance and every choice resolution.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core::choice::{ChoiceError, ChoiceResolver, ChoiceTicket, ChoiceView, Resolution};
use crate::core::config::{ConfigError, EngineConfig};
use crate::core::content::{ContentError, ContentStore};
use crate::core::dialogue::{DialogueAdvancer, Gate, LinePhase, TickOutcome};
use crate::core::host::{
    HeadlessSelection, InstantTransition, ManualClock, RevealClock, SelectionUi,
    TransitionEffect, TransitionStatus,
};
use crate::core::save::{self, SaveError};
use crate::core::store::{MemoryStore, PersistentStore};
use crate::schema::scene::{Line, Route, Scene, SceneId};
use crate::schema::state::NarrativeState;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("save error: {0}")]
    Save(#[from] SaveError),
    #[error("unknown route: {0}")]
    UnknownRoute(String),
    #[error("engine built without content")]
    MissingContent,
}

/// What the engine is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No run in progress (title/menu context).
    Title,
    /// Waiting for `transition_complete`.
    Transitioning,
    /// Revealing a line; waiting for `tick` or an advance/skip signal.
    Typing,
    /// Line fully shown; waiting for an advance signal.
    Ready,
    /// Waiting for `select`.
    Choosing,
}

/// Why the most recent run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// A terminal line was acknowledged.
    Terminal,
    /// The scene ran out of lines with no terminal line or redirect.
    Exhausted,
    /// `return_to_title` cancelled the run.
    Abandoned,
    /// A content error aborted the run.
    Aborted,
}

/// How `enter_scene` positions the narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnterOptions {
    /// Start at line 0; otherwise keep the current line index.
    pub reset_to_start: bool,
}

impl EnterOptions {
    pub fn from_start() -> Self {
        Self {
            reset_to_start: true,
        }
    }

    pub fn resume() -> Self {
        Self {
            reset_to_start: false,
        }
    }
}

pub struct NovelEngine {
    content: ContentStore,
    config: EngineConfig,
    state: NarrativeState,
    phase: Phase,
    advancer: DialogueAdvancer,
    choices: ChoiceResolver,
    store: Box<dyn PersistentStore>,
    transition: Box<dyn TransitionEffect>,
    clock: Box<dyn RevealClock>,
    selection: Box<dyn SelectionUi>,
    last_end: Option<RunEnd>,
}

/// Builder for constructing a `NovelEngine`.
pub struct NovelEngineBuilder {
    content: Option<ContentStore>,
    config: EngineConfig,
    store: Option<Box<dyn PersistentStore>>,
    transition: Option<Box<dyn TransitionEffect>>,
    clock: Option<Box<dyn RevealClock>>,
    selection: Option<Box<dyn SelectionUi>>,
}

impl NovelEngineBuilder {
    pub fn with_content(mut self, content: ContentStore) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(mut self, store: impl PersistentStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_transition(mut self, transition: impl TransitionEffect + 'static) -> Self {
        self.transition = Some(Box::new(transition));
        self
    }

    pub fn with_clock(mut self, clock: impl RevealClock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn with_selection(mut self, selection: impl SelectionUi + 'static) -> Self {
        self.selection = Some(Box::new(selection));
        self
    }

    /// Collaborators that were not provided default to a memory store,
    /// instant transitions, a manual clock and a headless selection UI.
    pub fn build(self) -> Result<NovelEngine, EngineError> {
        let content = self.content.ok_or(EngineError::MissingContent)?;
        self.config.validate()?;
        content.get_scene(&self.config.start_scene)?;

        Ok(NovelEngine {
            advancer: DialogueAdvancer::new(self.config.chars_per_tick),
            content,
            config: self.config,
            state: NarrativeState::new(),
            phase: Phase::Title,
            choices: ChoiceResolver::new(),
            store: self.store.unwrap_or_else(|| Box::new(MemoryStore::new())),
            transition: self
                .transition
                .unwrap_or_else(|| Box::new(InstantTransition)),
            clock: self.clock.unwrap_or_else(|| Box::new(ManualClock)),
            selection: self
                .selection
                .unwrap_or_else(|| Box::new(HeadlessSelection)),
            last_end: None,
        })
    }
}

impl NovelEngine {
    pub fn builder() -> NovelEngineBuilder {
        NovelEngineBuilder {
            content: None,
            config: EngineConfig::default(),
            store: None,
            transition: None,
            clock: None,
            selection: None,
        }
    }

    // ---------------------------------------------------------------
    // Title / menu operations
    // ---------------------------------------------------------------

    /// Clear the save and start over at the configured start scene.
    pub fn new_game(&mut self) -> Result<Phase, EngineError> {
        let start = self.config.start_scene.clone();
        self.content.get_scene(&start)?;
        self.reset_progress();
        info!(scene = %start, "new game");
        self.enter_scene(&start, EnterOptions::from_start())
    }

    /// Resume from the persisted save. Without a usable save the engine
    /// stays at the title.
    pub fn continue_game(&mut self) -> Result<Phase, EngineError> {
        let Some(saved) = save::read_save(self.store.as_ref(), &self.config.save_key) else {
            info!("no save to continue");
            return Ok(self.phase);
        };
        let Some(scene_id) = saved.scene_id().cloned() else {
            return Ok(self.phase);
        };
        if !self.content.contains(&scene_id) {
            warn!(scene = %scene_id, "save refers to a scene that no longer exists, ignoring it");
            return Ok(self.phase);
        }

        self.cancel_suspensions();
        self.state = saved;
        let options = if self.state.line_index() == 0 {
            EnterOptions::from_start()
        } else {
            EnterOptions::resume()
        };
        info!(scene = %scene_id, line = self.state.line_index(), "continuing");
        self.enter_scene(&scene_id, options)
    }

    /// Clear the save and start the route's first scene.
    pub fn start_route(&mut self, route_id: &str) -> Result<Phase, EngineError> {
        let start = self
            .content
            .route(route_id)
            .map(|r| r.start_scene.clone())
            .ok_or_else(|| EngineError::UnknownRoute(route_id.to_string()))?;
        self.content.get_scene(&start)?;
        self.reset_progress();
        info!(route = route_id, scene = %start, "route started");
        self.enter_scene(&start, EnterOptions::from_start())
    }

    /// True when there is a save `continue_game` would resume: readable
    /// and pointing at a scene that still exists.
    pub fn has_save(&self) -> bool {
        save::read_save(self.store.as_ref(), &self.config.save_key)
            .and_then(|saved| saved.scene_id().cloned())
            .is_some_and(|id| self.content.contains(&id))
    }

    pub fn clear_save(&mut self) -> Result<(), EngineError> {
        save::clear_save(self.store.as_mut(), &self.config.save_key)?;
        Ok(())
    }

    /// Cancel whatever the run is waiting on and go back to the title.
    /// Typed text is discarded and nothing is committed.
    pub fn return_to_title(&mut self) -> Phase {
        if self.phase == Phase::Title {
            return self.phase;
        }
        self.end_run(RunEnd::Abandoned)
    }

    // ---------------------------------------------------------------
    // Scene transitions
    // ---------------------------------------------------------------

    /// Enter scene `id`. Fails without touching the state when the scene
    /// does not exist.
    pub fn enter_scene(&mut self, id: &SceneId, options: EnterOptions) -> Result<Phase, EngineError> {
        let len = self.content.get_scene(id)?.lines.len();

        self.cancel_suspensions();
        let line = if options.reset_to_start {
            0
        } else {
            self.state.line_index().min(len - 1)
        };
        self.state.set_position(id.clone(), line);
        self.state.mark_visited(id.clone());
        debug!(scene = %id, line, "entering scene");

        if self.config.wipe_on_enter {
            let scene = self.content.get_scene(id)?;
            if self.transition.play(scene) == TransitionStatus::Pending {
                self.phase = Phase::Transitioning;
                return Ok(self.phase);
            }
        }
        Ok(self.begin_current_line())
    }

    /// The transition effect finished; the scene counts as entered now.
    pub fn transition_complete(&mut self) -> Phase {
        if self.phase != Phase::Transitioning {
            return self.phase;
        }
        self.begin_current_line()
    }

    // ---------------------------------------------------------------
    // Line signals
    // ---------------------------------------------------------------

    /// A reveal clock tick.
    pub fn tick(&mut self) -> Phase {
        if self.phase != Phase::Typing {
            return self.phase;
        }
        match self.advancer.tick() {
            TickOutcome::Continue => self.clock.schedule_tick(self.config.type_speed),
            TickOutcome::Complete => self.phase = Phase::Ready,
            TickOutcome::Ignored => {}
        }
        self.phase
    }

    /// The advance/skip input. While typing it only completes the reveal;
    /// once the line is fully shown it leaves the line.
    pub fn advance(&mut self) -> Phase {
        if !matches!(self.phase, Phase::Typing | Phase::Ready) {
            return self.phase;
        }
        match self.advancer.signal() {
            Gate::Revealed => {
                self.clock.cancel();
                self.phase = Phase::Ready;
                self.phase
            }
            Gate::Advance => self.leave_line(),
            Gate::Ignored => self.phase,
        }
    }

    /// Complete the reveal without ever leaving the line.
    pub fn skip(&mut self) -> Phase {
        if self.phase == Phase::Typing && self.advancer.skip() {
            self.clock.cancel();
            self.phase = Phase::Ready;
        }
        self.phase
    }

    // ---------------------------------------------------------------
    // Choice signals
    // ---------------------------------------------------------------

    /// Select option `index` of the choice identified by `ticket`.
    ///
    /// Selections that don't match the active choice are ignored. A
    /// dangling option target aborts the run without mutating state.
    pub fn select(&mut self, ticket: ChoiceTicket, index: usize) -> Result<Phase, EngineError> {
        if self.phase != Phase::Choosing {
            warn!(option = index, "selection ignored: no choice is active");
            return Ok(self.phase);
        }
        match self
            .choices
            .resolve(ticket, index, &self.content, &mut self.state)
        {
            Ok(Resolution::Transition(next)) => {
                self.selection.dismiss();
                let phase = self.enter_scene(&next, EnterOptions::from_start())?;
                self.persist();
                Ok(phase)
            }
            Ok(Resolution::Continue) => {
                self.selection.dismiss();
                let len = self.current_scene_len()?;
                if self.state.line_index() >= len {
                    self.state.set_line(len - 1);
                    self.persist();
                    warn!(scene = ?self.state.scene_id(), "choice ran past the end of the scene");
                    return Ok(self.end_run(RunEnd::Exhausted));
                }
                self.persist();
                Ok(self.begin_current_line())
            }
            Err(ChoiceError::Content(e)) => {
                error!(error = %e, "choice targets missing content, aborting run");
                self.end_run(RunEnd::Aborted);
                Err(e.into())
            }
            Err(e) => {
                warn!(error = %e, "selection ignored");
                Ok(self.phase)
            }
        }
    }

    /// Dismiss the selection UI. The choice stays unresolved and is shown
    /// again; nothing is mutated.
    pub fn cancel_choice(&mut self) -> Phase {
        if self.phase != Phase::Choosing {
            return self.phase;
        }
        self.selection.dismiss();
        if let Some(view) = self.choices.view() {
            self.selection.present(&view);
        }
        self.phase
    }

    // ---------------------------------------------------------------
    // Dev hooks
    // ---------------------------------------------------------------

    /// Enter `scene` at line 0 and persist.
    pub fn jump_to(&mut self, scene: &SceneId) -> Result<Phase, EngineError> {
        let phase = self.enter_scene(scene, EnterOptions::from_start())?;
        self.persist();
        Ok(phase)
    }

    /// Move to the last line of the current (or start) scene and persist.
    pub fn skip_to_end(&mut self) -> Result<Phase, EngineError> {
        let id = self
            .state
            .scene_id()
            .cloned()
            .unwrap_or_else(|| self.config.start_scene.clone());
        let len = self.content.get_scene(&id)?.lines.len();
        self.state.set_position(id.clone(), len - 1);
        let phase = self.enter_scene(&id, EnterOptions::resume())?;
        self.persist();
        Ok(phase)
    }

    // ---------------------------------------------------------------
    // Read-only views
    // ---------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &NarrativeState {
        &self.state
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn routes(&self) -> &[Route] {
        self.content.routes()
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        self.state
            .scene_id()
            .and_then(|id| self.content.get_scene(id).ok())
    }

    /// Speaker of the line being shown; `None` hides the name UI.
    pub fn speaker(&self) -> Option<&str> {
        match self.phase {
            Phase::Typing | Phase::Ready => self.advancer.speaker(),
            _ => None,
        }
    }

    pub fn visible_text(&self) -> String {
        self.advancer.visible_text()
    }

    pub fn full_text(&self) -> String {
        self.advancer.full_text()
    }

    pub fn line_phase(&self) -> LinePhase {
        self.advancer.phase()
    }

    /// Delay before the next reveal tick, while typing.
    pub fn pending_tick(&self) -> Option<u32> {
        (self.phase == Phase::Typing).then_some(self.config.type_speed)
    }

    pub fn pending_choice(&self) -> Option<ChoiceView> {
        if self.phase != Phase::Choosing {
            return None;
        }
        self.choices.view()
    }

    pub fn last_run_end(&self) -> Option<RunEnd> {
        self.last_end
    }

    /// The save record of the current state as pretty JSON.
    pub fn snapshot_json(&self) -> Option<String> {
        let record = self.state.to_record()?;
        serde_json::to_string_pretty(&record).ok()
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn reset_progress(&mut self) {
        self.cancel_suspensions();
        if let Err(e) = save::clear_save(self.store.as_mut(), &self.config.save_key) {
            warn!(error = %e, "failed to clear save");
        }
        self.state = NarrativeState::new();
    }

    /// Present the line at the current position.
    fn begin_current_line(&mut self) -> Phase {
        let Some(id) = self.state.scene_id().cloned() else {
            return self.end_run(RunEnd::Aborted);
        };
        let scene = match self.content.get_scene(&id) {
            Ok(scene) => scene,
            Err(e) => {
                error!(error = %e, "current scene is missing");
                return self.end_run(RunEnd::Aborted);
            }
        };

        match scene.lines.get(self.state.line_index()) {
            Some(Line::Dialogue(dialogue)) => {
                match self.advancer.begin_line(dialogue, &self.state) {
                    LinePhase::Typing => {
                        self.clock.schedule_tick(self.config.type_speed);
                        self.phase = Phase::Typing;
                    }
                    _ => self.phase = Phase::Ready,
                }
            }
            Some(Line::Choice(choice)) => {
                let view = self.choices.present(choice);
                self.selection.present(&view);
                self.phase = Phase::Choosing;
            }
            None => {
                warn!(scene = %id, "scene ran out of lines without a terminal line");
                return self.end_run(RunEnd::Exhausted);
            }
        }
        self.phase
    }

    /// The current line was acknowledged.
    fn leave_line(&mut self) -> Phase {
        if self.advancer.is_terminal() {
            return self.end_run(RunEnd::Terminal);
        }
        let len = match self.current_scene_len() {
            Ok(len) => len,
            Err(e) => {
                error!(error = %e, "current scene is missing");
                return self.end_run(RunEnd::Aborted);
            }
        };
        let next = self.state.line_index() + 1;
        if next >= len {
            warn!(scene = ?self.state.scene_id(), "scene ran out of lines without a terminal line");
            return self.end_run(RunEnd::Exhausted);
        }
        self.state.set_line(next);
        self.persist();
        self.begin_current_line()
    }

    fn current_scene_len(&self) -> Result<usize, ContentError> {
        match self.state.scene_id() {
            Some(id) => Ok(self.content.get_scene(id)?.lines.len()),
            None => Err(ContentError::SceneNotFound(SceneId::new(""))),
        }
    }

    fn cancel_suspensions(&mut self) {
        self.advancer.abandon();
        self.clock.cancel();
        if self.choices.is_pending() {
            self.choices.abandon();
            self.selection.dismiss();
        }
    }

    fn end_run(&mut self, reason: RunEnd) -> Phase {
        self.cancel_suspensions();
        self.phase = Phase::Title;
        self.last_end = Some(reason);
        info!(?reason, scene = ?self.state.scene_id(), "run ended");
        self.phase
    }

    /// Write failures are logged; the in-memory state stays authoritative.
    fn persist(&mut self) {
        if let Err(e) = save::write_save(self.store.as_mut(), &self.config.save_key, &self.state) {
            warn!(error = %e, "failed to persist narrative state");
        }
    }
}
