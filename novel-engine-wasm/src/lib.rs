//! WASM bindings for novel-engine — powers the browser demo.

use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use novel_engine::core::choice::ChoiceTicket;
use novel_engine::core::content::ContentStore;
use novel_engine::core::engine::{NovelEngine, Phase, RunEnd};
use novel_engine::core::host::DeferredTransition;
use novel_engine::core::store::{MemoryStore, PersistentStore, StoreError};
use novel_engine::schema::scene::SceneId;
use novel_engine::schema::state::SaveRecord;

// ---------------------------------------------------------------------------
// Embedded demo content — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const DEMO_STORY: &str = include_str!("../../content/demo/story.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct LineInfo {
    phase: &'static str,
    speaker: Option<String>,
    visible: String,
    full: String,
}

#[derive(serde::Serialize)]
struct SceneInfo {
    id: String,
    background: Option<String>,
    portrait: Option<String>,
    music: Option<String>,
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Title => "title",
        Phase::Transitioning => "transitioning",
        Phase::Typing => "typing",
        Phase::Ready => "ready",
        Phase::Choosing => "choosing",
    }
}

fn run_end_label(end: RunEnd) -> &'static str {
    match end {
        RunEnd::Terminal => "terminal",
        RunEnd::Exhausted => "exhausted",
        RunEnd::Abandoned => "abandoned",
        RunEnd::Aborted => "aborted",
    }
}

/// Tickets cross the boundary as JS numbers; anything that is not a
/// whole, non-negative number cannot be one we issued.
fn parse_ticket(raw: f64) -> Option<ChoiceTicket> {
    if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 || raw > u64::MAX as f64 {
        return None;
    }
    serde_json::from_value(serde_json::json!(raw as u64)).ok()
}

/// Memory store the page can read and seed through `export_save` and
/// `import_save`, so the record can live in `localStorage`.
#[derive(Clone, Default)]
struct PageStore(Rc<RefCell<MemoryStore>>);

impl PersistentStore for PageStore {
    fn put(&mut self, key: &str, record: &str) -> Result<(), StoreError> {
        self.0.borrow_mut().put(key, record)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.0.borrow().get(key)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.0.borrow_mut().delete(key)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct NovelDemo {
    engine: NovelEngine,
    store: PageStore,
}

#[wasm_bindgen]
impl NovelDemo {
    /// Create a demo over the embedded story. Scene transitions wait for
    /// the page to call `transition_complete` after its wipe animation.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<NovelDemo, JsError> {
        let content = ContentStore::parse_ron(data::DEMO_STORY)
            .map_err(|e| JsError::new(&format!("Content parse error: {e}")))?;
        let store = PageStore::default();
        let engine = NovelEngine::builder()
            .with_content(content)
            .with_store(store.clone())
            .with_transition(DeferredTransition)
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;
        Ok(NovelDemo { engine, store })
    }

    // --- title ---

    pub fn new_game(&mut self) -> Result<String, JsError> {
        let phase = self.engine.new_game().map_err(|e| JsError::new(&e.to_string()))?;
        Ok(phase_label(phase).to_string())
    }

    pub fn continue_game(&mut self) -> Result<String, JsError> {
        let phase = self
            .engine
            .continue_game()
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(phase_label(phase).to_string())
    }

    pub fn start_route(&mut self, route_id: &str) -> Result<String, JsError> {
        let phase = self
            .engine
            .start_route(route_id)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(phase_label(phase).to_string())
    }

    pub fn return_to_title(&mut self) -> String {
        phase_label(self.engine.return_to_title()).to_string()
    }

    pub fn has_save(&self) -> bool {
        self.engine.has_save()
    }

    pub fn clear_save(&mut self) -> Result<(), JsError> {
        self.engine
            .clear_save()
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// The raw save record, for the page to keep in browser storage.
    pub fn export_save(&self) -> Option<String> {
        let key = self.engine.config().save_key.clone();
        self.store.get(&key).ok().flatten()
    }

    /// Seed the store with a record previously returned by `export_save`.
    pub fn import_save(&mut self, json: &str) -> Result<(), JsError> {
        serde_json::from_str::<SaveRecord>(json)
            .map_err(|e| JsError::new(&format!("Invalid save record: {e}")))?;
        let key = self.engine.config().save_key.clone();
        self.store
            .put(&key, json)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    // --- signals ---

    pub fn transition_complete(&mut self) -> String {
        phase_label(self.engine.transition_complete()).to_string()
    }

    pub fn tick(&mut self) -> String {
        phase_label(self.engine.tick()).to_string()
    }

    pub fn advance(&mut self) -> String {
        phase_label(self.engine.advance()).to_string()
    }

    pub fn skip(&mut self) -> String {
        phase_label(self.engine.skip()).to_string()
    }

    /// Select `index` of the choice whose `ticket` came from `choice_json`.
    pub fn select(&mut self, ticket: f64, index: usize) -> Result<String, JsError> {
        let ticket = parse_ticket(ticket)
            .ok_or_else(|| JsError::new(&format!("Invalid choice ticket: {ticket}")))?;
        let phase = self
            .engine
            .select(ticket, index)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(phase_label(phase).to_string())
    }

    pub fn cancel_choice(&mut self) -> String {
        phase_label(self.engine.cancel_choice()).to_string()
    }

    // --- dev hooks ---

    pub fn jump_to(&mut self, scene: &str) -> Result<String, JsError> {
        let phase = self
            .engine
            .jump_to(&SceneId::new(scene))
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(phase_label(phase).to_string())
    }

    pub fn skip_to_end(&mut self) -> Result<String, JsError> {
        let phase = self
            .engine
            .skip_to_end()
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(phase_label(phase).to_string())
    }

    // --- views ---

    pub fn phase(&self) -> String {
        phase_label(self.engine.phase()).to_string()
    }

    /// Milliseconds until the page should call `tick`, while typing.
    pub fn pending_tick(&self) -> Option<u32> {
        self.engine.pending_tick()
    }

    pub fn last_run_end(&self) -> Option<String> {
        self.engine
            .last_run_end()
            .map(|end| run_end_label(end).to_string())
    }

    pub fn line_json(&self) -> Result<String, JsError> {
        let info = LineInfo {
            phase: phase_label(self.engine.phase()),
            speaker: self.engine.speaker().map(str::to_string),
            visible: self.engine.visible_text(),
            full: self.engine.full_text(),
        };
        serde_json::to_string(&info).map_err(|e| JsError::new(&e.to_string()))
    }

    /// `null` when no choice is open.
    pub fn choice_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.engine.pending_choice())
            .map_err(|e| JsError::new(&e.to_string()))
    }

    pub fn scene_json(&self) -> Result<String, JsError> {
        let info = self.engine.current_scene().map(|scene| SceneInfo {
            id: scene.id.to_string(),
            background: scene.resources.background.clone(),
            portrait: scene.resources.portrait.clone(),
            music: scene.resources.music.clone(),
        });
        serde_json::to_string(&info).map_err(|e| JsError::new(&e.to_string()))
    }

    pub fn routes_json(&self) -> Result<String, JsError> {
        serde_json::to_string(self.engine.routes()).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Pretty save record of the current state, or `null`.
    pub fn state_json(&self) -> String {
        self.engine
            .snapshot_json()
            .unwrap_or_else(|| "null".to_string())
    }
}
