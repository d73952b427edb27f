use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::scene::{FlagValue, SceneId};

/// The player's progress: narrative position, accumulated flags and the
/// scenes seen so far.
///
/// Only the engine driving a run mutates it; everything else receives a
/// shared reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrativeState {
    scene: Option<SceneId>,
    line: usize,
    flags: BTreeMap<String, FlagValue>,
    visited: FxHashSet<SceneId>,
}

impl NarrativeState {
    /// An empty "new game" state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene_id(&self) -> Option<&SceneId> {
        self.scene.as_ref()
    }

    pub fn line_index(&self) -> usize {
        self.line
    }

    pub fn flags(&self) -> &BTreeMap<String, FlagValue> {
        &self.flags
    }

    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    /// True when the flag exists and is truthy.
    pub fn is_flag_set(&self, name: &str) -> bool {
        self.flags.get(name).is_some_and(FlagValue::is_truthy)
    }

    pub fn visited(&self) -> &FxHashSet<SceneId> {
        &self.visited
    }

    pub fn has_visited(&self, scene: &SceneId) -> bool {
        self.visited.contains(scene)
    }

    pub(crate) fn set_position(&mut self, scene: SceneId, line: usize) {
        self.scene = Some(scene);
        self.line = line;
    }

    pub(crate) fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    /// Existing keys are overwritten, others untouched.
    pub(crate) fn merge_flags(&mut self, set: &BTreeMap<String, FlagValue>) {
        for (name, value) in set {
            self.flags.insert(name.clone(), value.clone());
        }
    }

    pub(crate) fn mark_visited(&mut self, scene: SceneId) {
        self.visited.insert(scene);
    }

    /// Flat persisted form. `None` until a scene has been entered.
    pub fn to_record(&self) -> Option<SaveRecord> {
        let scene_id = self.scene.clone()?;
        let mut visited_scenes: Vec<SceneId> = self.visited.iter().cloned().collect();
        visited_scenes.sort();
        Some(SaveRecord {
            scene_id,
            line_index: self.line,
            flags: self.flags.clone(),
            visited_scenes,
        })
    }

    pub fn from_record(record: SaveRecord) -> Self {
        Self {
            scene: Some(record.scene_id),
            line: record.line_index,
            flags: record.flags,
            visited: record.visited_scenes.into_iter().collect(),
        }
    }
}

/// The persisted save record, written whole on every committed step.
///
/// `seenScenes` is accepted as an alias of `visitedScenes` so saves
/// from the browser build keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    pub scene_id: SceneId,
    #[serde(default)]
    pub line_index: usize,
    #[serde(default)]
    pub flags: BTreeMap<String, FlagValue>,
    #[serde(default, alias = "seenScenes")]
    pub visited_scenes: Vec<SceneId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> NarrativeState {
        let mut state = NarrativeState::new();
        state.set_position(SceneId::from("scene2"), 3);
        state.merge_flags(&BTreeMap::from([
            ("tookPark".to_string(), FlagValue::Bool(true)),
            ("score".to_string(), FlagValue::Number(4.0)),
        ]));
        state.mark_visited(SceneId::from("scene2"));
        state.mark_visited(SceneId::from("scene1"));
        state
    }

    #[test]
    fn new_state_has_no_record() {
        assert!(NarrativeState::new().to_record().is_none());
    }

    #[test]
    fn record_is_flat_camel_case_json() {
        let record = sample_state().to_record().unwrap();
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sceneId"], "scene2");
        assert_eq!(json["lineIndex"], 3);
        assert_eq!(json["flags"]["tookPark"], true);
        assert_eq!(json["visitedScenes"], serde_json::json!(["scene1", "scene2"]));
    }

    #[test]
    fn record_round_trip_is_structurally_equal() {
        let record = sample_state().to_record().unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let loaded: SaveRecord = serde_json::from_str(&json).unwrap();
        let again = NarrativeState::from_record(loaded).to_record().unwrap();
        assert_eq!(again, record);
    }

    #[test]
    fn legacy_record_defaults_missing_fields() {
        let record: SaveRecord =
            serde_json::from_str(r#"{"sceneId":"scene1","seenScenes":["scene1"]}"#).unwrap();
        assert_eq!(record.line_index, 0);
        assert!(record.flags.is_empty());
        assert_eq!(record.visited_scenes, vec![SceneId::from("scene1")]);
    }

    #[test]
    fn merge_keeps_existing_flags() {
        let mut state = NarrativeState::new();
        state.merge_flags(&BTreeMap::from([("a".to_string(), FlagValue::Number(1.0))]));
        state.merge_flags(&BTreeMap::from([("b".to_string(), FlagValue::Number(2.0))]));
        assert_eq!(state.flag("a"), Some(&FlagValue::Number(1.0)));
        assert_eq!(state.flag("b"), Some(&FlagValue::Number(2.0)));

        state.merge_flags(&BTreeMap::from([("a".to_string(), FlagValue::Bool(false))]));
        assert_eq!(state.flag("a"), Some(&FlagValue::Bool(false)));
        assert!(!state.is_flag_set("a"));
    }
}
