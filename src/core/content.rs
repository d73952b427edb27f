/// Content store — the immutable scene registry, its RON authoring
/// format, and authoring-time validation.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use thiserror::Error;

use crate::schema::scene::{
    Choice, ChoiceOption, Dialogue, FlagValue, Line, LineText, Route, Scene, SceneId,
    SceneResources,
};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("scene not found: {0}")]
    SceneNotFound(SceneId),
    #[error("scene '{0}' has no lines")]
    EmptyScene(SceneId),
    #[error("choice at {scene}:{line} has no options")]
    EmptyChoice { scene: SceneId, line: usize },
    #[error("option {option} of choice at {scene}:{line} targets unknown scene '{target}'")]
    DanglingTarget {
        scene: SceneId,
        line: usize,
        option: usize,
        target: SceneId,
    },
    #[error("scene '{0}' is defined more than once")]
    DuplicateScene(SceneId),
    #[error("route '{route}' starts at unknown scene '{scene}'")]
    UnknownRouteStart { route: String, scene: SceneId },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Result of `ContentStore::lint`.
#[derive(Debug, Default)]
pub struct LintReport {
    pub errors: Vec<ContentError>,
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Read-only registry of scenes keyed by id, plus the story-select routes.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    scenes: FxHashMap<SceneId, Scene>,
    routes: Vec<Route>,
}

// RON authoring shapes. Dialogue text may be a closure at runtime, which
// has no serialized form, so authored files go through these.

#[derive(Debug, Deserialize)]
struct RonContent {
    #[serde(default)]
    routes: Vec<Route>,
    scenes: BTreeMap<String, RonScene>,
}

#[derive(Debug, Deserialize)]
struct RonScene {
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    portrait: Option<String>,
    #[serde(default)]
    music: Option<String>,
    lines: Vec<RonLine>,
}

#[derive(Debug, Deserialize)]
enum RonLine {
    Say {
        #[serde(default)]
        speaker: Option<String>,
        text: String,
        #[serde(default)]
        end: bool,
    },
    SayIf {
        #[serde(default)]
        speaker: Option<String>,
        flag: String,
        set: String,
        unset: String,
        #[serde(default)]
        end: bool,
    },
    Choice {
        prompt: String,
        options: Vec<RonOption>,
    },
}

#[derive(Debug, Deserialize)]
struct RonOption {
    text: String,
    #[serde(default)]
    set: BTreeMap<String, FlagValue>,
    #[serde(default)]
    next: Option<String>,
}

impl From<RonLine> for Line {
    fn from(line: RonLine) -> Self {
        match line {
            RonLine::Say { speaker, text, end } => Line::Dialogue(Dialogue {
                speaker,
                text: LineText::Literal(text),
                terminal: end,
            }),
            RonLine::SayIf {
                speaker,
                flag,
                set,
                unset,
                end,
            } => Line::Dialogue(Dialogue {
                speaker,
                text: LineText::FlagSwitch { flag, set, unset },
                terminal: end,
            }),
            RonLine::Choice { prompt, options } => Line::Choice(Choice {
                prompt,
                options: options
                    .into_iter()
                    .map(|o| ChoiceOption {
                        text: o.text,
                        set: o.set,
                        next: o.next.map(SceneId),
                    })
                    .collect(),
            }),
        }
    }
}

impl ContentStore {
    /// Build a store from scenes and routes.
    ///
    /// Checks structure only (unique ids, non-empty scenes and choices).
    /// Option targets and route starts are resolved lazily when the engine
    /// follows them; call `validate` to check them up front.
    pub fn from_scenes(scenes: Vec<Scene>, routes: Vec<Route>) -> Result<ContentStore, ContentError> {
        let mut map = FxHashMap::default();
        for scene in scenes {
            if scene.lines.is_empty() {
                return Err(ContentError::EmptyScene(scene.id));
            }
            for (line, entry) in scene.lines.iter().enumerate() {
                if let Line::Choice(choice) = entry {
                    if choice.options.is_empty() {
                        return Err(ContentError::EmptyChoice {
                            scene: scene.id.clone(),
                            line,
                        });
                    }
                }
            }
            if map.contains_key(&scene.id) {
                return Err(ContentError::DuplicateScene(scene.id));
            }
            map.insert(scene.id.clone(), scene);
        }
        Ok(ContentStore {
            scenes: map,
            routes,
        })
    }

    /// Load and fully validate content from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<ContentStore, ContentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and fully validate content from a RON string.
    pub fn parse_ron(input: &str) -> Result<ContentStore, ContentError> {
        let store = Self::parse_ron_unchecked(input)?;
        store.validate()?;
        Ok(store)
    }

    /// Parse without reference validation, for tooling that wants every
    /// problem reported rather than the first.
    pub fn parse_ron_unchecked(input: &str) -> Result<ContentStore, ContentError> {
        let raw: RonContent = ron::from_str(input)?;
        let scenes = raw
            .scenes
            .into_iter()
            .map(|(id, scene)| Scene {
                id: SceneId(id),
                lines: scene.lines.into_iter().map(Line::from).collect(),
                resources: SceneResources {
                    background: scene.background,
                    portrait: scene.portrait,
                    music: scene.music,
                },
            })
            .collect();
        Self::from_scenes(scenes, raw.routes)
    }

    /// Merge another store into this one. Scenes from `other` replace
    /// scenes with the same id; routes are appended.
    pub fn merge(&mut self, other: ContentStore) {
        for (id, scene) in other.scenes {
            self.scenes.insert(id, scene);
        }
        self.routes.extend(other.routes);
    }

    pub fn get_scene(&self, id: &SceneId) -> Result<&Scene, ContentError> {
        self.scenes
            .get(id)
            .ok_or_else(|| ContentError::SceneNotFound(id.clone()))
    }

    pub fn contains(&self, id: &SceneId) -> bool {
        self.scenes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Scene ids in sorted order.
    pub fn scene_ids(&self) -> Vec<&SceneId> {
        let mut ids: Vec<&SceneId> = self.scenes.keys().collect();
        ids.sort();
        ids
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, id: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }

    /// Fail on the first dangling option target or route start.
    pub fn validate(&self) -> Result<(), ContentError> {
        match self.reference_errors().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn reference_errors(&self) -> Vec<ContentError> {
        let mut errors = Vec::new();
        for id in self.scene_ids() {
            let scene = &self.scenes[id];
            for (line, option, target) in scene.targets() {
                if !self.scenes.contains_key(target) {
                    errors.push(ContentError::DanglingTarget {
                        scene: id.clone(),
                        line,
                        option,
                        target: target.clone(),
                    });
                }
            }
        }
        for route in &self.routes {
            if !self.scenes.contains_key(&route.start_scene) {
                errors.push(ContentError::UnknownRouteStart {
                    route: route.id.clone(),
                    scene: route.start_scene.clone(),
                });
            }
        }
        errors
    }

    /// Every reference error plus authoring warnings.
    ///
    /// `entry` is the scene "new game" starts at; it counts as reachable
    /// alongside every route start.
    pub fn lint(&self, entry: Option<&SceneId>) -> LintReport {
        let mut report = LintReport {
            errors: self.reference_errors(),
            warnings: Vec::new(),
        };

        let reachable = self.reachable_from(entry);
        for id in self.scene_ids() {
            if !reachable.contains(id) {
                report
                    .warnings
                    .push(format!("Scene '{}' is unreachable from any route or the start scene", id));
            }
            if self.can_run_out(&self.scenes[id]) {
                report.warnings.push(format!(
                    "Scene '{}' can run out of lines without a terminal line; the run will end there",
                    id
                ));
            }
        }
        report
    }

    fn reachable_from(&self, entry: Option<&SceneId>) -> FxHashSet<SceneId> {
        let mut seen = FxHashSet::default();
        let mut queue: VecDeque<&SceneId> = self.routes.iter().map(|r| &r.start_scene).collect();
        queue.extend(entry);

        while let Some(id) = queue.pop_front() {
            let Some(scene) = self.scenes.get(id) else {
                continue;
            };
            if !seen.insert(id.clone()) {
                continue;
            }
            queue.extend(scene.targets().map(|(_, _, target)| target));
        }
        seen
    }

    /// True when some path through the scene walks past its last line:
    /// the last line is a plain line, or a choice with an option that
    /// does not redirect.
    fn can_run_out(&self, scene: &Scene) -> bool {
        if scene.lines.iter().any(Line::is_terminal) {
            return false;
        }
        match scene.lines.last() {
            Some(Line::Choice(choice)) => choice.options.iter().any(|o| o.next.is_none()),
            Some(Line::Dialogue(_)) | None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SCENES: &str = r#"
(
    routes: [
        (id: "route_morning", title: "Morning Routine", start_scene: "scene1"),
    ],
    scenes: {
        "scene1": (
            background: Some("bg_home.png"),
            lines: [
                Say(speaker: Some("Narrator"), text: "A soft breeze."),
                Choice(prompt: "What do you do?", options: [
                    (text: "Park", set: {"tookPark": true}, next: Some("scene2")),
                    (text: "Usual", set: {"tookPark": false}, next: Some("scene2")),
                ]),
            ],
        ),
        "scene2": (
            lines: [
                SayIf(speaker: Some("Taylor"), flag: "tookPark", set: "Park again?", unset: "Reliable."),
                Say(speaker: Some("System"), text: "Done.", end: true),
            ],
        ),
    },
)
"#;

    #[test]
    fn parse_two_scenes() {
        let store = ContentStore::parse_ron(TWO_SCENES).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.routes().len(), 1);

        let scene1 = store.get_scene(&SceneId::from("scene1")).unwrap();
        assert_eq!(scene1.resources.background.as_deref(), Some("bg_home.png"));
        assert_eq!(scene1.lines.len(), 2);
        match &scene1.lines[1] {
            Line::Choice(choice) => {
                assert_eq!(choice.options.len(), 2);
                assert_eq!(choice.options[0].set["tookPark"], FlagValue::Bool(true));
                assert_eq!(choice.options[0].next, Some(SceneId::from("scene2")));
            }
            other => panic!("expected choice, got {:?}", other),
        }

        let scene2 = store.get_scene(&SceneId::from("scene2")).unwrap();
        assert!(scene2.lines[1].is_terminal());
        assert!(matches!(
            &scene2.lines[0],
            Line::Dialogue(Dialogue { text: LineText::FlagSwitch { .. }, .. })
        ));
    }

    #[test]
    fn missing_scene_is_not_found() {
        let store = ContentStore::parse_ron(TWO_SCENES).unwrap();
        assert!(matches!(
            store.get_scene(&SceneId::from("nope")),
            Err(ContentError::SceneNotFound(_))
        ));
    }

    #[test]
    fn dangling_target_rejected_at_ron_load() {
        let input = r#"(scenes: {
            "a": (lines: [Choice(prompt: "?", options: [(text: "go", next: Some("missing"))])]),
        })"#;
        let err = ContentStore::parse_ron(input).unwrap_err();
        assert!(matches!(err, ContentError::DanglingTarget { line: 0, option: 0, .. }));

        // Unchecked parsing still yields a store.
        assert!(ContentStore::parse_ron_unchecked(input).is_ok());
    }

    #[test]
    fn empty_scene_rejected() {
        let err = ContentStore::from_scenes(vec![Scene::new("a", vec![])], vec![]).unwrap_err();
        assert!(matches!(err, ContentError::EmptyScene(_)));
    }

    #[test]
    fn empty_choice_rejected() {
        let err = ContentStore::from_scenes(vec![Scene::new("a", vec![Line::choice("?", vec![])])], vec![])
            .unwrap_err();
        assert!(matches!(err, ContentError::EmptyChoice { line: 0, .. }));
    }

    #[test]
    fn duplicate_scene_rejected() {
        let err = ContentStore::from_scenes(
            vec![
                Scene::new("a", vec![Line::say(None, "one")]),
                Scene::new("a", vec![Line::say(None, "two")]),
            ],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::DuplicateScene(_)));
    }

    #[test]
    fn unknown_route_start_fails_validation() {
        let store = ContentStore::from_scenes(
            vec![Scene::new("a", vec![Line::terminal(None, "end")])],
            vec![Route {
                id: "r".to_string(),
                title: "R".to_string(),
                description: String::new(),
                start_scene: SceneId::from("b"),
            }],
        )
        .unwrap();
        assert!(matches!(
            store.validate(),
            Err(ContentError::UnknownRouteStart { .. })
        ));
    }

    #[test]
    fn lint_flags_unreachable_and_open_ended_scenes() {
        let store = ContentStore::from_scenes(
            vec![
                Scene::new("start", vec![Line::terminal(None, "end")]),
                Scene::new("orphan", vec![Line::say(None, "nobody comes here")]),
            ],
            vec![],
        )
        .unwrap();
        let report = store.lint(Some(&SceneId::from("start")));
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().all(|w| w.contains("orphan")));
    }

    #[test]
    fn lint_clean_for_demo_shape() {
        let store = ContentStore::parse_ron(TWO_SCENES).unwrap();
        let report = store.lint(None);
        assert!(report.is_clean(), "{:?}", report);
    }

    #[test]
    fn merge_overrides_and_appends() {
        let mut base = ContentStore::parse_ron(TWO_SCENES).unwrap();
        let extra = ContentStore::from_scenes(
            vec![Scene::new("scene2", vec![Line::terminal(None, "replaced")])],
            vec![Route {
                id: "route_b".to_string(),
                title: "B".to_string(),
                description: String::new(),
                start_scene: SceneId::from("scene2"),
            }],
        )
        .unwrap();
        base.merge(extra);
        assert_eq!(base.len(), 2);
        assert_eq!(base.routes().len(), 2);
        assert_eq!(base.get_scene(&SceneId::from("scene2")).unwrap().lines.len(), 1);
    }
}
