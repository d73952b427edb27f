use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::state::NarrativeState;

/// Newtype wrapper for scene identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A player-decision value stored under a flag name.
///
/// Serialized untagged so persisted records read as plain JSON primitives
/// (`true`, `2`, `"park"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FlagValue {
    /// Truthiness used by reactive text: `false`, `0`, `NaN` and the empty
    /// string are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for FlagValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for FlagValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for FlagValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Opaque presentation handles tied to a scene. The engine never loads
/// or interprets them; they are handed to the transition effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneResources {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub portrait: Option<String>,
    #[serde(default)]
    pub music: Option<String>,
}

/// A computed dialogue text: a pure function of the narrative state.
#[derive(Clone)]
pub struct ComputedText(Arc<dyn Fn(&NarrativeState) -> String + Send + Sync>);

impl fmt::Debug for ComputedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComputedText(..)")
    }
}

/// Dialogue text, possibly reactive to earlier choices.
///
/// Resolved once per visit of the line and never cached across visits.
#[derive(Debug, Clone)]
pub enum LineText {
    /// Fixed text.
    Literal(String),
    /// Picks `set` when `flag` is truthy, `unset` otherwise (including
    /// when the flag was never set).
    FlagSwitch {
        flag: String,
        set: String,
        unset: String,
    },
    /// Arbitrary closure over the narrative state.
    Computed(ComputedText),
}

impl LineText {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&NarrativeState) -> String + Send + Sync + 'static,
    {
        Self::Computed(ComputedText(Arc::new(f)))
    }

    /// Evaluate against the current state.
    pub fn resolve(&self, state: &NarrativeState) -> String {
        match self {
            Self::Literal(text) => text.clone(),
            Self::FlagSwitch { flag, set, unset } => {
                if state.is_flag_set(flag) {
                    set.clone()
                } else {
                    unset.clone()
                }
            }
            Self::Computed(ComputedText(f)) => f(state),
        }
    }
}

impl From<&str> for LineText {
    fn from(text: &str) -> Self {
        Self::Literal(text.to_string())
    }
}

impl From<String> for LineText {
    fn from(text: String) -> Self {
        Self::Literal(text)
    }
}

/// One spoken or narrated line.
#[derive(Debug, Clone)]
pub struct Dialogue {
    /// No speaker means the name UI is hidden; no default is substituted.
    pub speaker: Option<String>,
    pub text: LineText,
    /// Reaching and acknowledging this line ends the run.
    pub terminal: bool,
}

/// One selectable answer of a choice point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceOption {
    pub text: String,
    /// Merged into the state's flags on selection.
    pub set: BTreeMap<String, FlagValue>,
    /// Scene to transition to; `None` continues with the next line.
    pub next: Option<SceneId>,
}

impl ChoiceOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            set: BTreeMap::new(),
            next: None,
        }
    }

    pub fn set_flag(mut self, name: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.set.insert(name.into(), value.into());
        self
    }

    pub fn next(mut self, scene: impl Into<SceneId>) -> Self {
        self.next = Some(scene.into());
        self
    }
}

/// A branching point.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub prompt: String,
    pub options: Vec<ChoiceOption>,
}

/// A single entry in a scene, addressed by its index.
#[derive(Debug, Clone)]
pub enum Line {
    Dialogue(Dialogue),
    Choice(Choice),
}

impl Line {
    pub fn say(speaker: Option<&str>, text: impl Into<LineText>) -> Self {
        Self::Dialogue(Dialogue {
            speaker: speaker.map(str::to_string),
            text: text.into(),
            terminal: false,
        })
    }

    pub fn terminal(speaker: Option<&str>, text: impl Into<LineText>) -> Self {
        Self::Dialogue(Dialogue {
            speaker: speaker.map(str::to_string),
            text: text.into(),
            terminal: true,
        })
    }

    pub fn choice(prompt: impl Into<String>, options: Vec<ChoiceOption>) -> Self {
        Self::Choice(Choice {
            prompt: prompt.into(),
            options,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dialogue(d) if d.terminal)
    }
}

/// A named, ordered sequence of lines. Immutable once authored.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: SceneId,
    pub lines: Vec<Line>,
    pub resources: SceneResources,
}

impl Scene {
    pub fn new(id: impl Into<SceneId>, lines: Vec<Line>) -> Self {
        Self {
            id: id.into(),
            lines,
            resources: SceneResources::default(),
        }
    }

    pub fn with_resources(mut self, resources: SceneResources) -> Self {
        self.resources = resources;
        self
    }

    /// Scene ids referenced by any option of any choice, with their
    /// `(line, option)` position.
    pub fn targets(&self) -> impl Iterator<Item = (usize, usize, &SceneId)> {
        self.lines.iter().enumerate().flat_map(|(line_idx, line)| {
            let options: &[ChoiceOption] = match line {
                Line::Choice(choice) => &choice.options,
                Line::Dialogue(_) => &[],
            };
            options
                .iter()
                .enumerate()
                .filter_map(move |(opt_idx, opt)| opt.next.as_ref().map(|n| (line_idx, opt_idx, n)))
        })
    }
}

/// An entry point offered on the title screen's story select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_scene: SceneId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_truthiness() {
        assert!(FlagValue::Bool(true).is_truthy());
        assert!(!FlagValue::Bool(false).is_truthy());
        assert!(!FlagValue::Number(0.0).is_truthy());
        assert!(!FlagValue::Number(f64::NAN).is_truthy());
        assert!(FlagValue::Number(-1.0).is_truthy());
        assert!(!FlagValue::Text(String::new()).is_truthy());
        assert!(FlagValue::Text("park".to_string()).is_truthy());
    }

    #[test]
    fn flag_values_serialize_as_plain_json() {
        let json = serde_json::to_string(&vec![
            FlagValue::Bool(true),
            FlagValue::Number(2.0),
            FlagValue::Text("x".to_string()),
        ])
        .unwrap();
        assert_eq!(json, r#"[true,2.0,"x"]"#);

        let back: Vec<FlagValue> = serde_json::from_str("[false, 3, \"y\"]").unwrap();
        assert_eq!(
            back,
            vec![
                FlagValue::Bool(false),
                FlagValue::Number(3.0),
                FlagValue::Text("y".to_string()),
            ]
        );
    }

    #[test]
    fn flag_switch_reads_state() {
        let text = LineText::FlagSwitch {
            flag: "tookPark".to_string(),
            set: "Through the park again?".to_string(),
            unset: "Stuck to the plan, huh?".to_string(),
        };
        let mut state = NarrativeState::new();
        assert_eq!(text.resolve(&state), "Stuck to the plan, huh?");

        state.merge_flags(&BTreeMap::from([("tookPark".to_string(), FlagValue::Bool(true))]));
        assert_eq!(text.resolve(&state), "Through the park again?");
    }

    #[test]
    fn computed_text_is_evaluated_on_every_resolve() {
        let text = LineText::computed(|s| format!("visited {}", s.visited().len()));
        let mut state = NarrativeState::new();
        assert_eq!(text.resolve(&state), "visited 0");
        state.mark_visited(SceneId::from("a"));
        assert_eq!(text.resolve(&state), "visited 1");
    }

    #[test]
    fn scene_targets_lists_option_destinations() {
        let scene = Scene::new(
            "s",
            vec![
                Line::say(None, "hi"),
                Line::choice(
                    "go?",
                    vec![
                        ChoiceOption::new("stay"),
                        ChoiceOption::new("leave").next("t"),
                    ],
                ),
            ],
        );
        let targets: Vec<_> = scene.targets().collect();
        assert_eq!(targets, vec![(1, 1, &SceneId::from("t"))]);
    }

    #[test]
    fn terminal_marker() {
        assert!(Line::terminal(Some("System"), "The end.").is_terminal());
        assert!(!Line::say(Some("System"), "Not yet.").is_terminal());
        assert!(!Line::choice("?", vec![]).is_terminal());
    }
}
