/// Content loading, validation and lint integration tests.

use novel_engine::core::config::{ConfigError, EngineConfig};
use novel_engine::core::content::{ContentError, ContentStore};
use novel_engine::schema::scene::{Line, LineText, SceneId};
use std::path::Path;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(Path::new("tests/fixtures").join(name)).unwrap()
}

#[test]
fn demo_story_loads_and_lints_clean() {
    let store = ContentStore::load_from_ron(Path::new("content/demo/story.ron")).unwrap();
    assert_eq!(store.len(), 4);
    assert_eq!(
        store.scene_ids().iter().map(|id| id.as_str()).collect::<Vec<_>>(),
        vec!["fest1", "fest2", "scene1", "scene2"]
    );

    let report = store.lint(Some(&SceneId::from("scene1")));
    assert!(report.is_clean(), "unexpected lint: {:?}", report);
}

#[test]
fn demo_routes_keep_authored_order() {
    let store = ContentStore::load_from_ron(Path::new("content/demo/story.ron")).unwrap();
    let ids: Vec<&str> = store.routes().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["route_morning", "route_festival"]);

    let festival = store.route("route_festival").unwrap();
    assert_eq!(festival.title, "Festival Day");
    assert_eq!(festival.start_scene, SceneId::from("fest1"));
}

#[test]
fn demo_scene_carries_resources_and_reactive_line() {
    let store = ContentStore::load_from_ron(Path::new("content/demo/story.ron")).unwrap();
    let scene2 = store.get_scene(&SceneId::from("scene2")).unwrap();
    assert_eq!(
        scene2.resources.background.as_deref(),
        Some("assets/images/bg/bg_classroom.png")
    );
    assert_eq!(scene2.resources.music, None);

    match &scene2.lines[3] {
        Line::Dialogue(d) => {
            assert!(matches!(&d.text, LineText::FlagSwitch { flag, .. } if flag == "tookPark"));
        }
        other => panic!("expected a dialogue line, got {:?}", other),
    }
    assert!(scene2.lines.last().unwrap().is_terminal());
}

#[test]
fn dangling_fixture_is_rejected_on_load() {
    let err = ContentStore::parse_ron(&fixture("dangling.ron")).unwrap_err();
    match err {
        ContentError::DanglingTarget {
            scene,
            line,
            option,
            target,
        } => {
            assert_eq!(scene.as_str(), "scene1");
            assert_eq!(line, 0);
            assert_eq!(option, 0);
            assert_eq!(target.as_str(), "moon");
        }
        other => panic!("expected DanglingTarget, got {:?}", other),
    }
}

#[test]
fn unchecked_parse_defers_to_lint() {
    let store = ContentStore::parse_ron_unchecked(&fixture("dangling.ron")).unwrap();
    let report = store.lint(Some(&SceneId::from("scene1")));
    assert_eq!(report.errors.len(), 1);
    assert!(report.warnings.is_empty());
}

#[test]
fn open_ended_fixture_warns_but_loads() {
    let store = ContentStore::parse_ron(&fixture("open_ended.ron")).unwrap();
    let report = store.lint(Some(&SceneId::from("scene1")));
    assert!(report.errors.is_empty());
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings.iter().any(|w| w.contains("'attic' is unreachable")));
    assert!(report.warnings.iter().any(|w| w.contains("'hall' can run out")));
}

#[test]
fn merged_stores_resolve_cross_file_targets() {
    let mut store = ContentStore::parse_ron_unchecked(&fixture("dangling.ron")).unwrap();
    let moon = ContentStore::parse_ron(
        r#"(scenes: { "moon": (lines: [Say(text: "Quiet up here.", end: true)]) })"#,
    )
    .unwrap();
    store.merge(moon);
    assert!(store.validate().is_ok());
    assert_eq!(store.len(), 2);
}

#[test]
fn malformed_content_reports_ron_error() {
    let err = ContentStore::parse_ron("(scenes: { \"a\": (lines: [Shout(text: \"x\")]) })").unwrap_err();
    assert!(matches!(err, ContentError::Ron(_)));
}

#[test]
fn missing_file_is_io_error() {
    let err = ContentStore::load_from_ron(Path::new("tests/fixtures/nope.ron")).unwrap_err();
    assert!(matches!(err, ContentError::Io(_)));
}

#[test]
fn config_fixture_overrides_some_fields() {
    let config = EngineConfig::load_from_ron(Path::new("tests/fixtures/fast.ron")).unwrap();
    assert_eq!(config.type_speed, 10);
    assert_eq!(config.chars_per_tick, 2);
    assert_eq!(config.save_key, "test_save");
    assert_eq!(config.start_scene, SceneId::from("scene1"));
    assert!(config.wipe_on_enter);
}

#[test]
fn zero_chars_per_tick_is_invalid() {
    let err = EngineConfig::parse_ron("(chars_per_tick: 0)").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}
