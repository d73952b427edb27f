/// Scene Linter — validates scene content: dangling option targets,
/// unknown route starts, unreachable scenes and scenes that can run out.
///
/// Usage: scene_linter <file|dir> [--start <scene>]

use novel_engine::core::config::EngineConfig;
use novel_engine::core::content::ContentStore;
use novel_engine::schema::scene::SceneId;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: scene_linter <file|dir> [--start <scene>]");
        process::exit(0);
    }

    let content_path = &args[1];
    let mut start = EngineConfig::default().start_scene;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--start" && i + 1 < args.len() {
            i += 1;
            start = SceneId::new(args[i].clone());
        }
        i += 1;
    }

    let mut store = ContentStore::default();
    let mut load_failures = 0;
    let path = Path::new(content_path);

    if path.is_file() {
        match load_unchecked(path) {
            Ok(loaded) => store.merge(loaded),
            Err(e) => {
                eprintln!("ERROR: Failed to load content file: {}", e);
                process::exit(1);
            }
        }
    } else if path.is_dir() {
        load_content_recursive(path, &mut store, &mut load_failures);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", content_path);
        process::exit(1);
    }

    println!("Loaded {} scenes, {} routes", store.len(), store.routes().len());

    let entry = store.contains(&start).then_some(&start);
    if entry.is_none() && store.routes().is_empty() {
        println!("Note: start scene '{}' not found and no routes defined", start);
    }
    let report = store.lint(entry);

    println!("\n=== Scene Lint Report ===\n");

    if report.is_clean() && load_failures == 0 {
        println!("All checks passed!");
    }

    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }

    for error in &report.errors {
        println!("ERROR: {}", error);
    }

    let error_count = report.errors.len() + load_failures;
    println!(
        "\nSummary: {} errors, {} warnings",
        error_count,
        report.warnings.len()
    );

    if error_count == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

/// Reference checks run on the merged store, so targets may live in
/// another file.
fn load_unchecked(path: &Path) -> Result<ContentStore, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    ContentStore::parse_ron_unchecked(&contents).map_err(|e| e.to_string())
}

fn load_content_recursive(dir: &Path, store: &mut ContentStore, failures: &mut usize) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            load_content_recursive(&path, store, failures);
        } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            match load_unchecked(&path) {
                Ok(loaded) => {
                    println!("  Loaded: {}", path.display());
                    store.merge(loaded);
                }
                Err(e) => {
                    eprintln!("  ERROR loading {}: {}", path.display(), e);
                    *failures += 1;
                }
            }
        }
    }
}
