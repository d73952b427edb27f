/// Play — terminal player for scene content.
///
/// Usage: play --content <file> [--save-dir <dir>] [--config <file>] [--instant]
///
/// Title commands:
///   new                 — start a new game
///   continue            — resume from the save
///   route <n|id>        — start a route from the story select
///   quit                — exit
///
/// In a run:
///   <Enter>             — reveal / advance
///   <digit>             — pick a choice option
///   c                   — close and reopen the choice
///   t                   — return to title
///   state               — print the save snapshot
///   jump <scene>        — enter a scene (dev)
///   end                 — skip to the scene's last line (dev)

use novel_engine::core::config::EngineConfig;
use novel_engine::core::content::ContentStore;
use novel_engine::core::engine::{NovelEngine, Phase, RunEnd};
use novel_engine::core::store::{FileStore, MemoryStore};
use novel_engine::schema::scene::SceneId;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut content_path = None;
    let mut save_dir = None;
    let mut config_path = None;
    let mut instant = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--content" if i + 1 < args.len() => {
                i += 1;
                content_path = Some(args[i].clone());
            }
            "--save-dir" if i + 1 < args.len() => {
                i += 1;
                save_dir = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--instant" => instant = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(content_path) = content_path else {
        eprintln!("ERROR: --content is required");
        print_usage();
        std::process::exit(1);
    };

    let content = match ContentStore::load_from_ron(Path::new(&content_path)) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("ERROR: Failed to load content: {}", e);
            std::process::exit(1);
        }
    };

    let config = match config_path {
        Some(ref path) => match EngineConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let builder = NovelEngine::builder().with_content(content).with_config(config);
    let builder = match save_dir {
        Some(ref dir) => match FileStore::new(dir) {
            Ok(store) => builder.with_store(store),
            Err(e) => {
                eprintln!("ERROR: Cannot use save directory '{}': {}", dir, e);
                std::process::exit(1);
            }
        },
        None => builder.with_store(MemoryStore::new()),
    };
    let mut engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} scenes, {} routes",
        engine.content().len(),
        engine.routes().len()
    );
    println!("Type 'help' for commands.\n");
    print_title(&engine);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        let prompt = match engine.phase() {
            Phase::Title => "title> ",
            Phase::Choosing => "choose> ",
            _ => "> ",
        };
        print!("{}", prompt);
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts.first().map(|c| c.to_lowercase()).unwrap_or_default();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "state" => match engine.snapshot_json() {
                Some(json) => println!("{}", json),
                None => println!("No narrative state yet."),
            },
            _ if engine.phase() == Phase::Title => {
                let started = match cmd.as_str() {
                    "new" => engine.new_game(),
                    "continue" => {
                        if !engine.has_save() {
                            println!("No save to continue.");
                            continue;
                        }
                        engine.continue_game()
                    }
                    "route" => match parts.get(1).and_then(|arg| route_id(&engine, arg)) {
                        Some(id) => engine.start_route(&id),
                        None => {
                            println!("Usage: route <n|id>");
                            print_routes(&engine);
                            continue;
                        }
                    },
                    "" => {
                        print_title(&engine);
                        continue;
                    }
                    _ => {
                        println!("Unknown command: '{}'. Type 'help' for available commands.", cmd);
                        continue;
                    }
                };
                match started {
                    Ok(_) => present(&mut engine, instant),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "" => {
                engine.advance();
                present(&mut engine, instant);
            }
            "c" => {
                engine.cancel_choice();
                present(&mut engine, instant);
            }
            "t" => {
                engine.return_to_title();
                present(&mut engine, instant);
            }
            "jump" => match parts.get(1) {
                Some(scene) => match engine.jump_to(&SceneId::new(*scene)) {
                    Ok(_) => present(&mut engine, instant),
                    Err(e) => println!("ERROR: {}", e),
                },
                None => println!("Usage: jump <scene>"),
            },
            "end" => match engine.skip_to_end() {
                Ok(_) => present(&mut engine, instant),
                Err(e) => println!("ERROR: {}", e),
            },
            digits if digits.chars().all(|c| c.is_ascii_digit()) => {
                let Some(view) = engine.pending_choice() else {
                    println!("No choice to make right now.");
                    continue;
                };
                let index = digits.parse::<usize>().unwrap_or(0);
                if index == 0 || index > view.options.len() {
                    println!("Pick 1-{}.", view.options.len());
                    continue;
                }
                match engine.select(view.ticket, index - 1) {
                    Ok(_) => present(&mut engine, instant),
                    Err(e) => {
                        println!("ERROR: {}", e);
                        present(&mut engine, instant);
                    }
                }
            }
            _ => {
                println!("Unknown command: '{}'. Type 'help' for available commands.", cmd);
            }
        }
    }
}

/// Show whatever the engine is now waiting on, typing dialogue through
/// the reveal clock.
fn present(engine: &mut NovelEngine, instant: bool) {
    if engine.phase() == Phase::Transitioning {
        engine.transition_complete();
    }

    match engine.phase() {
        Phase::Typing => {
            print_speaker(engine);
            if instant {
                engine.skip();
                println!("{}", engine.full_text());
                return;
            }
            let mut shown = 0;
            let mut stdout = io::stdout();
            while let Some(delay) = engine.pending_tick() {
                std::thread::sleep(Duration::from_millis(u64::from(delay)));
                engine.tick();
                let visible: Vec<char> = engine.visible_text().chars().collect();
                let chunk: String = visible[shown..].iter().collect();
                print!("{}", chunk);
                stdout.flush().ok();
                shown = visible.len();
            }
            println!();
        }
        Phase::Ready => {
            print_speaker(engine);
            println!("{}", engine.full_text());
        }
        Phase::Choosing => {
            if let Some(view) = engine.pending_choice() {
                println!("\n{}", view.prompt);
                for (i, option) in view.options.iter().enumerate() {
                    println!("  {}. {}", i + 1, option);
                }
            }
        }
        Phase::Title => {
            match engine.last_run_end() {
                Some(RunEnd::Terminal) => println!("\n--- The End ---\n"),
                Some(RunEnd::Exhausted) => println!("\n--- Scene ended without a closing line ---\n"),
                Some(RunEnd::Aborted) => println!("\n--- Run aborted ---\n"),
                Some(RunEnd::Abandoned) | None => println!(),
            }
            print_title(engine);
        }
        Phase::Transitioning => {}
    }
}

fn print_speaker(engine: &NovelEngine) {
    if let Some(name) = engine.speaker() {
        print!("[{}] ", name);
    }
}

fn print_title(engine: &NovelEngine) {
    println!("=== Title ===");
    println!("  new");
    if engine.has_save() {
        println!("  continue");
    }
    print_routes(engine);
    println!("  quit");
}

fn print_routes(engine: &NovelEngine) {
    for (i, route) in engine.routes().iter().enumerate() {
        println!("  route {}  {}: {}", i + 1, route.title, route.description);
    }
}

fn route_id(engine: &NovelEngine, arg: &str) -> Option<String> {
    if let Ok(n) = arg.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| engine.routes().get(i))
            .map(|r| r.id.clone());
    }
    engine.content().route(arg).map(|r| r.id.clone())
}

fn print_usage() {
    println!("Play — terminal player for scene content.");
    println!();
    println!("Usage: play --content <file> [--save-dir <dir>] [--config <file>] [--instant]");
    println!();
    println!("  --content <file>   Scene content (RON)");
    println!("  --save-dir <dir>   Keep the save in <dir> (default: in memory)");
    println!("  --config <file>    Engine config (RON)");
    println!("  --instant          Show lines without typing them out");
}

fn print_help() {
    println!("Title:");
    println!("  new                Start a new game");
    println!("  continue           Resume from the save");
    println!("  route <n|id>       Start a route");
    println!();
    println!("In a run:");
    println!("  <Enter>            Reveal the line, or advance once it is shown");
    println!("  <n>                Pick option n of a choice");
    println!("  c                  Close and reopen the choice");
    println!("  t                  Return to title");
    println!("  jump <scene>       Enter a scene (dev)");
    println!("  end                Skip to the scene's last line (dev)");
    println!();
    println!("  state              Print the save snapshot");
    println!("  help               Show this help");
    println!("  quit               Exit");
}
