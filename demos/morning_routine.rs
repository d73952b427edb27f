/// Morning Routine example — plays the demo story's first route start to
/// finish, taking the park detour, then resumes a second engine from the
/// save to show continue.
///
/// Run with: cargo run --example morning_routine

use novel_engine::core::choice::ChoiceView;
use novel_engine::core::content::ContentStore;
use novel_engine::core::engine::{NovelEngine, Phase};
use novel_engine::core::host::SelectionUi;
use novel_engine::core::store::{MemoryStore, PersistentStore, StoreError};
use std::cell::RefCell;
use std::rc::Rc;

/// Prints the options whenever the engine presents a choice.
struct PrintedMenu;

impl SelectionUi for PrintedMenu {
    fn present(&mut self, choice: &ChoiceView) {
        println!("\n  ? {}", choice.prompt);
        for (i, option) in choice.options.iter().enumerate() {
            println!("    {}. {}", i + 1, option);
        }
    }

    fn dismiss(&mut self) {}
}

/// A memory store two engines can share.
#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<MemoryStore>>);

impl PersistentStore for SharedStore {
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

fn main() {
    let content = ContentStore::load_from_ron(std::path::Path::new("content/demo/story.ron"))
        .expect("Failed to load demo story");
    let store = SharedStore::default();

    let mut engine = NovelEngine::builder()
        .with_content(content.clone())
        .with_store(store.clone())
        .with_selection(PrintedMenu)
        .build()
        .expect("Failed to build engine");

    println!("=== {} ===\n", engine.routes()[0].title);
    engine.new_game().expect("Failed to start");

    let mut lines_read = 0;
    loop {
        match engine.phase() {
            Phase::Typing => {
                // Let the reveal run to completion the way a clock would.
                while engine.tick() == Phase::Typing {}
            }
            Phase::Ready => {
                let speaker = engine.speaker().unwrap_or("");
                println!("{:>10} | {}", speaker, engine.full_text());
                lines_read += 1;
                engine.advance();

                if lines_read == 7 {
                    break;
                }
            }
            Phase::Choosing => {
                let view = engine.pending_choice().expect("choice is pending");
                println!("  > {}\n", view.options[0]);
                engine.select(view.ticket, 0).expect("Failed to resolve choice");
            }
            Phase::Transitioning => {
                engine.transition_complete();
            }
            Phase::Title => break,
        }
    }

    println!("\n--- Saving and quitting mid-scene ---");
    println!("{}\n", engine.snapshot_json().unwrap_or_default());

    // A fresh engine picks the story up where the first one left off.
    let mut resumed = NovelEngine::builder()
        .with_content(content)
        .with_store(store)
        .build()
        .expect("Failed to build engine");
    resumed.continue_game().expect("Failed to continue");

    while resumed.phase() != Phase::Title {
        resumed.skip();
        if resumed.phase() == Phase::Ready {
            let speaker = resumed.speaker().unwrap_or("");
            println!("{:>10} | {}", speaker, resumed.full_text());
        }
        resumed.advance();
    }

    println!("\nRun ended: {:?}", resumed.last_run_end());
    println!("Flags: {:?}", resumed.state().flags());
}
