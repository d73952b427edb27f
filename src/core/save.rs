/// Save, continue and clear against a persistent store.
///
/// Reading never fails: an absent, unreadable or malformed record is
/// reported as "no save".

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::store::{PersistentStore, StoreError};
use crate::schema::state::{NarrativeState, SaveRecord};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state has no current scene to save")]
    NoScene,
}

/// Serialize the state and replace the record under `key`.
pub fn write_save(
    store: &mut dyn PersistentStore,
    key: &str,
    state: &NarrativeState,
) -> Result<(), SaveError> {
    let record = state.to_record().ok_or(SaveError::NoScene)?;
    let json = serde_json::to_string(&record)?;
    store.put(key, &json)?;
    debug!(key, scene = %record.scene_id, line = record.line_index, "saved");
    Ok(())
}

/// Load the record under `key`, or `None` when there is no usable save.
pub fn read_save(store: &dyn PersistentStore, key: &str) -> Option<NarrativeState> {
    let contents = match store.get(key) {
        Ok(Some(contents)) => contents,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "save unreadable, treating as no save");
            return None;
        }
    };
    match serde_json::from_str::<SaveRecord>(&contents) {
        Ok(record) => Some(NarrativeState::from_record(record)),
        Err(e) => {
            warn!(key, error = %e, "save malformed, treating as no save");
            None
        }
    }
}

pub fn has_save(store: &dyn PersistentStore, key: &str) -> bool {
    read_save(store, key).is_some()
}

pub fn clear_save(store: &mut dyn PersistentStore, key: &str) -> Result<(), SaveError> {
    store.delete(key)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::schema::scene::{FlagValue, SceneId};
    use std::collections::BTreeMap;

    const KEY: &str = "vn_save_v1";

    struct BrokenStore;

    impl PersistentStore for BrokenStore {
        fn put(&mut self, _key: &str, _record: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "no access",
            )))
        }

        fn delete(&mut self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn in_progress_state() -> NarrativeState {
        let mut state = NarrativeState::new();
        state.set_position(SceneId::from("scene1"), 2);
        state.mark_visited(SceneId::from("scene1"));
        state.merge_flags(&BTreeMap::from([("tookPark".to_string(), FlagValue::Bool(true))]));
        state
    }

    #[test]
    fn write_then_read() {
        let mut store = MemoryStore::new();
        let state = in_progress_state();
        write_save(&mut store, KEY, &state).unwrap();
        assert!(has_save(&store, KEY));
        assert_eq!(read_save(&store, KEY), Some(state));
    }

    #[test]
    fn empty_state_is_not_written() {
        let mut store = MemoryStore::new();
        let err = write_save(&mut store, KEY, &NarrativeState::new()).unwrap_err();
        assert!(matches!(err, SaveError::NoScene));
        assert!(!has_save(&store, KEY));
    }

    #[test]
    fn malformed_record_reads_as_no_save() {
        let mut store = MemoryStore::new();
        store.put(KEY, "{not json").unwrap();
        assert_eq!(read_save(&store, KEY), None);

        store.put(KEY, r#"{"lineIndex": 3}"#).unwrap();
        assert_eq!(read_save(&store, KEY), None);
    }

    #[test]
    fn store_failures_are_contained() {
        let mut store = BrokenStore;
        assert_eq!(read_save(&store, KEY), None);
        assert!(matches!(
            write_save(&mut store, KEY, &in_progress_state()),
            Err(SaveError::Store(_))
        ));
    }

    #[test]
    fn clear_removes_record() {
        let mut store = MemoryStore::new();
        write_save(&mut store, KEY, &in_progress_state()).unwrap();
        clear_save(&mut store, KEY).unwrap();
        assert!(!has_save(&store, KEY));
    }
}
