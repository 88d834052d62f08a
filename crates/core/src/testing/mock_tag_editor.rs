//! Mock tag editor for testing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::stage::{TagEditor, TagError, TagFile, TagValue};

/// A tag write that was saved to a file.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTagWrite {
    pub path: PathBuf,
    pub field: String,
    pub value: TagValue,
}

type FieldMap = HashMap<String, TagValue>;

/// Mock implementation of the TagEditor trait.
///
/// Each path has an in-memory field map, seeded with `set_existing`. Writes
/// and removals are recorded when the tag file is saved; unsaved changes are
/// lost, as with a real tag library. Uses blocking mutexes because tag
/// editing runs on blocking threads.
#[derive(Debug, Default, Clone)]
pub struct MockTagEditor {
    files: Arc<Mutex<HashMap<PathBuf, FieldMap>>>,
    saved: Arc<Mutex<Vec<RecordedTagWrite>>>,
    removed: Arc<Mutex<Vec<(PathBuf, String)>>>,
    fail_load: Arc<Mutex<bool>>,
}

impl MockTagEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `load` fail.
    pub fn set_fail_load(&self, fail: bool) {
        *self.fail_load.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    /// Pretend `path` already carries `field`.
    pub fn set_existing(&self, path: &Path, field: &str, value: TagValue) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_path_buf())
            .or_default()
            .insert(field.to_string(), value);
    }

    /// Saved fields of `path`.
    pub fn fields(&self, path: &Path) -> FieldMap {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn recorded_writes(&self) -> Vec<RecordedTagWrite> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(path, field)` pairs removed by a saved tag file.
    pub fn recorded_removals(&self) -> Vec<(PathBuf, String)> {
        self.removed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct MockTagFile {
    path: PathBuf,
    fields: FieldMap,
    writes: Vec<RecordedTagWrite>,
    removals: Vec<String>,
    editor: MockTagEditor,
}

impl TagFile for MockTagFile {
    fn get(&self, field: &str) -> Option<TagValue> {
        self.fields.get(field).cloned()
    }

    fn set(&mut self, field: &str, value: TagValue) -> Result<(), TagError> {
        self.fields.insert(field.to_string(), value.clone());
        self.writes.push(RecordedTagWrite {
            path: self.path.clone(),
            field: field.to_string(),
            value,
        });
        Ok(())
    }

    fn remove(&mut self, field: &str) -> Result<(), TagError> {
        self.fields.remove(field);
        self.removals.push(field.to_string());
        Ok(())
    }

    fn save(self: Box<Self>) -> Result<(), TagError> {
        let this = *self;
        let editor = this.editor;
        editor
            .files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(this.path.clone(), this.fields);
        editor
            .saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(this.writes);
        editor
            .removed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(this.removals.into_iter().map(|f| (this.path.clone(), f)));
        Ok(())
    }
}

impl TagEditor for MockTagEditor {
    fn name(&self) -> &str {
        "mock"
    }

    fn load(&self, path: &Path) -> Result<Box<dyn TagFile>, TagError> {
        if *self.fail_load.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(TagError::load(path, "mock load failure"));
        }
        Ok(Box::new(MockTagFile {
            path: path.to_path_buf(),
            fields: self.fields(path),
            writes: Vec::new(),
            removals: Vec::new(),
            editor: self.clone(),
        }))
    }
}
