//! Reading and writing task documents on disk.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::codec::Encoding;
use crate::editor::{OutputField, SegmentEditor};
use crate::error::TaskError;

/// An editor restored from disk, with a one-line summary for the status bar.
#[derive(Debug)]
pub struct LoadedTask {
    pub editor: SegmentEditor,
    pub status: String,
    pub file: TaskFile,
}

/// Where a task was loaded from, and whether the load dropped anything.
#[derive(Debug)]
pub struct TaskFile {
    path: PathBuf,
    load_problems: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The file had load problems; its previous contents were copied here
    /// before being overwritten.
    KeptOriginal(PathBuf),
    /// Nothing was edited since a lossy load, so the file was left alone.
    Unchanged,
}

impl TaskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            load_problems: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_problems(&self) -> usize {
        self.load_problems
    }

    /// Writes `output` to the file. After a lossy load the stored document is
    /// never replaced by an unedited task, and the first real save keeps a
    /// copy of it next to the file.
    pub fn save(&mut self, output: &OutputField, edited: bool) -> Result<SaveOutcome, TaskError> {
        if self.load_problems == 0 {
            save(&self.path, output)?;
            return Ok(SaveOutcome::Saved);
        }
        if !edited {
            warn!(
                path = %self.path.display(),
                problems = self.load_problems,
                "not overwriting a task that failed to load cleanly"
            );
            return Ok(SaveOutcome::Unchanged);
        }
        let backup = original_path(&self.path);
        fs::copy(&self.path, &backup).map_err(|err| io_error(&backup, err))?;
        save(&self.path, output)?;
        self.load_problems = 0;
        info!(backup = %backup.display(), "kept the original task");
        Ok(SaveOutcome::KeptOriginal(backup))
    }
}

fn io_error(path: &Path, source: io::Error) -> TaskError {
    TaskError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn read_document(path: &Path) -> Result<String, TaskError> {
    fs::read_to_string(path).map_err(|err| io_error(path, err))
}

/// Opens `path` for editing. A missing file starts a new, empty task.
pub fn load(path: &Path, encoding: Encoding, field: &str) -> Result<LoadedTask, TaskError> {
    let mut editor = SegmentEditor::with_output(encoding, OutputField::new(field));
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "starting a new task");
            return Ok(LoadedTask {
                editor,
                status: "New task".to_string(),
                file: TaskFile::new(path),
            });
        }
        Err(err) => return Err(io_error(path, err)),
    };

    let report = editor.restore(&contents);
    for diagnostic in &report.diagnostics {
        warn!(path = %path.display(), %diagnostic, "problem while loading task");
    }
    let loaded = report.inserted.len();
    let status = if report.is_clean() {
        format!("Loaded {loaded} segments")
    } else {
        format!(
            "Loaded {loaded} segments, {} problems (see log)",
            report.diagnostics.len()
        )
    };
    info!(path = %path.display(), segments = loaded, "loaded task");
    let file = TaskFile {
        path: path.to_path_buf(),
        load_problems: report.diagnostics.len(),
    };
    Ok(LoadedTask {
        editor,
        status,
        file,
    })
}

/// Writes the output field's current value to `path`.
pub fn save(path: &Path, output: &OutputField) -> Result<(), TaskError> {
    fs::write(path, output.value()).map_err(|err| io_error(path, err))?;
    info!(path = %path.display(), bytes = output.value().len(), "saved task");
    Ok(())
}

/// Where the previous contents of a lossily loaded task are kept.
pub fn original_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "task".into());
    name.push(".orig");
    path.with_file_name(name)
}

/// Destination of `convert --write`: next to `path`, named after the encoding.
pub fn converted_path(path: &Path, encoding: Encoding) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("task");
    path.with_file_name(format!("{stem}.{}.json", encoding.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::DEFAULT_FIELD_NAME;
    use crate::segment::SegmentKind;

    #[test]
    fn missing_file_starts_a_new_task() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load(&dir.path().join("task.json"), Encoding::Typed, DEFAULT_FIELD_NAME)
            .unwrap();
        assert!(loaded.editor.is_empty());
        assert_eq!(loaded.status, "New task");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.json");

        let mut editor = SegmentEditor::new(Encoding::Keyed);
        editor.insert_segment(SegmentKind::Comment, None);
        editor.insert_segment(SegmentKind::Multi, None);
        save(&path, editor.output()).unwrap();

        let loaded = load(&path, Encoding::Keyed, DEFAULT_FIELD_NAME).unwrap();
        assert_eq!(loaded.status, "Loaded 2 segments");
        assert_eq!(loaded.editor.output().value(), editor.output().value());
    }

    #[test]
    fn problems_are_counted_in_the_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.json");
        fs::write(&path, r#"{"segments":[{"type":"text","content":"A"},{"type":"nope"}]}"#)
            .unwrap();
        let loaded = load(&path, Encoding::Typed, "task_body").unwrap();
        assert_eq!(loaded.status, "Loaded 1 segments, 1 problems (see log)");
        assert_eq!(loaded.editor.output().name(), "task_body");
    }

    #[test]
    fn broken_task_is_not_overwritten_by_an_unedited_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.json");
        let stored = r#"{"segments": [ {"type":"text","content":"keep me"}, ]}"#;
        fs::write(&path, stored).unwrap();

        let mut loaded = load(&path, Encoding::Typed, DEFAULT_FIELD_NAME).unwrap();
        assert_eq!(loaded.file.load_problems(), 1);
        assert_eq!(
            loaded.file.save(loaded.editor.output(), false).unwrap(),
            SaveOutcome::Unchanged
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), stored);
        assert!(!original_path(&path).exists());
    }

    #[test]
    fn first_edited_save_after_a_lossy_load_keeps_the_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.json");
        let stored = r#"{"segments":[{"type":"text","content":"A"},{"type":"nope"}]}"#;
        fs::write(&path, stored).unwrap();

        let mut loaded = load(&path, Encoding::Typed, DEFAULT_FIELD_NAME).unwrap();
        loaded.editor.insert_segment(SegmentKind::Check, None);
        let outcome = loaded.file.save(loaded.editor.output(), true).unwrap();

        let backup = dir.path().join("task.json.orig");
        assert_eq!(outcome, SaveOutcome::KeptOriginal(backup.clone()));
        assert_eq!(fs::read_to_string(&backup).unwrap(), stored);
        assert_eq!(fs::read_to_string(&path).unwrap(), loaded.editor.output().value());
        assert_eq!(loaded.file.load_problems(), 0);
        assert_eq!(
            loaded.file.save(loaded.editor.output(), false).unwrap(),
            SaveOutcome::Saved
        );
    }

    #[test]
    fn clean_loads_save_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.json");
        let mut file = TaskFile::new(&path);
        let editor = SegmentEditor::new(Encoding::Typed);
        assert_eq!(file.save(editor.output(), false).unwrap(), SaveOutcome::Saved);
        assert_eq!(fs::read_to_string(&path).unwrap(), editor.output().value());
    }

    #[test]
    fn unreadable_paths_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(dir.path(), Encoding::Typed, DEFAULT_FIELD_NAME);
        assert!(matches!(result, Err(TaskError::Io { .. })));
        assert!(matches!(
            save(dir.path(), &OutputField::default()),
            Err(TaskError::Io { .. })
        ));
    }

    #[test]
    fn converted_path_names_the_encoding() {
        assert_eq!(
            converted_path(Path::new("/tmp/quiz.json"), Encoding::Keyed),
            PathBuf::from("/tmp/quiz.keyed.json")
        );
    }
}
