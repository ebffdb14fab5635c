//! Line-buffer host over pluggable storage.
//!
//! [`TextHost`] keeps loaded buffers as line vectors with a per-buffer
//! cursor and runs substitutions through [`PreparedSubstitution`]. Where the
//! text comes from and goes back to is a [`Storage`]:
//!
//! - [`MemoryStorage`]: seeded documents, for tests and embedding
//! - [`FileStorage`]: files on disk, persisted atomically

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::engine::PreparedSubstitution;
use super::{
    BufferHost, BufferId, CursorPosition, HostError, HostResult, LineRange, SubstitutionCount,
};
use crate::compile::Substitution;

/// Backing store for buffer text.
pub trait Storage {
    fn read(&self, id: &BufferId) -> HostResult<String>;

    fn write(&mut self, id: &BufferId, text: &str) -> HostResult<()>;

    fn display_name(&self, id: &BufferId) -> String {
        id.to_string()
    }
}

/// In-memory documents keyed by buffer id.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    documents: HashMap<BufferId, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_document(mut self, id: impl Into<BufferId>, text: impl Into<String>) -> Self {
        self.documents.insert(id.into(), text.into());
        self
    }

    /// Last persisted text of a document.
    pub fn document(&self, id: &BufferId) -> Option<&str> {
        self.documents.get(id).map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn read(&self, id: &BufferId) -> HostResult<String> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| HostError::UnknownBuffer(id.clone()))
    }

    fn write(&mut self, id: &BufferId, text: &str) -> HostResult<()> {
        self.documents.insert(id.clone(), text.to_owned());
        Ok(())
    }
}

/// Files on disk; buffer ids are paths, relative ids resolve against `root`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_of(&self, id: &BufferId) -> PathBuf {
        let path = Path::new(id.as_str());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Storage for FileStorage {
    fn read(&self, id: &BufferId) -> HostResult<String> {
        let path = self.path_of(id);
        std::fs::read_to_string(&path).map_err(|source| HostError::Io { path, source })
    }

    fn write(&mut self, id: &BufferId, text: &str) -> HostResult<()> {
        let path = self.path_of(id);
        crate::util::atomic::atomic_write(&path, text).map_err(|e| HostError::Persist {
            path,
            reason: format!("{e:#}"),
        })
    }

    fn display_name(&self, id: &BufferId) -> String {
        self.path_of(id)
            .strip_prefix(&self.root)
            .map_or_else(|_| id.to_string(), |p| p.display().to_string())
    }
}

#[derive(Debug, Clone)]
struct TextBuffer {
    lines: Vec<String>,
    trailing_newline: bool,
    cursor: CursorPosition,
    modified: bool,
}

impl TextBuffer {
    fn from_text(text: &str) -> Self {
        let mut lines: Vec<String> = text.split('\n').map(str::to_owned).collect();
        let trailing_newline = text.ends_with('\n');
        if trailing_newline {
            lines.pop();
        }
        Self {
            lines,
            trailing_newline,
            cursor: CursorPosition::default(),
            modified: false,
        }
    }

    fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }

    fn targets(&self, range: &LineRange) -> HostResult<Vec<usize>> {
        let len = self.lines.len();
        let targets = match range {
            LineRange::All => (1..=len).collect(),
            LineRange::Line(line) => vec![*line],
            LineRange::Lines(lines) => lines.clone(),
        };
        if let Some(&line) = targets.iter().find(|&&l| l == 0 || l > len) {
            return Err(HostError::LineOutOfRange { line, len });
        }
        Ok(targets)
    }
}

/// A host whose buffers live in memory, loaded from and persisted to `S`.
#[derive(Debug)]
pub struct TextHost<S> {
    storage: S,
    buffers: HashMap<BufferId, TextBuffer>,
    active: Option<BufferId>,
    /// Cursor reported while no buffer is active.
    detached_cursor: CursorPosition,
}

impl<S: Storage> TextHost<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            buffers: HashMap::new(),
            active: None,
            detached_cursor: CursorPosition::default(),
        }
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Current (possibly unpersisted) text of a loaded buffer.
    pub fn text(&self, id: &BufferId) -> Option<String> {
        self.buffers.get(id).map(TextBuffer::to_text)
    }

    pub fn is_modified(&self, id: &BufferId) -> bool {
        self.buffers.get(id).is_some_and(|b| b.modified)
    }

    fn buffer_mut(&mut self, id: &BufferId) -> HostResult<&mut TextBuffer> {
        self.buffers
            .get_mut(id)
            .ok_or_else(|| HostError::NotLoaded(id.clone()))
    }
}

impl<S: Storage> BufferHost for TextHost<S> {
    fn is_loaded(&self, id: &BufferId) -> bool {
        self.buffers.contains_key(id)
    }

    fn load(&mut self, id: &BufferId) -> HostResult<()> {
        if self.buffers.contains_key(id) {
            return Ok(());
        }
        let text = self.storage.read(id)?;
        debug!(buffer = %id, bytes = text.len(), "loaded buffer");
        self.buffers.insert(id.clone(), TextBuffer::from_text(&text));
        Ok(())
    }

    fn activate(&mut self, id: &BufferId) -> HostResult<()> {
        if !self.buffers.contains_key(id) {
            return Err(HostError::NotLoaded(id.clone()));
        }
        self.active = Some(id.clone());
        Ok(())
    }

    fn active_buffer(&self) -> Option<BufferId> {
        self.active.clone()
    }

    fn deactivate(&mut self) {
        self.active = None;
    }

    fn cursor(&self) -> CursorPosition {
        self.active
            .as_ref()
            .and_then(|id| self.buffers.get(id))
            .map_or(self.detached_cursor, |b| b.cursor)
    }

    fn set_cursor(&mut self, position: CursorPosition) {
        match self.active.as_ref().and_then(|id| self.buffers.get_mut(id)) {
            Some(buffer) => buffer.cursor = position,
            None => self.detached_cursor = position,
        }
    }

    fn persist(&mut self, id: &BufferId) -> HostResult<()> {
        let buffer = self
            .buffers
            .get_mut(id)
            .ok_or_else(|| HostError::NotLoaded(id.clone()))?;
        self.storage.write(id, &buffer.to_text())?;
        buffer.modified = false;
        debug!(buffer = %id, "persisted buffer");
        Ok(())
    }

    fn display_name(&self, id: &BufferId) -> String {
        self.storage.display_name(id)
    }

    fn apply_substitution(
        &mut self,
        id: &BufferId,
        range: &LineRange,
        substitution: &Substitution,
    ) -> HostResult<SubstitutionCount> {
        let prepared = PreparedSubstitution::prepare(substitution)?;
        let buffer = self.buffer_mut(id)?;
        let targets = buffer.targets(range)?;

        // Compute every line first so a multi-line instruction commits all or nothing.
        let mut staged = Vec::new();
        let mut count = SubstitutionCount::default();
        for line in targets {
            if let Some((text, replacements)) = prepared.apply_line(&buffer.lines[line - 1]) {
                count.replacements += replacements;
                count.lines_changed += 1;
                staged.push((line, text));
            }
        }

        if let Some(&(last, _)) = staged.iter().max_by_key(|(line, _)| *line) {
            buffer.cursor = CursorPosition::new(last, 0);
            buffer.modified = true;
        }
        for (line, text) in staged {
            buffer.lines[line - 1] = text;
        }

        debug!(
            buffer = %id,
            command = %substitution,
            replacements = count.replacements,
            "substitution applied"
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::flags::FlagSet;

    fn host(text: &str) -> (TextHost<MemoryStorage>, BufferId) {
        let id = BufferId::from("a.txt");
        let mut host = TextHost::new(MemoryStorage::new().with_document("a.txt", text));
        host.load(&id).expect("loads");
        (host, id)
    }

    fn sub(find: &str, replace: &str) -> Substitution {
        compile(find, replace, FlagSet::default()).expect("compiles")
    }

    #[test]
    fn test_text_round_trip() {
        for text in ["", "a", "a\n", "a\nb", "a\n\nb\n"] {
            assert_eq!(TextBuffer::from_text(text).to_text(), text);
        }
    }

    #[test]
    fn test_load_unknown_buffer() {
        let mut host = TextHost::new(MemoryStorage::new());
        let err = host.load(&BufferId::from("missing")).unwrap_err();
        assert!(matches!(err, HostError::UnknownBuffer(_)));
    }

    #[test]
    fn test_activate_requires_load() {
        let mut host = TextHost::new(MemoryStorage::new().with_document("a", "x"));
        assert!(host.activate(&BufferId::from("a")).is_err());
    }

    #[test]
    fn test_whole_buffer_substitution_moves_cursor() {
        let (mut host, id) = host("foo\nbar\nfoo foo\n");
        host.activate(&id).expect("activates");

        let count = host
            .apply_substitution(&id, &LineRange::All, &sub("foo", "baz"))
            .expect("applies");

        assert_eq!(count.replacements, 3);
        assert_eq!(count.lines_changed, 2);
        assert_eq!(host.text(&id).as_deref(), Some("baz\nbar\nbaz baz\n"));
        assert_eq!(host.cursor(), CursorPosition::new(3, 0));
        assert!(host.is_modified(&id));
    }

    #[test]
    fn test_lines_instruction_is_atomic() {
        let (mut host, id) = host("foo\nfoo\n");
        let err = host
            .apply_substitution(&id, &LineRange::Lines(vec![1, 7]), &sub("foo", "bar"))
            .unwrap_err();
        assert!(matches!(err, HostError::LineOutOfRange { line: 7, len: 2 }));
        assert_eq!(host.text(&id).as_deref(), Some("foo\nfoo\n"));
    }

    #[test]
    fn test_single_line() {
        let (mut host, id) = host("foo\nfoo\n");
        let count = host
            .apply_substitution(&id, &LineRange::Line(2), &sub("foo", "bar"))
            .expect("applies");
        assert_eq!(count.replacements, 1);
        assert_eq!(host.text(&id).as_deref(), Some("foo\nbar\n"));
    }

    #[test]
    fn test_persist_writes_storage() {
        let (mut host, id) = host("foo\n");
        host.apply_substitution(&id, &LineRange::All, &sub("foo", "bar"))
            .expect("applies");
        assert_eq!(host.storage().document(&id), Some("foo\n"));

        host.persist(&id).expect("persists");
        assert_eq!(host.storage().document(&id), Some("bar\n"));
        assert!(!host.is_modified(&id));
    }

    #[test]
    fn test_detached_cursor() {
        let mut host = TextHost::new(MemoryStorage::new());
        host.set_cursor(CursorPosition::new(4, 2));
        assert_eq!(host.cursor(), CursorPosition::new(4, 2));
        assert_eq!(host.active_buffer(), None);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("notes.txt"), "old value\n").expect("seed file");

        let mut host = TextHost::new(FileStorage::new(dir.path()));
        let id = BufferId::from("notes.txt");
        host.load(&id).expect("loads");
        host.apply_substitution(&id, &LineRange::All, &sub("old", "new"))
            .expect("applies");
        host.persist(&id).expect("persists");

        let on_disk = std::fs::read_to_string(dir.path().join("notes.txt")).expect("read back");
        assert_eq!(on_disk, "new value\n");
        assert_eq!(host.display_name(&id), "notes.txt");
    }

    #[test]
    fn test_file_storage_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut host = TextHost::new(FileStorage::new(dir.path()));
        let err = host.load(&BufferId::from("nope.txt")).unwrap_err();
        assert!(matches!(err, HostError::Io { .. }));
    }
}
