// src/exec/writer.rs

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

/// Writes generated outputs, leaving files whose content did not change
/// untouched so downstream watchers do not see spurious events.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    fs: Arc<dyn FileSystem>,
}

impl OutputWriter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn write(&self, path: &Path, contents: &str) -> Result<WriteOutcome> {
        if self.fs.is_file(path) {
            let existing = self.fs.read(path)?;
            if content_hash(&existing) == content_hash(contents.as_bytes()) {
                debug!(path = %path.display(), "output unchanged; not rewriting");
                return Ok(WriteOutcome::Unchanged);
            }
        }

        self.fs.write(path, contents.as_bytes())?;
        debug!(path = %path.display(), bytes = contents.len(), "output written");
        Ok(WriteOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn unchanged_content_is_not_rewritten() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/out.ts", "export {}");
        let writer = OutputWriter::new(Arc::new(fs.clone()));

        let outcome = writer.write(Path::new("/proj/out.ts"), "export {}").unwrap();
        assert_eq!(outcome, WriteOutcome::Unchanged);
        assert!(fs.writes().is_empty());
    }

    #[test]
    fn new_or_changed_content_is_written() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/out.ts", "old");
        let writer = OutputWriter::new(Arc::new(fs.clone()));

        assert_eq!(
            writer.write(Path::new("/proj/out.ts"), "new").unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(
            writer.write(Path::new("/proj/gen/fresh.ts"), "x").unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(fs.writes().len(), 2);
        assert_eq!(fs.read_to_string(Path::new("/proj/out.ts")).unwrap(), "new");
    }
}
