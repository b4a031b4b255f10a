//! Test utilities for creating, growing, truncating and rotating temporary log files.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct TempLogFile {
    pub path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TempLogFile {
    /// Create a new empty temporary log file
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("test.log");

        File::create(&path)?;

        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a temporary log file whose content is `content` followed by a newline
    pub fn with_content(content: &str) -> std::io::Result<Self> {
        let temp_file = Self::new()?;
        temp_file.append_content(content)?;
        Ok(temp_file)
    }

    /// Create a temporary log file holding exactly `bytes`
    pub fn with_raw(bytes: &[u8]) -> std::io::Result<Self> {
        let temp_file = Self::new()?;
        temp_file.append_raw(bytes)?;
        Ok(temp_file)
    }

    /// Append a line (newline added) to the temporary log file
    pub fn append_content(&self, content: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;

        writeln!(file, "{}", content)?;
        file.flush()?;
        Ok(())
    }

    /// Append bytes verbatim, without adding a terminator
    pub fn append_raw(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;

        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    /// Truncate the file in place (copytruncate-style rotation)
    pub fn truncate(&self) -> std::io::Result<()> {
        File::create(&self.path)?;
        Ok(())
    }

    /// Rename the file aside and create a fresh one under the same name
    pub fn rotate(&self) -> std::io::Result<PathBuf> {
        let rotated = self.path.with_extension("log.1");
        fs::rename(&self.path, &rotated)?;
        File::create(&self.path)?;
        Ok(rotated)
    }

    /// Get the path to the temporary file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the file in bytes
    pub fn size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_log_file_creation() {
        let temp_file = TempLogFile::new().unwrap();
        assert!(temp_file.path().exists());
        assert_eq!(temp_file.size(), 0);
    }

    #[test]
    fn test_temp_log_file_with_content() {
        let temp_file = TempLogFile::with_content("test line").unwrap();

        let file_content = fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(file_content, "test line\n");
    }

    #[test]
    fn test_append_raw_keeps_bytes_verbatim() {
        let temp_file = TempLogFile::with_raw(b"partial").unwrap();
        temp_file.append_raw(b" line\n").unwrap();

        let content = fs::read(temp_file.path()).unwrap();
        assert_eq!(content, b"partial line\n");
    }

    #[test]
    fn test_truncate() {
        let temp_file = TempLogFile::with_content("initial content").unwrap();
        temp_file.truncate().unwrap();

        let content = fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn test_rotate_moves_content_aside() {
        let temp_file = TempLogFile::with_content("old generation").unwrap();
        let rotated = temp_file.rotate().unwrap();

        assert_eq!(fs::read_to_string(&rotated).unwrap(), "old generation\n");
        assert_eq!(temp_file.size(), 0);
    }
}
