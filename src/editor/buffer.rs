use ropey::Rope;
use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

pub struct Buffer {
    text: Rope,
    filepath: Option<PathBuf>,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            text: Rope::new(),
            filepath: None,
        }
    }

    pub fn from_file(path: PathBuf) -> io::Result<Self> {
        let text = Rope::from_reader(BufReader::new(File::open(&path)?))?;
        Ok(Self {
            text,
            filepath: Some(path),
        })
    }

    pub fn from_reader(reader: impl Read) -> io::Result<Self> {
        Ok(Self {
            text: Rope::from_reader(reader)?,
            filepath: None,
        })
    }

    pub fn from_text(s: &str) -> Self {
        Self {
            text: Rope::from_str(s),
            filepath: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }

    /// Full document contents as bytes, detached from the rope
    pub fn text_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.text.len_bytes());
        for chunk in self.text.chunks() {
            bytes.extend_from_slice(chunk.as_bytes());
        }
        bytes
    }

    pub fn len_bytes(&self) -> usize {
        self.text.len_bytes()
    }

    /// Append text at the end of the document
    pub fn append(&mut self, s: &str) {
        let end = self.text.len_chars();
        self.text.insert(end, s);
    }

    /// Whether the document is empty or ends with a line break
    pub fn ends_with_newline(&self) -> bool {
        let len = self.text.len_chars();
        len == 0 || self.text.char(len - 1) == '\n'
    }

    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    pub fn line(&self, idx: usize) -> ropey::RopeSlice<'_> {
        self.text.line(idx)
    }

    pub fn line_len(&self, idx: usize) -> usize {
        // Length excluding newline character
        let line = self.text.line(idx);
        let len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in self.text.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn new_buffer_is_empty() {
        let buf = Buffer::new();
        assert_eq!(buf.line_count(), 1); // empty rope has 1 line
        assert!(buf.text_bytes().is_empty());
        assert!(buf.ends_with_newline());
    }

    #[test]
    fn line_count_counts_lines() {
        let buf = Buffer::from_text("hello\nworld\ntest\n");
        assert_eq!(buf.line_count(), 4); // 3 lines + trailing newline creates 4th
    }

    #[test]
    fn line_len_excludes_newline() {
        let buf = Buffer::from_text("hello\n\nworld");
        assert_eq!(buf.line_len(0), 5);
        assert_eq!(buf.line_len(1), 0);
        assert_eq!(buf.line_len(2), 5);
    }

    #[test]
    fn text_bytes_matches_source() {
        let source = "return \"héllo\"\n";
        let buf = Buffer::from_text(source);
        assert_eq!(buf.text_bytes(), source.as_bytes());
        assert_eq!(buf.len_bytes(), source.len());
    }

    #[test]
    fn append_extends_document() {
        let mut buf = Buffer::from_text("one");
        assert!(!buf.ends_with_newline());
        buf.append("\ntwo\n");
        assert_eq!(buf.to_string(), "one\ntwo\n");
        assert!(buf.ends_with_newline());
    }

    #[test]
    fn from_file_reads_contents_and_keeps_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "print('hi')").unwrap();

        let buf = Buffer::from_file(file.path().to_path_buf()).unwrap();
        assert_eq!(buf.to_string(), "print('hi')\n");
        assert_eq!(buf.path(), Some(file.path()));
    }

    #[test]
    fn from_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Buffer::from_file(dir.path().join("missing.lua")).is_err());
    }
}
