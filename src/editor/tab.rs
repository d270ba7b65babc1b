use std::collections::BTreeSet;
use std::sync::RwLock;

use super::Buffer;

/// Unique identifier for a tab
pub type TabId = usize;

/// An editor tab that receives streamed output.
///
/// Appends may come from any thread; each one takes the content lock, so the
/// order of calls is the order of the text.
pub struct Tab {
    id: TabId,
    name: String,
    content: RwLock<TabContent>,
}

#[derive(Default)]
struct TabContent {
    buffer: Buffer,
    /// Lines written by `append_error`
    error_lines: BTreeSet<usize>,
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,
}

impl Tab {
    pub fn new(id: TabId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            content: RwLock::new(TabContent::default()),
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append raw output bytes.
    ///
    /// A multi-byte character split across two calls is joined once the
    /// rest of it arrives. Invalid sequences become U+FFFD.
    pub fn append_bytes(&self, bytes: &[u8]) {
        if let Ok(mut content) = self.content.write() {
            let mut data = std::mem::take(&mut content.pending);
            data.extend_from_slice(bytes);

            let mut rest = data.as_slice();
            let mut text = String::new();
            loop {
                match std::str::from_utf8(rest) {
                    Ok(valid) => {
                        text.push_str(valid);
                        break;
                    }
                    Err(err) => {
                        let (valid, after) = rest.split_at(err.valid_up_to());
                        text.push_str(&String::from_utf8_lossy(valid));
                        match err.error_len() {
                            Some(len) => {
                                text.push(char::REPLACEMENT_CHARACTER);
                                rest = &after[len..];
                            }
                            None => {
                                content.pending = after.to_vec();
                                break;
                            }
                        }
                    }
                }
            }

            content.buffer.append(&text);
        }
    }

    /// Append a message as visually distinguished error lines
    pub fn append_error(&self, message: &str) {
        if let Ok(mut content) = self.content.write() {
            if !content.pending.is_empty() {
                let pending = std::mem::take(&mut content.pending);
                content.buffer.append(&String::from_utf8_lossy(&pending));
            }
            if !content.buffer.ends_with_newline() {
                content.buffer.append("\n");
            }

            let message = message.trim_end_matches('\n');
            let first = content.buffer.line_count() - 1;
            let count = message.split('\n').count();
            content.error_lines.extend(first..first + count);
            content.buffer.append(message);
            content.buffer.append("\n");
        }
    }

    pub fn text(&self) -> String {
        self.content
            .read()
            .map(|c| c.buffer.to_string())
            .unwrap_or_default()
    }

    pub fn line_count(&self) -> usize {
        self.content
            .read()
            .map(|c| c.buffer.line_count())
            .unwrap_or(0)
    }

    pub fn is_error_line(&self, idx: usize) -> bool {
        self.content
            .read()
            .map(|c| c.error_lines.contains(&idx))
            .unwrap_or(false)
    }

    /// Snapshot of every line (without its line break) and whether it is an
    /// error line. The empty line after a trailing newline is left out.
    pub fn lines(&self) -> Vec<(String, bool)> {
        let Ok(content) = self.content.read() else {
            return Vec::new();
        };

        let buffer = &content.buffer;
        let mut count = buffer.line_count();
        if count > 0 && buffer.line_len(count - 1) == 0 {
            count -= 1;
        }

        (0..count)
            .map(|idx| {
                let line = buffer.line(idx).to_string();
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                (line, content.error_lines.contains(&idx))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_bytes_preserves_call_order() {
        let tab = Tab::new(0, "Lua(0)");
        tab.append_bytes(b"1");
        tab.append_bytes(b"2\n");
        tab.append_bytes(b"3");
        assert_eq!(tab.text(), "12\n3");
        assert_eq!(tab.name(), "Lua(0)");
    }

    #[test]
    fn append_bytes_joins_split_characters() {
        let tab = Tab::new(0, "out");
        let bytes = "é".as_bytes();
        tab.append_bytes(&bytes[..1]);
        assert_eq!(tab.text(), "");
        tab.append_bytes(&bytes[1..]);
        assert_eq!(tab.text(), "é");
    }

    #[test]
    fn append_bytes_replaces_invalid_sequences() {
        let tab = Tab::new(0, "out");
        tab.append_bytes(b"a\xffb");
        assert_eq!(tab.text(), "a\u{fffd}b");
    }

    #[test]
    fn append_error_starts_on_its_own_line() {
        let tab = Tab::new(0, "out");
        tab.append_bytes(b"partial");
        tab.append_error("boom");
        tab.append_bytes(b"after\n");

        assert_eq!(tab.text(), "partial\nboom\nafter\n");
        assert_eq!(
            tab.lines(),
            vec![
                ("partial".to_string(), false),
                ("boom".to_string(), true),
                ("after".to_string(), false),
            ]
        );
        assert!(tab.is_error_line(1));
        assert!(!tab.is_error_line(0));
    }

    #[test]
    fn append_error_on_empty_tab_is_first_line() {
        let tab = Tab::new(3, "out");
        tab.append_error("syntax error\n");
        assert_eq!(tab.text(), "syntax error\n");
        assert_eq!(tab.lines(), vec![("syntax error".to_string(), true)]);
        assert_eq!(tab.id(), 3);
    }

    #[test]
    fn multi_line_error_marks_every_line() {
        let tab = Tab::new(0, "out");
        tab.append_bytes(b"before\n");
        tab.append_error("first\nsecond");
        tab.append_bytes(b"after\n");

        assert_eq!(
            tab.lines(),
            vec![
                ("before".to_string(), false),
                ("first".to_string(), true),
                ("second".to_string(), true),
                ("after".to_string(), false),
            ]
        );
    }

    #[test]
    fn appends_from_many_threads_are_not_lost() {
        let tab = std::sync::Arc::new(Tab::new(0, "out"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tab = std::sync::Arc::clone(&tab);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        tab.append_bytes(b"x\n");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tab.lines().len(), 200);
    }
}
