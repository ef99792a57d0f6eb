/// Forward-only scanner over shader source split into lines.
///
/// The index only ever advances; a line is never revisited. Lines are split
/// on `\n` with a trailing `\r` trimmed, so CRLF sources recompose with
/// plain `\n`. A source ending in a newline contributes no phantom final
/// line.
#[derive(Debug)]
pub struct LineCursor {
    lines: Vec<String>,
    index: usize,
}

impl LineCursor {
    pub fn new(source: &str) -> Self {
        let mut lines: Vec<String> = source
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect();
        if lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        Self { lines, index: 0 }
    }

    pub fn can_read(&self) -> bool {
        self.index < self.lines.len()
    }

    /// Advance and return the next line, or `None` at end of input.
    pub fn next_line(&mut self) -> Option<String> {
        let line = self.lines.get(self.index)?.clone();
        self.index += 1;
        Some(line)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lines_in_order() {
        let mut cursor = LineCursor::new("a\nb\nc");
        assert_eq!(cursor.line_count(), 3);
        assert_eq!(cursor.next_line().as_deref(), Some("a"));
        assert_eq!(cursor.next_line().as_deref(), Some("b"));
        assert_eq!(cursor.next_line().as_deref(), Some("c"));
        assert!(!cursor.can_read());
        assert_eq!(cursor.next_line(), None);
    }

    #[test]
    fn trailing_newline_adds_no_phantom_line() {
        let cursor = LineCursor::new("a\nb\n");
        assert_eq!(cursor.line_count(), 2);
    }

    #[test]
    fn interior_blank_lines_are_kept() {
        let cursor = LineCursor::new("a\n\nb\n");
        assert_eq!(cursor.line_count(), 3);
    }

    #[test]
    fn crlf_line_endings_are_trimmed() {
        let mut cursor = LineCursor::new("a\r\nb\r\n");
        assert_eq!(cursor.next_line().as_deref(), Some("a"));
        assert_eq!(cursor.next_line().as_deref(), Some("b"));
        assert!(!cursor.can_read());
    }

    #[test]
    fn empty_source_has_no_lines() {
        let cursor = LineCursor::new("");
        assert_eq!(cursor.line_count(), 0);
        assert!(!cursor.can_read());
    }
}
