use std::collections::HashMap;

/// Macro symbols active for one preprocessing pass.
///
/// A name is defined iff present; a valueless define still counts as
/// defined. Built fresh per pass and read-mostly during evaluation; the
/// only writers after construction are `#define` lines discovered on the
/// executed branch path.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Option<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `"#define NAME [VALUE]"` lines.
    ///
    /// Lines that do not parse as a define are skipped.
    pub fn from_defines(defines: &[String]) -> Self {
        let mut table = Self::new();
        for line in defines {
            table.add_define_line(line);
        }
        table
    }

    /// Parse one `#define` line into the table; other lines are ignored.
    pub fn add_define_line(&mut self, line: &str) {
        if let Some((name, value)) = parse_define_line(line) {
            self.symbols.insert(name, value);
        }
    }

    pub fn define(&mut self, name: impl Into<String>, value: Option<String>) {
        self.symbols.insert(name.into(), value);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Value of a symbol, or `None` when undefined or valueless.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.symbols.get(name).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Split a `#define NAME [VALUE]` line into name and optional value.
///
/// The trailing `;` shader authors sometimes carry over is dropped.
pub(crate) fn parse_define_line(line: &str) -> Option<(String, Option<String>)> {
    let trimmed = line.trim().trim_end_matches(';').trim_end();
    let rest = trimmed.strip_prefix("#define")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let mut parts = rest.trim_start().splitn(2, char::is_whitespace);
    let name = parts.next().filter(|n| !n.is_empty())?;
    let value = parts
        .next()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    Some((name.to_string(), value))
}
