//! Fixed-column parsing of `hp-info -i` output
//!
//! Each line carries a label in the first 30 columns and a value from column
//! 30 onward. Cartridge lines are labelled `agentN-<field>`; the field part
//! after the hyphen is what operators configure.

/// Column at which the value starts in `hp-info` output.
pub const VALUE_COLUMN: usize = 30;

/// Turns one line of status output into names the bridge understands.
pub trait LineParser {
    /// Name an operator would configure to select this line.
    fn candidate_name(&self, line: &str) -> Option<String>;

    /// Snapshot entry (full label, raw value) carried by this line.
    fn parse(&self, line: &str) -> Option<(String, String)>;
}

#[derive(Debug, Clone, Copy)]
pub struct HpInfoLayout {
    value_column: usize,
}

impl HpInfoLayout {
    pub fn with_value_column(value_column: usize) -> Self {
        Self { value_column }
    }
}

impl Default for HpInfoLayout {
    fn default() -> Self {
        Self::with_value_column(VALUE_COLUMN)
    }
}

impl LineParser for HpInfoLayout {
    /// `agent` is only looked for in the label columns, never in the value,
    /// for both startup validation and fetching.
    fn candidate_name(&self, line: &str) -> Option<String> {
        let (span, _) = split_at_column(line, self.value_column);

        let name = match span.find("agent") {
            Some(pos) => match span[pos..].find('-') {
                Some(dash) => &span[pos + dash + 1..],
                None => span,
            },
            None => span,
        };

        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    fn parse(&self, line: &str) -> Option<(String, String)> {
        let (span, value) = split_at_column(line, self.value_column);

        let label = line.trim_start();
        let key = match label.find("   ") {
            Some(end) => label[..end].trim(),
            None => span.trim(),
        };
        if key.is_empty() {
            return None;
        }

        Some((key.to_string(), value.to_string()))
    }
}

/// Splits `line` at character (not byte) `column`.
fn split_at_column(line: &str, column: usize) -> (&str, &str) {
    match line.char_indices().nth(column) {
        Some((idx, _)) => line.split_at(idx),
        None => (line, ""),
    }
}

/// Lines of command output, accepting both LF and CRLF endings.
pub fn lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, value: &str) -> String {
        format!("{:<30}{}", label, value)
    }

    #[test]
    fn test_plain_label_is_candidate() {
        let layout = HpInfoLayout::default();
        assert_eq!(
            layout.candidate_name(&row("status-desc", "Ready")),
            Some("status-desc".to_string())
        );
        assert_eq!(layout.candidate_name(&row("level", " 42%")), Some("level".to_string()));
    }

    #[test]
    fn test_agent_label_drops_prefix() {
        let layout = HpInfoLayout::default();
        assert_eq!(
            layout.candidate_name(&row("scan-agent-status", "OK")),
            Some("status".to_string())
        );
        assert_eq!(
            layout.candidate_name(&row("agent1-health-desc", "Good/OK")),
            Some("health-desc".to_string())
        );
        // no hyphen after "agent": keep the whole label
        assert_eq!(
            layout.candidate_name(&row("useragent", "x")),
            Some("useragent".to_string())
        );
    }

    #[test]
    fn test_agent_in_value_is_ignored() {
        let layout = HpInfoLayout::default();
        assert_eq!(
            layout.candidate_name(&row("model", "agent-x")),
            Some("model".to_string())
        );
    }

    #[test]
    fn test_parse_keeps_value_whitespace() {
        let layout = HpInfoLayout::default();
        let (key, value) = layout.parse(&row("level", " 42%")).unwrap();
        assert_eq!(key, "level");
        assert_eq!(value, " 42%");

        let (key, value) = layout.parse(&row("agent1-level", "80")).unwrap();
        assert_eq!(key, "agent1-level");
        assert_eq!(value, "80");
    }

    #[test]
    fn test_parse_short_and_blank_lines() {
        let layout = HpInfoLayout::default();
        assert_eq!(layout.parse("serial"), Some(("serial".to_string(), String::new())));
        assert_eq!(layout.parse("   "), None);
        assert_eq!(layout.candidate_name(""), None);
    }

    #[test]
    fn test_columns_count_characters() {
        let layout = HpInfoLayout::default();
        let line = row("désc", "Noir");
        let (key, value) = layout.parse(&line).unwrap();
        assert_eq!(key, "désc");
        assert_eq!(value, "Noir");
    }

    #[test]
    fn test_lines_handles_crlf() {
        let collected: Vec<&str> = lines("a\r\nb\nc").collect();
        assert_eq!(collected, vec!["a", "b", "c"]);
    }
}
