use packrat_utils::{Error, PackratResult};
use std::fmt;

/// Name of the variable holding the semantic value of a production in
/// actions and bindings.
pub const VALUE: &str = "yyValue";

/// A literal semantic action: lines of host-language code together with
/// their indentation levels.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Action {
    pub code: Vec<String>,
    pub indent: Vec<usize>,
}

/// Horizontal whitespace stripped around line breaks.
const HSPACE: &[char] = &[' ', '\t', '\u{c}'];

impl Action {
    /// Create an action from already split lines.
    pub fn new(code: Vec<String>, indent: Vec<usize>) -> PackratResult<Self> {
        if code.len() != indent.len() {
            return Err(Error::contract(
                "Number of code lines and indentation levels inconsistent",
            ));
        }
        Ok(Action { code, indent })
    }

    /// Create an action from its source text. The text is split into lines,
    /// horizontal whitespace around line breaks is removed, and blank lines
    /// at the beginning and end are dropped together with their indentation
    /// levels.
    pub fn from_text(text: &str, mut indent: Vec<usize>) -> PackratResult<Self> {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let mut lines: Vec<&str> = normalized.split('\n').collect();
        let last = lines.len() - 1;
        for (i, line) in lines.iter_mut().enumerate() {
            let mut l = *line;
            if i > 0 {
                l = l.trim_start_matches(HSPACE);
            }
            if i < last {
                l = l.trim_end_matches(HSPACE);
            }
            *line = l;
        }
        // A split on line breaks drops trailing empty pieces.
        if lines.len() > 1 {
            while lines.last().is_some_and(|l| l.is_empty()) {
                lines.pop();
            }
        }

        if indent.len() < lines.len() {
            return Err(Error::contract(
                "List of indentation levels too short",
            ));
        }

        if let Some(first) = lines.first_mut() {
            *first = first.trim();
        }
        if lines.len() > 1 {
            if let Some(last) = lines.last_mut() {
                *last = last.trim();
            }
        }

        let start = lines.iter().position(|l| !l.is_empty());
        let end = lines.iter().rposition(|l| !l.is_empty());
        match (start, end) {
            (Some(start), Some(end)) => {
                indent.truncate(end + 1);
                indent.drain(..start);
                let code =
                    lines[start..=end].iter().map(|l| l.to_string()).collect();
                Ok(Action { code, indent })
            }
            _ => Ok(Action {
                code: Vec::new(),
                indent: Vec::new(),
            }),
        }
    }

    /// Append the lines of another action.
    pub fn add(&mut self, other: Action) {
        self.code.extend(other.code);
        self.indent.extend(other.indent);
    }

    /// Whether the action assigns the semantic value, approximated by any
    /// line mentioning the value variable.
    pub fn sets_value(&self) -> bool {
        self.code.iter().any(|line| line.contains(VALUE))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code.as_slice() {
            [] => write!(f, "{{ }}"),
            [line] => write!(f, "{{ {line} }}"),
            lines => {
                writeln!(f, "{{")?;
                for (line, indent) in lines.iter().zip(&self.indent) {
                    writeln!(f, "{:width$}{line}", "", width = 2 * (indent + 1))?;
                }
                write!(f, "}}")
            }
        }
    }
}
