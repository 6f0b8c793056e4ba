//! Section text format
//!
//! ```text
//! # leading comment block
//!
//! [section]
//! key = value
//! other: value
//!   continued on a second line
//! ```

use std::path::Path;

use crate::error::{Error, Result};

/// Raw content of one parsed file, in file order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub comments: Vec<String>,
    pub sections: Vec<(String, Vec<(String, String)>)>,
}

impl ParsedFile {
    fn current_entries(&mut self) -> Option<&mut Vec<(String, String)>> {
        self.sections.last_mut().map(|(_, entries)| entries)
    }
}

/// Parse section text. `path` is only used in error messages.
pub fn parse(text: &str, path: &Path) -> Result<ParsedFile> {
    let mut parsed = ParsedFile::default();
    let mut in_header = true;
    let mut continuable = false;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim_end_matches('\r');
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continuable = false;
            continue;
        }

        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            if in_header {
                let comment = trimmed.trim_start_matches(['#', ';']);
                parsed
                    .comments
                    .push(comment.strip_prefix(' ').unwrap_or(comment).to_string());
            }
            continue;
        }

        if continuable && line.starts_with([' ', '\t']) {
            if let Some((_, value)) = parsed.current_entries().and_then(|e| e.last_mut()) {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(trimmed);
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('[') {
            let name = rest.strip_suffix(']').ok_or_else(|| Error::Parse {
                path: path.to_path_buf(),
                line: line_no,
                message: format!("unterminated section header \"{}\"", trimmed),
            })?;
            in_header = false;
            continuable = false;
            parsed.sections.push((name.trim().to_string(), Vec::new()));
            continue;
        }

        let separator = trimmed.find(['=', ':']).ok_or_else(|| Error::Parse {
            path: path.to_path_buf(),
            line: line_no,
            message: format!("expected \"key = value\", got \"{}\"", trimmed),
        })?;
        let key = trimmed[..separator].trim();
        let value = trimmed[separator + 1..].trim();
        if key.is_empty() {
            return Err(Error::Parse {
                path: path.to_path_buf(),
                line: line_no,
                message: "empty key".to_string(),
            });
        }

        let entries = parsed.current_entries().ok_or_else(|| Error::Parse {
            path: path.to_path_buf(),
            line: line_no,
            message: format!("key \"{}\" outside of any section", key),
        })?;
        entries.push((key.to_string(), value.to_string()));
        continuable = true;
    }

    Ok(parsed)
}

/// Render a comment block followed by sections, in the order given
pub fn render<'a, S, K>(comments: &[String], sections: S) -> String
where
    S: IntoIterator<Item = (&'a str, K)>,
    K: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = String::new();
    for comment in comments {
        if comment.is_empty() {
            out.push_str("#\n");
        } else {
            out.push_str("# ");
            out.push_str(comment);
            out.push('\n');
        }
    }

    let mut first = comments.is_empty();
    for (name, entries) in sections {
        if !first {
            out.push('\n');
        }
        first = false;
        out.push('[');
        out.push_str(name);
        out.push_str("]\n");
        for (key, value) in entries {
            out.push_str(key);
            if value.is_empty() {
                out.push_str(" =\n");
                continue;
            }
            out.push_str(" = ");
            out.push_str(&value.replace('\n', "\n\t"));
            out.push('\n');
        }
    }
    out
}
