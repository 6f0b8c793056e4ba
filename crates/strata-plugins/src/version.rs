//! Version requirements between plugins
//!
//! Versions that are both valid semver compare as semver. Anything else
//! falls back to Debian version ordering, where `~` sorts before the end of
//! the string (`1.0~rc1 < 1.0`) and other punctuation after it
//! (`1.0+bpo1 > 1.0`).

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator of a version requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VersionOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl VersionOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            VersionOp::Eq => "=",
            VersionOp::Gt => ">",
            VersionOp::Ge => ">=",
            VersionOp::Lt => "<",
            VersionOp::Le => "<=",
        }
    }

    /// Operator for a descriptor key (`eq`, `ge`, ...) or a symbol (`>=`, ...)
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "eq" | "=" => Some(VersionOp::Eq),
            "gt" | ">" => Some(VersionOp::Gt),
            "ge" | ">=" => Some(VersionOp::Ge),
            "lt" | "<" => Some(VersionOp::Lt),
            "le" | "<=" => Some(VersionOp::Le),
            _ => None,
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            VersionOp::Eq => ordering == Ordering::Equal,
            VersionOp::Gt => ordering == Ordering::Greater,
            VersionOp::Ge => ordering != Ordering::Less,
            VersionOp::Lt => ordering == Ordering::Less,
            VersionOp::Le => ordering != Ordering::Greater,
        }
    }
}

impl fmt::Display for VersionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `<op> <version>` constraint on a dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub op: VersionOp,
    pub version: String,
}

impl Requirement {
    pub fn new(op: VersionOp, version: impl Into<String>) -> Self {
        Self {
            op,
            version: version.into(),
        }
    }

    /// Whether `actual` satisfies this requirement
    pub fn matches(&self, actual: &str) -> bool {
        self.op.accepts(compare_versions(actual, &self.version))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.version)
    }
}

/// Order two version strings
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.trim(), b.trim());
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => debian_cmp(a.as_bytes(), b.as_bytes()),
    }
}

fn char_order(c: Option<&u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(*c),
        Some(c) => i32::from(*c) + 256,
    }
}

fn debian_cmp(a: &[u8], b: &[u8]) -> Ordering {
    let (mut i, mut j) = (0, 0);
    let is_digit = |s: &[u8], k: usize| s.get(k).is_some_and(u8::is_ascii_digit);

    while i < a.len() || j < b.len() {
        while (i < a.len() && !is_digit(a, i)) || (j < b.len() && !is_digit(b, j)) {
            let (ac, bc) = (char_order(a.get(i)), char_order(b.get(j)));
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while is_digit(a, i) && is_digit(b, j) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }
        if is_digit(a, i) {
            return Ordering::Greater;
        }
        if is_digit(b, j) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }
    Ordering::Equal
}
