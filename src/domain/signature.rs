//! Error signatures for stagnation detection.
//!
//! Two failures are "the same error" when their kinds match and their
//! messages match after normalization:
//!
//! 1. leading/trailing whitespace trimmed, inner whitespace runs collapsed
//! 2. line and column numbers masked (`line 12` -> `line N`, `:12:5` -> `:N:N`,
//!    `main.sh: 2:` -> `main.sh: N:`)
//!
//! Harness paths are already gone by the time a message gets here (the
//! executor scrubs them). Identifiers and literal text are kept, so
//! `name 'x' is not defined` and `name 'y' is not defined` differ.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::LazyLock;

use super::attempt::{ErrorKind, Failure};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static LINE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(line|column|col)\s+\d+").expect("valid regex"));
static COLON_POSITION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":\d+(:\d+)?\b").expect("valid regex"));
// dash and friends: `main.sh: 2: cmd: not found`
static SPACED_POSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\.[A-Za-z]\w*):\s+\d+:").expect("valid regex"));

/// Normalize an error message for comparison.
pub fn normalize_message(message: &str) -> String {
    let collapsed = WHITESPACE.replace_all(message.trim(), " ");
    let masked = LINE_WORD.replace_all(&collapsed, |caps: &regex::Captures| format!("{} N", &caps[1]));
    let masked = SPACED_POSITION.replace_all(&masked, "$1: N:");
    COLON_POSITION
        .replace_all(&masked, |caps: &regex::Captures| {
            if caps.get(1).is_some() { ":N:N" } else { ":N" }.to_string()
        })
        .into_owned()
}

/// Comparable fingerprint of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorSignature {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorSignature {
    /// Derive the signature of a failure.
    pub fn of(failure: &Failure) -> Self {
        Self {
            kind: failure.kind.clone(),
            message: normalize_message(&failure.message),
        }
    }

    /// Short hex digest, for logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.message.as_bytes());
        hex::encode(&hasher.finalize()[..6])
    }
}

impl fmt::Display for ErrorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
