//! Turn raw process output into a `Failure`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{ErrorKind, Failure};

/// `SyntaxError: invalid syntax`, `json.decoder.JSONDecodeError: ...`, a bare `KeyboardInterrupt`
static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z_][\w]*\.)*([A-Za-z_]\w*(?:Error|Exception|Interrupt|Exit))(?::\s*(.*))?$")
        .expect("error line regex")
});

/// Ruby style: `main.rb:1:in '<main>': undefined method 'x' (NoMethodError)`
static TRAILING_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*\(([A-Z]\w*(?:Error|Exception))\)$").expect("trailing class regex"));

/// Remove the harness directory prefix from every path in `text`.
pub fn scrub_paths(text: &str, dir: &Path) -> String {
    let mut out = text.to_string();
    let mut prefixes = vec![dir.to_path_buf()];
    if let Ok(canonical) = dir.canonicalize() {
        if canonical != dir {
            prefixes.push(canonical);
        }
    }
    for prefix in prefixes {
        let prefix = prefix.to_string_lossy();
        out = out.replace(&format!("{}/", prefix), "").replace(prefix.as_ref(), ".");
    }
    out
}

/// Classify a failed run from its (already scrubbed) output.
///
/// `exit_code` is `None` when the process was killed by a signal.
pub fn diagnose(stderr: &str, stdout: &str, exit_code: Option<i32>) -> Failure {
    let detail = stderr.trim().to_string();

    for line in stderr.lines().rev().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(caps) = ERROR_LINE.captures(line) {
            let name = caps[1].to_string();
            let message = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            return Failure::new(ErrorKind::Exception(name), message).with_detail(detail);
        }
        if let Some(caps) = TRAILING_CLASS.captures(line) {
            let name = caps[2].to_string();
            return Failure::new(ErrorKind::Exception(name), caps[1].trim()).with_detail(detail);
        }
    }

    let last_line = |text: &str| {
        text.lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    };

    match exit_code {
        None => {
            let message = last_line(stderr).unwrap_or_else(|| "killed by signal".to_string());
            Failure::new(ErrorKind::Signal, message).with_detail(detail)
        }
        Some(code) => {
            let message = last_line(stderr)
                .or_else(|| last_line(stdout))
                .unwrap_or_else(|| format!("process exited with status {}", code));
            Failure::new(ErrorKind::ExitStatus(code), message).with_detail(detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PY_TRACEBACK: &str = "Traceback (most recent call last):\n  File \"main.py\", line 3, in <module>\n    print(x)\nNameError: name 'x' is not defined\n";

    #[test]
    fn test_python_exception() {
        let failure = diagnose(PY_TRACEBACK, "", Some(1));
        assert_eq!(failure.kind, ErrorKind::Exception("NameError".into()));
        assert_eq!(failure.message, "name 'x' is not defined");
        assert!(failure.detail.starts_with("Traceback"));
    }

    #[test]
    fn test_python_syntax_error() {
        let stderr = "  File \"main.py\", line 1\n    print('a'\n         ^\nSyntaxError: '(' was never closed\n";
        let failure = diagnose(stderr, "", Some(1));
        assert_eq!(failure.kind, ErrorKind::Exception("SyntaxError".into()));
        assert_eq!(failure.message, "'(' was never closed");
    }

    #[test]
    fn test_dotted_exception_name() {
        let failure = diagnose("json.decoder.JSONDecodeError: Expecting value: line 1 column 1", "", Some(1));
        assert_eq!(failure.kind, ErrorKind::Exception("JSONDecodeError".into()));
        assert_eq!(failure.message, "Expecting value: line 1 column 1");
    }

    #[test]
    fn test_bare_interrupt() {
        let failure = diagnose("Traceback...\nKeyboardInterrupt\n", "", Some(130));
        assert_eq!(failure.kind, ErrorKind::Exception("KeyboardInterrupt".into()));
        assert_eq!(failure.message, "");
    }

    #[test]
    fn test_node_error() {
        let stderr = "main.js:1\nconsole.log(x)\n            ^\n\nReferenceError: x is not defined\n    at Object.<anonymous> (main.js:1:13)\n\nNode.js v20.0.0\n";
        let failure = diagnose(stderr, "", Some(1));
        assert_eq!(failure.kind, ErrorKind::Exception("ReferenceError".into()));
        assert_eq!(failure.message, "x is not defined");
    }

    #[test]
    fn test_ruby_error() {
        let stderr = "main.rb:1:in `<main>': undefined local variable or method `x' for main:Object (NameError)\n";
        let failure = diagnose(stderr, "", Some(1));
        assert_eq!(failure.kind, ErrorKind::Exception("NameError".into()));
        assert!(failure.message.starts_with("main.rb:1:in"));
    }

    #[test]
    fn test_plain_exit_status() {
        let failure = diagnose("main.sh: 2: frobnicate: not found\n", "", Some(127));
        assert_eq!(failure.kind, ErrorKind::ExitStatus(127));
        assert_eq!(failure.message, "main.sh: 2: frobnicate: not found");
    }

    #[test]
    fn test_exit_status_falls_back_to_stdout_then_code() {
        let failure = diagnose("", "partial output\nbad thing happened\n", Some(3));
        assert_eq!(failure.message, "bad thing happened");

        let failure = diagnose("", "", Some(4));
        assert_eq!(failure.kind, ErrorKind::ExitStatus(4));
        assert_eq!(failure.message, "process exited with status 4");
    }

    #[test]
    fn test_signal() {
        let failure = diagnose("", "", None);
        assert_eq!(failure.kind, ErrorKind::Signal);
        assert_eq!(failure.message, "killed by signal");
    }

    #[test]
    fn test_scrub_paths() {
        let dir = Path::new("/tmp/.tmpAbC123");
        let text = "File \"/tmp/.tmpAbC123/main.py\", line 3\ncwd: /tmp/.tmpAbC123";
        assert_eq!(scrub_paths(text, dir), "File \"main.py\", line 3\ncwd: .");
    }

    #[test]
    fn test_scrubbed_failures_compare_equal_across_dirs() {
        let a = scrub_paths("  File \"/tmp/.tmpA/main.py\", line 1\nSyntaxError: invalid syntax", Path::new("/tmp/.tmpA"));
        let b = scrub_paths("  File \"/tmp/.tmpB/main.py\", line 1\nSyntaxError: invalid syntax", Path::new("/tmp/.tmpB"));
        assert_eq!(diagnose(&a, "", Some(1)), diagnose(&b, "", Some(1)));
    }
}
