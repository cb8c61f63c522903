//! Run code in a child process.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::diagnose::{diagnose, scrub_paths};
use super::{CodeExecutor, ExecutorError};
use crate::domain::{CodeLanguage, Failure, Outcome};

/// Bytes of stdout and of stderr kept per execution; older output is dropped.
pub const OUTPUT_TAIL_BYTES: usize = 64 * 1024;

/// The last `limit` bytes of a stream.
#[derive(Debug)]
struct OutputTail {
    buf: Vec<u8>,
    dropped: usize,
    limit: usize,
}

impl OutputTail {
    fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            dropped: 0,
            limit,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
        if self.buf.len() > self.limit {
            let excess = self.buf.len() - self.limit;
            self.buf.drain(..excess);
            self.dropped += excess;
        }
    }

    fn text(&self) -> String {
        let body = String::from_utf8_lossy(&self.buf);
        if self.dropped > 0 {
            format!("[{} earlier bytes dropped]\n{}", self.dropped, body)
        } else {
            body.into_owned()
        }
    }
}

/// Read `reader` to EOF, keeping only the tail.
async fn drain<R: AsyncRead + Unpin>(reader: Option<R>, tail: &mut OutputTail) -> std::io::Result<()> {
    let Some(mut reader) = reader else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        tail.push(&chunk[..n]);
    }
}

/// Configuration for `ProcessExecutor`
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Kill the program after this long (default: 30000)
    pub timeout_ms: u64,
    /// Interpreter argv per language tag, overriding the built-in defaults
    pub interpreters: HashMap<String, Vec<String>>,
    /// Extra environment for the child
    pub env: Vec<(String, String)>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            interpreters: HashMap::new(),
            env: Vec::new(),
        }
    }
}

impl ExecutorConfig {
    /// Set the timeout in milliseconds
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Override the interpreter for a language tag
    pub fn interpreter(mut self, tag: impl Into<String>, argv: Vec<String>) -> Self {
        self.interpreters.insert(tag.into(), argv);
        self
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Executes each code body as `main.<ext>` in a fresh temp directory.
///
/// Nothing survives between executions: every call gets its own directory,
/// removed when the call returns.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    config: ExecutorConfig,
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Interpreter argv for `language`, config first.
    fn interpreter_for(&self, language: &CodeLanguage) -> Result<Vec<String>, ExecutorError> {
        let argv = self
            .config
            .interpreters
            .get(language.tag())
            .cloned()
            .or_else(|| language.default_interpreter())
            .ok_or_else(|| ExecutorError::Unavailable(format!("no interpreter for language '{}'", language)))?;
        if argv.is_empty() {
            return Err(ExecutorError::Unavailable(format!(
                "empty interpreter command for language '{}'",
                language
            )));
        }
        Ok(argv)
    }
}

#[async_trait]
impl CodeExecutor for ProcessExecutor {
    async fn execute(&self, code: &str, language: &CodeLanguage) -> Result<Outcome, ExecutorError> {
        let argv = self.interpreter_for(language)?;

        let workdir = tempfile::Builder::new()
            .prefix("catherder-")
            .tempdir()
            .map_err(|e| ExecutorError::Unavailable(format!("cannot create temp dir: {}", e)))?;
        let script_name = format!("main.{}", language.extension());
        tokio::fs::write(workdir.path().join(&script_name), code)
            .await
            .map_err(|e| ExecutorError::Unavailable(format!("cannot write {}: {}", script_name, e)))?;

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]).arg(&script_name);
        cmd.current_dir(workdir.path());
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::debug!("execute: {} {} in {}", argv.join(" "), script_name, workdir.path().display());

        let mut child = cmd
            .spawn()
            .map_err(|e| ExecutorError::Unavailable(format!("cannot launch '{}': {}", argv[0], e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut stdout_tail = OutputTail::new(OUTPUT_TAIL_BYTES);
        let mut stderr_tail = OutputTail::new(OUTPUT_TAIL_BYTES);

        let run = async {
            let (out, err, status) = tokio::join!(
                drain(stdout, &mut stdout_tail),
                drain(stderr, &mut stderr_tail),
                child.wait()
            );
            out?;
            err?;
            Ok::<_, std::io::Error>(status?)
        };
        let waited = tokio::time::timeout(Duration::from_millis(self.config.timeout_ms), run).await;

        let status = match waited {
            Ok(result) => result.map_err(|e| ExecutorError::Unavailable(format!("wait failed: {}", e)))?,
            Err(_) => {
                log::info!("execute: timed out after {}ms", self.config.timeout_ms);
                if let Err(e) = child.start_kill() {
                    log::debug!("execute: kill after timeout failed: {}", e);
                }
                let output = format!("{}{}", stderr_tail.text(), stdout_tail.text());
                let detail = scrub_paths(output.trim(), workdir.path());
                return Ok(Outcome::Failure(Failure::timeout(self.config.timeout_ms).with_detail(detail)));
            }
        };

        if stdout_tail.dropped > 0 || stderr_tail.dropped > 0 {
            log::warn!(
                "execute: output truncated (stdout {} bytes, stderr {} bytes dropped)",
                stdout_tail.dropped,
                stderr_tail.dropped
            );
        }

        let stdout = scrub_paths(&stdout_tail.text(), workdir.path());
        if status.success() {
            return Ok(Outcome::Success { stdout });
        }

        let stderr = scrub_paths(&stderr_tail.text(), workdir.path());
        let failure = diagnose(&stderr, &stdout, status.code());
        log::debug!("execute: failed with {}", failure);
        Ok(Outcome::Failure(failure))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    fn shell() -> ProcessExecutor {
        ProcessExecutor::new(ExecutorConfig::default().timeout_ms(5000))
    }

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let outcome = shell().execute("echo hello world", &CodeLanguage::Shell).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Success {
                stdout: "hello world\n".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let outcome = shell()
            .execute("echo 'boom' >&2\nexit 3", &CodeLanguage::Shell)
            .await
            .unwrap();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::ExitStatus(3));
        assert_eq!(failure.message, "boom");
    }

    #[tokio::test]
    async fn test_exception_line_is_recognized() {
        let outcome = shell()
            .execute("echo 'ValueError: bad value' >&2\nexit 1", &CodeLanguage::Shell)
            .await
            .unwrap();
        assert_eq!(
            outcome.failure().unwrap().kind,
            ErrorKind::Exception("ValueError".to_string())
        );
    }

    #[tokio::test]
    async fn test_timeout() {
        let executor = ProcessExecutor::new(ExecutorConfig::default().timeout_ms(200));
        let outcome = executor.execute("sleep 10", &CodeLanguage::Shell).await.unwrap();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert_eq!(failure.message, "execution timed out after 200ms");
    }

    #[tokio::test]
    async fn test_endless_output_is_bounded() {
        let executor = ProcessExecutor::new(ExecutorConfig::default().timeout_ms(500));
        let outcome = executor
            .execute("yes 'spam spam spam spam'", &CodeLanguage::Shell)
            .await
            .unwrap();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert!(failure.detail.contains("spam spam"));
        assert!(failure.detail.contains("earlier bytes dropped"));
        assert!(failure.detail.len() <= 2 * OUTPUT_TAIL_BYTES + 128);
    }

    #[tokio::test]
    async fn test_large_output_keeps_tail() {
        let outcome = shell()
            .execute(
                "i=0\nwhile [ $i -lt 20000 ]; do echo \"line $i of noise\"; i=$((i+1)); done\necho 'fatal: at the end' >&2\nexit 4",
                &CodeLanguage::Shell,
            )
            .await
            .unwrap();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::ExitStatus(4));
        assert_eq!(failure.message, "fatal: at the end");
    }

    #[test]
    fn test_output_tail_keeps_last_bytes() {
        let mut tail = OutputTail::new(8);
        tail.push(b"abcdef");
        tail.push(b"ghijkl");
        assert_eq!(tail.buf, b"efghijkl");
        assert_eq!(tail.dropped, 4);
        assert_eq!(tail.text(), "[4 earlier bytes dropped]\nefghijkl");
    }

    #[tokio::test]
    async fn test_killed_by_signal() {
        let outcome = shell().execute("kill -9 $$", &CodeLanguage::Shell).await.unwrap();
        assert_eq!(outcome.failure().unwrap().kind, ErrorKind::Signal);
    }

    #[tokio::test]
    async fn test_harness_paths_are_scrubbed() {
        let outcome = shell()
            .execute("echo \"$(pwd)/main.sh failed\" >&2\nexit 1", &CodeLanguage::Shell)
            .await
            .unwrap();
        assert_eq!(outcome.failure().unwrap().message, "main.sh failed");
    }

    #[tokio::test]
    async fn test_executions_are_isolated() {
        let executor = shell();
        let first = executor
            .execute("touch leftover.txt && echo made", &CodeLanguage::Shell)
            .await
            .unwrap();
        assert!(first.is_success());

        let second = executor
            .execute("test -e leftover.txt && echo present || echo absent", &CodeLanguage::Shell)
            .await
            .unwrap();
        assert_eq!(
            second,
            Outcome::Success {
                stdout: "absent\n".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_unavailable() {
        let executor = ProcessExecutor::new(
            ExecutorConfig::default().interpreter("sh", vec!["definitely-not-a-real-interpreter-xyz".to_string()]),
        );
        let err = executor.execute("echo hi", &CodeLanguage::Shell).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_non_executable_language_is_unavailable() {
        let err = shell()
            .execute("\\documentclass{article}", &CodeLanguage::Other("latex".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_interpreter_override_and_env() {
        let executor = ProcessExecutor::new(
            ExecutorConfig::default()
                .interpreter("sh", vec!["sh".to_string(), "-e".to_string()])
                .env("CATHERDER_TEST_VALUE", "42"),
        );
        let outcome = executor
            .execute("echo $CATHERDER_TEST_VALUE\nfalse\necho unreachable", &CodeLanguage::Shell)
            .await
            .unwrap();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::ExitStatus(1));
        assert_eq!(failure.message, "42");
    }

    #[tokio::test]
    async fn test_python_name_error() {
        if std::process::Command::new("python3").arg("--version").output().is_err() {
            return;
        }
        let outcome = shell().execute("print(x)", &CodeLanguage::Python).await.unwrap();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::Exception("NameError".to_string()));
        assert_eq!(failure.message, "name 'x' is not defined");
        assert!(failure.detail.contains("main.py"));
        assert!(!failure.detail.contains("catherder-"));
    }
}
