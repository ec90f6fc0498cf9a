//! Strategy that shells out to an external program.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::error::{SourceError, SourceResult};
use super::strategy::Strategy;
use crate::payload::Payload;

/// Placeholder replaced by the key in every templated argument.
pub const KEY_PLACEHOLDER: &str = "{key}";

/// Runs `program` once per attempt; stdout is the payload.
///
/// Exit status mapping: success returns stdout, any code listed in
/// `content_unavailable_exit_codes` aborts the chain, every other failure is
/// retriable. A missing or non-executable program disables the strategy.
/// The child is killed if the attempt is dropped (timeout or cancellation).
#[derive(Debug, Clone)]
pub struct CommandStrategy {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    extra_args: Vec<String>,
    content_unavailable_exit_codes: Vec<i32>,
}

impl CommandStrategy {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            extra_args: Vec::new(),
            content_unavailable_exit_codes: Vec::new(),
        }
    }

    /// Appends one templated argument (`{key}` is substituted).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments appended verbatim after the templated ones, e.g. auth cookies.
    pub fn extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn content_unavailable_exit_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.content_unavailable_exit_codes.extend(codes);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument list for `key`.
    pub fn command_args(&self, key: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(KEY_PLACEHOLDER, key))
            .chain(self.extra_args.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl Strategy for CommandStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, key: &str) -> SourceResult<Payload> {
        let label = self.program.display();

        let mut cmd = Command::new(&self.program);
        cmd.args(self.command_args(key))
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                return Err(SourceError::strategy_unavailable(format!(
                    "cannot run {label}: {e}"
                )));
            }
            Err(e) => {
                return Err(SourceError::retriable(format!(
                    "failed to spawn {label}: {e}"
                )));
            }
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SourceError::retriable(format!("failed waiting for {label}: {e}")))?;

        if output.status.success() {
            return Ok(Payload::from(output.stdout));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match output.status.code() {
            Some(code) if self.content_unavailable_exit_codes.contains(&code) => Err(
                SourceError::content_unavailable(format!("{label} exited with {code}: {stderr}")),
            ),
            Some(code) => Err(SourceError::retriable(format!(
                "{label} exited with {code}: {stderr}"
            ))),
            None => Err(SourceError::retriable(format!(
                "{label} terminated by signal: {stderr}"
            ))),
        }
    }
}
