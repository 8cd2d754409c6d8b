//! Running external command-line tools.
//!
//! Collectors never spawn processes directly. They describe the invocation as a [`ToolCommand`]
//! and hand it to a [`ToolRunner`], which makes the tool seam replaceable in tests.
//!
//! The raw result of a run is then classified into one of three outcomes that callers must keep
//! apart, because "no findings" and "the tool failed" render very differently:
//!
//! - the tool is not installed ([`ToolFailure::Unavailable`]),
//! - the tool printed no JSON at all ([`ToolOutcome::NoJson`]),
//! - the tool printed a JSON document ([`ToolOutcome::Json`]), which may still turn out to be
//!   malformed when parsed ([`ToolFailure::MalformedOutput`]).

use crate::Result;
use core::fmt;
use core::time::Duration;
use ohno::bail;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

const LOG_TARGET: &str = "      tool";

/// Exit status shells use for "command not found"
const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Lines that debuggers and IDE integrations inject into tool output
const NOISE_MARKERS: [&str; 4] = ["Subprocess Debugger", "ruby-debug-ide", "debase", "listens on"];

/// One invocation of an external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl ToolCommand {
    /// Build a command from a configured argument vector, program first
    pub fn from_argv(argv: &[String], working_dir: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("tool command line is empty");
        };

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: working_dir.as_ref().to_path_buf(),
            timeout,
        })
    }

    /// The command line as a user would type it
    #[must_use]
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Combined output and exit status of a finished tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    /// Standard output followed by standard error
    pub output: String,

    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl RawOutput {
    #[must_use]
    pub fn new(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code: Some(exit_code),
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Why a tool run produced no usable result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolFailure {
    /// The tool is not installed or not on the `PATH`
    Unavailable { tool: String },

    /// The tool ran but its output could not be understood
    MalformedOutput { detail: String },

    /// The tool could not be run or failed without producing a result
    Failed { exit_code: Option<i32>, output: String },

    /// The tool did not finish within its time budget and was killed
    TimedOut { after_secs: u64 },
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { tool } => write!(f, "'{tool}' is not installed"),
            Self::MalformedOutput { detail } => write!(f, "unreadable tool output: {detail}"),
            Self::Failed {
                exit_code: Some(code),
                output,
            } => write!(f, "tool exited with status {code}: {}", first_line(output)),
            Self::Failed { exit_code: None, output } => write!(f, "tool failed: {}", first_line(output)),
            Self::TimedOut { after_secs } => write!(f, "tool timed out after {after_secs}s"),
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or("no output")
}

/// What a finished tool run amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The JSON document embedded in the output
    Json(String),

    /// The output held no JSON document
    NoJson { success: bool, output: String },
}

/// Runs external tools
pub trait ToolRunner: Send + Sync {
    /// Run `command` to completion, or until its timeout expires
    fn run(&self, command: &ToolCommand) -> impl Future<Output = Result<RawOutput, ToolFailure>> + Send;
}

/// Runs tools as child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    async fn run(&self, command: &ToolCommand) -> Result<RawOutput, ToolFailure> {
        log::info!(target: LOG_TARGET, "Running '{}' in '{}'", command.display(), command.working_dir.display());

        let child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(target: LOG_TARGET, "'{}' is not installed", command.program);
                return Err(ToolFailure::Unavailable {
                    tool: command.program.clone(),
                });
            }
            Err(e) => {
                return Err(ToolFailure::Failed {
                    exit_code: None,
                    output: format!("unable to start '{}': {e}", command.program),
                });
            }
        };

        // Dropping the child on timeout kills it
        let Ok(output) = tokio::time::timeout(command.timeout, child.wait_with_output()).await else {
            log::warn!(target: LOG_TARGET, "'{}' timed out after {:?}", command.display(), command.timeout);
            return Err(ToolFailure::TimedOut {
                after_secs: command.timeout.as_secs(),
            });
        };

        let output = output.map_err(|e| ToolFailure::Failed {
            exit_code: None,
            output: format!("unable to collect output of '{}': {e}", command.program),
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        log::debug!(target: LOG_TARGET, "'{}' exited with {:?}", command.program, output.status.code());

        Ok(RawOutput {
            output: text,
            exit_code: output.status.code(),
        })
    }
}

/// Replays canned results instead of running anything
///
/// Programs without a scripted response behave as if they were not installed.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, Result<RawOutput, ToolFailure>>>,
    calls: AtomicUsize,
}

impl ScriptedRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every run of `program` with `response`
    #[must_use]
    pub fn with_response(self, program: impl Into<String>, response: Result<RawOutput, ToolFailure>) -> Self {
        let _ = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(program.into(), response);
        self
    }

    /// Number of runs requested so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ToolRunner for ScriptedRunner {
    async fn run(&self, command: &ToolCommand) -> Result<RawOutput, ToolFailure> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&command.program)
            .cloned()
            .unwrap_or_else(|| {
                Err(ToolFailure::Unavailable {
                    tool: command.program.clone(),
                })
            })
    }
}

/// Run `command` and classify the result
pub async fn run_tool<R: ToolRunner>(runner: &R, command: &ToolCommand) -> Result<ToolOutcome, ToolFailure> {
    let raw = runner.run(command).await?;
    classify(command, raw)
}

/// Turn a finished run into a [`ToolOutcome`], recognizing shells that could not find the tool
pub fn classify(command: &ToolCommand, raw: RawOutput) -> Result<ToolOutcome, ToolFailure> {
    if raw.exit_code == Some(EXIT_COMMAND_NOT_FOUND) || raw.output.contains("command not found") {
        return Err(ToolFailure::Unavailable {
            tool: command.program.clone(),
        });
    }

    Ok(match extract_json(&raw.output) {
        Some(json) => ToolOutcome::Json(json),
        None => ToolOutcome::NoJson {
            success: raw.success(),
            output: raw.output,
        },
    })
}

/// Deserialize a JSON document produced by a tool
pub fn parse_tool_json<T: DeserializeOwned>(json: &str) -> Result<T, ToolFailure> {
    serde_json::from_str(json).map_err(|e| ToolFailure::MalformedOutput { detail: e.to_string() })
}

fn is_noise(line: &str) -> bool {
    NOISE_MARKERS.iter().any(|marker| line.contains(marker))
}

fn brace_delta(line: &str) -> i64 {
    line.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

/// Find the first top-level JSON object in noisy tool output
///
/// Noise lines are skipped. Collection starts at the first line that begins with `{` and
/// continues until the braces seen so far balance out.
#[must_use]
pub fn extract_json(raw_output: &str) -> Option<String> {
    let mut collected: Vec<&str> = Vec::new();
    let mut depth = 0;

    for line in raw_output.lines() {
        if is_noise(line) {
            continue;
        }

        if collected.is_empty() && !line.trim_start().starts_with('{') {
            continue;
        }

        collected.push(line);
        depth += brace_delta(line);
        if depth <= 0 {
            break;
        }
    }

    if collected.is_empty() { None } else { Some(collected.join("\n")) }
}
