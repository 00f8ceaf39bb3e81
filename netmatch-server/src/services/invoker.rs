//! Computation invoker
//!
//! Bridge to the external scoring unit. The unit is opaque: NETMATCH only
//! knows the action names, the flat argument list, and that a JSON document
//! (or plain text) comes back on standard output.
//!
//! [`ProcessInvoker`] runs the unit as a child process per call:
//! `<program> <base args...> --action <action> [--<key>=<value>]...`
//!
//! Each call holds a permit from a counting semaphore for its whole run. One
//! deadline bounds the call from the moment it is made, queueing for a
//! permit included; on expiry a running child is killed.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Default bound on a single invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default number of invocations allowed to run at once
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Scoring unit behavior selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ProcessUser,
    GenerateMatches,
    GetUserMatches,
    GetAllMatches,
    GetSampleData,
}

impl Action {
    /// Name passed after `--action`
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ProcessUser => "process_user",
            Action::GenerateMatches => "generate_matches",
            Action::GetUserMatches => "get_user_matches",
            Action::GetAllMatches => "get_all_matches",
            Action::GetSampleData => "get_sample_data",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat string arguments, emitted in key order as `--<key>=<value>`
///
/// Key and value travel as one argument so a value starting with `-` is
/// never read as an option.
pub type InvocationParams = BTreeMap<String, String>;

/// Parameter carrying a JSON-serialized payload
pub const PARAM_DATA: &str = "data";

/// Parameter carrying a user identity
pub const PARAM_USER_ID: &str = "user_id";

/// Scoring unit invocation errors
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The unit could not be started at all
    #[error("Scoring unit unavailable: {0}")]
    Unavailable(String),

    /// The unit ran and exited unsuccessfully
    #[error("Scoring unit failed ({status}): {stderr}")]
    Failed {
        /// Human-readable exit description
        status: String,
        code: Option<i32>,
        signal: Option<i32>,
        /// Captured error stream
        stderr: String,
    },

    /// The unit did not finish within the configured bound and was killed
    #[error("Scoring unit timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

impl InvokeError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            InvokeError::Unavailable(_) => "COMPUTATION_UNAVAILABLE",
            InvokeError::Failed { .. } => "COMPUTATION_FAILED",
            InvokeError::Timeout(_) => "COMPUTATION_TIMEOUT",
        }
    }
}

/// Capability to run one action of the external scoring unit
#[async_trait]
pub trait ComputationInvoker: Send + Sync {
    /// Run `action` with `params` and return its result document
    async fn invoke(&self, action: Action, params: InvocationParams) -> Result<Value, InvokeError>;
}

/// Runs the scoring unit as a child process per invocation
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: String,
    base_args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
    max_concurrent: usize,
    limiter: Arc<Semaphore>,
}

impl ProcessInvoker {
    /// Create an invoker with default timeout and concurrency bound
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
            working_dir: None,
            timeout: DEFAULT_TIMEOUT,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            limiter: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT)),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound concurrently running invocations (minimum 1); excess calls queue
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self.limiter = Arc::new(Semaphore::new(self.max_concurrent));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Program and base arguments, for startup logging
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.base_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build_command(&self, action: Action, params: &InvocationParams) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .arg("--action")
            .arg(action.as_str());
        for (key, value) in params {
            command.arg(format!("--{}={}", key, value));
        }
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl ComputationInvoker for ProcessInvoker {
    async fn invoke(&self, action: Action, params: InvocationParams) -> Result<Value, InvokeError> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        let _permit = match timeout_at(deadline, self.limiter.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(InvokeError::Unavailable("invocation limiter closed".to_string()));
            }
            Err(_) => {
                warn!(
                    action = %action,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Scoring unit call timed out waiting for a free slot"
                );
                return Err(InvokeError::Timeout(self.timeout));
            }
        };

        debug!(
            action = %action,
            params = params.len(),
            queued_ms = started.elapsed().as_millis() as u64,
            "Starting scoring unit"
        );

        let child = self.build_command(action, &params).spawn().map_err(|e| {
            warn!(
                action = %action,
                program = %self.program,
                error = %e,
                "Failed to start scoring unit"
            );
            InvokeError::Unavailable(e.to_string())
        })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match timeout_at(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(InvokeError::Failed {
                    status: "output collection failed".to_string(),
                    code: None,
                    signal: None,
                    stderr: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    action = %action,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Scoring unit timed out, killed"
                );
                return Err(InvokeError::Timeout(self.timeout));
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                action = %action,
                status = %output.status,
                elapsed_ms,
                stderr = %stderr,
                "Scoring unit exited unsuccessfully"
            );
            return Err(InvokeError::Failed {
                status: output.status.to_string(),
                code: output.status.code(),
                signal: exit_signal(&output.status),
                stderr,
            });
        }

        info!(action = %action, elapsed_ms, "Scoring unit completed");
        Ok(decode_output(&output.stdout))
    }
}

/// Parse standard output as JSON, falling back to `{success: true, output}`
pub fn decode_output(stdout: &[u8]) -> Value {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    serde_json::from_str(trimmed).unwrap_or_else(|_| {
        json!({
            "success": true,
            "output": trimmed,
        })
    })
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(Action::ProcessUser.as_str(), "process_user");
        assert_eq!(Action::GenerateMatches.to_string(), "generate_matches");
        assert_eq!(Action::GetUserMatches.as_str(), "get_user_matches");
        assert_eq!(Action::GetAllMatches.as_str(), "get_all_matches");
        assert_eq!(Action::GetSampleData.as_str(), "get_sample_data");
    }

    #[test]
    fn test_decode_output_json() {
        let value = decode_output(b"  {\"success\": true, \"total_users\": 3}\n");
        assert_eq!(value["total_users"], 3);
    }

    #[test]
    fn test_decode_output_raw_fallback() {
        let value = decode_output(b"Processing new user registration...\n{\"success\": true}\n");
        assert_eq!(value["success"], true);
        assert_eq!(
            value["output"],
            "Processing new user registration...\n{\"success\": true}"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(InvokeError::Unavailable("x".into()).kind(), "COMPUTATION_UNAVAILABLE");
        assert_eq!(InvokeError::Timeout(Duration::from_secs(1)).kind(), "COMPUTATION_TIMEOUT");
        let failed = InvokeError::Failed {
            status: "exit status: 1".into(),
            code: Some(1),
            signal: None,
            stderr: "boom".into(),
        };
        assert_eq!(failed.kind(), "COMPUTATION_FAILED");
        assert!(failed.to_string().contains("boom"));
    }

    #[test]
    fn test_max_concurrent_floor() {
        let invoker = ProcessInvoker::new("python", vec![]).with_max_concurrent(0);
        assert_eq!(invoker.max_concurrent(), 1);
    }

    #[test]
    fn test_command_line() {
        let invoker = ProcessInvoker::new("python", vec!["Agents/main.py".to_string()]);
        assert_eq!(invoker.command_line(), "python Agents/main.py");
        assert_eq!(invoker.timeout(), DEFAULT_TIMEOUT);
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;

        /// Invoker running `sh -c <script> scorer --action ...`
        fn shell(script: &str) -> ProcessInvoker {
            ProcessInvoker::new(
                "sh",
                vec!["-c".to_string(), script.to_string(), "scorer".to_string()],
            )
        }

        #[tokio::test]
        async fn test_json_stdout_is_parsed() {
            let invoker = shell(r#"printf '{"action":"%s"}' "$2""#);
            let value = invoker
                .invoke(Action::GenerateMatches, InvocationParams::new())
                .await
                .unwrap();
            assert_eq!(value["action"], "generate_matches");
        }

        #[tokio::test]
        async fn test_params_are_flat_arguments() {
            let invoker = shell(r#"printf '%s|' "$@""#);
            let mut params = InvocationParams::new();
            params.insert(PARAM_USER_ID.to_string(), "u1".to_string());
            params.insert(PARAM_DATA.to_string(), r#"{"a":1}"#.to_string());

            let value = invoker.invoke(Action::ProcessUser, params).await.unwrap();

            assert_eq!(value["success"], true);
            assert_eq!(
                value["output"],
                r#"--action|process_user|--data={"a":1}|--user_id=u1|"#
            );
        }

        #[tokio::test]
        async fn test_dash_leading_value_stays_one_argument() {
            let invoker = shell(r#"printf '%s|' "$@""#);
            let mut params = InvocationParams::new();
            params.insert(PARAM_USER_ID.to_string(), "-x".to_string());

            let value = invoker.invoke(Action::GetUserMatches, params).await.unwrap();

            assert_eq!(value["output"], "--action|get_user_matches|--user_id=-x|");
        }

        #[tokio::test]
        async fn test_nonzero_exit_is_failure_with_stderr() {
            let invoker = shell("echo partial; echo boom >&2; exit 3");
            let err = invoker
                .invoke(Action::GetAllMatches, InvocationParams::new())
                .await
                .unwrap_err();
            match err {
                InvokeError::Failed { code, stderr, .. } => {
                    assert_eq!(code, Some(3));
                    assert_eq!(stderr, "boom");
                }
                other => panic!("expected Failed, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_missing_program_is_unavailable() {
            let invoker = ProcessInvoker::new("/nonexistent/netmatch-scorer", vec![]);
            let err = invoker
                .invoke(Action::GetSampleData, InvocationParams::new())
                .await
                .unwrap_err();
            assert!(matches!(err, InvokeError::Unavailable(_)));
        }

        #[tokio::test]
        async fn test_timeout_kills_unit() {
            let invoker = shell("sleep 5").with_timeout(Duration::from_millis(200));
            let started = Instant::now();
            let err = invoker
                .invoke(Action::GenerateMatches, InvocationParams::new())
                .await
                .unwrap_err();
            assert!(matches!(err, InvokeError::Timeout(_)));
            assert!(started.elapsed() < Duration::from_secs(3));
        }

        #[tokio::test]
        async fn test_concurrency_bound_queues_calls() {
            let invoker = Arc::new(shell("sleep 0.3; echo done").with_max_concurrent(1));
            let started = Instant::now();

            let a = {
                let invoker = Arc::clone(&invoker);
                tokio::spawn(async move { invoker.invoke(Action::GenerateMatches, InvocationParams::new()).await })
            };
            let b = {
                let invoker = Arc::clone(&invoker);
                tokio::spawn(async move { invoker.invoke(Action::GenerateMatches, InvocationParams::new()).await })
            };

            assert!(a.await.unwrap().is_ok());
            assert!(b.await.unwrap().is_ok());
            assert!(started.elapsed() >= Duration::from_millis(600));
        }

        #[tokio::test]
        async fn test_queued_time_counts_toward_timeout() {
            let invoker = Arc::new(
                shell("sleep 0.6; echo done")
                    .with_max_concurrent(1)
                    .with_timeout(Duration::from_millis(1000)),
            );

            let calls: Vec<_> = (0..2)
                .map(|_| {
                    let invoker = Arc::clone(&invoker);
                    tokio::spawn(async move {
                        invoker.invoke(Action::GenerateMatches, InvocationParams::new()).await
                    })
                })
                .collect();

            let mut completed = 0;
            let mut timed_out = 0;
            for call in calls {
                match call.await.unwrap() {
                    Ok(_) => completed += 1,
                    Err(InvokeError::Timeout(_)) => timed_out += 1,
                    Err(other) => panic!("unexpected error: {:?}", other),
                }
            }
            assert_eq!((completed, timed_out), (1, 1));
        }
    }
}
