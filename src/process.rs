use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Grace period between SIGTERM and SIGKILL when a command overruns its timeout.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// One external command invocation, always bound to an explicit working directory.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Option<Duration>,
    pub log_prefix: String,
}

impl CommandSpec {
    /// Run `script` through `sh -c`, for opaque commands handed over by the review service.
    pub fn shell(script: &str, working_dir: PathBuf, timeout: Option<Duration>) -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir,
            timeout,
            log_prefix: "sh".to_string(),
        }
    }

    pub fn describe(&self) -> String {
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}

/// Output from a completed child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub signal: Option<i32>,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.signal.is_none()
    }

    /// True when the child died from a signal the user sent to us.
    pub fn interrupted(&self) -> bool {
        #[cfg(unix)]
        {
            matches!(self.signal, Some(libc::SIGINT) | Some(libc::SIGTERM))
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Short human-readable failure summary: exit status plus the last stderr line.
    pub fn failure_reason(&self) -> String {
        let status = match self.signal {
            Some(sig) => format!("killed by signal {sig}"),
            None => format!("exit code {}", self.exit_code),
        };
        match self.stderr_lines.iter().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => format!("{status}: {}", line.trim()),
            None => status,
        }
    }
}

/// Run a child process to completion, capturing its output line by line.
///
/// The child runs in `spec.working_dir`; our own cwd is never touched. On Unix
/// it gets its own process group so SIGINT/SIGTERM received by us are
/// forwarded to everything it spawned (`git fetch && git cherry-pick` chains
/// included), and so a timeout can take the whole group down.
pub async fn run_command(spec: CommandSpec) -> Result<ProcessOutput> {
    if !spec.working_dir.is_dir() {
        return Err(Error::Workdir(format!(
            "{} is not a directory",
            spec.working_dir.display()
        )));
    }

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::Process(format!("failed to spawn '{}': {e}", spec.program)))?;

    let pid = child
        .id()
        .ok_or_else(|| Error::Process("child has no pid".into()))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Process("child stdout not captured".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Process("child stderr not captured".into()))?;

    let prefix_out = spec.log_prefix.clone();
    let prefix_err = spec.log_prefix.clone();

    let stdout_task = tokio::spawn(async move {
        let mut lines = Vec::new();
        let mut reader = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            debug!("[{prefix_out}] {line}");
            lines.push(line);
        }
        lines
    });

    let stderr_task = tokio::spawn(async move {
        let mut lines = Vec::new();
        let mut reader = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            debug!("[{prefix_err}] {line}");
            lines.push(line);
        }
        lines
    });

    #[cfg(unix)]
    let signal_task = {
        let pgid = pid as i32;
        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};
            let (Ok(mut sigint), Ok(mut sigterm)) = (
                signal(SignalKind::interrupt()),
                signal(SignalKind::terminate()),
            ) else {
                return;
            };
            loop {
                tokio::select! {
                    _ = sigint.recv() => {
                        unsafe { libc::killpg(pgid, libc::SIGINT); }
                    }
                    _ = sigterm.recv() => {
                        unsafe { libc::killpg(pgid, libc::SIGTERM); }
                    }
                }
            }
        })
    };

    let status = if let Some(dur) = spec.timeout {
        match tokio::time::timeout(dur, child.wait()).await {
            Ok(r) => r.map_err(|e| Error::Process(format!("wait error: {e}")))?,
            Err(_) => {
                #[cfg(unix)]
                signal_task.abort();
                #[cfg(unix)]
                unsafe {
                    libc::killpg(pid as i32, libc::SIGTERM);
                }
                tokio::time::sleep(KILL_GRACE).await;
                #[cfg(unix)]
                unsafe {
                    libc::killpg(pid as i32, libc::SIGKILL);
                }
                #[cfg(not(unix))]
                let _ = child.start_kill();
                stdout_task.abort();
                stderr_task.abort();
                return Err(Error::Timeout {
                    what: spec.describe(),
                    after: dur,
                });
            }
        }
    } else {
        child
            .wait()
            .await
            .map_err(|e| Error::Process(format!("wait error: {e}")))?
    };

    #[cfg(unix)]
    signal_task.abort();

    let stdout_lines = stdout_task
        .await
        .map_err(|e| Error::Process(format!("stdout reader failed: {e}")))?;
    let stderr_lines = stderr_task
        .await
        .map_err(|e| Error::Process(format!("stderr reader failed: {e}")))?;

    let (exit_code, signal) = extract_exit_info(&status);

    Ok(ProcessOutput {
        exit_code,
        signal,
        stdout_lines,
        stderr_lines,
    })
}

fn extract_exit_info(status: &std::process::ExitStatus) -> (i32, Option<i32>) {
    if let Some(code) = status.code() {
        return (code, None);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return (128 + sig, Some(sig));
        }
    }
    (-1, None)
}
