use super::{LineSender, OutputLine, ProcessOutcome, ProcessResult, ProcessRunner, RunnerError, Stream};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Shell program used to interpret command lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    program: String,
    args: Vec<String>,
}

impl Shell {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `cmd /C` on Windows, `sh -c` everywhere else
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::new("cmd", vec!["/C".to_string()])
        } else {
            Self::new("sh", vec!["-c".to_string()])
        }
    }

    /// Parses a whitespace separated shell invocation such as `bash -lc`
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, line: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        // cmd.exe does its own quote parsing, so the line must reach it untouched
        #[cfg(windows)]
        {
            cmd.raw_arg(line);
            cmd.creation_flags(CREATE_NO_WINDOW);
        }
        #[cfg(not(windows))]
        cmd.arg(line);

        cmd
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// [`ProcessRunner`] that hands every command line to a shell
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    shell: Shell,
    timeout: Option<Duration>,
}

impl ShellRunner {
    pub fn new(shell: Shell) -> Self {
        Self {
            shell,
            timeout: None,
        }
    }

    /// Kills processes that run longer than `limit`
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }
}

#[async_trait]
impl ProcessRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        working_dir: &Path,
        lines: LineSender,
    ) -> Result<ProcessResult, RunnerError> {
        let mut cmd = self.shell.command(command);
        cmd.current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group so a timeout can take down everything the shell started
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(shell = %self.shell, command, error = %e, "Failed to start process");
                return Ok(ProcessResult::launch_failed(format!(
                    "Failed to start process: {}",
                    e
                )));
            }
        };
        debug!(pid = ?child.id(), command, "Process started");

        let pid = child.id();
        let mut stdout_task =
            tokio::spawn(read_lines(child.stdout.take(), Stream::Stdout, lines.clone()));
        let mut stderr_task = tokio::spawn(read_lines(child.stderr.take(), Stream::Stderr, lines));

        // The deadline covers draining the pipes too, which background children can hold open
        let finished = async {
            let status = child.wait().await.map_err(RunnerError::Wait)?;
            let stdout = (&mut stdout_task)
                .await
                .map_err(|e| RunnerError::Reader(e.to_string()))?;
            let stderr = (&mut stderr_task)
                .await
                .map_err(|e| RunnerError::Reader(e.to_string()))?;
            Ok::<_, RunnerError>((status, stdout, stderr))
        };

        let (status, stdout, stderr) = match self.timeout {
            Some(limit) => {
                let timed = tokio::time::timeout(limit, finished).await;
                match timed {
                    Ok(finished) => finished?,
                    Err(_) => {
                        warn!(command, limit_secs = limit.as_secs_f64(), "Process timed out");
                        kill_process_tree(&mut child, pid).await;
                        stdout_task.abort();
                        stderr_task.abort();
                        return Err(RunnerError::TimedOut {
                            seconds: limit.as_secs(),
                        });
                    }
                }
            }
            None => finished.await?,
        };

        let outcome = match status.code() {
            Some(code) => ProcessOutcome::Exited(code),
            None => ProcessOutcome::Terminated,
        };
        debug!(?outcome, "Process finished");

        Ok(ProcessResult {
            stdout,
            stderr,
            outcome,
        })
    }
}

/// Kills the shell and, on unix, every process left in its group
#[cfg_attr(not(unix), allow(unused_variables))]
async fn kill_process_tree(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!(pid, error = %e, "Failed to kill process group");
        }
    }
    // Already reaped when only the pipes were still open
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Failed to kill timed out process");
    }
}

/// Forwards each line of `source` and returns the non-empty lines joined by `\n`
async fn read_lines<R>(source: Option<R>, stream: Stream, sender: LineSender) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(source) = source else {
        return String::new();
    };

    let mut reader = BufReader::new(source);
    let mut captured: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf)
                    .trim_end_matches(|c| c == '\n' || c == '\r')
                    .to_string();
                if !text.is_empty() {
                    captured.push(text.clone());
                }
                // Receiver gone means nobody is listening anymore; keep draining the pipe
                let _ = sender.send(OutputLine { stream, text });
            }
            Err(e) => {
                warn!(%stream, error = %e, "Failed to read process output");
                break;
            }
        }
    }

    captured.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_shell() {
        let shell = Shell::host();
        if cfg!(windows) {
            assert_eq!(shell.to_string(), "cmd /C");
        } else {
            assert_eq!(shell.to_string(), "sh -c");
        }
    }

    #[test]
    fn test_parse_shell() {
        let shell = Shell::parse("bash -lc").unwrap();
        assert_eq!(shell.program(), "bash");
        assert_eq!(shell.to_string(), "bash -lc");
        assert!(Shell::parse("   ").is_none());
    }

    #[tokio::test]
    async fn test_read_lines_strips_terminators() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let input: &[u8] = b"first\r\n\nsecond";
        let captured = read_lines(Some(input), Stream::Stdout, tx).await;

        assert_eq!(captured, "first\nsecond");
        assert_eq!(rx.recv().await, Some(OutputLine::stdout("first")));
        assert_eq!(rx.recv().await, Some(OutputLine::stdout("")));
        assert_eq!(rx.recv().await, Some(OutputLine::stdout("second")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_read_lines_without_source() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let captured = read_lines(None::<&[u8]>, Stream::Stderr, tx).await;
        assert!(captured.is_empty());
    }

    #[tokio::test]
    async fn test_missing_shell_is_launch_failure() {
        let runner = ShellRunner::new(Shell::new("definitely-not-a-shell-oasis", vec![]));
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let cwd = std::env::current_dir().unwrap();

        let result = runner.run("echo hi", &cwd, tx).await.unwrap();
        assert!(matches!(result.outcome, ProcessOutcome::LaunchFailed(_)));
        assert_eq!(result.exit_code(), -1);
        assert!(result.stderr.contains("Failed to start process"));
    }
}
