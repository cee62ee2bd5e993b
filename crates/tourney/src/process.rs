//! Child-process supervision for one engine.
//!
//! Each engine runs as a child with piped stdio. A dedicated reader
//! thread turns stdout into an ordered stream of [`ProcessEvent`]s over an
//! unbounded channel; stderr is drained by a second thread straight into
//! the log. Nothing outside this module touches the pipes.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

/// Errors from spawning or talking to the child.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The executable could not be launched.
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        /// Engine name from the configuration.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// Writing to the child's stdin failed; the engine is gone.
    #[error("broken pipe to {name}: {source}")]
    Write {
        /// Engine name from the configuration.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// What the reader thread delivers, in strict emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One line of engine output, terminator stripped.
    Line(String),
    /// Stdout reached end of file: the process exited or closed the pipe.
    /// Sent exactly once, after the final line.
    Terminated,
}

/// One supervised engine process.
pub struct EngineProcess {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    events: Receiver<ProcessEvent>,
    reader: Option<JoinHandle<()>>,
}

impl EngineProcess {
    /// Launches `command` with `args` in `cwd` and starts the reader
    /// threads. `name` is only used for logging and errors.
    pub fn spawn(
        name: &str,
        command: &Path,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<EngineProcess, ProcessError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            name: name.to_string(),
            source,
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let (tx, events) = std::sync::mpsc::channel();
        let reader = std::thread::spawn({
            let name = name.to_string();
            move || read_stdout(&name, stdout, tx)
        });
        std::thread::spawn({
            let name = name.to_string();
            move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    debug!(engine = %name, "stderr: {}", line);
                }
            }
        });

        Ok(EngineProcess {
            name: name.to_string(),
            child,
            stdin,
            events,
            reader: Some(reader),
        })
    }

    /// Sends one line to the engine, flushing immediately.
    pub fn write_line(&mut self, line: &str) -> Result<(), ProcessError> {
        debug!(engine = %self.name, "-> {}", line);
        let result = match self.stdin.as_mut() {
            Some(stdin) => writeln!(stdin, "{}", line).and_then(|_| stdin.flush()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin already closed",
            )),
        };
        result.map_err(|source| ProcessError::Write {
            name: self.name.clone(),
            source,
        })
    }

    /// The next pending event, if any. Never blocks.
    pub fn try_event(&mut self) -> Option<ProcessEvent> {
        match self.events.try_recv() {
            Ok(event) => {
                if let ProcessEvent::Line(line) = &event {
                    debug!(engine = %self.name, "<- {}", line);
                }
                Some(event)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Whether the child is still running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// The exit code, if the child has exited.
    pub fn exit_code(&mut self) -> Option<i32> {
        match self.child.try_wait() {
            Ok(Some(status)) => status.code(),
            _ => None,
        }
    }

    /// Closes stdin, waits up to `timeout` for a clean exit, then kills.
    ///
    /// The protocol-level `quit` is the caller's business and must have
    /// been written before calling this.
    pub fn stop(&mut self, timeout: Duration) {
        self.stdin.take();

        let deadline = Instant::now() + timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                _ => {
                    warn!(engine = %self.name, "did not exit in time, killing");
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
            }
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if self.is_alive() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn read_stdout<R: std::io::Read>(name: &str, stdout: R, tx: Sender<ProcessEvent>) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if tx.send(ProcessEvent::Line(line)).is_err() {
                    return;
                }
            }
            Err(err) => {
                debug!(engine = %name, "stdout read error: {}", err);
                break;
            }
        }
    }
    let _ = tx.send(ProcessEvent::Terminated);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_event(process: &mut EngineProcess, timeout: Duration) -> Option<ProcessEvent> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(event) = process.try_event() {
                return Some(event);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn spawn_nonexistent_executable_fails() {
        let result = EngineProcess::spawn(
            "ghost",
            Path::new("/nonexistent/engine"),
            &[],
            None,
        );
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn lines_echo_in_order() {
        let mut process =
            EngineProcess::spawn("cat", Path::new("/bin/cat"), &[], None).unwrap();
        process.write_line("one").unwrap();
        process.write_line("two").unwrap();
        assert_eq!(
            wait_event(&mut process, Duration::from_secs(2)),
            Some(ProcessEvent::Line("one".to_string()))
        );
        assert_eq!(
            wait_event(&mut process, Duration::from_secs(2)),
            Some(ProcessEvent::Line("two".to_string()))
        );
        process.stop(Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn exit_is_reported_once() {
        let mut process =
            EngineProcess::spawn("true", Path::new("/bin/true"), &[], None).unwrap();
        assert_eq!(
            wait_event(&mut process, Duration::from_secs(2)),
            Some(ProcessEvent::Terminated)
        );
        assert!(wait_event(&mut process, Duration::from_millis(50)).is_none());
        process.stop(Duration::from_secs(1));
        assert!(!process.is_alive());
    }

    #[cfg(unix)]
    #[test]
    fn stop_kills_a_stuck_process() {
        let mut process = EngineProcess::spawn(
            "sleeper",
            Path::new("/bin/sleep"),
            &["30".to_string()],
            None,
        )
        .unwrap();
        assert!(process.is_alive());
        let start = Instant::now();
        process.stop(Duration::from_millis(100));
        assert!(!process.is_alive());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn write_after_exit_fails() {
        let mut process =
            EngineProcess::spawn("true", Path::new("/bin/true"), &[], None).unwrap();
        assert_eq!(
            wait_event(&mut process, Duration::from_secs(2)),
            Some(ProcessEvent::Terminated)
        );
        process.stop(Duration::from_secs(1));
        assert!(process.write_line("hello").is_err());
    }
}
