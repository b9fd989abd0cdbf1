use std::io::{self, Read};
use std::process::{Child, Command, Stdio};

/// Terminates the spawned log source. Kill is non-graceful by contract.
pub trait ProcessHandle: Send {
    fn kill(&mut self);
}

/// A spawned log source: its output byte streams plus a kill handle.
pub struct SourceProcess {
    pub stdout: Box<dyn Read + Send>,
    pub stderr: Box<dyn Read + Send>,
    pub handle: Box<dyn ProcessHandle>,
}

/// Produces the process the engine captures. The engine spawns it once per
/// session; a fresh spawn happens on every restart.
pub trait LogSource: Send + Sync {
    fn spawn(&self) -> io::Result<SourceProcess>;
}

/// Spawns an external command and captures its output pipes.
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for CommandSource {
    /// The device log command with long-form, human-readable output.
    fn default() -> Self {
        Self::new("logcat", vec!["-v".to_string(), "long".to_string()])
    }
}

impl LogSource for CommandSource {
    fn spawn(&self) -> io::Result<SourceProcess> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

        Ok(SourceProcess {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            handle: Box::new(ChildHandle(child)),
        })
    }
}

struct ChildHandle(Child);

impl ProcessHandle for ChildHandle {
    fn kill(&mut self) {
        // Kill can race a process that already exited; wait reaps either way.
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}
