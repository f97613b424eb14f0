use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, ChildStderr, ChildStdout},
    sync::Mutex,
    task::JoinHandle,
    time::timeout,
};
use tracing::{error, info, warn};

use pipeforge_common::{
    error::Error, handshake::parse_handshake_line, state::PluginProcessState,
};

enum StdioPipes {
    Stdout(BufReader<ChildStdout>),
    Stderr(ChildStderr),
}

/// One spawned plugin process instance.
/// ---
/// The host owns the lifecycle: spawn, handshake, state transitions,
/// termination. A `Crashed` or `Stopped` instance is never reused;
/// callers spawn a fresh one on next use.
#[derive(Debug)]
pub struct PluginProcess {
    binary: PathBuf,
    child: Child,
    pid: u32,
    state: PluginProcessState,
    address: SocketAddr,
    log_buffer: Arc<Mutex<Vec<String>>>,
}

impl PluginProcess {
    /// Spawns the plugin binary and blocks until it announces its
    /// listen address on stdout, bounded by `handshake_timeout`.
    /// Output preceding the handshake line is ignored; after it,
    /// stdout and stderr are drained into the instance log buffer.
    pub async fn spawn(
        binary: &Path,
        args: &[String],
        handshake_timeout: Duration,
    ) -> Result<Self, Error> {
        let mut state = PluginProcessState::NotStarted;
        state.transition_to(PluginProcessState::Starting)?;

        let mut command = tokio::process::Command::new(binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| Error::PluginCrashed {
            identifier: binary.display().to_string(),
            message: format!("failed to spawn plugin process: {}", e),
        })?;

        let pid = child.id().ok_or_else(|| Error::PluginCrashed {
            identifier: binary.display().to_string(),
            message: "plugin process exited before it could be tracked".to_string(),
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            Error::Internal("failed to capture plugin process stdout".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            Error::Internal("failed to capture plugin process stderr".to_string())
        })?;

        let mut stdout_reader = BufReader::new(stdout);

        let address =
            match timeout(handshake_timeout, read_handshake(&mut stdout_reader)).await {
                Ok(Ok(addr)) => addr,
                Ok(Err(e)) => {
                    warn!(binary = %binary.display(), pid, "plugin handshake failed: {}", e);
                    let _ = child.kill().await;
                    return Err(e);
                }
                Err(_elapsed) => {
                    warn!(
                        binary = %binary.display(),
                        pid,
                        "plugin did not hand shake within {:?}",
                        handshake_timeout
                    );
                    let _ = child.kill().await;
                    return Err(Error::PluginTimeout {
                        identifier: binary.display().to_string(),
                        timeout: handshake_timeout,
                    });
                }
            };

        let log_buffer = Arc::new(Mutex::new(Vec::new()));
        spawn_log_capture(StdioPipes::Stdout(stdout_reader), Arc::clone(&log_buffer));
        spawn_log_capture(StdioPipes::Stderr(stderr), Arc::clone(&log_buffer));

        info!(binary = %binary.display(), pid, %address, "plugin process started");

        Ok(Self {
            binary: binary.to_path_buf(),
            child,
            pid,
            state,
            address,
            log_buffer,
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn state(&self) -> PluginProcessState {
        self.state
    }

    pub fn mark_ready(&mut self) -> Result<(), Error> {
        self.state.transition_to(PluginProcessState::Ready)
    }

    /// Ready -> Serving on the first apply call; later calls are a
    /// no-op.
    pub fn mark_serving(&mut self) -> Result<(), Error> {
        if self.state == PluginProcessState::Serving {
            return Ok(());
        }
        self.state.transition_to(PluginProcessState::Serving)
    }

    /// Kills the process and marks the instance `Crashed`. Terminal;
    /// the instance is discarded, not reused.
    pub async fn mark_crashed(&mut self, reason: &str) {
        error!(
            binary = %self.binary.display(),
            pid = self.pid,
            "plugin process crashed: {}",
            reason
        );

        if let Err(e) = self.child.kill().await {
            warn!(pid = self.pid, "failed to kill crashed plugin process: {}", e);
        }

        if let Err(e) = self.state.transition_to(PluginProcessState::Crashed) {
            warn!(pid = self.pid, "{}", e);
        }
    }

    /// Orderly host-initiated termination.
    pub async fn stop(&mut self) -> Result<(), Error> {
        if self.state.is_terminal() {
            return Ok(());
        }

        if let Err(e) = self.child.kill().await {
            warn!(pid = self.pid, "failed to kill plugin process on stop: {}", e);
        }

        self.state.transition_to(PluginProcessState::Stopped)?;
        info!(binary = %self.binary.display(), pid = self.pid, "plugin process stopped");
        Ok(())
    }

    /// Captured stdout/stderr since the handshake, newest last.
    pub async fn fetch_logs(&self, tail_lines: Option<usize>) -> Vec<String> {
        let buffer = self.log_buffer.lock().await;
        match tail_lines {
            Some(n) => {
                let start = buffer.len().saturating_sub(n);
                buffer[start..].to_vec()
            }
            None => buffer.clone(),
        }
    }
}

/// Scans stdout for the handshake line. EOF first means the process
/// exited (or closed its pipe) before announcing itself.
async fn read_handshake(reader: &mut BufReader<ChildStdout>) -> Result<SocketAddr, Error> {
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await.map_err(|e| {
            Error::GrpcComm(format!("failed to read plugin stdout: {}", e))
        })?;

        if bytes_read == 0 {
            return Err(Error::PluginCrashed {
                identifier: "unknown".to_string(),
                message: "plugin process exited before the discovery handshake".to_string(),
            });
        }

        match parse_handshake_line(&line) {
            Some(Ok(addr)) => return Ok(addr),
            Some(Err(e)) => return Err(e),
            None => continue,
        }
    }
}

fn spawn_log_capture(pipe: StdioPipes, log_buffer: Arc<Mutex<Vec<String>>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match pipe {
            StdioPipes::Stdout(mut reader) => {
                let mut line = String::new();
                while let Ok(bytes_read) = reader.read_line(&mut line).await {
                    if bytes_read == 0 {
                        break;
                    }
                    log_buffer.lock().await.push(line.trim_end().to_string());
                    line.clear();
                }
            }
            StdioPipes::Stderr(pipe) => {
                let mut reader = BufReader::new(pipe);
                let mut line = String::new();
                while let Ok(bytes_read) = reader.read_line(&mut line).await {
                    if bytes_read == 0 {
                        break;
                    }
                    log_buffer.lock().await.push(line.trim_end().to_string());
                    line.clear();
                }
            }
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    #[tokio::test]
    async fn handshake_timeout_kills_the_process() {
        let args = vec!["-c".to_string(), "sleep 5".to_string()];
        let err = PluginProcess::spawn(&sh(), &args, Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PluginTimeout { .. }));
    }

    #[tokio::test]
    async fn exit_before_handshake_is_a_crash() {
        let args = vec!["-c".to_string(), "echo starting up; exit 0".to_string()];
        let err = PluginProcess::spawn(&sh(), &args, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PluginCrashed { .. }));
    }

    #[tokio::test]
    async fn handshake_line_yields_the_announced_address() {
        let args = vec![
            "-c".to_string(),
            "echo 'noise line'; echo 'PIPEFORGE-PLUGIN|1|127.0.0.1:45991'; sleep 5".to_string(),
        ];
        let mut process = PluginProcess::spawn(&sh(), &args, Duration::from_secs(5))
            .await
            .expect("spawn failed");

        assert_eq!(process.address().to_string(), "127.0.0.1:45991");
        assert_eq!(process.state(), PluginProcessState::Starting);

        process.stop().await.unwrap();
        assert_eq!(process.state(), PluginProcessState::Stopped);
    }

    #[tokio::test]
    async fn unsupported_protocol_version_is_rejected() {
        let args = vec![
            "-c".to_string(),
            "echo 'PIPEFORGE-PLUGIN|99|127.0.0.1:45992'; sleep 5".to_string(),
        ];
        let err = PluginProcess::spawn(&sh(), &args, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn crashed_instance_is_terminal() {
        let args = vec![
            "-c".to_string(),
            "echo 'PIPEFORGE-PLUGIN|1|127.0.0.1:45993'; sleep 5".to_string(),
        ];
        let mut process = PluginProcess::spawn(&sh(), &args, Duration::from_secs(5))
            .await
            .expect("spawn failed");

        process.mark_crashed("test-induced").await;
        assert_eq!(process.state(), PluginProcessState::Crashed);
        assert!(process.mark_ready().is_err());
    }
}
