//! Shared fixture for daemon spec tests.

use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// A running `ndd` sandboxed into a temp state directory.
pub struct Daemon {
    child: Child,
    state_dir: tempfile::TempDir,
}

impl Daemon {
    /// Spawn the daemon and wait for its READY line.
    pub fn start() -> Self {
        let state_dir = tempfile::tempdir().unwrap();
        let mut child = Command::new(assert_cmd::cargo::cargo_bin("ndd"))
            .env("NEXTDEPLOY_STATE_DIR", state_dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        let stdout = child.stdout.take().unwrap();
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).unwrap() == 0 {
                panic!("daemon exited before READY");
            }
            if line.trim() == "READY" {
                break;
            }
        }
        // Keep draining stdout so the daemon never blocks on a full pipe.
        std::thread::spawn(move || {
            let mut sink = Vec::new();
            let _ = reader.read_to_end(&mut sink);
        });

        Self { child, state_dir }
    }

    pub fn socket_path(&self) -> PathBuf {
        self.state_dir.path().join("daemon.sock")
    }

    /// Send raw bytes, half-close, and collect whatever comes back.
    pub fn send_raw(&self, bytes: &[u8]) -> Vec<u8> {
        let mut stream = UnixStream::connect(self.socket_path()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        stream.write_all(bytes).unwrap();
        stream.shutdown(std::net::Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        buf
    }

    /// One command in, one parsed response out.
    pub fn send(&self, command: serde_json::Value) -> serde_json::Value {
        let raw = self.send_raw(command.to_string().as_bytes());
        serde_json::from_slice(&raw).unwrap_or_else(|e| {
            panic!(
                "unparseable response ({e}): {:?}",
                String::from_utf8_lossy(&raw)
            )
        })
    }

    /// Wait for the daemon process to exit on its own.
    pub fn wait_for_exit(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.child.try_wait().unwrap().is_some() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        false
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
