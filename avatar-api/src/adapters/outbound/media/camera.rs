use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{io::AsyncReadExt, process::Command};

use crate::domain::{
    models::CameraPermission, ports::outbound::CameraSource, services::MAX_AVATAR_SIZE,
    AvatarError,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const STDERR_LIMIT: u64 = 4 * 1024;

/// Captures a still image by running an external command that writes the
/// image to stdout, e.g. `libcamera-still -n -o -`.
///
/// At most one byte more than the avatar size limit is read from the
/// command. Once that much has arrived the command is killed.
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    read_limit: u64,
}

impl CommandCamera {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_TIMEOUT,
            read_limit: MAX_AVATAR_SIZE as u64 + 1,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_read_limit(mut self, read_limit: u64) -> Self {
        self.read_limit = read_limit;
        self
    }

    async fn run(&self) -> Result<Vec<u8>, AvatarError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                AvatarError::acquisition(format!("failed to run {}: {err}", self.program))
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(AvatarError::acquisition("camera output was not captured"));
        };

        let diagnostics = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.take(STDERR_LIMIT).read_to_end(&mut buf).await;
            buf
        });

        let mut image = Vec::new();
        stdout
            .take(self.read_limit)
            .read_to_end(&mut image)
            .await
            .map_err(|err| {
                AvatarError::acquisition(format!("failed to read camera output: {err}"))
            })?;

        if image.len() as u64 >= self.read_limit {
            tracing::warn!(program = %self.program, "camera output exceeds limit, stopping capture");
            let _ = child.start_kill();
            return Ok(image);
        }

        let status = child.wait().await.map_err(|err| {
            AvatarError::acquisition(format!("failed to wait for {}: {err}", self.program))
        })?;

        if !status.success() {
            let stderr = diagnostics.await.unwrap_or_default();
            return Err(AvatarError::acquisition(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        Ok(image)
    }
}

#[async_trait]
impl CameraSource for CommandCamera {
    async fn capture(&self, _permission: &CameraPermission) -> Result<Vec<u8>, AvatarError> {
        tracing::debug!(program = %self.program, "capturing from camera");

        tokio::time::timeout(self.timeout, self.run())
            .await
            .map_err(|_| AvatarError::acquisition("camera capture timed out"))?
    }
}
