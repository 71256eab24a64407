//! Piped landmark helper
//!
//! Launches a configured helper process (e.g. a Python MediaPipe script) and
//! speaks line-delimited JSON over stdin/stdout. Each request carries one
//! base64-encoded RGB frame; each response carries the detected faces'
//! keypoints in pixel space. The child is killed when the detector is
//! dropped.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::capture::Frame;
use crate::config::DetectorConfig;
use crate::detector::LandmarkDetector;
use crate::error::{DetectorError, Result};
use crate::mesh::{FaceLandmarks, Keypoint};

/// One request line written to the helper's stdin.
#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    seq: u64,
    width: u32,
    height: u32,
    /// Base64-encoded tightly packed RGB8 pixels.
    rgb: &'a str,
}

/// One response line read from the helper's stdout.
#[derive(Debug, Deserialize)]
struct DetectResponse {
    seq: u64,
    /// One entry per detected face: `[x, y, z]` keypoints in pixel space.
    faces: Vec<Vec<[f32; 3]>>,
}

fn faces_from_wire(faces: Vec<Vec<[f32; 3]>>) -> Vec<FaceLandmarks> {
    faces
        .into_iter()
        .map(|face| FaceLandmarks::new(face.into_iter().map(Keypoint::from).collect()))
        .collect()
}

/// Whether the configured helper script and interpreter are both present.
pub fn helper_available(config: &DetectorConfig) -> bool {
    if !std::path::Path::new(&config.helper_script).exists() {
        return false;
    }
    std::process::Command::new(&config.helper_command)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

struct HelperIo {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Landmark detector backed by a helper subprocess.
pub struct PipedDetector {
    io: Mutex<HelperIo>,
    seq: AtomicU64,
}

impl PipedDetector {
    /// Launch the helper subprocess.
    pub async fn spawn(config: &DetectorConfig) -> Result<Self> {
        let mut child = Command::new(&config.helper_command)
            .arg(&config.helper_script)
            .args(["--max-faces", &config.max_faces.to_string()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DetectorError::Spawn(format!(
                    "'{} {}': {}",
                    config.helper_command, config.helper_script, e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DetectorError::Stdio("helper stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DetectorError::Stdio("helper stdout not captured".to_string()))?;

        tracing::info!(
            pid = ?child.id(),
            script = %config.helper_script,
            "Landmark helper started"
        );

        Ok(Self {
            io: Mutex::new(HelperIo {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            }),
            seq: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl LandmarkDetector for PipedDetector {
    async fn estimate(&self, frame: Frame) -> Result<Vec<FaceLandmarks>> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let rgb = BASE64.encode(&frame.rgb);
        let request = serde_json::to_string(&DetectRequest {
            seq,
            width: frame.width,
            height: frame.height,
            rgb: &rgb,
        })
        .map_err(|e| DetectorError::Wire(format!("request encode: {e}")))?;

        let mut io = self.io.lock().await;
        io.stdin
            .write_all(request.as_bytes())
            .await
            .map_err(|e| DetectorError::Wire(format!("helper stdin: {e}")))?;
        io.stdin
            .write_all(b"\n")
            .await
            .map_err(|e| DetectorError::Wire(format!("helper stdin: {e}")))?;
        io.stdin
            .flush()
            .await
            .map_err(|e| DetectorError::Wire(format!("helper stdin: {e}")))?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = io
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| DetectorError::Wire(format!("helper stdout: {e}")))?;
            if read == 0 {
                return Err(DetectorError::Wire("helper closed its stdout".to_string()).into());
            }

            let response: DetectResponse = serde_json::from_str(line.trim())
                .map_err(|e| DetectorError::Parse(e.to_string()))?;
            if response.seq < seq {
                tracing::warn!(
                    got = response.seq,
                    expected = seq,
                    "Discarding stale helper response"
                );
                continue;
            }
            return Ok(faces_from_wire(response.faces));
        }
    }
}

impl Drop for PipedDetector {
    // The child itself is killed by `kill_on_drop`.
    fn drop(&mut self) {
        if let Some(pid) = self.io.get_mut().child.id() {
            tracing::info!(pid, "Stopping landmark helper");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = DetectRequest {
            seq: 7,
            width: 4,
            height: 2,
            rgb: "AAEC",
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"seq":7,"width":4,"height":2,"rgb":"AAEC"}"#);
    }

    #[test]
    fn test_response_wire_format() {
        let json = r#"{"seq":3,"faces":[[[10.0,20.0,0.5],[30.0,40.0,-0.5]]]}"#;
        let response: DetectResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.seq, 3);

        let faces = faces_from_wire(response.faces);
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].keypoints[1], Keypoint::new(30.0, 40.0, -0.5));
    }

    #[test]
    fn test_empty_response() {
        let json = r#"{"seq":1,"faces":[]}"#;
        let response: DetectResponse = serde_json::from_str(json).unwrap();
        assert!(faces_from_wire(response.faces).is_empty());
    }

    #[test]
    fn test_helper_available_rejects_missing_script() {
        let config = DetectorConfig {
            helper_script: "/nonexistent/helper.py".to_string(),
            ..DetectorConfig::default()
        };
        assert!(!helper_available(&config));
    }
}
