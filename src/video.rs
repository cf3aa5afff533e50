// src/video.rs - Landmark frame source fed by an external hand detector
//
// The detector (e.g. a MediaPipe process) writes one JSON object per video
// frame to its stdout:
//   {"image": "/tmp/frame.jpg", "multiHandLandmarks": [[{"x":0.1,"y":0.2,"z":0.0}, ...]]}
// `image` is optional. A `READY` line before the first frame is skipped.
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::app::AppEvent;
use crate::config::ClientConfig;
use crate::tracking::{HandObservation, Landmark, LandmarkFrame};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read landmark stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("detector command is empty")]
    EmptyCommand,
    #[error("failed to start detector {command:?}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("detector process has no stdout")]
    NoStdout,
}

/// Anything that yields landmark frames at its own cadence.
pub trait LandmarkSource: Send + 'static {
    /// `Ok(None)` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct LandmarkJson {
    x: f32,
    y: f32,
    #[serde(default)]
    z: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct FrameJson {
    #[serde(default)]
    image: Option<PathBuf>,
    #[serde(default, rename = "multiHandLandmarks")]
    multi_hand_landmarks: Option<Vec<Vec<LandmarkJson>>>,
}

impl From<FrameJson> for LandmarkFrame {
    fn from(json: FrameJson) -> Self {
        let image = json.image.and_then(|path| match image::open(&path) {
            Ok(img) => Some(Arc::new(img.to_rgba8())),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load frame image");
                None
            }
        });
        let hands = json
            .multi_hand_landmarks
            .unwrap_or_default()
            .into_iter()
            .map(|points| {
                HandObservation::new(
                    points
                        .into_iter()
                        .map(|p| Landmark { x: p.x, y: p.y, z: p.z })
                        .collect(),
                )
            })
            .collect();
        LandmarkFrame { image, hands }
    }
}

/// Reads newline-delimited JSON frames from any buffered reader.
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_no: u64,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead + Send + 'static> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let text = self.line.trim();
            if text.is_empty() || text == "READY" {
                continue;
            }
            match serde_json::from_str::<FrameJson>(text) {
                Ok(json) => return Ok(Some(json.into())),
                Err(e) => warn!(line = self.line_no, error = %e, "dropping malformed landmark frame"),
            }
        }
    }
}

/// A detector subprocess whose stdout is the landmark stream.
pub struct DetectorProcess {
    child: Child,
    frames: JsonLinesSource<BufReader<ChildStdout>>,
}

impl DetectorProcess {
    pub fn spawn(command_line: &str) -> Result<Self, SourceError> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or(SourceError::EmptyCommand)?;

        info!(command = %command_line, "starting hand detector");
        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SourceError::Spawn {
                command: command_line.to_string(),
                source,
            })?;
        let stdout = child.stdout.take().ok_or(SourceError::NoStdout)?;

        Ok(Self {
            child,
            frames: JsonLinesSource::new(BufReader::new(stdout)),
        })
    }
}

impl LandmarkSource for DetectorProcess {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        self.frames.next_frame()
    }
}

impl Drop for DetectorProcess {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!(error = %e, "detector already exited");
        }
        let _ = self.child.wait();
    }
}

/// The detector named in the config, or stdin.
pub fn open_source(config: &ClientConfig) -> Result<Box<dyn LandmarkSource>, SourceError> {
    match config.detector_command.as_deref() {
        Some(command) => Ok(Box::new(DetectorProcess::spawn(command)?)),
        None => {
            info!("reading landmark frames from stdin");
            Ok(Box::new(JsonLinesSource::new(BufReader::new(std::io::stdin()))))
        }
    }
}

/// Pumps frames into the application queue until the source ends.
pub fn spawn_source_thread(
    mut source: Box<dyn LandmarkSource>,
    events: UnboundedSender<AppEvent>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("landmark-source".into())
        .spawn(move || loop {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    if events.send(AppEvent::FrameReady(frame)).is_err() {
                        debug!("application loop gone; stopping landmark source");
                        return;
                    }
                }
                Ok(None) => {
                    info!("landmark source ended");
                    let _ = events.send(AppEvent::SourceEnded);
                    return;
                }
                Err(e) => {
                    error!(error = %e, "landmark source failed");
                    let _ = events.send(AppEvent::SourceEnded);
                    return;
                }
            }
        })
}
