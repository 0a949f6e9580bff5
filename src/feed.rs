//! JSON-lines frame feed
//!
//! One record per line:
//! `{"t_ms":120,"data":[x,y,w,h,conf,cls,...],"shape":[1,1,6]}`
//! Control records carry no `data`: `{"t_ms":0,"trigger":true}` confirms
//! calibration, `{"t_ms":50,"press":"key-A"}` is a manual selection.
//! Blank lines and lines starting with `#` are skipped.

use crate::commit::Commit;
use crate::detection::{BatchError, DetectionBatch};
use crate::engine::{GazeTyper, TickReport};
use crate::geometry::SurfaceGeometry;
use crate::target::{HitTester, InteractiveTarget};
use serde::Deserialize;
use std::io::BufRead;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FrameRecord {
    /// Milliseconds since the start of the feed
    #[serde(default)]
    pub t_ms: Option<u64>,
    #[serde(default)]
    pub data: Option<Vec<f32>>,
    #[serde(default)]
    pub shape: Option<Vec<usize>>,
    #[serde(default)]
    pub trigger: bool,
    #[serde(default)]
    pub press: Option<String>,
}

impl FrameRecord {
    pub fn is_frame(&self) -> bool {
        self.data.is_some()
    }

    pub fn batch(&self, default_stride: usize) -> Result<DetectionBatch, BatchError> {
        DetectionBatch::from_shape(
            self.data.clone().unwrap_or_default(),
            self.shape.as_deref(),
            default_stride,
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read feed: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse one line; `Ok(None)` for blanks and comments.
pub fn parse_record(line: &str) -> Result<Option<FrameRecord>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Turn a record into a batch, treating a malformed tensor as "no signal".
pub fn batch_or_empty(record: &FrameRecord, default_stride: usize) -> DetectionBatch {
    match record.batch(default_stride) {
        Ok(batch) => batch,
        Err(e) => {
            log::warn!("rejected detection batch: {}", e);
            DetectionBatch::empty()
        }
    }
}

/// Apply one record at `now`: calibration trigger, then manual press, then
/// the detection frame.
pub fn apply_record<H: HitTester>(
    typer: &mut GazeTyper<H>,
    record: &FrameRecord,
    surface: &SurfaceGeometry,
    targets: &[InteractiveTarget],
    default_stride: usize,
    now: Instant,
) -> TickReport {
    let mut report = TickReport::default();
    if record.trigger {
        typer.trigger_calibration(now);
    }
    if let Some(ref id) = record.press {
        report.commits.extend(typer.press(id, targets));
    }
    if record.is_frame() {
        let batch = batch_or_empty(record, default_stride);
        let frame = typer.process_frame(&batch, surface, targets, now);
        report.gaze = frame.gaze;
        report.hit = frame.hit;
        report.calibrated = frame.calibrated;
        report.commits.extend(frame.commits);
    }
    report
}

#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub frames: usize,
    pub commits: Vec<Commit>,
    pub calibrated: bool,
    pub buffer: String,
}

/// Drive a typer from a recorded feed. Timestamps are taken relative to the
/// first stamped record, which plays at `start`;
/// timers that fall between two records fire at their exact deadline.
pub fn replay<R, H>(
    reader: R,
    typer: &mut GazeTyper<H>,
    surface: &SurfaceGeometry,
    targets: &[InteractiveTarget],
    default_stride: usize,
    start: Instant,
) -> Result<ReplaySummary, FeedError>
where
    R: BufRead,
    H: HitTester,
{
    let mut summary = ReplaySummary::default();
    let mut now = start;
    let mut first_t_ms = None;
    typer.begin_calibration();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let record = match parse_record(&line) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(source) => {
                return Err(FeedError::Parse {
                    line: idx + 1,
                    source,
                });
            }
        };

        if let Some(t_ms) = record.t_ms {
            let base = *first_t_ms.get_or_insert(t_ms);
            now = now.max(start + Duration::from_millis(t_ms.saturating_sub(base)));
        }

        // Deadlines that elapsed between records
        while let Some(deadline) = typer.next_deadline().filter(|d| *d <= now) {
            let report = typer.poll(deadline);
            summary.calibrated |= report.calibrated;
            summary.commits.extend(report.commits);
        }

        let report = apply_record(typer, &record, surface, targets, default_stride, now);
        if record.is_frame() {
            summary.frames += 1;
        }
        summary.calibrated |= report.calibrated;
        summary.commits.extend(report.commits);
    }

    summary.buffer = typer.buffer().as_str().to_string();
    Ok(summary)
}
