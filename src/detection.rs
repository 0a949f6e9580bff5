//! Raw detections from the inference step and the aggregator that turns
//! them into a single gaze point per tick.

use crate::geometry::Point;
use serde::Deserialize;

/// Fixed record layout: `[x, y, w, h, confidence, class_id]`.
pub const RECORD_WIDTH: usize = 6;

/// One candidate bounding box in model-input space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
    pub class_id: f32,
}

impl Detection {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    fn from_record(record: &[f32]) -> Self {
        Self {
            x: record[0],
            y: record[1],
            w: record[2],
            h: record[3],
            confidence: record[4],
            class_id: record[5],
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BatchError {
    #[error("stride {0} is narrower than a detection record ({RECORD_WIDTH})")]
    StrideTooSmall(usize),
    #[error("{len} values do not divide into records of stride {stride}")]
    Ragged { len: usize, stride: usize },
}

/// A validated, flat detection tensor: `count` records of `stride` values.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBatch {
    values: Vec<f32>,
    stride: usize,
}

impl DetectionBatch {
    pub fn new(values: Vec<f32>, stride: usize) -> Result<Self, BatchError> {
        if stride < RECORD_WIDTH {
            return Err(BatchError::StrideTooSmall(stride));
        }
        if values.len() % stride != 0 {
            return Err(BatchError::Ragged {
                len: values.len(),
                stride,
            });
        }
        Ok(Self { values, stride })
    }

    /// Build a batch, reading the stride from the trailing dimension of a
    /// `[N, S]` or `[1, N, S]` shape. Any other shape (or none) uses
    /// `default_stride`.
    pub fn from_shape(
        values: Vec<f32>,
        shape: Option<&[usize]>,
        default_stride: usize,
    ) -> Result<Self, BatchError> {
        let stride = match shape {
            Some([_, s]) | Some([_, _, s]) => *s,
            _ => default_stride,
        };
        Self::new(values, stride)
    }

    pub fn empty() -> Self {
        Self {
            values: Vec::new(),
            stride: RECORD_WIDTH,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len() / self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Records in tensor order; columns past the sixth are ignored.
    pub fn detections(&self) -> impl Iterator<Item = Detection> + '_ {
        self.values
            .chunks_exact(self.stride)
            .map(Detection::from_record)
    }
}

impl From<Vec<Detection>> for DetectionBatch {
    fn from(detections: Vec<Detection>) -> Self {
        let values = detections
            .iter()
            .flat_map(|d| [d.x, d.y, d.w, d.h, d.confidence, d.class_id])
            .collect();
        Self {
            values,
            stride: RECORD_WIDTH,
        }
    }
}

/// How surviving detection centers are combined.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CentroidMode {
    /// Unweighted arithmetic mean (default)
    #[default]
    Mean,
    /// Mean weighted by detection confidence
    Confidence,
}

/// Reduces one tick's detections to at most one gaze point.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    pub confidence_threshold: f32,
    pub mode: CentroidMode,
}

impl Aggregator {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            mode: CentroidMode::Mean,
        }
    }

    pub fn with_mode(mut self, mode: CentroidMode) -> Self {
        self.mode = mode;
        self
    }

    /// Centroid of the centers of detections at or above the threshold.
    /// `None` when nothing survives. Stateless between calls.
    pub fn aggregate<I>(&self, detections: I) -> Option<Point>
    where
        I: IntoIterator<Item = Detection>,
    {
        let mut sum_x = 0.0f64;
        let mut sum_y = 0.0f64;
        let mut total = 0.0f64;
        let mut mean_x = 0.0f64;
        let mut mean_y = 0.0f64;
        let mut survivors = 0usize;

        for d in detections {
            // NaN confidence never survives
            if !(d.confidence >= self.confidence_threshold) {
                continue;
            }
            let weight = match self.mode {
                CentroidMode::Mean => 1.0,
                CentroidMode::Confidence => d.confidence as f64,
            };
            let c = d.center();
            sum_x += c.x as f64 * weight;
            sum_y += c.y as f64 * weight;
            total += weight;
            mean_x += c.x as f64;
            mean_y += c.y as f64;
            survivors += 1;
        }

        if survivors == 0 {
            return None;
        }
        if total <= 0.0 {
            // Zero total weight: fall back to the plain mean
            let n = survivors as f64;
            return Some(Point::new((mean_x / n) as f32, (mean_y / n) as f32));
        }
        Some(Point::new((sum_x / total) as f32, (sum_y / total) as f32))
    }
}
