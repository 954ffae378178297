//! Face-mesh landmark tracker via ONNX Runtime.
//!
//! Runs a single-face mesh model (192×192 RGB input) in two modes. Detection
//! mode feeds the whole frame, letterboxed to a square, and accepts a face
//! above the detection confidence. Tracking mode crops a square region around
//! the previous frame's landmarks and accepts a face above the tracking
//! confidence. Losing the face drops back to detection mode.

use crate::types::{Landmark, LandmarkSet, FACE_MESH_POINTS, REFINED_FACE_MESH_POINTS};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const MESH_INPUT_SIZE: usize = 192;
/// Tracking crop side relative to the previous landmark bounding box.
const ROI_EXPANSION: f32 = 1.5;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("model file not found: {0}; place a face-mesh ONNX model there or set HORSEMAN_MODEL_PATH")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Landmark model configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerOptions {
    /// Faces to track. Only one is ever reported.
    pub max_num_faces: usize,
    /// Keep the iris refinement points when the model provides them.
    pub refine_landmarks: bool,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            max_num_faces: 1,
            refine_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// Produces at most one landmark set per frame.
pub trait LandmarkDetector: Send {
    fn process(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>, TrackerError>;
}

/// Square crop of the frame fed to the model, in frame pixels. May extend past the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Roi {
    x: f32,
    y: f32,
    size: f32,
}

impl Roi {
    /// Square covering the whole frame, centered.
    fn whole_frame(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let size = w.max(h);
        Self {
            x: (w - size) / 2.0,
            y: (h - size) / 2.0,
            size,
        }
    }

    /// Square around the landmarks' bounding box, expanded by [`ROI_EXPANSION`].
    fn around(set: &LandmarkSet, width: u32, height: u32) -> Option<Self> {
        let (x0, y0, x1, y1) = set.bounds()?;
        let (w, h) = (width as f32, height as f32);
        let side = ((x1 - x0) * w).max((y1 - y0) * h) * ROI_EXPANSION;
        if side <= 1.0 {
            return None;
        }
        let cx = (x0 + x1) / 2.0 * w;
        let cy = (y0 + y1) / 2.0 * h;
        Some(Self {
            x: cx - side / 2.0,
            y: cy - side / 2.0,
            size: side,
        })
    }
}

/// Single-face mesh tracker backed by an ONNX session.
pub struct FaceMeshTracker {
    session: Session,
    options: TrackerOptions,
    landmark_output: usize,
    score_output: usize,
    /// Crop for the next frame while a face is being tracked.
    tracked: Option<Roi>,
}

impl FaceMeshTracker {
    /// Load the face-mesh ONNX model from the given path.
    pub fn load(model_path: &str, options: TrackerOptions) -> Result<Self, TrackerError> {
        if !Path::new(model_path).exists() {
            return Err(TrackerError::ModelNotFound(model_path.to_string()));
        }
        if options.max_num_faces != 1 {
            tracing::warn!(
                requested = options.max_num_faces,
                "face-mesh tracker reports a single face"
            );
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();
        tracing::info!(
            path = model_path,
            outputs = ?output_names,
            refine = options.refine_landmarks,
            "loaded face-mesh model"
        );

        let (landmark_output, score_output) = discover_outputs(&output_names)?;
        tracing::debug!(landmark_output, score_output, "face-mesh output mapping");

        Ok(Self {
            session,
            options,
            landmark_output,
            score_output,
            tracked: None,
        })
    }
}

impl LandmarkDetector for FaceMeshTracker {
    fn process(&mut self, frame: &RgbImage) -> Result<Option<LandmarkSet>, TrackerError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let (roi, threshold) = match self.tracked {
            Some(roi) => (roi, self.options.min_tracking_confidence),
            None => (
                Roi::whole_frame(width, height),
                self.options.min_detection_confidence,
            ),
        };
        let landmark_idx = self.landmark_output;
        let score_idx = self.score_output;
        let refine = self.options.refine_landmarks;

        let input = preprocess(frame, roi);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[landmark_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| TrackerError::InferenceFailed(format!("landmarks: {e}")))?;
        let (_, logits) = outputs[score_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| TrackerError::InferenceFailed(format!("face score: {e}")))?;

        let score = logits.first().copied().map(sigmoid).unwrap_or(0.0);
        if score < threshold {
            if self.tracked.is_some() {
                tracing::debug!(score, threshold, "face lost; back to detection");
            }
            self.tracked = None;
            return Ok(None);
        }

        let points = decode_landmarks(raw, roi, width, height, refine)?;
        let set = LandmarkSet::new(points);
        if self.tracked.is_none() {
            tracing::debug!(score, "face acquired; tracking");
        }
        self.tracked = Roi::around(&set, width, height);
        Ok(Some(set))
    }
}

/// Locate the landmark and face-score outputs by name, falling back to
/// positional order (landmarks first).
fn discover_outputs(names: &[String]) -> Result<(usize, usize), TrackerError> {
    if names.len() < 2 {
        return Err(TrackerError::InferenceFailed(format!(
            "face-mesh model requires landmark and score outputs, got {}",
            names.len()
        )));
    }
    let find = |keys: &[&str]| {
        names.iter().position(|n| {
            let n = n.to_ascii_lowercase();
            keys.iter().any(|k| n.contains(k))
        })
    };
    let score = find(&["score", "flag", "presence"]);
    let landmarks = find(&["landmark", "mesh"]);
    Ok(match (landmarks, score) {
        (Some(l), Some(s)) if l != s => (l, s),
        (Some(l), None) => (l, if l == 0 { 1 } else { 0 }),
        (None, Some(s)) => (if s == 0 { 1 } else { 0 }, s),
        _ => (0, 1),
    })
}

/// Crop `roi` from the frame, resize bilinearly to the model input and
/// normalize to `[0,1]` in NCHW order. Pixels outside the frame read as black.
pub(crate) fn preprocess(frame: &RgbImage, roi: Roi) -> Array4<f32> {
    let n = MESH_INPUT_SIZE;
    let (fw, fh) = frame.dimensions();
    let step = roi.size / n as f32;
    let mut tensor = Array4::<f32>::zeros((1, 3, n, n));

    let sample = |x: i64, y: i64| -> [f32; 3] {
        if x < 0 || y < 0 || x >= fw as i64 || y >= fh as i64 {
            return [0.0; 3];
        }
        let p = frame.get_pixel(x as u32, y as u32);
        [p[0] as f32, p[1] as f32, p[2] as f32]
    };

    for y in 0..n {
        let sy = roi.y + (y as f32 + 0.5) * step - 0.5;
        let y0 = sy.floor();
        let fy = sy - y0;
        for x in 0..n {
            let sx = roi.x + (x as f32 + 0.5) * step - 0.5;
            let x0 = sx.floor();
            let fx = sx - x0;

            let (xi, yi) = (x0 as i64, y0 as i64);
            let tl = sample(xi, yi);
            let tr = sample(xi + 1, yi);
            let bl = sample(xi, yi + 1);
            let br = sample(xi + 1, yi + 1);

            for c in 0..3 {
                let top = tl[c] * (1.0 - fx) + tr[c] * fx;
                let bot = bl[c] * (1.0 - fx) + br[c] * fx;
                tensor[[0, c, y, x]] = (top * (1.0 - fy) + bot * fy) / 255.0;
            }
        }
    }
    tensor
}

/// Convert raw model output (x, y, z triples in input pixels) into
/// frame-normalized landmarks.
pub(crate) fn decode_landmarks(
    raw: &[f32],
    roi: Roi,
    width: u32,
    height: u32,
    refine: bool,
) -> Result<Vec<Landmark>, TrackerError> {
    let count = raw.len() / 3;
    if count < FACE_MESH_POINTS {
        return Err(TrackerError::InferenceFailed(format!(
            "expected at least {FACE_MESH_POINTS} landmarks, got {count}"
        )));
    }
    let keep = if refine {
        count.min(REFINED_FACE_MESH_POINTS)
    } else {
        FACE_MESH_POINTS
    };

    let scale = roi.size / MESH_INPUT_SIZE as f32;
    let (w, h) = (width as f32, height as f32);
    Ok(raw
        .chunks_exact(3)
        .take(keep)
        .map(|p| Landmark {
            x: (roi.x + p[0] * scale) / w,
            y: (roi.y + p[1] * scale) / h,
            z: p[2] / MESH_INPUT_SIZE as f32,
        })
        .collect())
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
