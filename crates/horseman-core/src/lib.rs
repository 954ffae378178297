//! horseman-core: headless horseman compositing engine.
//!
//! Cover-fit geometry, alpha-mask raster operations, the per-frame
//! compositor, head capture, photo export and a face-mesh landmark
//! tracker running via ONNX Runtime.

pub mod asset;
pub mod capture;
pub mod compositor;
pub mod export;
pub mod geometry;
pub mod raster;
pub mod tracker;
pub mod types;

pub use asset::RiderAsset;
pub use capture::{capture_head, CaptureOptions, CutoutCache, HeadCutout};
pub use compositor::{Compositor, Placement, RenderOptions};
pub use geometry::{CoverFit, Ellipse, Rect, Size};
pub use tracker::{FaceMeshTracker, LandmarkDetector, TrackerError, TrackerOptions};
pub use types::{Landmark, LandmarkSet};
