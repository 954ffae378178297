//! horseman-hw: hardware abstraction for camera capture.
//!
//! Provides V4L2-based color camera access, facing-mode selection and
//! pixel-format conversion to RGB frames.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, FacingMode, FrameSource, PixelFormat};
pub use frame::Frame;
