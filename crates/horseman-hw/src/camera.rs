//! V4L2 camera capture via the `v4l` crate.

use crate::frame::{self, Frame};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

const STREAM_BUFFERS: u32 = 4;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
}

/// Which camera the session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// User-facing camera.
    #[default]
    #[serde(alias = "user")]
    Front,
    /// Environment-facing camera.
    #[serde(alias = "environment")]
    Back,
}

impl FacingMode {
    pub fn flipped(self) -> Self {
        match self {
            FacingMode::Front => FacingMode::Back,
            FacingMode::Back => FacingMode::Front,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FacingMode::Front => "user",
            FacingMode::Back => "environment",
        }
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" | "user" => Ok(FacingMode::Front),
            "back" | "environment" => Ok(FacingMode::Back),
            other => Err(format!("unknown facing mode: {other}")),
        }
    }
}

/// A source of successive camera frames.
pub trait FrameSource: Send {
    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<Frame, CameraError>;

    /// Release the capture stream. Further frames restart it.
    fn stop(&mut self) {}
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// Packed RGB24 (3 bytes/pixel).
    Rgb3,
    /// Motion JPEG, one compressed image per buffer.
    Mjpg,
}

/// V4L2 camera device handle.
pub struct Camera {
    device: Device,
    stream: Option<MmapStream<'static>>,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pub fourcc: FourCC,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0") and request
    /// the given resolution.
    pub fn open(device_path: &str, width: u32, height: u32) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("busy") || msg.contains("EBUSY") {
                CameraError::DeviceBusy
            } else if e.kind() == std::io::ErrorKind::PermissionDenied {
                CameraError::PermissionDenied(device_path.to_string())
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV; drivers that only offer RGB3 or MJPG negotiate those instead.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = width;
        fmt.height = height;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = if fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if fourcc == FourCC::new(b"RGB3") {
            PixelFormat::Rgb3
        } else if fourcc == FourCC::new(b"MJPG") {
            PixelFormat::Mjpg
        } else {
            return Err(CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, RGB3, or MJPG)"
            )));
        };

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "negotiated format"
        );

        Ok(Self {
            device,
            stream: None,
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            fourcc,
            pixel_format,
        })
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}

impl FrameSource for Camera {
    fn next_frame(&mut self) -> Result<Frame, CameraError> {
        if self.stream.is_none() {
            let stream =
                MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
                    .map_err(|e| {
                        CameraError::CaptureFailed(format!("failed to create mmap stream: {e}"))
                    })?;
            tracing::debug!(device = %self.device_path, "capture stream started");
            self.stream = Some(stream);
        }
        let (format, width, height) = (self.pixel_format, self.width, self.height);
        let Some(stream) = self.stream.as_mut() else {
            return Err(CameraError::CaptureFailed("capture stream unavailable".into()));
        };

        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
        let image = buf_to_rgb(format, buf, width, height)?;
        Ok(Frame::new(image, meta.sequence))
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!(device = %self.device_path, "capture stream stopped");
        }
    }
}

/// Convert a raw buffer to RGB based on the negotiated format.
fn buf_to_rgb(
    format: PixelFormat,
    buf: &[u8],
    width: u32,
    height: u32,
) -> Result<image::RgbImage, CameraError> {
    let converted = match format {
        PixelFormat::Yuyv => frame::yuyv_to_rgb(buf, width, height),
        PixelFormat::Rgb3 => frame::rgb24_to_rgb(buf, width, height),
        PixelFormat::Mjpg => frame::mjpeg_to_rgb(buf),
    };
    converted.map_err(|e| CameraError::CaptureFailed(format!("{format:?} conversion failed: {e}")))
}
