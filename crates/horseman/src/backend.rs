use crate::config::Config;
use crate::engine::EngineError;
use crate::session::SessionBackend;
use horseman_core::{FaceMeshTracker, LandmarkDetector};
use horseman_hw::{Camera, FacingMode, FrameSource};

/// Opens the real V4L2 camera and the ONNX face-mesh tracker.
pub struct HardwareBackend {
    config: Config,
}

impl HardwareBackend {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl SessionBackend for HardwareBackend {
    fn open_source(&self, facing: FacingMode) -> Result<Box<dyn FrameSource>, EngineError> {
        let device = self.config.device_for(facing);
        let camera = Camera::open(
            device,
            self.config.capture_width,
            self.config.capture_height,
        )?;
        tracing::info!(
            device,
            facing = facing.as_str(),
            width = camera.width,
            height = camera.height,
            fourcc = ?camera.fourcc,
            pixel_format = ?camera.pixel_format(),
            "camera opened"
        );
        Ok(Box::new(camera))
    }

    fn open_detector(&self) -> Result<Box<dyn LandmarkDetector>, EngineError> {
        let path = self.config.model_path.to_string_lossy();
        let tracker = FaceMeshTracker::load(&path, self.config.tracker_options())?;
        tracing::info!(path = %path, "face mesh tracker loaded");
        Ok(Box::new(tracker))
    }
}
