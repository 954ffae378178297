//! The live session: one owner for facing mode, latest tracking result,
//! cached head cutout, render toggles and the running pipeline.

use crate::controls::Control;
use crate::engine::{EngineError, Pipeline, TrackedFrame, TrackingReceiver};
use horseman_core::export::{self, DownloadTarget, ExportError, ExportOutcome, ShareTarget};
use horseman_core::{
    CaptureOptions, Compositor, CutoutCache, LandmarkDetector, RenderOptions, RiderAsset, Size,
};
use horseman_hw::{FacingMode, FrameSource};
use image::RgbaImage;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to start tracking: {0}")]
    Engine(#[from] EngineError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

/// Opens the camera and landmark detector for a session.
pub trait SessionBackend {
    fn open_source(&self, facing: FacingMode) -> Result<Box<dyn FrameSource>, EngineError>;
    fn open_detector(&self) -> Result<Box<dyn LandmarkDetector>, EngineError>;
}

pub struct Session<B: SessionBackend> {
    backend: B,
    facing: FacingMode,
    pipeline: Option<Pipeline>,
    latest: Option<Arc<TrackedFrame>>,
    compositor: Compositor,
    cutouts: CutoutCache,
    options: RenderOptions,
    capture_options: CaptureOptions,
    display: Size,
    share: Option<Box<dyn ShareTarget>>,
    download: Box<dyn DownloadTarget>,
    generation: u64,
}

impl<B: SessionBackend> Session<B> {
    pub fn new(backend: B, rider: RiderAsset, download: Box<dyn DownloadTarget>) -> Self {
        Self {
            backend,
            facing: FacingMode::default(),
            pipeline: None,
            latest: None,
            compositor: Compositor::new(rider),
            cutouts: CutoutCache::new(),
            options: RenderOptions::default(),
            capture_options: CaptureOptions::default(),
            display: Size::new(1280, 720),
            share: None,
            download,
            generation: 0,
        }
    }

    pub fn with_share(mut self, share: Box<dyn ShareTarget>) -> Self {
        self.share = Some(share);
        self
    }

    pub fn with_facing(mut self, facing: FacingMode) -> Self {
        self.facing = facing;
        self
    }

    pub fn with_display(mut self, display: Size) -> Self {
        self.display = display;
        self
    }

    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_capture_options(mut self, options: CaptureOptions) -> Self {
        self.capture_options = options;
        self
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn render_options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn display(&self) -> Size {
        self.display
    }

    pub fn canvas(&self) -> &RgbaImage {
        self.compositor.canvas()
    }

    pub fn has_cutout(&self) -> bool {
        self.cutouts.get().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.pipeline.as_ref().is_some_and(Pipeline::is_running)
    }

    /// Bumped whenever a pipeline starts or stops; callers re-subscribe when it changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Results of the active pipeline, if any.
    pub fn subscribe(&self) -> Option<TrackingReceiver> {
        self.pipeline.as_ref().map(Pipeline::subscribe)
    }

    /// Open the camera for the current facing mode and start tracking.
    ///
    /// Any running pipeline is stopped first. On failure the view goes blank
    /// and the session stays usable.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.stop();
        let result = self.spawn_pipeline();
        if result.is_err() {
            self.compositor.clear();
        }
        result
    }

    fn spawn_pipeline(&mut self) -> Result<(), SessionError> {
        let source = self.backend.open_source(self.facing)?;
        let detector = self.backend.open_detector()?;
        self.pipeline = Some(Pipeline::spawn(self.generation + 1, source, detector)?);
        self.generation += 1;
        tracing::info!(
            facing = self.facing.as_str(),
            generation = self.generation,
            "session started"
        );
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.stop();
            self.generation += 1;
            tracing::info!(generation = self.generation, "session stopped");
        }
        self.latest = None;
    }

    /// Record a tracking result and render it. Results from a pipeline
    /// that has since been stopped are dropped.
    pub fn on_frame(&mut self, tracked: Arc<TrackedFrame>) {
        if tracked.generation != self.generation {
            tracing::debug!(
                frame_generation = tracked.generation,
                generation = self.generation,
                "stale frame dropped"
            );
            return;
        }
        self.latest = Some(tracked);
        self.render();
    }

    /// Compose the latest frame onto the canvas.
    pub fn render(&mut self) {
        let Some(tracked) = &self.latest else {
            return;
        };
        self.compositor.render(
            self.display,
            &tracked.frame.image,
            tracked.landmarks.as_ref(),
            self.cutouts.get().map(|c| &**c),
            &self.options,
        );
    }

    /// Cut the head out of the latest frame. No-op without a face.
    pub fn capture_head(&mut self) -> bool {
        let Some(tracked) = &self.latest else {
            tracing::debug!("capture ignored: no frame yet");
            return false;
        };
        let captured = self.cutouts.capture(
            &tracked.frame.image,
            self.display,
            tracked.landmarks.as_ref(),
            self.capture_options,
        );
        if captured {
            tracing::info!(seq = tracked.frame.sequence, "head captured");
            self.render();
        } else {
            tracing::debug!("capture ignored: no face");
        }
        captured
    }

    /// Export the current canvas.
    pub fn export(&self) -> Result<ExportOutcome, SessionError> {
        let outcome = export::export_photo(
            self.compositor.canvas(),
            self.share.as_deref(),
            &*self.download,
        )?;
        Ok(outcome)
    }

    /// Export the current canvas and return the text to show, if any.
    pub fn take_photo(&self) -> Option<String> {
        match self.export() {
            Ok(outcome) => outcome.message().map(str::to_string),
            Err(e) => {
                tracing::error!(error = %e, "photo export failed");
                Some(export::SAVE_FAILED.to_string())
            }
        }
    }

    /// Switch cameras and restart tracking on the new one.
    pub fn flip(&mut self) -> Result<(), SessionError> {
        self.facing = self.facing.flipped();
        tracing::info!(facing = self.facing.as_str(), "camera flipped");
        self.start()
    }

    /// Set head hiding; `None` toggles the current value.
    pub fn set_hide_head(&mut self, hide: Option<bool>) {
        self.options.hide_head = hide.unwrap_or(!self.options.hide_head);
        self.render();
    }

    pub fn set_scale(&mut self, percent: i32) {
        self.options.placement.scale_percent = percent;
        self.render();
    }

    pub fn set_offset_x(&mut self, x: i32) {
        self.options.placement.offset_x = x;
        self.render();
    }

    pub fn set_offset_y(&mut self, y: i32) {
        self.options.placement.offset_y = y;
        self.render();
    }

    pub fn resize(&mut self, display: Size) {
        self.display = display;
        self.render();
    }

    /// Apply one control. Returns text for the user, if any.
    pub fn apply(&mut self, control: Control) -> Option<String> {
        match control {
            Control::Start => {
                if let Err(e) = self.start() {
                    tracing::error!(error = %e, "camera start failed");
                }
            }
            Control::Flip => {
                if let Err(e) = self.flip() {
                    tracing::error!(error = %e, "camera restart failed");
                }
            }
            Control::Capture => {
                self.capture_head();
            }
            Control::Photo => return self.take_photo(),
            Control::Hide(hide) => self.set_hide_head(hide),
            Control::Scale(n) => self.set_scale(n),
            Control::X(n) => self.set_offset_x(n),
            Control::Y(n) => self.set_offset_y(n),
            Control::Resize(w, h) => self.resize(Size::new(w, h)),
            Control::Quit => self.stop(),
        }
        None
    }
}
