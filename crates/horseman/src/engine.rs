use horseman_core::{LandmarkDetector, LandmarkSet, TrackerError};
use horseman_hw::{CameraError, Frame, FrameSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),
    #[error("failed to spawn tracking thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// One camera frame and the face found in it, if any.
#[derive(Debug)]
pub struct TrackedFrame {
    /// Session generation of the pipeline that produced this frame.
    pub generation: u64,
    pub frame: Frame,
    pub landmarks: Option<LandmarkSet>,
}

/// Latest tracking result. Holds one value; unread results are overwritten.
pub type TrackingReceiver = watch::Receiver<Option<Arc<TrackedFrame>>>;

/// A running camera + inference thread.
///
/// Dropping or stopping the pipeline signals the thread and waits for it,
/// so two pipelines never hold the camera at once.
pub struct Pipeline {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    results: TrackingReceiver,
}

impl Pipeline {
    /// Spawn the tracking thread: pull a frame, run the detector, publish.
    /// Every result is stamped with `generation`.
    pub fn spawn(
        generation: u64,
        mut source: Box<dyn FrameSource>,
        mut detector: Box<dyn LandmarkDetector>,
    ) -> Result<Self, EngineError> {
        let (tx, rx) = watch::channel::<Option<Arc<TrackedFrame>>>(None);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("horseman-tracking".into())
            .spawn(move || {
                tracing::info!(generation, "tracking pipeline started");
                while !stop_flag.load(Ordering::Acquire) {
                    let frame = match source.next_frame() {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!(error = %e, "camera stopped delivering frames");
                            break;
                        }
                    };
                    let landmarks = match detector.process(&frame.image) {
                        Ok(landmarks) => landmarks,
                        Err(e) => {
                            tracing::warn!(
                                seq = frame.sequence,
                                error = %e,
                                "landmark inference failed"
                            );
                            None
                        }
                    };
                    tracing::trace!(
                        seq = frame.sequence,
                        latency_ms = frame.timestamp.elapsed().as_millis() as u64,
                        face = landmarks.is_some(),
                        "frame tracked"
                    );
                    let tracked = TrackedFrame {
                        generation,
                        frame,
                        landmarks,
                    };
                    if tx.send(Some(Arc::new(tracked))).is_err() {
                        break;
                    }
                }
                source.stop();
                tracing::info!("tracking pipeline exiting");
            })?;

        Ok(Self {
            stop,
            thread: Some(thread),
            results: rx,
        })
    }

    /// A receiver observing this pipeline's results.
    pub fn subscribe(&self) -> TrackingReceiver {
        self.results.clone()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the thread and wait for it to release the camera.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("tracking thread panicked");
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
