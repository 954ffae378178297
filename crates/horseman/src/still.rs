//! Offline compositing of a single image, without a camera.

use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use horseman_core::asset::load_rgba;
use horseman_core::export::encode_png;
use horseman_core::{
    capture_head, Compositor, FaceMeshTracker, LandmarkDetector, LandmarkSet, RiderAsset, Size,
};
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone)]
pub struct StillArgs {
    /// Input photo
    #[arg(long)]
    pub frame: PathBuf,
    /// Face landmarks as a JSON array of {x, y, z} in normalized coordinates
    #[arg(long, conflicts_with = "model")]
    pub landmarks: Option<PathBuf>,
    /// Face-mesh ONNX model (defaults to the configured model)
    #[arg(long)]
    pub model: Option<PathBuf>,
    /// Rider illustration (defaults to the configured asset)
    #[arg(long)]
    pub rider: Option<PathBuf>,
    /// Erase the subject's head from the frame
    #[arg(long, conflicts_with = "show_head")]
    pub hide_head: bool,
    /// Keep the subject's head visible
    #[arg(long)]
    pub show_head: bool,
    /// Cutout scale in percent
    #[arg(long)]
    pub scale: Option<i32>,
    /// Horizontal cutout offset in pixels
    #[arg(long, allow_hyphen_values = true)]
    pub x: Option<i32>,
    /// Vertical cutout offset in pixels
    #[arg(long, allow_hyphen_values = true)]
    pub y: Option<i32>,
    /// Output width (defaults to the configured display width)
    #[arg(long)]
    pub width: Option<u32>,
    /// Output height (defaults to the configured display height)
    #[arg(long)]
    pub height: Option<u32>,
    /// Output PNG
    #[arg(long, short, default_value = "headless_horseman.png")]
    pub out: PathBuf,
}

/// Capture the head from `frame` and composite it onto the rider.
pub fn run(args: &StillArgs, config: &Config) -> Result<PathBuf> {
    let frame = image::open(&args.frame)
        .with_context(|| format!("failed to open {}", args.frame.display()))?
        .to_rgb8();

    let landmarks = match &args.landmarks {
        Some(path) => Some(read_landmarks(path)?),
        None => {
            let model = args.model.as_ref().unwrap_or(&config.model_path);
            let mut tracker =
                FaceMeshTracker::load(&model.to_string_lossy(), config.tracker_options())?;
            tracker.process(&frame)?
        }
    }
    .filter(|set| !set.is_empty());
    if landmarks.is_none() {
        tracing::warn!(frame = %args.frame.display(), "no face found; compositing without a head");
    }

    let rider_path = args.rider.as_ref().unwrap_or(&config.rider_path);
    let rider = match load_rgba(rider_path) {
        Ok(image) => RiderAsset::ready(image),
        Err(e) => {
            tracing::warn!(path = %rider_path.display(), error = %e, "rider not loaded");
            RiderAsset::pending()
        }
    };

    let display = Size::new(
        args.width.unwrap_or(config.display_width),
        args.height.unwrap_or(config.display_height),
    );
    let mut options = config.render_options();
    if args.hide_head {
        options.hide_head = true;
    } else if args.show_head {
        options.hide_head = false;
    }
    if let Some(scale) = args.scale {
        options.placement.scale_percent = scale;
    }
    if let Some(x) = args.x {
        options.placement.offset_x = x;
    }
    if let Some(y) = args.y {
        options.placement.offset_y = y;
    }

    let cutout = landmarks
        .as_ref()
        .and_then(|set| capture_head(&frame, display, set, config.capture_options()));

    let mut compositor = Compositor::new(rider);
    compositor.render(display, &frame, landmarks.as_ref(), cutout.as_ref(), &options);

    let photo = encode_png(compositor.canvas())?;
    std::fs::write(&args.out, &photo.bytes)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    tracing::info!(
        out = %args.out.display(),
        width = display.width,
        height = display.height,
        head = cutout.is_some(),
        "still composited"
    );
    Ok(args.out.clone())
}

fn read_landmarks(path: &Path) -> Result<LandmarkSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let set: LandmarkSet = serde_json::from_str(&text)
        .with_context(|| format!("invalid landmarks in {}", path.display()))?;
    Ok(set)
}
