use horseman_core::{CaptureOptions, Placement, RenderOptions, Size, TrackerOptions};
use horseman_hw::FacingMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Application configuration: defaults, then an optional TOML file, then
/// `HORSEMAN_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// V4L2 device for the user-facing camera.
    pub front_device: String,
    /// V4L2 device for the environment-facing camera.
    pub back_device: String,
    pub capture_width: u32,
    pub capture_height: u32,
    /// Face-mesh ONNX model.
    pub model_path: PathBuf,
    /// Rider illustration.
    pub rider_path: PathBuf,
    pub refine_landmarks: bool,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    /// Size of the displayed canvas.
    pub display_width: u32,
    pub display_height: u32,
    /// Where photos are saved when sharing is unavailable.
    pub download_dir: PathBuf,
    /// External command that receives the photo path for native sharing.
    pub share_command: Option<String>,
    /// Trim captured heads to the ellipse bounds.
    pub crop_cutout: bool,
    pub hide_head: bool,
    pub head_scale: i32,
    pub head_x: i32,
    pub head_y: i32,
    pub facing: FacingMode,
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(&home).join(".local/share"))
            .join("horseman");
        let download_dir = std::env::var("XDG_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(&home).join("Downloads"));

        Self {
            front_device: "/dev/video0".to_string(),
            back_device: "/dev/video2".to_string(),
            capture_width: 1280,
            capture_height: 720,
            model_path: data_dir.join("models/face_landmark.onnx"),
            rider_path: data_dir.join("assets/horseman.png"),
            refine_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            display_width: 1280,
            display_height: 720,
            download_dir,
            share_command: None,
            crop_cutout: false,
            hide_head: true,
            head_scale: 100,
            head_x: 0,
            head_y: 0,
            facing: FacingMode::Front,
        }
    }
}

impl Config {
    /// Load configuration. `path` (or `HORSEMAN_CONFIG`) names an optional TOML file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var("HORSEMAN_CONFIG").ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay `HORSEMAN_*` variables read through `get`. Unparseable values are ignored.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("HORSEMAN_FRONT_DEVICE") {
            self.front_device = v;
        }
        if let Some(v) = get("HORSEMAN_BACK_DEVICE") {
            self.back_device = v;
        }
        if let Some(v) = get("HORSEMAN_MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = get("HORSEMAN_RIDER_PATH") {
            self.rider_path = PathBuf::from(v);
        }
        if let Some(v) = get("HORSEMAN_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(v);
        }
        if let Some(v) = get("HORSEMAN_SHARE_COMMAND") {
            self.share_command = Some(v).filter(|s| !s.trim().is_empty());
        }
        set_parsed(&get, "HORSEMAN_CAPTURE_WIDTH", &mut self.capture_width);
        set_parsed(&get, "HORSEMAN_CAPTURE_HEIGHT", &mut self.capture_height);
        set_parsed(&get, "HORSEMAN_DISPLAY_WIDTH", &mut self.display_width);
        set_parsed(&get, "HORSEMAN_DISPLAY_HEIGHT", &mut self.display_height);
        set_parsed(&get, "HORSEMAN_MIN_DETECTION_CONFIDENCE", &mut self.min_detection_confidence);
        set_parsed(&get, "HORSEMAN_MIN_TRACKING_CONFIDENCE", &mut self.min_tracking_confidence);
        set_parsed(&get, "HORSEMAN_HEAD_SCALE", &mut self.head_scale);
        set_parsed(&get, "HORSEMAN_HEAD_X", &mut self.head_x);
        set_parsed(&get, "HORSEMAN_HEAD_Y", &mut self.head_y);
        set_parsed(&get, "HORSEMAN_FACING", &mut self.facing);
        set_flag(&get, "HORSEMAN_REFINE_LANDMARKS", &mut self.refine_landmarks);
        set_flag(&get, "HORSEMAN_CROP_CUTOUT", &mut self.crop_cutout);
        set_flag(&get, "HORSEMAN_HIDE_HEAD", &mut self.hide_head);
    }

    /// Camera device for the given facing mode.
    pub fn device_for(&self, facing: FacingMode) -> &str {
        match facing {
            FacingMode::Front => &self.front_device,
            FacingMode::Back => &self.back_device,
        }
    }

    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            refine_landmarks: self.refine_landmarks,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
            ..TrackerOptions::default()
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            hide_head: self.hide_head,
            placement: Placement {
                scale_percent: self.head_scale,
                offset_x: self.head_x,
                offset_y: self.head_y,
            },
        }
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            crop_to_ellipse: self.crop_cutout,
        }
    }

    pub fn display_size(&self) -> Size {
        Size::new(self.display_width, self.display_height)
    }
}

fn set_parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    if let Some(v) = get(key).and_then(|v| v.trim().parse().ok()) {
        *slot = v;
    }
}

fn set_flag(get: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut bool) {
    if let Some(v) = get(key) {
        *slot = v != "0";
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!((c.capture_width, c.capture_height), (1280, 720));
        assert_eq!(c.min_detection_confidence, 0.5);
        assert_eq!(c.min_tracking_confidence, 0.5);
        assert_eq!(c.head_scale, 100);
        assert_eq!(c.facing, FacingMode::Front);
        assert!(c.refine_landmarks);
        assert!(c.share_command.is_none());
    }

    #[test]
    fn test_toml_partial_overrides() {
        let c = Config::from_toml(
            r#"
            back_device = "/dev/video4"
            head_scale = 150
            facing = "environment"
            share_command = "wl-copy --type image/png"
            "#,
        )
        .unwrap();
        assert_eq!(c.back_device, "/dev/video4");
        assert_eq!(c.head_scale, 150);
        assert_eq!(c.facing, FacingMode::Back);
        assert_eq!(c.share_command.as_deref(), Some("wl-copy --type image/png"));
        assert_eq!(c.front_device, "/dev/video0");
    }

    #[test]
    fn test_toml_rejects_bad_types() {
        assert!(Config::from_toml("head_scale = \"big\"").is_err());
    }

    #[test]
    fn test_env_overlay() {
        let mut c = Config::default();
        c.apply_env(env(&[
            ("HORSEMAN_FRONT_DEVICE", "/dev/video7"),
            ("HORSEMAN_MIN_TRACKING_CONFIDENCE", "0.8"),
            ("HORSEMAN_HEAD_X", "-25"),
            ("HORSEMAN_HIDE_HEAD", "0"),
            ("HORSEMAN_FACING", "back"),
            ("HORSEMAN_DISPLAY_WIDTH", "not-a-number"),
        ]));
        assert_eq!(c.front_device, "/dev/video7");
        assert_eq!(c.min_tracking_confidence, 0.8);
        assert_eq!(c.head_x, -25);
        assert!(!c.hide_head);
        assert_eq!(c.facing, FacingMode::Back);
        assert_eq!(c.display_width, 1280);
    }

    #[test]
    fn test_empty_share_command_disables_sharing() {
        let mut c = Config::default();
        c.apply_env(env(&[("HORSEMAN_SHARE_COMMAND", "  ")]));
        assert!(c.share_command.is_none());
    }

    #[test]
    fn test_device_for_facing() {
        let c = Config::default();
        assert_eq!(c.device_for(FacingMode::Front), "/dev/video0");
        assert_eq!(c.device_for(FacingMode::Back), "/dev/video2");
    }

    #[test]
    fn test_derived_options() {
        let mut c = Config::default();
        c.head_scale = 120;
        c.head_y = 8;
        c.crop_cutout = true;
        let r = c.render_options();
        assert_eq!(r.placement.scale_percent, 120);
        assert_eq!(r.placement.offset_y, 8);
        assert!(c.capture_options().crop_to_ellipse);
        assert_eq!(c.tracker_options().max_num_faces, 1);
        assert_eq!(c.display_size(), Size::new(1280, 720));
    }
}
