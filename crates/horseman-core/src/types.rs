use serde::{Deserialize, Serialize};

/// Face-mesh index of the forehead center.
pub const FOREHEAD: usize = 10;
/// Face-mesh index of the chin.
pub const CHIN: usize = 152;
/// Face-mesh index of the left temple.
pub const LEFT_TEMPLE: usize = 234;
/// Face-mesh index of the right temple.
pub const RIGHT_TEMPLE: usize = 454;

/// Points produced by the base face-mesh model.
pub const FACE_MESH_POINTS: usize = 468;
/// Points produced when iris refinement is enabled.
pub const REFINED_FACE_MESH_POINTS: usize = 478;

/// A single facial landmark in normalized frame coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Relative depth; unused by compositing.
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// One face's landmarks for a single frame, indexed by the face-mesh numbering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    pub points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    /// The four anchor points used for head ellipses.
    ///
    /// Returns `None` when the set is too short to contain them, which
    /// callers treat the same as "no face".
    pub fn anchors(&self) -> Option<FaceAnchors> {
        Some(FaceAnchors {
            forehead: self.get(FOREHEAD)?,
            chin: self.get(CHIN)?,
            left_temple: self.get(LEFT_TEMPLE)?,
            right_temple: self.get(RIGHT_TEMPLE)?,
        })
    }

    /// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` in normalized coordinates.
    pub fn bounds(&self) -> Option<(f32, f32, f32, f32)> {
        let first = self.points.first()?;
        let init = (first.x, first.y, first.x, first.y);
        Some(self.points.iter().fold(init, |(x0, y0, x1, y1), p| {
            (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y))
        }))
    }
}

/// Forehead, chin and temple landmarks extracted from a [`LandmarkSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceAnchors {
    pub forehead: Landmark,
    pub chin: Landmark,
    pub left_temple: Landmark,
    pub right_temple: Landmark,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a full-size set with the four anchors placed and every other point at `(0.5, 0.5)`.
    pub(crate) fn face_set(
        forehead: (f32, f32),
        chin: (f32, f32),
        left: (f32, f32),
        right: (f32, f32),
    ) -> LandmarkSet {
        let mut points = vec![Landmark::new(0.5, 0.5); FACE_MESH_POINTS];
        points[FOREHEAD] = Landmark::new(forehead.0, forehead.1);
        points[CHIN] = Landmark::new(chin.0, chin.1);
        points[LEFT_TEMPLE] = Landmark::new(left.0, left.1);
        points[RIGHT_TEMPLE] = Landmark::new(right.0, right.1);
        LandmarkSet::new(points)
    }

    #[test]
    fn test_anchors_present() {
        let set = face_set((0.5, 0.2), (0.5, 0.6), (0.3, 0.4), (0.7, 0.4));
        let a = set.anchors().unwrap();
        assert_eq!(a.forehead, Landmark::new(0.5, 0.2));
        assert_eq!(a.chin, Landmark::new(0.5, 0.6));
        assert_eq!(a.left_temple, Landmark::new(0.3, 0.4));
        assert_eq!(a.right_temple, Landmark::new(0.7, 0.4));
    }

    #[test]
    fn test_anchors_missing_on_short_set() {
        let set = LandmarkSet::new(vec![Landmark::default(); 200]);
        assert!(set.anchors().is_none());
    }

    #[test]
    fn test_bounds() {
        let set = LandmarkSet::new(vec![
            Landmark::new(0.2, 0.6),
            Landmark::new(0.4, 0.1),
            Landmark::new(0.3, 0.9),
        ]);
        assert_eq!(set.bounds(), Some((0.2, 0.1, 0.4, 0.9)));
        assert_eq!(LandmarkSet::default().bounds(), None);
    }

    #[test]
    fn test_deserialize_plain_array() {
        let json = r#"[{"x":0.1,"y":0.2},{"x":0.3,"y":0.4,"z":-0.01}]"#;
        let set: LandmarkSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.points[0], Landmark::new(0.1, 0.2));
        assert!((set.points[1].z + 0.01).abs() < 1e-6);
    }
}
