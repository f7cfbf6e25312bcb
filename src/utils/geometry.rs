use serde::{Deserialize, Serialize};

/// Width and height of a surface, either the intrinsic video frame or the
/// area it is displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned face rectangle in source-video pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FaceRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Edges are inclusive.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when the whole rectangle lies inside `[0, w] x [0, h]`.
    pub fn fits_within(&self, frame: Size) -> bool {
        self.width >= 0.0
            && self.height >= 0.0
            && self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= frame.width
            && self.y + self.height <= frame.height
    }

    pub fn scaled(&self, scale: Scale) -> FaceRegion {
        FaceRegion {
            x: self.x * scale.x,
            y: self.y * scale.y,
            width: self.width * scale.x,
            height: self.height * scale.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    /// Multiplier that converts a point in `from` space into `to` space.
    /// Returns `None` when either surface has no area.
    pub fn between(from: Size, to: Size) -> Option<Scale> {
        if from.is_empty() || to.is_empty() {
            return None;
        }
        Some(Scale {
            x: to.width / from.width,
            y: to.height / from.height,
        })
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.x, p.y * self.y)
    }
}

pub fn display_to_source(p: Point, display: Size, source: Size) -> Option<Point> {
    Scale::between(display, source).map(|s| s.apply(p))
}

/// Index of the first region (in detection order) containing `p`.
pub fn hit_test(regions: &[FaceRegion], p: Point) -> Option<usize> {
    regions.iter().position(|r| r.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prototype_faces() -> Vec<FaceRegion> {
        vec![
            FaceRegion::new(200.0, 100.0, 120.0, 120.0),
            FaceRegion::new(400.0, 150.0, 100.0, 100.0),
        ]
    }

    #[test]
    fn test_hit_inside_first_face() {
        let faces = prototype_faces();
        assert_eq!(hit_test(&faces, Point::new(250.0, 150.0)), Some(0));
        assert_eq!(hit_test(&faces, Point::new(450.0, 200.0)), Some(1));
    }

    #[test]
    fn test_hit_outside_all_faces() {
        let faces = prototype_faces();
        assert_eq!(hit_test(&faces, Point::new(1000.0, 1000.0)), None);
    }

    #[test]
    fn test_edges_are_inclusive() {
        let face = FaceRegion::new(200.0, 100.0, 120.0, 120.0);
        assert!(face.contains(Point::new(200.0, 100.0)));
        assert!(face.contains(Point::new(320.0, 220.0)));
        assert!(!face.contains(Point::new(320.1, 220.0)));
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        let faces = vec![
            FaceRegion::new(0.0, 0.0, 100.0, 100.0),
            FaceRegion::new(50.0, 50.0, 100.0, 100.0),
        ];
        assert_eq!(hit_test(&faces, Point::new(75.0, 75.0)), Some(0));
        assert_eq!(hit_test(&faces, Point::new(120.0, 120.0)), Some(1));
    }

    #[test]
    fn test_display_to_source_scaling() {
        let display = Size::new(640.0, 360.0);
        let source = Size::new(1280.0, 720.0);
        let p = display_to_source(Point::new(125.0, 75.0), display, source).unwrap();
        assert_eq!(p, Point::new(250.0, 150.0));

        assert!(display_to_source(Point::new(1.0, 1.0), Size::new(0.0, 360.0), source).is_none());
    }

    #[test]
    fn test_fits_within_frame() {
        let frame = Size::new(1280.0, 720.0);
        assert!(FaceRegion::new(200.0, 100.0, 120.0, 120.0).fits_within(frame));
        assert!(FaceRegion::new(1180.0, 620.0, 100.0, 100.0).fits_within(frame));
        assert!(!FaceRegion::new(1200.0, 100.0, 120.0, 120.0).fits_within(frame));
        assert!(!FaceRegion::new(-1.0, 100.0, 10.0, 10.0).fits_within(frame));
    }

    #[test]
    fn test_scaled_region_for_overlay() {
        let scale = Scale::between(Size::new(1280.0, 720.0), Size::new(640.0, 360.0)).unwrap();
        let shown = FaceRegion::new(200.0, 100.0, 120.0, 120.0).scaled(scale);
        assert_eq!(shown, FaceRegion::new(100.0, 50.0, 60.0, 60.0));
    }
}
