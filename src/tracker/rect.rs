use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Normalized bounding box with format conversion utilities.
///
/// Coordinates are fractions of the frame size with the origin at the
/// top-left corner, so a box covering the whole frame is `(0, 0, 1, 1)`.
///
/// Supports three common bounding box formats:
/// - TLWH: Top-Left X, Top-Left Y, Width, Height
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y
/// - XYWH: Center X, Center Y, Width, Height
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a Rect from XYWH format (center x, center y, width, height).
    #[inline]
    pub fn from_xywh(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Get the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get the area of the bounding box. Degenerate boxes have zero area.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Overlapping region of two boxes, or `None` when they only touch or are apart.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            Some(Rect::from_tlbr(x1, y1, x2, y2))
        } else {
            None
        }
    }

    /// Non-empty geometric overlap. Shared edges do not count.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter_area = self.intersection(other).map_or(0.0, |r| r.area());
        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }

    /// Clip the box to the unit square.
    pub fn clamped(&self) -> Rect {
        let x1 = self.x.clamp(0.0, 1.0);
        let y1 = self.y.clamp(0.0, 1.0);
        let x2 = self.right().clamp(0.0, 1.0);
        let y2 = self.bottom().clamp(0.0, 1.0);
        Rect::from_tlbr(x1, y1, x2.max(x1), y2.max(y1))
    }

    /// Pixel bounds `(col0, row0, col1, row1)` of the box inside a `width` x `height` image,
    /// clamped to the image. The end bounds are exclusive.
    pub fn to_pixels(&self, width: usize, height: usize) -> (usize, usize, usize, usize) {
        let r = self.clamped();
        let scale = |v: f32, n: usize| ((v * n as f32).round() as usize).min(n);
        (
            scale(r.x, width),
            scale(r.y, height),
            scale(r.right(), width),
            scale(r.bottom(), height),
        )
    }
}

/// Calculate IoU matrix between two sets of bounding boxes.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    let mut dists = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            dists[[i, j]] = a.iou(b);
        }
    }
    dists
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_conversions() {
        let rect = Rect::new(0.1, 0.2, 0.3, 0.4);

        assert_eq!(rect.to_tlwh(), [0.1, 0.2, 0.3, 0.4]);

        let tlbr = rect.to_tlbr();
        assert!((tlbr[2] - 0.4).abs() < 1e-6);
        assert!((tlbr[3] - 0.6).abs() < 1e-6);

        let (cx, cy) = rect.center();
        assert!((cx - 0.25).abs() < 1e-6);
        assert!((cy - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_from_xywh() {
        let rect = Rect::from_xywh(0.5, 0.5, 0.2, 0.4);
        assert!((rect.x - 0.4).abs() < 1e-6);
        assert!((rect.y - 0.3).abs() < 1e-6);
        assert!((rect.width - 0.2).abs() < 1e-6);
        assert!((rect.height - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_intersects() {
        let a = Rect::new(0.0, 0.0, 0.5, 0.5);
        let b = Rect::new(0.25, 0.25, 0.5, 0.5);
        let c = Rect::new(0.6, 0.6, 0.1, 0.1);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 0.5, 0.5);
        let b = Rect::new(0.5, 0.0, 0.5, 0.5);
        assert!(!a.intersects(&b));
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);

        // Intersection: 5x5 = 25
        // Union: 100 + 100 - 25 = 175
        let iou = a.iou(&b);
        assert!((iou - 25.0 / 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_same_box() {
        let a = Rect::new(0.1, 0.1, 0.2, 0.2);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_to_pixels_clamps() {
        let rect = Rect::new(-0.1, 0.5, 0.6, 0.75);
        assert_eq!(rect.to_pixels(100, 40), (0, 20, 50, 40));
    }

    #[test]
    fn test_iou_batch_shape() {
        let a = [Rect::new(0.0, 0.0, 0.5, 0.5), Rect::new(0.5, 0.5, 0.5, 0.5)];
        let b = [Rect::new(0.0, 0.0, 0.5, 0.5)];
        let m = iou_batch(&a, &b);
        assert_eq!(m.dim(), (2, 1));
        assert!((m[[0, 0]] - 1.0).abs() < 1e-6);
        assert_eq!(m[[1, 0]], 0.0);
    }
}
