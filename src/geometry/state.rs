//! Geometry primitives and clamping rules for the script panel.

use crate::config::PanelConfig;

/// A point in viewport coordinates (CSS pixels, top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Panel position and size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// True if the whole rect lies inside a viewport of the given size
    pub fn is_inside(&self, viewport: Size) -> bool {
        self.left >= 0.0
            && self.top >= 0.0
            && self.right() <= viewport.width
            && self.bottom() <= viewport.height
    }
}

/// Edge handle used for direct resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Bottom,
    Left,
    Right,
}

/// Min/max size limits applied to every geometry update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeBounds {
    pub min: Size,
    pub max: Size,
}

impl From<&PanelConfig> for SizeBounds {
    fn from(c: &PanelConfig) -> Self {
        Self {
            min: Size::new(c.min_width, c.min_height),
            max: Size::new(c.max_width, c.max_height),
        }
    }
}

impl SizeBounds {
    /// Largest width allowed in the viewport; never below the minimum
    fn max_width_in(&self, viewport: Size) -> f64 {
        self.max.width.min(viewport.width).max(self.min.width)
    }

    fn max_height_in(&self, viewport: Size) -> f64 {
        self.max.height.min(viewport.height).max(self.min.height)
    }

    pub fn clamp_width(&self, width: f64, viewport: Size) -> f64 {
        width.clamp(self.min.width, self.max_width_in(viewport))
    }

    pub fn clamp_height(&self, height: f64, viewport: Size) -> f64 {
        height.clamp(self.min.height, self.max_height_in(viewport))
    }
}

/// Shift a rect so it lies fully inside the viewport
///
/// A rect larger than the viewport is pinned to the top-left corner.
pub fn clamp_position(rect: Rect, viewport: Size) -> Rect {
    let max_left = (viewport.width - rect.width).max(0.0);
    let max_top = (viewport.height - rect.height).max(0.0);
    Rect {
        left: rect.left.clamp(0.0, max_left),
        top: rect.top.clamp(0.0, max_top),
        ..rect
    }
}

/// Clamp size to bounds, then position to the viewport
pub fn fit(rect: Rect, bounds: &SizeBounds, viewport: Size) -> Rect {
    let sized = Rect {
        width: bounds.clamp_width(rect.width, viewport),
        height: bounds.clamp_height(rect.height, viewport),
        ..rect
    };
    clamp_position(sized, viewport)
}

/// Move the whole panel by a pointer delta
pub fn dragged(origin: Rect, dx: f64, dy: f64, viewport: Size) -> Rect {
    clamp_position(
        Rect {
            left: origin.left + dx,
            top: origin.top + dy,
            ..origin
        },
        viewport,
    )
}

/// Resize from one edge by a pointer delta, keeping the opposite edge fixed
pub fn resized(
    origin: Rect,
    edge: Edge,
    dx: f64,
    dy: f64,
    bounds: &SizeBounds,
    viewport: Size,
) -> Rect {
    let rect = match edge {
        Edge::Bottom => {
            let room = (viewport.height - origin.top).max(bounds.min.height);
            let height = bounds.clamp_height(origin.height + dy, viewport).min(room);
            Rect { height, ..origin }
        }
        Edge::Right => {
            let room = (viewport.width - origin.left).max(bounds.min.width);
            let width = bounds.clamp_width(origin.width + dx, viewport).min(room);
            Rect { width, ..origin }
        }
        Edge::Left => {
            let right = origin.right();
            let room = right.max(bounds.min.width);
            let width = bounds.clamp_width(origin.width - dx, viewport).min(room);
            Rect {
                left: right - width,
                width,
                ..origin
            }
        }
    };
    clamp_position(rect, viewport)
}

/// Scale both dimensions by a pinch ratio, each clamped independently
pub fn pinched(origin: Rect, ratio: f64, bounds: &SizeBounds, viewport: Size) -> Rect {
    let ratio = if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    };
    fit(
        Rect {
            width: origin.width * ratio,
            height: origin.height * ratio,
            ..origin
        },
        bounds,
        viewport,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> SizeBounds {
        SizeBounds {
            min: Size::new(200.0, 100.0),
            max: Size::new(800.0, 600.0),
        }
    }

    const VIEWPORT: Size = Size {
        width: 1280.0,
        height: 720.0,
    };

    fn within_bounds(r: &Rect) -> bool {
        let b = bounds();
        r.width >= b.min.width
            && r.width <= b.max.width
            && r.height >= b.min.height
            && r.height <= b.max.height
    }

    #[test]
    fn test_drag_moves_by_delta() {
        let r = dragged(Rect::new(100.0, 100.0, 300.0, 200.0), 50.0, -20.0, VIEWPORT);
        assert_eq!(r, Rect::new(150.0, 80.0, 300.0, 200.0));
    }

    #[test]
    fn test_drag_clamps_to_viewport() {
        let origin = Rect::new(100.0, 100.0, 300.0, 200.0);
        assert_eq!(
            dragged(origin, -500.0, -500.0, VIEWPORT),
            Rect::new(0.0, 0.0, 300.0, 200.0)
        );
        assert_eq!(
            dragged(origin, 5000.0, 5000.0, VIEWPORT),
            Rect::new(980.0, 520.0, 300.0, 200.0)
        );
    }

    #[test]
    fn test_left_edge_keeps_right_edge_fixed() {
        let origin = Rect::new(400.0, 100.0, 300.0, 200.0);
        let r = resized(origin, Edge::Left, -100.0, 0.0, &bounds(), VIEWPORT);
        assert_eq!(r, Rect::new(300.0, 100.0, 400.0, 200.0));
        assert_eq!(r.right(), origin.right());
    }

    #[test]
    fn test_left_edge_cannot_cross_viewport() {
        let origin = Rect::new(50.0, 100.0, 300.0, 200.0);
        let r = resized(origin, Edge::Left, -400.0, 0.0, &bounds(), VIEWPORT);
        assert_eq!(r.left, 0.0);
        assert_eq!(r.width, 350.0);
    }

    #[test]
    fn test_right_and_bottom_edges() {
        let origin = Rect::new(100.0, 100.0, 300.0, 200.0);
        let r = resized(origin, Edge::Right, 40.0, 999.0, &bounds(), VIEWPORT);
        assert_eq!(r, Rect::new(100.0, 100.0, 340.0, 200.0));
        let r = resized(origin, Edge::Bottom, 999.0, 40.0, &bounds(), VIEWPORT);
        assert_eq!(r, Rect::new(100.0, 100.0, 300.0, 240.0));
    }

    #[test]
    fn test_resize_respects_min_and_max() {
        let origin = Rect::new(100.0, 100.0, 300.0, 200.0);
        let r = resized(origin, Edge::Right, -1000.0, 0.0, &bounds(), VIEWPORT);
        assert_eq!(r.width, 200.0);
        let r = resized(origin, Edge::Right, 1000.0, 0.0, &bounds(), VIEWPORT);
        assert_eq!(r.width, 800.0);
        let r = resized(origin, Edge::Bottom, 0.0, -1000.0, &bounds(), VIEWPORT);
        assert_eq!(r.height, 100.0);
    }

    #[test]
    fn test_pinch_scales_proportionally() {
        let origin = Rect::new(100.0, 100.0, 300.0, 200.0);
        let r = pinched(origin, 1.5, &bounds(), VIEWPORT);
        assert_eq!(r.width, 450.0);
        assert_eq!(r.height, 300.0);
    }

    #[test]
    fn test_pinch_clamps_each_dimension_independently() {
        let origin = Rect::new(0.0, 0.0, 300.0, 500.0);
        let r = pinched(origin, 2.0, &bounds(), VIEWPORT);
        assert_eq!(r.width, 600.0);
        assert_eq!(r.height, 600.0);
        let r = pinched(origin, 0.1, &bounds(), VIEWPORT);
        assert_eq!(r.width, 200.0);
        assert_eq!(r.height, 100.0);
    }

    #[test]
    fn test_pinch_ignores_degenerate_ratio() {
        let origin = Rect::new(0.0, 0.0, 300.0, 200.0);
        assert_eq!(pinched(origin, f64::NAN, &bounds(), VIEWPORT), origin);
        assert_eq!(pinched(origin, 0.0, &bounds(), VIEWPORT), origin);
    }

    #[test]
    fn test_any_delta_keeps_invariants() {
        let origins = [
            Rect::new(0.0, 0.0, 200.0, 100.0),
            Rect::new(500.0, 300.0, 400.0, 300.0),
            Rect::new(1080.0, 620.0, 200.0, 100.0),
        ];
        let deltas = [-2000.0, -333.3, -1.0, 0.0, 0.5, 77.0, 640.0, 2000.0];
        for origin in origins {
            for &dx in &deltas {
                for &dy in &deltas {
                    let moved = dragged(origin, dx, dy, VIEWPORT);
                    assert!(moved.is_inside(VIEWPORT), "drag {:?}", moved);
                    for edge in [Edge::Bottom, Edge::Left, Edge::Right] {
                        let r = resized(origin, edge, dx, dy, &bounds(), VIEWPORT);
                        assert!(within_bounds(&r), "{:?} {:?}", edge, r);
                        assert!(r.is_inside(VIEWPORT), "{:?} {:?}", edge, r);
                    }
                }
                let r = pinched(origin, (dx.abs() + 1.0) / 100.0, &bounds(), VIEWPORT);
                assert!(within_bounds(&r), "pinch {:?}", r);
                assert!(r.is_inside(VIEWPORT), "pinch {:?}", r);
            }
        }
    }

    #[test]
    fn test_fit_pins_oversized_panel() {
        let small = Size::new(150.0, 80.0);
        let r = fit(Rect::new(40.0, 40.0, 300.0, 200.0), &bounds(), small);
        assert_eq!(r.left, 0.0);
        assert_eq!(r.top, 0.0);
        assert_eq!(r.width, 200.0);
    }
}
