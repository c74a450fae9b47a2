//! Script panel geometry controller
//!
//! Turns pointer and touch gestures into panel moves and resizes:
//! - single-pointer drag on the grip moves the whole panel
//! - drag on a bottom/left/right handle resizes from that edge
//! - two-finger pinch scales width and height proportionally
//!
//! Every update is clamped to the configured size bounds and keeps the panel
//! fully inside the viewport. Only one gesture runs at a time.

mod state;

pub use state::{clamp_position, dragged, fit, pinched, resized, Edge, Point, Rect, Size, SizeBounds};

use tracing::debug;

/// Rendering surface of the floating panel
pub trait Panel {
    fn geometry(&self) -> Rect;
    fn set_geometry(&self, rect: Rect);
    fn viewport(&self) -> Size;
}

/// Where a pointer gesture started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grip {
    /// The move handle
    Move,
    /// One of the edge resize handles
    Resize(Edge),
}

impl Grip {
    /// Grip named by a `data-grip` attribute value
    pub fn from_attr(value: &str) -> Option<Grip> {
        match value.trim() {
            "move" => Some(Grip::Move),
            "bottom" => Some(Grip::Resize(Edge::Bottom)),
            "left" => Some(Grip::Resize(Edge::Left)),
            "right" => Some(Grip::Resize(Edge::Right)),
            _ => None,
        }
    }

    /// Pick the grip that owns an event hitting several nested targets
    ///
    /// Resize handles sit inside the move grip and win over it.
    pub fn resolve(hits: &[Grip]) -> Option<Grip> {
        hits.iter()
            .copied()
            .find(|g| matches!(g, Grip::Resize(_)))
            .or_else(|| hits.first().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Drag { start: Point, origin: Rect },
    Resize { edge: Edge, start: Point, origin: Rect },
    Pinch { last_distance: f64 },
}

/// Tracks the active gesture and applies it to a [`Panel`]
pub struct BoxGeometryController {
    panel: Box<dyn Panel>,
    bounds: SizeBounds,
    gesture: Option<Gesture>,
}

impl BoxGeometryController {
    pub fn new(panel: Box<dyn Panel>, bounds: SizeBounds) -> Self {
        Self {
            panel,
            bounds,
            gesture: None,
        }
    }

    pub fn geometry(&self) -> Rect {
        self.panel.geometry()
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Apply a geometry (e.g. restored from preferences), clamped to the viewport
    pub fn apply(&self, rect: Rect) -> Rect {
        let fitted = fit(rect, &self.bounds, self.panel.viewport());
        self.panel.set_geometry(fitted);
        fitted
    }

    /// Re-clamp after the viewport changed size
    pub fn refit(&self) -> Rect {
        self.apply(self.panel.geometry())
    }

    /// Begin a pointer gesture; ignored while another gesture runs
    pub fn pointer_down(&mut self, grip: Grip, at: Point) -> bool {
        if self.gesture.is_some() {
            debug!("Gesture already active, ignoring pointer down on {:?}", grip);
            return false;
        }
        let origin = self.panel.geometry();
        self.gesture = Some(match grip {
            Grip::Move => Gesture::Drag { start: at, origin },
            Grip::Resize(edge) => Gesture::Resize {
                edge,
                start: at,
                origin,
            },
        });
        debug!("Gesture started: {:?}", grip);
        true
    }

    /// Update the active drag/resize gesture
    pub fn pointer_move(&mut self, at: Point) -> Option<Rect> {
        let viewport = self.panel.viewport();
        let rect = match self.gesture? {
            Gesture::Drag { start, origin } => dragged(origin, at.x - start.x, at.y - start.y, viewport),
            Gesture::Resize {
                edge,
                start,
                origin,
            } => resized(
                origin,
                edge,
                at.x - start.x,
                at.y - start.y,
                &self.bounds,
                viewport,
            ),
            Gesture::Pinch { .. } => return None,
        };
        self.panel.set_geometry(rect);
        Some(rect)
    }

    /// Finish the active gesture, returning the geometry to persist
    pub fn pointer_up(&mut self) -> Option<Rect> {
        self.gesture.take().map(|_| self.panel.geometry())
    }

    /// Touch start: one finger on the grip drags, two fingers pinch
    pub fn touch_start(&mut self, grip: Option<Grip>, touches: &[Point]) -> bool {
        match touches {
            [a, b, ..] => {
                // A second finger turns a move into a pinch; resizes keep running.
                if matches!(self.gesture, Some(Gesture::Resize { .. })) {
                    return false;
                }
                self.gesture = Some(Gesture::Pinch {
                    last_distance: a.distance(*b),
                });
                debug!("Pinch started");
                true
            }
            [single] => match grip {
                Some(grip) => self.pointer_down(grip, *single),
                None => false,
            },
            [] => false,
        }
    }

    pub fn touch_move(&mut self, touches: &[Point]) -> Option<Rect> {
        match (self.gesture?, touches) {
            (Gesture::Pinch { last_distance }, [a, b, ..]) => {
                let distance = a.distance(*b);
                if last_distance <= 0.0 || distance <= 0.0 {
                    self.gesture = Some(Gesture::Pinch {
                        last_distance: distance,
                    });
                    return None;
                }
                let rect = pinched(
                    self.panel.geometry(),
                    distance / last_distance,
                    &self.bounds,
                    self.panel.viewport(),
                );
                self.panel.set_geometry(rect);
                self.gesture = Some(Gesture::Pinch {
                    last_distance: distance,
                });
                Some(rect)
            }
            (Gesture::Pinch { .. }, _) => None,
            (_, [single, ..]) => self.pointer_move(*single),
            (_, []) => None,
        }
    }

    /// Touch end; the gesture finishes once fewer fingers remain than it needs
    pub fn touch_end(&mut self, remaining: &[Point]) -> Option<Rect> {
        let finished = match self.gesture {
            Some(Gesture::Pinch { .. }) => remaining.len() < 2,
            Some(_) => remaining.is_empty(),
            None => false,
        };
        if finished {
            self.pointer_up()
        } else {
            None
        }
    }
}
