use kurbo::{Point, Rect};

use crate::error::{LimnerError, LimnerResult};

/// Immutable shape description. Shapes own no pixels; coordinates may lie
/// outside the canvas and are clipped at draw time, never rejected.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Shape {
    Ellipse {
        center: Point,
        radius_x: f64,
        radius_y: f64,
    },
    Polygon {
        points: Vec<Point>,
    },
    Line {
        from: Point,
        to: Point,
        width: f64,
    },
    /// Elliptical arc along the ellipse inscribed in `bbox`, swept from
    /// `start_deg` to `end_deg` (degrees, clockwise with y down).
    Arc {
        bbox: Rect,
        start_deg: f64,
        end_deg: f64,
        width: f64,
    },
}

impl Shape {
    pub fn validate(&self) -> LimnerResult<()> {
        match self {
            Shape::Ellipse {
                center,
                radius_x,
                radius_y,
            } => {
                if !center.x.is_finite() || !center.y.is_finite() {
                    return Err(LimnerError::validation("ellipse center must be finite"));
                }
                if !radius_x.is_finite() || !radius_y.is_finite() {
                    return Err(LimnerError::validation("ellipse radii must be finite"));
                }
            }
            Shape::Polygon { points } => {
                if points.len() < 3 {
                    return Err(LimnerError::validation("polygon needs at least 3 points"));
                }
                if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                    return Err(LimnerError::validation("polygon points must be finite"));
                }
            }
            Shape::Line { from, to, width } => {
                if [from.x, from.y, to.x, to.y, *width]
                    .iter()
                    .any(|v| !v.is_finite())
                {
                    return Err(LimnerError::validation("line endpoints must be finite"));
                }
            }
            Shape::Arc {
                bbox,
                start_deg,
                end_deg,
                width,
            } => {
                if [
                    bbox.x0, bbox.y0, bbox.x1, bbox.y1, *start_deg, *end_deg, *width,
                ]
                .iter()
                .any(|v| !v.is_finite())
                {
                    return Err(LimnerError::validation("arc parameters must be finite"));
                }
            }
        }
        Ok(())
    }
}
