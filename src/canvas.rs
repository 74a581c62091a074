use kurbo::{Point, Rect};

use crate::{
    blend::{over, over_in_place},
    blur::blur_rgba8,
    color::{GradientSpec, Rgba},
    error::{LimnerError, LimnerResult},
    shape::Shape,
};

/// Owned width×height buffer of straight-alpha RGBA8 pixels; the unit of
/// composition.
///
/// Drawing never raw-overwrites: every shape is rasterized into a coverage
/// mask first and each covered pixel is then blended exactly once with the
/// straight-alpha rule, so stacking translucent shapes accumulates visually
/// without double-blending where a stroke overlaps itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Flattened opaque RGB8 output, ready for an external encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgb {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgb {
    pub fn into_rgb_image(self) -> LimnerResult<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data)
            .ok_or_else(|| LimnerError::dimension("frame buffer does not match its dimensions"))
    }
}

impl Canvas {
    pub fn new(width: u32, height: u32, fill: Rgba) -> LimnerResult<Self> {
        let pixels = (width as usize)
            .checked_mul(height as usize)
            .filter(|v| v.checked_mul(4).is_some())
            .ok_or_else(|| LimnerError::dimension("canvas buffer size overflow"))?;
        let px = [fill.r, fill.g, fill.b, fill.a];
        Ok(Self {
            width,
            height,
            data: px.repeat(pixels),
        })
    }

    pub fn transparent(width: u32, height: u32) -> LimnerResult<Self> {
        Self::new(width, height, Rgba::TRANSPARENT)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some(Rgba::new(
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ))
    }

    /// Blend `color` over every pixel whose index is set in `mask`.
    fn blend_mask(&mut self, mask: &[bool], color: Rgba) {
        let src = [color.r, color.g, color.b, color.a];
        for (i, covered) in mask.iter().enumerate() {
            if *covered {
                let off = i * 4;
                let dst = [
                    self.data[off],
                    self.data[off + 1],
                    self.data[off + 2],
                    self.data[off + 3],
                ];
                self.data[off..off + 4].copy_from_slice(&over(dst, src, 1.0));
            }
        }
    }

    /// Rasterize and blend a shape. `stroke_width` switches ellipses and
    /// polygons from filled to outlined; lines and arcs carry their own
    /// width. Shapes outside the canvas are a no-op, never an error;
    /// zero-size shapes draw nothing.
    pub fn draw_shape(&mut self, shape: &Shape, color: Rgba, stroke_width: Option<f64>) {
        if self.width == 0 || self.height == 0 || color.a == 0 {
            return;
        }
        let mut mask = vec![false; (self.width as usize) * (self.height as usize)];
        let any = match (shape, stroke_width) {
            (
                Shape::Ellipse {
                    center,
                    radius_x,
                    radius_y,
                },
                None,
            ) => self.mask_ellipse_fill(&mut mask, *center, *radius_x, *radius_y),
            (
                Shape::Ellipse {
                    center,
                    radius_x,
                    radius_y,
                },
                Some(w),
            ) => self.mask_ellipse_stroke(&mut mask, *center, *radius_x, *radius_y, w),
            (Shape::Polygon { points }, None) => self.mask_polygon_fill(&mut mask, points),
            (Shape::Polygon { points }, Some(w)) => {
                let mut any = false;
                for i in 0..points.len() {
                    let a = points[i];
                    let b = points[(i + 1) % points.len()];
                    any |= self.mask_segment(&mut mask, a, b, w);
                }
                any
            }
            (Shape::Line { from, to, width }, _) => self.mask_segment(&mut mask, *from, *to, *width),
            (
                Shape::Arc {
                    bbox,
                    start_deg,
                    end_deg,
                    width,
                },
                _,
            ) => self.mask_arc(&mut mask, *bbox, *start_deg, *end_deg, *width),
        };
        if any {
            self.blend_mask(&mask, color);
        }
    }

    fn mark(&self, mask: &mut [bool], x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return false;
        }
        mask[(y as usize) * (self.width as usize) + (x as usize)] = true;
        true
    }

    fn mask_ellipse_fill(&self, mask: &mut [bool], c: Point, rx: f64, ry: f64) -> bool {
        if !(rx > 0.0) || !(ry > 0.0) {
            return false;
        }
        let y0 = (c.y - ry).floor().max(0.0) as i64;
        let y1 = ((c.y + ry).ceil() as i64).min(i64::from(self.height) - 1);
        let x0 = (c.x - rx).floor().max(0.0) as i64;
        let x1 = ((c.x + rx).ceil() as i64).min(i64::from(self.width) - 1);
        let mut any = false;
        for y in y0..=y1 {
            let ny = (y as f64 - c.y) / ry;
            for x in x0..=x1 {
                let nx = (x as f64 - c.x) / rx;
                if nx * nx + ny * ny <= 1.0 {
                    any |= self.mark(mask, x, y);
                }
            }
        }
        any
    }

    fn mask_ellipse_stroke(&self, mask: &mut [bool], c: Point, rx: f64, ry: f64, w: f64) -> bool {
        if !(rx > 0.0) || !(ry > 0.0) || !(w > 0.0) {
            return false;
        }
        let r_max = rx.max(ry);
        let steps = ((std::f64::consts::TAU * r_max).ceil() as usize * 2).max(8);
        let mut any = false;
        for i in 0..=steps {
            let theta = std::f64::consts::TAU * (i as f64) / (steps as f64);
            let p = Point::new(c.x + rx * theta.cos(), c.y + ry * theta.sin());
            any |= self.mask_stamp(mask, p, w / 2.0);
        }
        any
    }

    /// Even-odd scanline fill, sampling pixel centers.
    fn mask_polygon_fill(&self, mask: &mut [bool], points: &[Point]) -> bool {
        if points.len() < 3 {
            return false;
        }
        let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        let y0 = min_y.floor().max(0.0) as i64;
        let y1 = (max_y.ceil() as i64).min(i64::from(self.height) - 1);
        let mut any = false;
        let mut xs = Vec::<f64>::new();
        for y in y0..=y1 {
            let yc = y as f64 + 0.5;
            xs.clear();
            for i in 0..points.len() {
                let a = points[i];
                let b = points[(i + 1) % points.len()];
                if (a.y <= yc && b.y > yc) || (b.y <= yc && a.y > yc) {
                    let t = (yc - a.y) / (b.y - a.y);
                    xs.push(a.x + t * (b.x - a.x));
                }
            }
            xs.sort_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal));
            for pair in xs.chunks_exact(2) {
                let xa = (pair[0] - 0.5).ceil().max(0.0) as i64;
                let xb = ((pair[1] - 0.5).floor() as i64).min(i64::from(self.width) - 1);
                for x in xa..=xb {
                    any |= self.mark(mask, x, y);
                }
            }
        }
        any
    }

    fn mask_segment(&self, mask: &mut [bool], a: Point, b: Point, w: f64) -> bool {
        if !(w > 0.0) {
            return false;
        }
        let len = a.distance(b);
        let steps = ((len * 2.0).ceil() as usize).max(1);
        let r = w / 2.0;
        let mut any = false;
        for i in 0..=steps {
            let t = (i as f64) / (steps as f64);
            let p = Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
            any |= self.mask_stamp(mask, p, r);
        }
        any
    }

    fn mask_arc(&self, mask: &mut [bool], bbox: Rect, start_deg: f64, end_deg: f64, w: f64) -> bool {
        if !(w > 0.0) || bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return false;
        }
        let c = bbox.center();
        let rx = bbox.width() / 2.0;
        let ry = bbox.height() / 2.0;
        // Sweep clockwise from start to end, wrapping like PIL-style arcs.
        let mut end = end_deg;
        if end < start_deg {
            end += 360.0;
        }
        let sweep = (end - start_deg).to_radians();
        let steps = ((sweep * rx.max(ry)).abs().ceil() as usize * 2).max(4);
        let mut any = false;
        for i in 0..=steps {
            let theta = start_deg.to_radians() + sweep * (i as f64) / (steps as f64);
            let p = Point::new(c.x + rx * theta.cos(), c.y + ry * theta.sin());
            any |= self.mask_stamp(mask, p, w / 2.0);
        }
        any
    }

    /// Mark a disc of radius `r` around `p`; sub-pixel radii still mark the
    /// nearest pixel so 1px strokes stay connected.
    fn mask_stamp(&self, mask: &mut [bool], p: Point, r: f64) -> bool {
        let mut any = self.mark(mask, p.x.round() as i64, p.y.round() as i64);
        if r < 1.0 {
            return any;
        }
        let y0 = (p.y - r).floor() as i64;
        let y1 = (p.y + r).ceil() as i64;
        let x0 = (p.x - r).floor() as i64;
        let x1 = (p.x + r).ceil() as i64;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f64 - p.x;
                let dy = y as f64 - p.y;
                if dx * dx + dy * dy <= r * r {
                    any |= self.mark(mask, x, y);
                }
            }
        }
        any
    }

    /// Blend a single pixel; out-of-bounds coordinates are clipped silently.
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let dst = [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ];
        self.data[i..i + 4].copy_from_slice(&over(dst, [color.r, color.g, color.b, color.a], 1.0));
    }

    /// Colored silhouette of this canvas's alpha mask: every pixel takes
    /// `color`'s RGB and keeps its own alpha.
    pub fn tinted_mask(&self, color: Rgba) -> Canvas {
        let mut data = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            data.extend_from_slice(&[color.r, color.g, color.b, px[3]]);
        }
        Canvas {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Blend the gradient color over every pixel.
    pub fn fill_gradient(&mut self, spec: &GradientSpec) {
        for y in 0..self.height {
            for x in 0..self.width {
                let c = spec.eval(x, y, self.width, self.height);
                let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
                let dst = [
                    self.data[i],
                    self.data[i + 1],
                    self.data[i + 2],
                    self.data[i + 3],
                ];
                self.data[i..i + 4].copy_from_slice(&over(dst, [c.r, c.g, c.b, c.a], 1.0));
            }
        }
    }

    /// Blend `other` over `self`, consuming it as the top layer.
    pub fn composite_over(&mut self, other: Canvas) -> LimnerResult<()> {
        if other.width != self.width || other.height != self.height {
            return Err(LimnerError::dimension(format!(
                "cannot composite {}x{} over {}x{}",
                other.width, other.height, self.width, self.height
            )));
        }
        over_in_place(&mut self.data, &other.data, 1.0)
    }

    /// Separable Gaussian blur; pure, returns a new canvas. Sigma defaults
    /// to half the radius.
    pub fn gaussian_blur(&self, radius_px: u32) -> LimnerResult<Canvas> {
        let sigma = (radius_px as f32 / 2.0).max(0.5);
        let data = blur_rgba8(&self.data, self.width, self.height, radius_px, sigma)?;
        Ok(Canvas {
            width: self.width,
            height: self.height,
            data,
        })
    }

    /// Composite over a solid background and drop the alpha channel. The
    /// terminal operation before encoding.
    pub fn flatten_to_opaque(self, background: Rgba) -> FrameRgb {
        let bg = [background.r, background.g, background.b, 255];
        let mut out = Vec::with_capacity((self.width as usize) * (self.height as usize) * 3);
        for px in self.data.chunks_exact(4) {
            let flat = over(bg, [px[0], px[1], px[2], px[3]], 1.0);
            out.extend_from_slice(&flat[..3]);
        }
        FrameRgb {
            width: self.width,
            height: self.height,
            data: out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disc(cx: f64, cy: f64, r: f64) -> Shape {
        Shape::Ellipse {
            center: Point::new(cx, cy),
            radius_x: r,
            radius_y: r,
        }
    }

    #[test]
    fn new_fills_every_pixel() {
        let c = Canvas::new(3, 2, Rgba::new(9, 8, 7, 6)).unwrap();
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(c.pixel(x, y), Some(Rgba::new(9, 8, 7, 6)));
            }
        }
    }

    #[test]
    fn new_rejects_oversized_dimensions() {
        assert!(matches!(
            Canvas::new(u32::MAX, u32::MAX, Rgba::TRANSPARENT),
            Err(LimnerError::Dimension(_))
        ));
    }

    #[test]
    fn opaque_ellipse_covers_center() {
        let mut c = Canvas::transparent(64, 64).unwrap();
        c.draw_shape(&disc(32.0, 32.0, 20.0), Rgba::opaque(255, 200, 100), None);
        assert_eq!(c.pixel(32, 32), Some(Rgba::opaque(255, 200, 100)));
        // Well outside the disc stays untouched.
        assert_eq!(c.pixel(1, 1), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn shape_outside_canvas_is_a_noop() {
        let mut c = Canvas::new(8, 8, Rgba::opaque(1, 2, 3)).unwrap();
        let before = c.clone();
        c.draw_shape(&disc(1000.0, 1000.0, 5.0), Rgba::opaque(255, 0, 0), None);
        assert_eq!(c, before);
    }

    #[test]
    fn zero_radius_and_zero_width_draw_nothing() {
        let mut c = Canvas::transparent(8, 8).unwrap();
        let before = c.clone();
        c.draw_shape(&disc(4.0, 4.0, 0.0), Rgba::opaque(255, 0, 0), None);
        c.draw_shape(
            &Shape::Line {
                from: Point::new(0.0, 0.0),
                to: Point::new(7.0, 7.0),
                width: 0.0,
            },
            Rgba::opaque(255, 0, 0),
            None,
        );
        assert_eq!(c, before);
    }

    #[test]
    fn translucent_shapes_accumulate() {
        let mut c = Canvas::new(4, 4, Rgba::opaque(0, 0, 0)).unwrap();
        let half_white = Rgba::new(255, 255, 255, 128);
        c.draw_shape(&disc(2.0, 2.0, 10.0), half_white, None);
        let once = c.pixel(2, 2).unwrap().r;
        c.draw_shape(&disc(2.0, 2.0, 10.0), half_white, None);
        let twice = c.pixel(2, 2).unwrap().r;
        assert!(once > 100 && once < 156);
        assert!(twice > once);
    }

    #[test]
    fn stroke_overlap_blends_once_per_shape() {
        // A tight zig-zag polyline overlaps its own stamps heavily; with
        // mask-based drawing the translucent color must land exactly once.
        let mut c = Canvas::new(16, 16, Rgba::opaque(0, 0, 0)).unwrap();
        c.draw_shape(
            &Shape::Line {
                from: Point::new(2.0, 8.0),
                to: Point::new(13.0, 8.0),
                width: 6.0,
            },
            Rgba::new(255, 255, 255, 100),
            None,
        );
        let expected = over([0, 0, 0, 255], [255, 255, 255, 100], 1.0);
        let got = c.pixel(8, 8).unwrap();
        assert_eq!([got.r, got.g, got.b, got.a], expected);
    }

    #[test]
    fn polygon_fill_covers_interior_only() {
        let mut c = Canvas::transparent(16, 16).unwrap();
        c.draw_shape(
            &Shape::Polygon {
                points: vec![
                    Point::new(2.0, 2.0),
                    Point::new(13.0, 2.0),
                    Point::new(13.0, 13.0),
                    Point::new(2.0, 13.0),
                ],
            },
            Rgba::opaque(10, 20, 30),
            None,
        );
        assert_eq!(c.pixel(8, 8), Some(Rgba::opaque(10, 20, 30)));
        assert_eq!(c.pixel(0, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(c.pixel(15, 8), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn composite_over_requires_matching_dimensions() {
        let mut a = Canvas::transparent(8, 8).unwrap();
        let b = Canvas::transparent(8, 9).unwrap();
        assert!(matches!(
            a.composite_over(b),
            Err(LimnerError::Dimension(_))
        ));
    }

    #[test]
    fn composite_over_puts_other_on_top() {
        let mut base = Canvas::new(4, 4, Rgba::opaque(0, 0, 0)).unwrap();
        let top = Canvas::new(4, 4, Rgba::opaque(255, 0, 0)).unwrap();
        base.composite_over(top).unwrap();
        assert_eq!(base.pixel(1, 1), Some(Rgba::opaque(255, 0, 0)));
    }

    #[test]
    fn flatten_composites_over_background() {
        let c = Canvas::new(2, 1, Rgba::new(255, 255, 255, 128)).unwrap();
        let frame = c.flatten_to_opaque(Rgba::opaque(0, 0, 0));
        assert_eq!(frame.data.len(), 6);
        assert!(frame.data[0] > 100 && frame.data[0] < 156);
    }

    #[test]
    fn blur_is_pure_and_repeatable() {
        let mut c = Canvas::transparent(16, 16).unwrap();
        c.draw_shape(&disc(8.0, 8.0, 3.0), Rgba::opaque(255, 255, 255), None);
        let a = c.gaussian_blur(2).unwrap();
        let b = c.gaussian_blur(2).unwrap();
        assert_eq!(a, b);
        // Source untouched.
        assert_eq!(c.pixel(8, 8), Some(Rgba::opaque(255, 255, 255)));
    }

    #[test]
    fn gradient_fill_is_monotonic_down_the_canvas() {
        let mut c = Canvas::new(4, 16, Rgba::opaque(0, 0, 0)).unwrap();
        c.fill_gradient(&GradientSpec::Linear {
            from: Rgba::opaque(0, 0, 0),
            to: Rgba::opaque(200, 200, 200),
            axis: crate::color::Axis::Vertical,
        });
        let top = c.pixel(0, 0).unwrap().r;
        let mid = c.pixel(0, 8).unwrap().r;
        let bot = c.pixel(0, 15).unwrap().r;
        assert!(top < mid && mid < bot);
        assert_eq!(bot, 200);
    }
}
