//! Rasterizer: paint commands onto an RGBA buffer, then PNG.

use crate::capture::paint::PaintCommand;
use crate::capture::{CanvasSize, Point, Rgba};
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Prefix of every exported payload
pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Distance between stamped discs along a segment, in pixels
const STEP: f32 = 0.5;

// Outcodes for segment clipping
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const TOP: u8 = 4;
const BOTTOM: u8 = 8;

/// An encoded capture
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

impl CapturedImage {
    /// `data:image/png;base64,...`
    pub fn to_data_uri(&self) -> String {
        let mut uri = String::with_capacity(DATA_URI_PREFIX.len() + self.png_data.len() * 4 / 3 + 4);
        uri.push_str(DATA_URI_PREFIX);
        uri.push_str(&STANDARD.encode(&self.png_data));
        uri
    }
}

/// Recover PNG bytes from a payload produced by [`CapturedImage::to_data_uri`].
pub fn png_from_data_uri(uri: &str) -> Result<Vec<u8>> {
    let encoded = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| Error::RenderError("not a PNG data URI".into()))?;
    STANDARD
        .decode(encoded)
        .map_err(|e| Error::RenderError(format!("invalid base64 payload: {}", e)))
}

/// Straight-alpha RGBA8 pixel buffer, row-major.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    /// A fully transparent canvas
    pub fn new(size: CanvasSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            pixels: vec![0; size.width as usize * size.height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        let p = &self.pixels[i..i + 4];
        Some((p[0], p[1], p[2], p[3]))
    }

    /// Number of pixels with non-zero alpha
    pub fn painted_pixels(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|p| p[3] != 0).count()
    }

    pub fn apply(&mut self, command: &PaintCommand) {
        match command {
            PaintCommand::Fill { rgba } => {
                for px in self.pixels.chunks_exact_mut(4) {
                    px.copy_from_slice(&[rgba.0, rgba.1, rgba.2, rgba.3]);
                }
            }
            PaintCommand::Dot {
                center,
                radius,
                rgba,
            } => {
                if is_finite(*center) {
                    self.stamp_disc(*center, *radius, *rgba);
                }
            }
            PaintCommand::Segment {
                from,
                to,
                width,
                rgba,
            } => {
                if !is_finite(*from) || !is_finite(*to) || !width.is_finite() {
                    return;
                }
                let radius = width / 2.0;
                let Some(((x0, y0), (x1, y1))) = self.clip_segment(*from, *to, radius.max(0.5))
                else {
                    return;
                };

                let (dx, dy) = (x1 - x0, y1 - y0);
                let len = (dx * dx + dy * dy).sqrt();
                let steps = ((len / STEP as f64).ceil() as usize).max(1);
                for i in 0..=steps {
                    let t = i as f64 / steps as f64;
                    let at = Point {
                        x: (x0 + dx * t) as f32,
                        y: (y0 + dy * t) as f32,
                    };
                    self.stamp_disc(at, radius, *rgba);
                }
            }
        }
    }

    /// Clip `from -> to` to the surface grown by `margin` on every side
    /// (Cohen-Sutherland). Intersections are solved against the crossed
    /// edge directly so very long segments keep their on-surface part.
    /// `None` when the segment misses the surface.
    fn clip_segment(&self, from: Point, to: Point, margin: f32) -> Option<((f64, f64), (f64, f64))> {
        let margin = margin as f64;
        let (xmin, ymin) = (-margin, -margin);
        let xmax = self.width as f64 + margin;
        let ymax = self.height as f64 + margin;
        let outcode = |x: f64, y: f64| -> u8 {
            let mut code = 0;
            if x < xmin {
                code |= LEFT;
            } else if x > xmax {
                code |= RIGHT;
            }
            if y < ymin {
                code |= TOP;
            } else if y > ymax {
                code |= BOTTOM;
            }
            code
        };

        let (mut x0, mut y0) = (from.x as f64, from.y as f64);
        let (mut x1, mut y1) = (to.x as f64, to.y as f64);
        let mut code0 = outcode(x0, y0);
        let mut code1 = outcode(x1, y1);

        // Each pass moves one endpoint onto an edge; four per end suffice.
        for _ in 0..8 {
            if code0 | code1 == 0 {
                return Some(((x0, y0), (x1, y1)));
            }
            if code0 & code1 != 0 {
                return None;
            }
            let out = if code0 != 0 { code0 } else { code1 };
            let (x, y) = if out & TOP != 0 {
                (x0 + (x1 - x0) * (ymin - y0) / (y1 - y0), ymin)
            } else if out & BOTTOM != 0 {
                (x0 + (x1 - x0) * (ymax - y0) / (y1 - y0), ymax)
            } else if out & LEFT != 0 {
                (xmin, y0 + (y1 - y0) * (xmin - x0) / (x1 - x0))
            } else {
                (xmax, y0 + (y1 - y0) * (xmax - x0) / (x1 - x0))
            };
            if out == code0 {
                (x0, y0) = (x, y);
                code0 = outcode(x0, y0);
            } else {
                (x1, y1) = (x, y);
                code1 = outcode(x1, y1);
            }
        }
        None
    }

    fn stamp_disc(&mut self, center: Point, radius: f32, rgba: Rgba) {
        // Never thinner than one pixel, so hairline pens stay visible.
        let r = radius.max(0.5);
        let x0 = (center.x - r).floor().max(0.0) as u32;
        let y0 = (center.y - r).floor().max(0.0) as u32;
        let x1 = ((center.x + r).ceil().max(0.0) as u32).min(self.width);
        let y1 = ((center.y + r).ceil().max(0.0) as u32).min(self.height);

        for y in y0..y1 {
            for x in x0..x1 {
                let (px, py) = (x as f32 + 0.5 - center.x, y as f32 + 0.5 - center.y);
                if px * px + py * py <= r * r {
                    self.blend(x, y, rgba);
                }
            }
        }
    }

    /// Source-over compositing in straight alpha.
    fn blend(&mut self, x: u32, y: u32, src: Rgba) {
        let i = self.offset(x, y);
        let dst = &mut self.pixels[i..i + 4];
        let sa = src.3 as f32 / 255.0;
        if sa >= 1.0 {
            dst.copy_from_slice(&[src.0, src.1, src.2, src.3]);
            return;
        }
        let da = dst[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return;
        }
        let channel = |s: u8, d: u8| {
            ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a).round() as u8
        };
        let rgb = [
            channel(src.0, dst[0]),
            channel(src.1, dst[1]),
            channel(src.2, dst[2]),
        ];
        dst[..3].copy_from_slice(&rgb);
        dst[3] = (out_a * 255.0).round() as u8;
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn encode_png(&self) -> Result<CapturedImage> {
        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| Error::RenderError(e.to_string()))?;
            writer
                .write_image_data(&self.pixels)
                .map_err(|e| Error::RenderError(e.to_string()))?;
            writer
                .finish()
                .map_err(|e| Error::RenderError(e.to_string()))?;
        }
        Ok(CapturedImage {
            width: self.width,
            height: self.height,
            png_data,
        })
    }
}

fn is_finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Run `commands` against a fresh canvas of `size`.
pub fn rasterize(size: CanvasSize, commands: &[PaintCommand]) -> Canvas {
    let mut canvas = Canvas::new(size);
    for command in commands {
        canvas.apply(command);
    }
    canvas
}
