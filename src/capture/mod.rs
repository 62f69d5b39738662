//! Freehand signature capture.
//!
//! A [`SignaturePad`] records pointer strokes on a bounded surface and, on
//! demand, encodes them as a PNG data URI. The pad is either blank or has
//! content:
//!
//! ```text
//! Blank --(stroke)--> HasContent --(clear)--> Blank
//!                     HasContent --(export)--> HasContent
//! ```
//!
//! # Example
//!
//! ```
//! use signbook::capture::{Point, SignaturePad};
//!
//! let mut pad = SignaturePad::new();
//! assert!(pad.is_empty());
//! pad.draw_stroke([Point::new(10.0, 60.0), Point::new(120.0, 40.0)]);
//! let uri = pad.export()?;
//! assert!(uri.starts_with("data:image/png;base64,"));
//! # Ok::<(), signbook::Error>(())
//! ```

pub mod paint;
pub mod raster;

pub use raster::{CapturedImage, DATA_URI_PREFIX};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Straight-alpha color
pub type Rgba = (u8, u8, u8, u8);

/// Drawing surface dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 800,
            height: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Pen used for new strokes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenStyle {
    pub color: Rgba,
    pub width: f32,
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            color: (255, 255, 255, 255),
            width: 2.5,
        }
    }
}

/// One continuous pointer-down .. pointer-up gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f32,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadState {
    Blank,
    HasContent,
}

/// Capture surface for a hand-drawn signature.
#[derive(Debug, Clone)]
pub struct SignaturePad {
    size: CanvasSize,
    pen: PenStyle,
    background: Rgba,
    strokes: Vec<Stroke>,
    drawing: bool,
}

impl SignaturePad {
    /// An 800x120 pad with a white pen on a transparent background.
    pub fn new() -> Self {
        Self::with_size(CanvasSize::default())
    }

    pub fn with_size(size: CanvasSize) -> Self {
        Self {
            size,
            pen: PenStyle::default(),
            background: (0, 0, 0, 0),
            strokes: Vec::new(),
            drawing: false,
        }
    }

    pub fn with_pen(mut self, pen: PenStyle) -> Self {
        self.pen = pen;
        self
    }

    pub fn with_background(mut self, background: Rgba) -> Self {
        self.background = background;
        self
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    pub fn set_pen(&mut self, pen: PenStyle) {
        self.pen = pen;
    }

    /// Pointer down: starts a new stroke with the current pen.
    pub fn begin_stroke(&mut self, at: Point) {
        self.strokes.push(Stroke {
            color: self.pen.color,
            width: self.pen.width,
            points: vec![at],
        });
        self.drawing = true;
    }

    /// Pointer move. Ignored unless a stroke is in progress.
    pub fn extend_stroke(&mut self, to: Point) {
        if !self.drawing {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.points.push(to);
        }
    }

    /// Pointer up.
    pub fn end_stroke(&mut self) {
        self.drawing = false;
    }

    /// Record a whole stroke at once.
    pub fn draw_stroke<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = Point>,
    {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return;
        };
        self.begin_stroke(first);
        for p in points {
            self.extend_stroke(p);
        }
        self.end_stroke();
    }

    /// Reset to blank. Idempotent.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.drawing = false;
    }

    /// True iff nothing has been drawn since the last clear.
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn state(&self) -> PadState {
        if self.is_empty() {
            PadState::Blank
        } else {
            PadState::HasContent
        }
    }

    /// The recorded strokes, oldest first.
    pub fn to_data(&self) -> Vec<Stroke> {
        self.strokes.clone()
    }

    /// Replace the pad content with previously recorded strokes.
    pub fn from_data(&mut self, strokes: Vec<Stroke>) {
        self.clear();
        self.strokes = strokes.into_iter().filter(|s| !s.points.is_empty()).collect();
    }

    /// Rasterize the current strokes. Does not modify the pad.
    pub fn render(&self) -> raster::Canvas {
        let commands = paint::paint_strokes(self.background, &self.strokes);
        raster::rasterize(self.size, &commands)
    }

    /// Encode the current content as PNG.
    pub fn export_png(&self) -> Result<CapturedImage> {
        if self.is_empty() {
            return Err(Error::EmptySignature);
        }
        self.render().encode_png()
    }

    /// Encode the current content as a `data:image/png;base64,...` payload.
    ///
    /// Callers are expected to check [`SignaturePad::is_empty`] first; a
    /// blank pad yields [`Error::EmptySignature`].
    pub fn export(&self) -> Result<String> {
        Ok(self.export_png()?.to_data_uri())
    }
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new()
    }
}
