//! Free-hand annotations drawn over a chart or photo.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an annotation.
pub type AnnotationId = Uuid;

/// Serializable stroke color (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrokeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl StrokeColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    /// Stroke color used for neurotoxin charting (violet).
    pub const fn neurotoxin() -> Self {
        Self::new(0x8b, 0x5c, 0xf6, 255)
    }

    /// Stroke color used for filler charting (pink).
    pub const fn filler() -> Self {
        Self::new(0xec, 0x48, 0x99, 255)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let byte = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let r = byte(&hex[0..1])? * 17;
                let g = byte(&hex[1..2])? * 17;
                let b = byte(&hex[2..3])? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(
                byte(&hex[0..2])?,
                byte(&hex[2..4])?,
                byte(&hex[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                byte(&hex[0..2])?,
                byte(&hex[2..4])?,
                byte(&hex[4..6])?,
                byte(&hex[6..8])?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for StrokeColor {
    fn default() -> Self {
        Self::black()
    }
}

/// Kind of mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    #[default]
    Line,
    Circle,
    Arrow,
    Text,
}

/// A drawn mark that is not tied to a dose.
///
/// Points are kept in stroke order. Annotations are immutable once recorded;
/// callers replace them wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreehandAnnotation {
    pub(crate) id: AnnotationId,
    pub kind: AnnotationKind,
    pub points: Vec<Point>,
    pub color: StrokeColor,
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl FreehandAnnotation {
    /// Create an annotation from an ordered point sequence.
    pub fn new(
        kind: AnnotationKind,
        points: Vec<Point>,
        color: StrokeColor,
        stroke_width: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            points,
            color,
            stroke_width,
            text: None,
        }
    }

    /// Create a text label anchored at `position`.
    pub fn label(position: Point, text: impl Into<String>, color: StrokeColor) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: AnnotationKind::Text,
            points: vec![position],
            color,
            stroke_width: 1.0,
            text: Some(text.into()),
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounding box of the mark's points.
    pub fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };
        self.points
            .iter()
            .skip(1)
            .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
    }
}
