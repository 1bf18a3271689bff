//! Free-draw capture.

use crate::config::ChartingSettings;
use crate::error::ChartResult;
use crate::model::{AnnotationId, AnnotationKind, FreehandAnnotation, ProductCategory, StrokeColor};
use crate::smoothing::{smooth_path, smooth_points};
use crate::store::ChartingStore;
use kurbo::{BezPath, Point};

/// Default stroke width for chart drawings.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// Accumulates pointer samples for one pen-down to pen-up gesture.
#[derive(Debug, Clone)]
pub struct DrawingCapture {
    /// Raw samples of the gesture in progress.
    samples: Vec<Point>,
    active: bool,
    /// Color applied to finished strokes.
    pub color: StrokeColor,
    /// Width applied to finished strokes.
    pub stroke_width: f64,
}

impl Default for DrawingCapture {
    fn default() -> Self {
        Self::for_product(ProductCategory::default())
    }
}

impl DrawingCapture {
    /// Capture with the stroke color used for `product`.
    pub fn for_product(product: ProductCategory) -> Self {
        let color = match product {
            ProductCategory::Neurotoxin => StrokeColor::neurotoxin(),
            ProductCategory::Filler => StrokeColor::filler(),
        };
        Self {
            samples: Vec::new(),
            active: false,
            color,
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }

    /// Capture for `product` with the configured stroke width.
    pub fn from_settings(settings: &ChartingSettings, product: ProductCategory) -> Self {
        Self {
            stroke_width: settings.stroke_width,
            ..Self::for_product(product)
        }
    }

    /// Start a gesture, discarding any unfinished one.
    pub fn begin(&mut self, point: Point) {
        self.samples.clear();
        self.samples.push(point);
        self.active = true;
    }

    /// Add a sample to the gesture in progress.
    pub fn extend(&mut self, point: Point) {
        if self.active {
            self.samples.push(point);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn samples(&self) -> &[Point] {
        &self.samples
    }

    /// Smoothed curve of the gesture so far, for live preview.
    pub fn preview(&self) -> BezPath {
        smooth_path(&self.samples)
    }

    /// Abandon the gesture. Nothing is recorded.
    pub fn cancel(&mut self) {
        self.samples.clear();
        self.active = false;
    }

    /// End the gesture and append the smoothed stroke to the session.
    ///
    /// Returns `Ok(None)` if no gesture was in progress. The capture is reset
    /// whether or not the store accepts the annotation.
    pub fn finish(&mut self, store: &mut ChartingStore) -> ChartResult<Option<AnnotationId>> {
        if !self.active {
            return Ok(None);
        }
        self.active = false;
        let samples = std::mem::take(&mut self.samples);

        let annotation = FreehandAnnotation::new(
            AnnotationKind::Line,
            smooth_points(&samples),
            self.color,
            self.stroke_width,
        );
        store.add_annotation(annotation).map(Some)
    }
}
