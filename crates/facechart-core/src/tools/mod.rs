//! Input modalities as discrete commands against the store.
//!
//! Zone-tap, free-tap and spatial placement are [`ChartCommand`] values run by
//! [`execute`]. Free-draw is a gesture that spans many pointer events, so it
//! lives in [`DrawingCapture`] instead.

mod drawing;

pub use drawing::{DEFAULT_STROKE_WIDTH, DrawingCapture};

use crate::error::{ChartError, ChartResult};
use crate::model::{Placement, PointDraft, PointId, ZoneRef};
use crate::store::ChartingStore;
use crate::zones;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Active input modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChartMode {
    /// Tap a catalog zone.
    #[default]
    Zones,
    /// Tap anywhere on the chart.
    Freehand,
    /// Draw annotations.
    Draw,
    /// Place points on the 3-D model.
    Spatial,
}

impl ChartMode {
    /// Whether taps in this mode create injection points.
    pub fn places_points(self) -> bool {
        !matches!(self, ChartMode::Draw)
    }
}

/// A point-placing gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartCommand {
    /// Tap on a catalog zone.
    ZoneTap { zone_id: String },
    /// Tap at `position` in pixels inside a chart of size `container`.
    FreeTap { position: Point, container: Size },
    /// Tap on the 3-D model at model coordinates.
    SpatialTap { position: [f64; 3] },
}

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Created(PointId),
    /// The zone already had a point; it was selected instead.
    Selected(PointId),
}

impl CommandOutcome {
    pub fn point_id(self) -> PointId {
        match self {
            CommandOutcome::Created(id) | CommandOutcome::Selected(id) => id,
        }
    }
}

/// Run a placement command against the store.
pub fn execute(store: &mut ChartingStore, command: ChartCommand) -> ChartResult<CommandOutcome> {
    match command {
        ChartCommand::ZoneTap { zone_id } => zone_tap(store, &zone_id),
        ChartCommand::FreeTap { position, container } => free_tap(store, position, container),
        ChartCommand::SpatialTap { position } => {
            let draft = PointDraft::new(
                ZoneRef::Free,
                Placement::spatial(position),
                store.product_type(),
            );
            store.add_spatial_point(draft).map(CommandOutcome::Created)
        }
    }
}

fn zone_tap(store: &mut ChartingStore, zone_id: &str) -> ChartResult<CommandOutcome> {
    let zone = zones::find(zone_id).ok_or_else(|| ChartError::UnknownZone(zone_id.to_string()))?;

    // At most one point per zone for this modality.
    if let Some(existing) = store.point_in_zone(zone.id).map(|p| p.id()) {
        store.select_point(existing);
        return Ok(CommandOutcome::Selected(existing));
    }

    let draft = PointDraft::new(
        ZoneRef::Zone(zone.id.to_string()),
        Placement::chart(Point::new(zone.x, zone.y)),
        store.product_type(),
    );
    store.add_injection_point(draft).map(CommandOutcome::Created)
}

fn free_tap(
    store: &mut ChartingStore,
    position: Point,
    container: Size,
) -> ChartResult<CommandOutcome> {
    if !(container.width > 0.0 && container.height > 0.0) {
        return Err(ChartError::EmptyContainer);
    }
    let x = position.x / container.width * 100.0;
    let y = position.y / container.height * 100.0;

    let draft = PointDraft::new(ZoneRef::Free, Placement::Chart { x, y }, store.product_type());
    store.add_injection_point(draft).map(CommandOutcome::Created)
}
