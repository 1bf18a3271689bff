//! Injection point record.

use super::{
    Dose, InjectionDepth, InjectionTechnique, ModelError, NeedleGauge, ProductCategory,
};
use crate::zones::{self, FREE_PLACEMENT_ZONE_ID};
use chrono::{DateTime, Utc};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an injection point.
pub type PointId = Uuid;

/// Reference into the zone catalog, or the free placement sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ZoneRef {
    Zone(String),
    Free,
}

impl ZoneRef {
    /// Wire id of this reference.
    pub fn as_str(&self) -> &str {
        match self {
            ZoneRef::Zone(id) => id,
            ZoneRef::Free => FREE_PLACEMENT_ZONE_ID,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, ZoneRef::Free)
    }
}

impl From<String> for ZoneRef {
    fn from(id: String) -> Self {
        if id == FREE_PLACEMENT_ZONE_ID {
            ZoneRef::Free
        } else {
            ZoneRef::Zone(id)
        }
    }
}

impl From<ZoneRef> for String {
    fn from(zone: ZoneRef) -> Self {
        match zone {
            ZoneRef::Zone(id) => id,
            ZoneRef::Free => FREE_PLACEMENT_ZONE_ID.to_string(),
        }
    }
}

/// Where a point was placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Percentages (0-100) of chart width and height.
    Chart { x: f64, y: f64 },
    /// Coordinates on the 3-D face model.
    Spatial { x: f64, y: f64, z: f64 },
}

impl Placement {
    pub fn chart(point: Point) -> Self {
        Placement::Chart {
            x: point.x,
            y: point.y,
        }
    }

    pub fn spatial([x, y, z]: [f64; 3]) -> Self {
        Placement::Spatial { x, y, z }
    }

    /// Chart coordinates, if this is a 2-D placement.
    pub fn chart_point(&self) -> Option<Point> {
        match self {
            Placement::Chart { x, y } => Some(Point::new(*x, *y)),
            Placement::Spatial { .. } => None,
        }
    }

    pub fn is_spatial(&self) -> bool {
        matches!(self, Placement::Spatial { .. })
    }
}

/// Input to point creation. Unset fields are filled from the zone catalog
/// or from the category fallbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct PointDraft {
    pub zone: ZoneRef,
    pub placement: Placement,
    pub product: ProductCategory,
    pub dose: Option<Dose>,
    pub depth: Option<InjectionDepth>,
    pub technique: Option<InjectionTechnique>,
    pub needle: Option<NeedleGauge>,
    pub notes: Option<String>,
}

impl PointDraft {
    /// A draft at `placement` with everything else defaulted.
    pub fn new(zone: ZoneRef, placement: Placement, product: ProductCategory) -> Self {
        Self {
            zone,
            placement,
            product,
            dose: None,
            depth: None,
            technique: None,
            needle: None,
            notes: None,
        }
    }

    pub fn with_dose(mut self, dose: Dose) -> Self {
        self.dose = Some(dose);
        self
    }

    pub fn with_needle(mut self, needle: NeedleGauge) -> Self {
        self.needle = Some(needle);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial update merged into an existing point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointUpdate {
    pub product: Option<ProductCategory>,
    pub dose: Option<Dose>,
    pub depth: Option<InjectionDepth>,
    pub technique: Option<InjectionTechnique>,
    pub needle: Option<NeedleGauge>,
    /// `Some("")` clears the note.
    pub notes: Option<String>,
}

/// One administered dose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionPoint {
    pub(crate) id: PointId,
    pub zone: ZoneRef,
    pub placement: Placement,
    product: ProductCategory,
    dose: Dose,
    pub depth: InjectionDepth,
    pub technique: InjectionTechnique,
    pub needle: NeedleGauge,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl InjectionPoint {
    /// Build a point from a draft, copying catalog defaults into it.
    ///
    /// A catalog zone's defaults are copied at creation time and never
    /// referenced afterwards.
    pub fn from_draft(draft: PointDraft) -> Result<Self, ModelError> {
        let zone = match &draft.zone {
            ZoneRef::Zone(id) => zones::find(id),
            ZoneRef::Free => None,
        };

        let dose = draft.dose.unwrap_or_else(|| match zone {
            Some(z) => z.default_dose(draft.product),
            None => Dose::fallback(draft.product),
        });
        dose.validate(draft.product)?;

        let depth = draft
            .depth
            .or(zone.map(|z| z.recommended_depth))
            .unwrap_or_default();
        let technique = draft
            .technique
            .or(zone.map(|z| z.recommended_technique))
            .unwrap_or_default();
        let needle = draft.needle.unwrap_or_else(|| {
            if zone.is_some() {
                draft.product.zone_needle()
            } else {
                draft.product.free_needle()
            }
        });

        Ok(Self {
            id: Uuid::new_v4(),
            zone: draft.zone,
            placement: draft.placement,
            product: draft.product,
            dose,
            depth,
            technique,
            needle,
            created_at: Utc::now(),
            notes: draft.notes.filter(|n| !n.is_empty()),
        })
    }

    pub fn id(&self) -> PointId {
        self.id
    }

    pub fn product(&self) -> ProductCategory {
        self.product
    }

    pub fn dose(&self) -> Dose {
        self.dose
    }

    /// Units administered, zero for filler points.
    pub fn units(&self) -> u32 {
        self.dose.units().unwrap_or(0)
    }

    /// Volume administered in mL, zero for neurotoxin points.
    pub fn volume(&self) -> f64 {
        self.dose.volume().unwrap_or(0.0)
    }

    /// Merge an update into this point.
    ///
    /// Changing the product without supplying a dose resets the dose to the
    /// fallback for the new category. Nothing is modified if the resulting
    /// dose would not match the resulting category.
    pub fn apply(&mut self, update: PointUpdate) -> Result<(), ModelError> {
        let product = update.product.unwrap_or(self.product);
        let dose = match update.dose {
            Some(dose) => dose,
            None if product != self.product => Dose::fallback(product),
            None => self.dose,
        };
        dose.validate(product)?;

        self.product = product;
        self.dose = dose;
        if let Some(depth) = update.depth {
            self.depth = depth;
        }
        if let Some(technique) = update.technique {
            self.technique = technique;
        }
        if let Some(needle) = update.needle {
            self.needle = needle;
        }
        if let Some(notes) = update.notes {
            self.notes = if notes.is_empty() { None } else { Some(notes) };
        }
        Ok(())
    }

    /// Step the dose (see [`Dose::stepped`]).
    pub fn step_dose(&mut self, steps: i32) {
        self.dose = self.dose.stepped(steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(x: f64, y: f64) -> Placement {
        Placement::Chart { x, y }
    }

    #[test]
    fn test_free_point_uses_fallbacks() {
        let draft = PointDraft::new(ZoneRef::Free, chart(40.0, 60.0), ProductCategory::Filler);
        let point = InjectionPoint::from_draft(draft).unwrap();

        assert_eq!(point.dose(), Dose::Volume(0.5));
        assert_eq!(point.depth, InjectionDepth::MidDermis);
        assert_eq!(point.technique, InjectionTechnique::SerialPuncture);
        assert_eq!(point.needle, NeedleGauge::G27Cannula);
    }

    #[test]
    fn test_zone_point_copies_catalog_defaults() {
        let zone = zones::find("glabella").unwrap();
        let draft = PointDraft::new(
            ZoneRef::Zone("glabella".to_string()),
            chart(zone.x, zone.y),
            ProductCategory::Neurotoxin,
        );
        let point = InjectionPoint::from_draft(draft).unwrap();

        assert_eq!(point.dose(), zone.default_dose(ProductCategory::Neurotoxin));
        assert_eq!(point.depth, zone.recommended_depth);
        assert_eq!(point.needle, NeedleGauge::G30);
    }

    #[test]
    fn test_explicit_dose_overrides_default() {
        let draft = PointDraft::new(ZoneRef::Free, chart(0.0, 0.0), ProductCategory::Neurotoxin)
            .with_dose(Dose::Units(12));
        let point = InjectionPoint::from_draft(draft).unwrap();
        assert_eq!(point.units(), 12);
        assert_eq!(point.volume(), 0.0);
    }

    #[test]
    fn test_mismatched_dose_rejected_at_construction() {
        let draft = PointDraft::new(ZoneRef::Free, chart(0.0, 0.0), ProductCategory::Neurotoxin)
            .with_dose(Dose::Volume(1.0));
        assert!(InjectionPoint::from_draft(draft).is_err());
    }

    #[test]
    fn test_reclassify_resets_dose() {
        let draft = PointDraft::new(ZoneRef::Free, chart(0.0, 0.0), ProductCategory::Neurotoxin);
        let mut point = InjectionPoint::from_draft(draft).unwrap();

        point
            .apply(PointUpdate {
                product: Some(ProductCategory::Filler),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(point.product(), ProductCategory::Filler);
        assert_eq!(point.dose(), Dose::Volume(0.5));
    }

    #[test]
    fn test_rejected_update_leaves_point_untouched() {
        let draft = PointDraft::new(ZoneRef::Free, chart(0.0, 0.0), ProductCategory::Neurotoxin)
            .with_dose(Dose::Units(8));
        let mut point = InjectionPoint::from_draft(draft).unwrap();
        let before = point.clone();

        let result = point.apply(PointUpdate {
            dose: Some(Dose::Volume(0.2)),
            depth: Some(InjectionDepth::Intramuscular),
            ..Default::default()
        });

        assert!(result.is_err());
        assert_eq!(point, before);
    }

    #[test]
    fn test_zone_ref_wire_format() {
        let json = serde_json::to_string(&ZoneRef::Free).unwrap();
        assert_eq!(json, "\"freehand\"");
        let zone: ZoneRef = serde_json::from_str("\"forehead\"").unwrap();
        assert_eq!(zone, ZoneRef::Zone("forehead".to_string()));
    }
}
