//! Anatomical zone catalog.
//!
//! Reference data only. Entries are append-only: a zone's defaults are copied
//! into each point at creation, so changing one would silently change what new
//! charts mean relative to old ones. Bump [`ZONE_CATALOG_VERSION`] when adding
//! zones.

use crate::model::{Dose, InjectionDepth, InjectionTechnique, ProductCategory};
use serde::Serialize;

/// Version of the catalog below. Recorded on every session.
pub const ZONE_CATALOG_VERSION: u32 = 1;

/// Zone id used for points placed off-catalog.
pub const FREE_PLACEMENT_ZONE_ID: &str = "freehand";

/// Face region a zone belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaceRegion {
    UpperFace,
    MidFace,
    LowerFace,
}

/// A named injection site with its defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceZone {
    pub id: &'static str,
    pub name: &'static str,
    pub region: FaceRegion,
    /// Horizontal position, percent of chart width.
    pub x: f64,
    /// Vertical position, percent of chart height.
    pub y: f64,
    pub default_units: Option<u32>,
    pub default_volume: Option<f64>,
    pub recommended_depth: InjectionDepth,
    pub recommended_technique: InjectionTechnique,
}

impl FaceZone {
    /// Default dose for `product` at this zone, falling back to the category
    /// default when the zone has none.
    pub fn default_dose(&self, product: ProductCategory) -> Dose {
        match product {
            ProductCategory::Neurotoxin => self
                .default_units
                .map(Dose::Units)
                .unwrap_or_else(|| Dose::fallback(product)),
            ProductCategory::Filler => self
                .default_volume
                .map(Dose::Volume)
                .unwrap_or_else(|| Dose::fallback(product)),
        }
    }
}

use self::FaceRegion::*;
use crate::model::InjectionDepth as D;
use crate::model::InjectionTechnique as T;

#[allow(clippy::too_many_arguments)]
const fn zone(
    id: &'static str,
    name: &'static str,
    region: FaceRegion,
    x: f64,
    y: f64,
    default_units: Option<u32>,
    default_volume: Option<f64>,
    recommended_depth: InjectionDepth,
    recommended_technique: InjectionTechnique,
) -> FaceZone {
    FaceZone {
        id,
        name,
        region,
        x,
        y,
        default_units,
        default_volume,
        recommended_depth,
        recommended_technique,
    }
}

#[rustfmt::skip]
static FACE_ZONES: &[FaceZone] = &[
    zone("forehead", "Forehead", UpperFace, 50.0, 18.0, Some(10), None, D::Intramuscular, T::SerialPuncture),
    zone("glabella", "Glabella", UpperFace, 50.0, 30.0, Some(20), None, D::Intramuscular, T::SerialPuncture),
    zone("temple-left", "Left Temple", UpperFace, 22.0, 28.0, None, Some(1.0), D::Supraperiosteal, T::Bolus),
    zone("temple-right", "Right Temple", UpperFace, 78.0, 28.0, None, Some(1.0), D::Supraperiosteal, T::Bolus),
    zone("crows-feet-left", "Left Crow's Feet", UpperFace, 24.0, 38.0, Some(12), None, D::Intramuscular, T::SerialPuncture),
    zone("crows-feet-right", "Right Crow's Feet", UpperFace, 76.0, 38.0, Some(12), None, D::Intramuscular, T::SerialPuncture),
    zone("tear-trough-left", "Left Tear Trough", MidFace, 38.0, 44.0, None, Some(0.5), D::Supraperiosteal, T::Microdroplet),
    zone("tear-trough-right", "Right Tear Trough", MidFace, 62.0, 44.0, None, Some(0.5), D::Supraperiosteal, T::Microdroplet),
    zone("bunny-lines", "Bunny Lines", MidFace, 50.0, 45.0, Some(4), None, D::Intramuscular, T::SerialPuncture),
    zone("cheek-left", "Left Cheek", MidFace, 30.0, 52.0, None, Some(1.0), D::Supraperiosteal, T::Bolus),
    zone("cheek-right", "Right Cheek", MidFace, 70.0, 52.0, None, Some(1.0), D::Supraperiosteal, T::Bolus),
    zone("nasolabial-left", "Left Nasolabial Fold", MidFace, 40.0, 60.0, None, Some(0.8), D::DeepDermis, T::LinearThreading),
    zone("nasolabial-right", "Right Nasolabial Fold", MidFace, 60.0, 60.0, None, Some(0.8), D::DeepDermis, T::LinearThreading),
    zone("lip-flip", "Lip Flip", LowerFace, 50.0, 64.0, Some(4), None, D::Intramuscular, T::SerialPuncture),
    zone("lips", "Lips", LowerFace, 50.0, 68.0, None, Some(1.0), D::Superficial, T::LinearThreading),
    zone("dao-left", "Left DAO", LowerFace, 38.0, 74.0, Some(4), None, D::Intramuscular, T::SerialPuncture),
    zone("dao-right", "Right DAO", LowerFace, 62.0, 74.0, Some(4), None, D::Intramuscular, T::SerialPuncture),
    zone("marionette-left", "Left Marionette Line", LowerFace, 40.0, 72.0, None, Some(0.6), D::Subcutaneous, T::Fanning),
    zone("marionette-right", "Right Marionette Line", LowerFace, 60.0, 72.0, None, Some(0.6), D::Subcutaneous, T::Fanning),
    zone("mentalis", "Mentalis", LowerFace, 50.0, 80.0, Some(6), None, D::Intramuscular, T::SerialPuncture),
    zone("chin", "Chin", LowerFace, 50.0, 84.0, None, Some(1.0), D::Supraperiosteal, T::Bolus),
    zone("masseter-left", "Left Masseter", LowerFace, 20.0, 70.0, Some(25), None, D::Intramuscular, T::SerialPuncture),
    zone("masseter-right", "Right Masseter", LowerFace, 80.0, 70.0, Some(25), None, D::Intramuscular, T::SerialPuncture),
    zone("jawline-left", "Left Jawline", LowerFace, 28.0, 78.0, None, Some(1.5), D::Subcutaneous, T::LinearThreading),
    zone("jawline-right", "Right Jawline", LowerFace, 72.0, 78.0, None, Some(1.5), D::Subcutaneous, T::LinearThreading),
];

/// All catalog zones in display order.
pub fn all() -> &'static [FaceZone] {
    FACE_ZONES
}

/// Look up a zone by id.
pub fn find(id: &str) -> Option<&'static FaceZone> {
    FACE_ZONES.iter().find(|z| z.id == id)
}

/// Zones in a region, in display order.
pub fn in_region(region: FaceRegion) -> impl Iterator<Item = &'static FaceZone> {
    FACE_ZONES.iter().filter(move |z| z.region == region)
}
