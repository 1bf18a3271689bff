//! Charting records: injection points, annotations, photos, notes and sessions.

mod annotation;
mod notes;
mod patient;
mod photo;
mod point;
mod session;

pub use annotation::{AnnotationId, AnnotationKind, FreehandAnnotation, StrokeColor};
pub use notes::{SoapNotes, SoapNotesUpdate, SoapSection};
pub use patient::{Patient, PatientId};
pub use photo::{CameraAngle, PhotoCategory, PhotoId, PhotoUpdate, TreatmentPhoto};
pub use point::{InjectionPoint, Placement, PointDraft, PointId, PointUpdate, ZoneRef};
pub use session::{SessionId, SessionStatus, TreatmentSession};
pub(crate) use session::{total_units, total_volume};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing or mutating charting records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{dose} does not match product category {category}")]
    DoseMismatch { category: ProductCategory, dose: Dose },
    #[error("Dose must be finite and non-negative")]
    InvalidDose,
}

/// Product family administered at a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    /// Measured in discrete units.
    #[default]
    Neurotoxin,
    /// Measured in millilitres.
    Filler,
}

impl ProductCategory {
    /// Default needle for a point placed on a catalog zone.
    pub fn zone_needle(self) -> NeedleGauge {
        match self {
            ProductCategory::Neurotoxin => NeedleGauge::G30,
            ProductCategory::Filler => NeedleGauge::G25Cannula,
        }
    }

    /// Default needle for free and spatial placement.
    pub fn free_needle(self) -> NeedleGauge {
        match self {
            ProductCategory::Neurotoxin => NeedleGauge::G30,
            ProductCategory::Filler => NeedleGauge::G27Cannula,
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductCategory::Neurotoxin => write!(f, "neurotoxin"),
            ProductCategory::Filler => write!(f, "filler"),
        }
    }
}

/// Fallback neurotoxin dose when neither the gesture nor the zone supplies one.
pub const FALLBACK_UNITS: u32 = 5;
/// Fallback filler dose in mL.
pub const FALLBACK_VOLUME_ML: f64 = 0.5;
/// Filler volume moved by one step of the dose stepper.
pub const VOLUME_STEP_ML: f64 = 0.1;

/// Amount administered at a single point.
///
/// The variant is tied to the product category: neurotoxins are dosed in
/// units and fillers in millilitres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum Dose {
    Units(u32),
    Volume(f64),
}

impl Dose {
    /// The category this dose belongs to.
    pub fn category(&self) -> ProductCategory {
        match self {
            Dose::Units(_) => ProductCategory::Neurotoxin,
            Dose::Volume(_) => ProductCategory::Filler,
        }
    }

    /// Fallback dose for a category.
    pub fn fallback(category: ProductCategory) -> Self {
        match category {
            ProductCategory::Neurotoxin => Dose::Units(FALLBACK_UNITS),
            ProductCategory::Filler => Dose::Volume(FALLBACK_VOLUME_ML),
        }
    }

    /// Check that this dose may be recorded for `category`.
    pub fn validate(&self, category: ProductCategory) -> Result<(), ModelError> {
        if let Dose::Volume(ml) = self {
            if !ml.is_finite() || *ml < 0.0 {
                return Err(ModelError::InvalidDose);
            }
        }
        if self.category() != category {
            return Err(ModelError::DoseMismatch {
                category,
                dose: *self,
            });
        }
        Ok(())
    }

    /// Units, if this is a neurotoxin dose.
    pub fn units(&self) -> Option<u32> {
        match self {
            Dose::Units(u) => Some(*u),
            Dose::Volume(_) => None,
        }
    }

    /// Volume in mL, if this is a filler dose.
    pub fn volume(&self) -> Option<f64> {
        match self {
            Dose::Units(_) => None,
            Dose::Volume(v) => Some(*v),
        }
    }

    /// Move the dose by `steps` stepper increments, clamped at zero.
    ///
    /// Units move by one per step. Volume moves by [`VOLUME_STEP_ML`] per step
    /// and is rounded to one decimal place.
    pub fn stepped(self, steps: i32) -> Self {
        match self {
            Dose::Units(u) => {
                let next = (i64::from(u) + i64::from(steps)).max(0);
                Dose::Units(u32::try_from(next).unwrap_or(u32::MAX))
            }
            Dose::Volume(v) => {
                let next = (v + f64::from(steps) * VOLUME_STEP_ML).max(0.0);
                Dose::Volume((next * 10.0).round() / 10.0)
            }
        }
    }
}

impl std::fmt::Display for Dose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dose::Units(u) => write!(f, "{} units", u),
            Dose::Volume(v) => write!(f, "{:.1} mL", v),
        }
    }
}

/// Tissue plane targeted by an injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InjectionDepth {
    Superficial,
    #[default]
    MidDermis,
    DeepDermis,
    Subcutaneous,
    Supraperiosteal,
    Intramuscular,
}

/// Delivery technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InjectionTechnique {
    #[default]
    SerialPuncture,
    LinearThreading,
    Fanning,
    CrossHatching,
    Bolus,
    Microdroplet,
}

/// Needle or cannula used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeedleGauge {
    #[serde(rename = "30g")]
    G30,
    #[serde(rename = "32g")]
    G32,
    #[serde(rename = "27g")]
    G27,
    #[serde(rename = "25g-cannula")]
    G25Cannula,
    #[serde(rename = "27g-cannula")]
    G27Cannula,
    #[serde(rename = "22g-cannula")]
    G22Cannula,
}

impl NeedleGauge {
    /// Whether this is a blunt cannula rather than a sharp needle.
    pub fn is_cannula(self) -> bool {
        matches!(
            self,
            NeedleGauge::G25Cannula | NeedleGauge::G27Cannula | NeedleGauge::G22Cannula
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dose_matches_category() {
        assert!(Dose::Units(10).validate(ProductCategory::Neurotoxin).is_ok());
        assert!(Dose::Volume(0.5).validate(ProductCategory::Filler).is_ok());
    }

    #[test]
    fn test_dose_mismatch_rejected() {
        let err = Dose::Units(10).validate(ProductCategory::Filler).unwrap_err();
        assert!(matches!(err, ModelError::DoseMismatch { .. }));

        let err = Dose::Volume(1.0).validate(ProductCategory::Neurotoxin).unwrap_err();
        assert!(matches!(err, ModelError::DoseMismatch { .. }));
    }

    #[test]
    fn test_negative_volume_rejected() {
        assert_eq!(
            Dose::Volume(-0.1).validate(ProductCategory::Filler),
            Err(ModelError::InvalidDose)
        );
        assert_eq!(
            Dose::Volume(f64::NAN).validate(ProductCategory::Filler),
            Err(ModelError::InvalidDose)
        );
    }

    #[test]
    fn test_stepped_units_clamp_at_zero() {
        assert_eq!(Dose::Units(2).stepped(3), Dose::Units(5));
        assert_eq!(Dose::Units(2).stepped(-5), Dose::Units(0));
        assert_eq!(Dose::Units(u32::MAX - 1).stepped(10), Dose::Units(u32::MAX));
    }

    #[test]
    fn test_stepped_volume_rounds() {
        assert_eq!(Dose::Volume(0.5).stepped(1), Dose::Volume(0.6));
        assert_eq!(Dose::Volume(0.5).stepped(-2), Dose::Volume(0.3));
        assert_eq!(Dose::Volume(0.1).stepped(-3), Dose::Volume(0.0));
    }

    #[test]
    fn test_needle_wire_names() {
        let json = serde_json::to_string(&NeedleGauge::G27Cannula).unwrap();
        assert_eq!(json, "\"27g-cannula\"");
        let depth = serde_json::to_string(&InjectionDepth::MidDermis).unwrap();
        assert_eq!(depth, "\"mid-dermis\"");
    }
}
