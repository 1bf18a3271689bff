//! Treatment session, the aggregate root of a chart.

use super::{
    FreehandAnnotation, InjectionPoint, PatientId, ProductCategory, SoapNotes, TreatmentPhoto,
};
use crate::zones::ZONE_CATALOG_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session. Also the idempotency key on sync.
pub type SessionId = Uuid;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    PendingSync,
    /// Accepted by the remote system.
    Completed,
}

/// One treatment encounter. Owns its points, annotations and photos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentSession {
    pub id: SessionId,
    pub patient_id: PatientId,
    pub provider_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub product_type: ProductCategory,
    pub points: Vec<InjectionPoint>,
    /// Points placed on the 3-D model. Kept apart from `points`.
    #[serde(default)]
    pub spatial_points: Vec<InjectionPoint>,
    pub annotations: Vec<FreehandAnnotation>,
    pub photos: Vec<TreatmentPhoto>,
    pub soap_notes: SoapNotes,
    pub(crate) status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
    /// Catalog version whose defaults were copied into `points`.
    pub zone_catalog_version: u32,
    #[serde(default)]
    pub photo_consent: bool,
}

impl TreatmentSession {
    /// Start a new in-progress session with empty collections.
    pub fn new(patient_id: PatientId, provider_id: String, product_type: ProductCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            provider_id,
            started_at: Utc::now(),
            ended_at: None,
            product_type,
            points: Vec::new(),
            spatial_points: Vec::new(),
            annotations: Vec::new(),
            photos: Vec::new(),
            soap_notes: SoapNotes::default(),
            status: SessionStatus::InProgress,
            synced_at: None,
            zone_catalog_version: ZONE_CATALOG_VERSION,
            photo_consent: false,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Units over the chart points with category neurotoxin.
    pub fn total_units(&self) -> u32 {
        total_units(&self.points)
    }

    /// Volume over the chart points with category filler.
    pub fn total_volume(&self) -> f64 {
        total_volume(&self.points)
    }

    /// Session length, if it has ended.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }

    /// Serialize the session to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a session from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Saturates at `u32::MAX`.
pub(crate) fn total_units(points: &[InjectionPoint]) -> u32 {
    points
        .iter()
        .filter(|p| p.product() == ProductCategory::Neurotoxin)
        .map(InjectionPoint::units)
        .fold(0, u32::saturating_add)
}

pub(crate) fn total_volume(points: &[InjectionPoint]) -> f64 {
    points
        .iter()
        .filter(|p| p.product() == ProductCategory::Filler)
        .map(InjectionPoint::volume)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dose, Placement, PointDraft, ZoneRef};

    fn point(product: ProductCategory, dose: Dose) -> InjectionPoint {
        let draft = PointDraft::new(ZoneRef::Free, Placement::Chart { x: 1.0, y: 1.0 }, product)
            .with_dose(dose);
        InjectionPoint::from_draft(draft).unwrap()
    }

    #[test]
    fn test_new_session_is_empty() {
        let session =
            TreatmentSession::new("p-1".into(), "dr-1".into(), ProductCategory::Filler);
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert!(session.points.is_empty());
        assert!(session.ended_at.is_none());
        assert_eq!(session.zone_catalog_version, ZONE_CATALOG_VERSION);
    }

    #[test]
    fn test_totals_split_by_category() {
        let mut session =
            TreatmentSession::new("p-1".into(), "dr-1".into(), ProductCategory::Neurotoxin);
        session.points.push(point(ProductCategory::Neurotoxin, Dose::Units(10)));
        session.points.push(point(ProductCategory::Filler, Dose::Volume(0.8)));
        session.points.push(point(ProductCategory::Neurotoxin, Dose::Units(4)));

        assert_eq!(session.total_units(), 14);
        assert!((session.total_volume() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_total_units_saturates() {
        let points = [
            point(ProductCategory::Neurotoxin, Dose::Units(u32::MAX - 1)),
            point(ProductCategory::Neurotoxin, Dose::Units(5)),
        ];
        assert_eq!(total_units(&points), u32::MAX);
    }

    #[test]
    fn test_json_roundtrip_keeps_nested_records() {
        let mut session =
            TreatmentSession::new("p-1".into(), "dr-1".into(), ProductCategory::Neurotoxin);
        session.points.push(point(ProductCategory::Neurotoxin, Dose::Units(10)));
        session.soap_notes.plan = "recheck".to_string();

        let json = session.to_json().unwrap();
        let loaded = TreatmentSession::from_json(&json).unwrap();
        assert_eq!(loaded, session);
    }
}
