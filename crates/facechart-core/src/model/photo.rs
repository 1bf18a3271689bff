//! Treatment photos.

use super::FreehandAnnotation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a photo.
pub type PhotoId = Uuid;

/// When in the treatment a photo was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoCategory {
    #[default]
    Before,
    After,
    During,
    Progress,
}

/// Standard documentation angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraAngle {
    #[default]
    Frontal,
    LeftProfile,
    RightProfile,
    LeftOblique,
    RightOblique,
    ChinUp,
    EyesClosed,
    Smile,
}

impl CameraAngle {
    pub const ALL: [CameraAngle; 8] = [
        CameraAngle::Frontal,
        CameraAngle::LeftProfile,
        CameraAngle::RightProfile,
        CameraAngle::LeftOblique,
        CameraAngle::RightOblique,
        CameraAngle::ChinUp,
        CameraAngle::EyesClosed,
        CameraAngle::Smile,
    ];
}

/// One captured image. The URI comes from the capture collaborator and is
/// stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPhoto {
    pub(crate) id: PhotoId,
    pub uri: String,
    pub category: PhotoCategory,
    pub angle: CameraAngle,
    pub taken_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<FreehandAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TreatmentPhoto {
    pub fn new(uri: impl Into<String>, category: PhotoCategory, angle: CameraAngle) -> Self {
        Self {
            id: Uuid::new_v4(),
            uri: uri.into(),
            category,
            angle,
            taken_at: Utc::now(),
            annotations: Vec::new(),
            notes: None,
        }
    }

    pub fn id(&self) -> PhotoId {
        self.id
    }

    pub fn apply(&mut self, update: PhotoUpdate) {
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(angle) = update.angle {
            self.angle = angle;
        }
        if let Some(annotations) = update.annotations {
            self.annotations = annotations;
        }
        if let Some(notes) = update.notes {
            self.notes = if notes.is_empty() { None } else { Some(notes) };
        }
    }
}

/// Partial update for a photo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoUpdate {
    pub category: Option<PhotoCategory>,
    pub angle: Option<CameraAngle>,
    /// Replaces the photo's annotation list.
    pub annotations: Option<Vec<FreehandAnnotation>>,
    /// `Some("")` clears the note.
    pub notes: Option<String>,
}
