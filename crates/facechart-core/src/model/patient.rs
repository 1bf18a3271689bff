//! Patient reference data, owned by the patient directory.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier assigned by the patient directory.
pub type PatientId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// Medical record number.
    pub mrn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<NaiveDate>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_allergies(&self) -> bool {
        !self.allergies.is_empty()
    }
}
