//! Patient directory collaborator.

use crate::model::{Patient, PatientId};
use std::collections::BTreeMap;

/// Read-only source of patient records.
pub trait PatientDirectory {
    fn get(&self, id: &str) -> Option<Patient>;

    /// Patients whose name or medical record number contains `query`,
    /// case-insensitively. A blank query matches everyone.
    fn search(&self, query: &str) -> Vec<Patient>;
}

/// In-memory directory, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    patients: BTreeMap<PatientId, Patient>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a patient.
    pub fn insert(&mut self, patient: Patient) {
        self.patients.insert(patient.id.clone(), patient);
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

impl FromIterator<Patient> for MemoryDirectory {
    fn from_iter<I: IntoIterator<Item = Patient>>(iter: I) -> Self {
        let mut directory = Self::new();
        for patient in iter {
            directory.insert(patient);
        }
        directory
    }
}

fn matches(patient: &Patient, needle: &str) -> bool {
    patient.full_name().to_lowercase().contains(needle)
        || patient.mrn.to_lowercase().contains(needle)
}

impl PatientDirectory for MemoryDirectory {
    fn get(&self, id: &str) -> Option<Patient> {
        self.patients.get(id).cloned()
    }

    fn search(&self, query: &str) -> Vec<Patient> {
        let needle = query.trim().to_lowercase();
        self.patients
            .values()
            .filter(|p| needle.is_empty() || matches(p, &needle))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn patient(id: &str, first: &str, last: &str, mrn: &str) -> Patient {
        Patient {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
            mrn: mrn.to_string(),
            phone: None,
            email: None,
            allergies: Vec::new(),
            last_visit: None,
        }
    }

    fn directory() -> MemoryDirectory {
        [
            patient("1", "Maria", "Lopez", "MRN-1001"),
            patient("2", "Chris", "Lopez", "MRN-1002"),
            patient("3", "Taylor", "Nguyen", "MRN-2001"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_get() {
        let directory = directory();
        assert_eq!(directory.get("3").unwrap().full_name(), "Taylor Nguyen");
        assert!(directory.get("9").is_none());
    }

    #[test]
    fn test_search_by_name_and_mrn() {
        let directory = directory();
        let ids = |q: &str| directory.search(q).into_iter().map(|p| p.id).collect::<Vec<_>>();

        assert_eq!(ids("lopez"), vec!["1", "2"]);
        assert_eq!(ids("mrn-2"), vec!["3"]);
        assert_eq!(ids("maria lo"), vec!["1"]);
        assert!(ids("zzz").is_empty());
        assert_eq!(ids("  ").len(), 3);
    }
}
