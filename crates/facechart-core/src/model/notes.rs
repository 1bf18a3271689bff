//! SOAP clinical notes.

use serde::{Deserialize, Serialize};

/// One of the four SOAP sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoapSection {
    Subjective,
    Objective,
    Assessment,
    Plan,
}

impl SoapSection {
    pub const ALL: [SoapSection; 4] = [
        SoapSection::Subjective,
        SoapSection::Objective,
        SoapSection::Assessment,
        SoapSection::Plan,
    ];
}

/// Free-text notes for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapNotes {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

/// Shallow update: every `Some` field replaces the stored text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapNotesUpdate {
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
}

impl SoapNotes {
    pub fn section(&self, section: SoapSection) -> &str {
        match section {
            SoapSection::Subjective => &self.subjective,
            SoapSection::Objective => &self.objective,
            SoapSection::Assessment => &self.assessment,
            SoapSection::Plan => &self.plan,
        }
    }

    fn section_mut(&mut self, section: SoapSection) -> &mut String {
        match section {
            SoapSection::Subjective => &mut self.subjective,
            SoapSection::Objective => &mut self.objective,
            SoapSection::Assessment => &mut self.assessment,
            SoapSection::Plan => &mut self.plan,
        }
    }

    pub fn merge(&mut self, update: SoapNotesUpdate) {
        if let Some(text) = update.subjective {
            self.subjective = text;
        }
        if let Some(text) = update.objective {
            self.objective = text;
        }
        if let Some(text) = update.assessment {
            self.assessment = text;
        }
        if let Some(text) = update.plan {
            self.plan = text;
        }
    }

    /// Append a line to a section, separated from existing text by `separator`.
    pub fn append(&mut self, section: SoapSection, text: &str, separator: &str) {
        let current = self.section_mut(section);
        if !current.is_empty() {
            current.push_str(separator);
        }
        current.push_str(text);
    }

    /// Whitespace-separated word count across all sections.
    pub fn word_count(&self) -> usize {
        SoapSection::ALL
            .iter()
            .map(|s| self.section(*s).split_whitespace().count())
            .sum()
    }

    /// Share of sections with any non-blank text, as a whole percentage.
    pub fn completion_percent(&self) -> u8 {
        let filled = SoapSection::ALL
            .iter()
            .filter(|s| !self.section(**s).trim().is_empty())
            .count();
        (filled * 100 / SoapSection::ALL.len()) as u8
    }

    pub fn is_empty(&self) -> bool {
        self.completion_percent() == 0
    }
}
