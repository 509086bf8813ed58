//! Borrower application drafts, the per-section completion tracker, and the submission
//! adapter that turns a complete draft into the upstream form post.

mod progress;
pub mod schema;
mod submission;
mod validators;

pub use progress::{
    check_submittable, compute_progress, ProgressReport, SectionProgress, SubmissionBlocked,
};
pub use schema::{FieldRequirement, FieldRule, IncomeBranch, Presence};
pub use submission::{FileField, MultipartError, SubmissionPayload};
pub use validators::FieldFormat;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Number of character references every application carries.
pub const REFERENCE_SLOTS: usize = 3;

/// Tracker sections in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    BasicInfo,
    Income,
    References,
    Collateral,
    LoanDetails,
    Uploads,
}

impl SectionKey {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::BasicInfo,
            Self::Income,
            Self::References,
            Self::Collateral,
            Self::LoanDetails,
            Self::Uploads,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::BasicInfo => "basic_info",
            Self::Income => "income",
            Self::References => "references",
            Self::Collateral => "collateral",
            Self::LoanDetails => "loan_details",
            Self::Uploads => "uploads",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic Information",
            Self::Income => "Source of Income",
            Self::References => "Character References",
            Self::Collateral => "Collateral",
            Self::LoanDetails => "Loan Details",
            Self::Uploads => "Requirements Upload",
        }
    }
}

/// Raw text values of one form section keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldValues(BTreeMap<String, String>);

impl FieldValues {
    /// Trimmed value, treating blank input as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn clear(&mut self, key: &str) {
        self.0.remove(key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceEntry {
    pub name: String,
    pub contact: String,
    pub relation: String,
}

impl ReferenceEntry {
    pub fn new(
        name: impl Into<String>,
        contact: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
            relation: relation.into(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        let value = match field {
            "name" => &self.name,
            "contact" => &self.contact,
            "relation" => &self.relation,
            _ => return None,
        };
        Some(value.trim()).filter(|value| !value.is_empty())
    }

    fn field_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "name" => Some(&mut self.name),
            "contact" => Some(&mut self.contact),
            "relation" => Some(&mut self.relation),
            _ => None,
        }
    }
}

/// In-progress application owned by a single form session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationDraft {
    pub basic_info: FieldValues,
    pub income: FieldValues,
    pub references: [ReferenceEntry; REFERENCE_SLOTS],
    pub collateral: FieldValues,
    pub loan_details: FieldValues,
    pub uploads: FieldValues,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("reference values must be set through a reference slot")]
    ReferenceSection,
    #[error("reference slot {0} is out of range (expected 1-3)")]
    SlotOutOfRange(usize),
    #[error("unknown reference field '{0}'")]
    UnknownReferenceField(String),
}

impl ApplicationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(&self, section: SectionKey) -> Option<&FieldValues> {
        match section {
            SectionKey::BasicInfo => Some(&self.basic_info),
            SectionKey::Income => Some(&self.income),
            SectionKey::References => None,
            SectionKey::Collateral => Some(&self.collateral),
            SectionKey::LoanDetails => Some(&self.loan_details),
            SectionKey::Uploads => Some(&self.uploads),
        }
    }

    fn section_mut(&mut self, section: SectionKey) -> Option<&mut FieldValues> {
        match section {
            SectionKey::BasicInfo => Some(&mut self.basic_info),
            SectionKey::Income => Some(&mut self.income),
            SectionKey::References => None,
            SectionKey::Collateral => Some(&mut self.collateral),
            SectionKey::LoanDetails => Some(&mut self.loan_details),
            SectionKey::Uploads => Some(&mut self.uploads),
        }
    }

    /// Record one keystroke-level change to a non-reference section.
    pub fn set(
        &mut self,
        section: SectionKey,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), DraftError> {
        let values = self
            .section_mut(section)
            .ok_or(DraftError::ReferenceSection)?;
        values.set(key, value);
        Ok(())
    }

    /// Update one field of a reference; `slot` is 1-based as shown on the form.
    pub fn set_reference(
        &mut self,
        slot: usize,
        field: &str,
        value: impl Into<String>,
    ) -> Result<(), DraftError> {
        let entry = slot
            .checked_sub(1)
            .and_then(|index| self.references.get_mut(index))
            .ok_or(DraftError::SlotOutOfRange(slot))?;
        let target = entry
            .field_mut(field)
            .ok_or_else(|| DraftError::UnknownReferenceField(field.to_string()))?;
        *target = value.into();
        Ok(())
    }

    /// Present, trimmed value for a resolved schema requirement.
    pub fn value_of(&self, requirement: &FieldRequirement) -> Option<&str> {
        match requirement.slot {
            Some(slot) => self
                .references
                .get(slot)
                .and_then(|entry| entry.get(requirement.rule.key)),
            None => self
                .section(requirement.section)
                .and_then(|values| values.get(requirement.rule.key)),
        }
    }

    /// Full name as typed, used for queue listings.
    pub fn applicant_name(&self) -> Option<String> {
        let parts: Vec<&str> = ["first_name", "middle_name", "last_name"]
            .iter()
            .filter_map(|key| self.basic_info.get(key))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_read_as_absent() {
        let mut values = FieldValues::default();
        values.set("first_name", "   ");
        assert_eq!(values.get("first_name"), None);

        values.set("first_name", " Liza ");
        assert_eq!(values.get("first_name"), Some("Liza"));

        values.clear("first_name");
        assert_eq!(values.get("first_name"), None);
    }

    #[test]
    fn references_are_addressed_by_one_based_slot() {
        let mut draft = ApplicationDraft::new();
        draft
            .set_reference(3, "relation", "Cousin")
            .expect("slot 3 exists");

        assert_eq!(draft.references[2].get("relation"), Some("Cousin"));
        assert_eq!(
            draft.set_reference(0, "name", "x"),
            Err(DraftError::SlotOutOfRange(0))
        );
        assert_eq!(
            draft.set_reference(4, "name", "x"),
            Err(DraftError::SlotOutOfRange(4))
        );
        assert_eq!(
            draft.set_reference(1, "email", "x"),
            Err(DraftError::UnknownReferenceField("email".to_string()))
        );
        assert_eq!(
            draft.set(SectionKey::References, "name", "x"),
            Err(DraftError::ReferenceSection)
        );
    }

    #[test]
    fn draft_deserializes_from_partial_json() {
        let draft: ApplicationDraft = serde_json::from_str(
            r#"{"basic_info": {"first_name": "Liza", "last_name": "Soberano"}}"#,
        )
        .expect("partial draft parses");

        assert_eq!(draft.applicant_name().as_deref(), Some("Liza Soberano"));
        assert_eq!(draft.references, <[ReferenceEntry; 3]>::default());
    }
}
