use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use super::super::domain::LoanCategory;
use super::progress::{check_submittable, SubmissionBlocked};
use super::schema::{section_requirements, Presence};
use super::{ApplicationDraft, SectionKey};

/// Upload reference carried by a submission; bytes are supplied at encode time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileField {
    pub name: String,
    pub file_name: String,
}

impl FileField {
    pub fn content_type(&self) -> mime::Mime {
        mime_guess::from_path(&self.file_name).first_or_octet_stream()
    }
}

/// Form post destined for the lending backend's apply endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPayload {
    pub category: LoanCategory,
    pub endpoint: String,
    pub fields: Vec<(String, String)>,
    pub files: Vec<FileField>,
}

#[derive(Debug, thiserror::Error)]
pub enum MultipartError {
    #[error("no attachment bytes supplied for upload field '{0}'")]
    MissingAttachment(String),
    #[error("multipart boundary must be 1-70 characters without whitespace")]
    InvalidBoundary,
    #[error("failed to write multipart body: {0}")]
    Io(#[from] std::io::Error),
}

impl SubmissionPayload {
    /// Build the post for a draft that passes the submission gate.
    pub fn from_draft(
        draft: &ApplicationDraft,
        category: LoanCategory,
    ) -> Result<Self, SubmissionBlocked> {
        let report = check_submittable(draft, category)?;

        let mut fields = vec![("category".to_string(), category.slug().to_string())];
        let mut files = Vec::new();
        for progress in &report.sections {
            for requirement in section_requirements(progress.section_key, category, draft) {
                let Some(value) = draft.value_of(&requirement) else {
                    debug_assert!(requirement.rule.presence == Presence::Optional);
                    continue;
                };
                if requirement.section == SectionKey::Uploads {
                    files.push(FileField {
                        name: requirement.wire_name(),
                        file_name: value.to_string(),
                    });
                } else {
                    fields.push((requirement.wire_name(), value.to_string()));
                }
            }
        }

        Ok(Self {
            category,
            endpoint: format!("/loan-applications/apply/{}", category.slug()),
            fields,
            files,
        })
    }

    pub fn content_type(boundary: &str) -> String {
        format!("{}; boundary={boundary}", mime::MULTIPART_FORM_DATA)
    }

    /// Render a `multipart/form-data` body. `attachments` maps upload field names to bytes.
    pub fn encode_multipart(
        &self,
        boundary: &str,
        attachments: &BTreeMap<String, Vec<u8>>,
    ) -> Result<Vec<u8>, MultipartError> {
        if boundary.is_empty()
            || boundary.len() > 70
            || boundary.chars().any(char::is_whitespace)
        {
            return Err(MultipartError::InvalidBoundary);
        }

        let mut body = Vec::new();
        for (name, value) in &self.fields {
            write!(body, "--{boundary}\r\n")?;
            write!(
                body,
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quoted(name)
            )?;
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }

        for file in &self.files {
            let bytes = attachments
                .get(&file.name)
                .ok_or_else(|| MultipartError::MissingAttachment(file.name.clone()))?;
            write!(body, "--{boundary}\r\n")?;
            write!(
                body,
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                escape_quoted(&file.name),
                escape_quoted(&file.file_name)
            )?;
            write!(body, "Content-Type: {}\r\n\r\n", file.content_type())?;
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }

        write!(body, "--{boundary}--\r\n")?;
        Ok(body)
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ")
}
