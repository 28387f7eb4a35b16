//! Parsing of issue bodies into typed action requests.
//!
//! The body is an INI-like document: one `[section]` per requested action,
//! each holding `name`, `description` and `requested_version`. Issue forms
//! usually wrap the block in a Markdown code fence and may carry free text
//! above the first header; both are tolerated.

use crate::error::{IntakeError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};

pub const KEY_NAME: &str = "name";
pub const KEY_DESCRIPTION: &str = "description";
pub const KEY_VERSION: &str = "requested_version";

const REQUIRED_KEYS: [&str; 3] = [KEY_NAME, KEY_DESCRIPTION, KEY_VERSION];

// ---------------------------------------------------------------------------
// ActionRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Header of the section the request was declared in.
    pub section: String,
    pub name: String,
    pub description: String,
    /// Tag, branch or commit-ish, never interpreted.
    pub version: String,
}

impl ActionRequest {
    /// `owner/repo/version`, the allow-list entry for this request.
    pub fn composite_key(&self) -> String {
        crate::allowlist::composite_key(&self.name, &self.version)
    }
}

impl std::fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

struct RawSection {
    key: String,
    fields: Vec<(String, String)>,
}

impl RawSection {
    fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
    }
}

/// Parse `raw` into requests, preserving section order.
///
/// Returns [`IntakeError::NoSections`] when no header is present at all so
/// callers can treat an empty request as a no-op rather than a failure.
pub fn parse(raw: &str) -> Result<Vec<ActionRequest>> {
    let sections = split_sections(raw)?;
    if sections.is_empty() {
        return Err(IntakeError::NoSections);
    }
    sections.iter().map(to_request).collect()
}

/// Fail when more requests were parsed than one run may process.
pub fn enforce_limit(requests: &[ActionRequest], max: Option<usize>) -> Result<()> {
    match max {
        Some(max) if requests.len() > max => Err(IntakeError::TooManyRequests {
            found: requests.len(),
            max,
        }),
        _ => Ok(()),
    }
}

fn split_sections(raw: &str) -> Result<Vec<RawSection>> {
    let mut sections: Vec<RawSection> = Vec::new();
    // Index of the field a continuation line would extend.
    let mut open_field: Option<usize> = None;

    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            open_field = None;
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') || trimmed.starts_with("```") {
            continue;
        }

        if let Some(header) = section_header(trimmed) {
            if sections.iter().any(|s| s.key == header) {
                return Err(IntakeError::DuplicateSection(header.to_string()));
            }
            sections.push(RawSection {
                key: header.to_string(),
                fields: Vec::new(),
            });
            open_field = None;
            continue;
        }

        // Free text before the first header is preamble.
        let Some(section) = sections.last_mut() else {
            continue;
        };

        let indented = line.starts_with(' ') || line.starts_with('\t');
        if indented {
            if let Some(i) = open_field {
                let value = &mut section.fields[i].1;
                value.push('\n');
                value.push_str(trimmed);
                continue;
            }
        }

        let Some((key, value)) = split_key_value(trimmed) else {
            return Err(IntakeError::InvalidLine {
                line: idx + 1,
                content: trimmed.to_string(),
            });
        };
        if section.fields.iter().any(|(k, _)| *k == key) {
            return Err(IntakeError::DuplicateKey {
                section: section.key.clone(),
                key,
            });
        }
        section.fields.push((key, value.to_string()));
        open_field = Some(section.fields.len() - 1);
    }

    Ok(sections)
}

fn section_header(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    (!inner.is_empty()).then_some(inner)
}

/// Split on the first `=` or `:`; keys are case-insensitive.
fn split_key_value(line: &str) -> Option<(String, &str)> {
    let pos = line.find(['=', ':'])?;
    let key = line[..pos].trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_lowercase(), line[pos + 1..].trim()))
}

fn to_request(section: &RawSection) -> Result<ActionRequest> {
    for key in REQUIRED_KEYS {
        if section.get(key).map_or(true, str::is_empty) {
            return Err(IntakeError::MissingField {
                section: section.key.clone(),
                key: key.to_string(),
            });
        }
    }
    let field = |key: &str| section.get(key).unwrap_or_default().to_string();

    let name = field(KEY_NAME);
    if !paths::is_valid_action_name(&name) {
        return Err(IntakeError::InvalidName {
            section: section.key.clone(),
            name,
        });
    }
    let version = field(KEY_VERSION);
    if !paths::is_valid_version(&version) {
        return Err(IntakeError::InvalidVersion {
            section: section.key.clone(),
            version,
        });
    }

    Ok(ActionRequest {
        section: section.key.clone(),
        name,
        description: field(KEY_DESCRIPTION),
        version,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
