//! School enrichment from an education registry.
//!
//! The registry is an opaque text dump (typically XML) of educational
//! institutions, loaded once from `EDUCATION_REGISTRY_PATH`. The model is
//! asked to find the school in it and summarize the matching record. When
//! there is no registry, no provider, or the reply cannot be parsed, a fixed
//! fallback object is returned.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::extract::extract_json_block;
use crate::providers::LlmProvider;

/// Registry text beyond this many bytes is dropped before prompting.
pub const MAX_REGISTRY_BYTES: usize = 800_000;

const NOT_SPECIFIED: &str = "Not specified";

/// Enriched school details.
///
/// `details` holds whatever fields the model returned; `has_registry_data`
/// is `true` only when the model reports a registry match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolInfo {
    /// Free-form fields (`students_count`, `ownership`, `address`, ...).
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
    /// Whether the details came from a registry match.
    pub has_registry_data: bool,
}

impl SchoolInfo {
    /// The fixed payload returned when enrichment is unavailable.
    #[must_use]
    pub fn fallback(school_name: &str) -> Self {
        let details = serde_json::json!({
            "students_count": NOT_SPECIFIED,
            "staff_count": NOT_SPECIFIED,
            "ownership": NOT_SPECIFIED,
            "language": "Kyrgyz/Russian",
            "specialization": "General education school",
            "address": "Bishkek",
            "contact_info": NOT_SPECIFIED,
            "description": format!("Information about school {school_name} is temporarily unavailable."),
        });

        Self {
            details: match details {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            },
            has_registry_data: false,
        }
    }
}

/// Education registry text, truncated to [`MAX_REGISTRY_BYTES`].
#[derive(Debug, Clone)]
pub struct EducationRegistry {
    text: String,
}

impl EducationRegistry {
    /// Wraps registry text, truncating it at a character boundary when it
    /// exceeds [`MAX_REGISTRY_BYTES`]. A truncated XML dump gets a closing
    /// `</root>` so the model still sees a terminated document.
    #[must_use]
    pub fn new(mut text: String) -> Self {
        if text.len() > MAX_REGISTRY_BYTES {
            let mut cut = MAX_REGISTRY_BYTES;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            log::warn!(
                "Education registry is {} bytes, truncating to {cut}",
                text.len()
            );
            text.truncate(cut);
            text.push_str("\n</root>");
        }
        Self { text }
    }

    /// Reads the registry from a file.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if the file cannot be read.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        log::info!(
            "Loaded education registry from {} ({} bytes)",
            path.display(),
            text.len()
        );
        Ok(Self::new(text))
    }

    /// Reads the registry from `EDUCATION_REGISTRY_PATH`, or `None` when the
    /// variable is unset or the file cannot be read.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let path = std::env::var("EDUCATION_REGISTRY_PATH").ok()?;
        match Self::load(Path::new(&path)) {
            Ok(registry) => Some(registry),
            Err(e) => {
                log::warn!("Could not read education registry {path}: {e}");
                None
            }
        }
    }

    /// The (possibly truncated) registry text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Builds the enrichment prompt.
#[must_use]
pub fn build_prompt(registry: &EducationRegistry, school_name: &str, location: Option<(f64, f64)>) -> String {
    let location = location.map_or_else(String::new, |(lat, lng)| {
        format!(" located near ({lat:.5}, {lng:.5})")
    });

    format!(
        r#"You are given a registry of educational institutions. Find the school named "{school_name}"{location}.

Registry data:
{registry}

Match on the school's name or full name, allowing partial word matches. If a matching record exists, reply with JSON only:
{{
    "found": true,
    "students_count": "number of students, or 'Not filled in' if 0",
    "staff_count": "number of staff, or 'Not filled in' if 0",
    "ownership": "form of ownership",
    "language": "main language of instruction, judged from class counts per language",
    "specialization": "school type (gymnasium, lyceum, international, general education)",
    "address": "full address",
    "contact_info": "phone number",
    "description": "detailed description based on the record",
    "registry_school_name": "exact school name from the registry"
}}

If no record matches, reply with JSON only, with "found": false and "{not_specified}" for every unknown field."#,
        registry = registry.text(),
        not_specified = NOT_SPECIFIED,
    )
}

/// Parses a model reply into school details. Returns `None` if the
/// extracted block is not a JSON object.
#[must_use]
pub fn parse_school_info(reply: &str) -> Option<SchoolInfo> {
    let value: serde_json::Value = serde_json::from_str(extract_json_block(reply)).ok()?;
    let serde_json::Value::Object(mut details) = value else {
        return None;
    };

    let has_registry_data = details
        .get("found")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    details.remove("has_registry_data");

    Some(SchoolInfo {
        details,
        has_registry_data,
    })
}

/// Asks the model to describe a school using the registry.
///
/// Never fails: a missing registry, a missing provider, a provider error or
/// an unparseable reply all produce [`SchoolInfo::fallback`].
pub async fn describe_school(
    provider: Option<&dyn LlmProvider>,
    registry: Option<&EducationRegistry>,
    school_name: &str,
    location: Option<(f64, f64)>,
) -> SchoolInfo {
    let (Some(provider), Some(registry)) = (provider, registry) else {
        log::debug!("School enrichment unavailable for '{school_name}': no provider or registry");
        return SchoolInfo::fallback(school_name);
    };

    let prompt = build_prompt(registry, school_name, location);

    match provider.complete(&prompt).await {
        Ok(reply) => parse_school_info(&reply).unwrap_or_else(|| {
            log::warn!("Unparseable school info reply for '{school_name}'");
            SchoolInfo::fallback(school_name)
        }),
        Err(e) => {
            log::warn!("School info request for '{school_name}' failed: {e}");
            SchoolInfo::fallback(school_name)
        }
    }
}
