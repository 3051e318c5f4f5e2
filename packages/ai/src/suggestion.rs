//! Building placement suggestions.
//!
//! Composes a prompt from the city's district densities and asks the model
//! for a single recommended district and coordinate. Any provider or parse
//! failure yields [`BuildingSuggestion::fallback`].

use std::fmt::Write as _;

use building_optimizer_geography_models::BuildingType;
use serde::{Deserialize, Serialize};

use crate::AiError;
use crate::extract::extract_json_block;
use crate::providers::LlmProvider;

/// District name used when no recommendation could be produced.
pub const NO_DATA_DISTRICT: &str = "No data";

/// A district as presented to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictSummary {
    /// District name.
    pub name: String,
    /// People per square kilometre.
    pub population_density: u32,
    /// Centroid latitude.
    pub lat: f64,
    /// Centroid longitude.
    pub lng: f64,
}

/// A suggested coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

/// The model's placement recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSuggestion {
    /// Recommended district (or nearest district to the coordinate).
    pub district: String,
    /// Recommended location.
    pub coordinates: Coordinates,
    /// Confidence score, nominally 1 to 10.
    pub confidence: f64,
    /// Short justification.
    pub reasoning: String,
}

impl BuildingSuggestion {
    /// The fixed payload returned when no recommendation is available.
    #[must_use]
    pub fn fallback(reason: &str) -> Self {
        Self {
            district: NO_DATA_DISTRICT.to_string(),
            coordinates: Coordinates { lat: 0.0, lng: 0.0 },
            confidence: 1.0,
            reasoning: format!("Failed to get a recommendation from the AI: {reason}"),
        }
    }
}

/// Builds the placement prompt.
#[must_use]
pub fn build_prompt(building_type: BuildingType, city: &str, districts: &[DistrictSummary]) -> String {
    let mut district_lines = String::new();
    if districts.is_empty() {
        district_lines.push_str("No population density data is available for this city's districts.\n");
    } else {
        district_lines.push_str("Available districts and their population density (people/km²):\n");
        for d in districts {
            let _ = writeln!(
                district_lines,
                "- {}: {} (lat: {:.4}, lng: {:.4})",
                d.name, d.population_density, d.lat, d.lng
            );
        }
    }

    format!(
        r#"I am looking for the best place to build a new "{label}" in the city of "{city}".

{district_lines}
Taking the building type into account, recommend the most suitable district, or a specific coordinate if no district fits but a good point exists.

Guidelines:
1. School, Kindergarten: prefer medium to high density (1500-5000 people/km²) close to residential areas. Avoid very dense (>5000) and sparse (<1000) districts.
2. Hospital, Pharmacy: prefer medium to high density (1500-4000 people/km²) reachable by most residents.
3. Shopping center: prefer medium to high density (2000-6000 people/km²) with good transport access.
4. Park: prefer medium density (1000-3000 people/km²) where green space is needed and land is available.

Answer with JSON only, using exactly these fields:
{{
    "district": "district name or nearest district",
    "coordinates": {{"lat": latitude, "lng": longitude}},
    "confidence": score from 1 to 10,
    "reasoning": "short explanation of why this location is optimal"
}}

If no recommendation is possible, use "{no_data}" as the district, explain why in reasoning, and set confidence to 1."#,
        label = building_type.label(),
        no_data = NO_DATA_DISTRICT,
    )
}

/// Parses a model reply into a suggestion.
///
/// # Errors
///
/// Returns [`AiError::Json`] if the extracted block is not a suggestion
/// object.
pub fn parse_suggestion(reply: &str) -> Result<BuildingSuggestion, AiError> {
    Ok(serde_json::from_str(extract_json_block(reply))?)
}

/// Asks the model where to place a building.
///
/// Never fails: a missing provider, a provider error, or an unparseable
/// reply all produce [`BuildingSuggestion::fallback`].
pub async fn suggest_location(
    provider: Option<&dyn LlmProvider>,
    building_type: BuildingType,
    city: &str,
    districts: &[DistrictSummary],
) -> BuildingSuggestion {
    let Some(provider) = provider else {
        return BuildingSuggestion::fallback("no AI provider is configured");
    };

    let prompt = build_prompt(building_type, city, districts);
    log::debug!(
        "Requesting {building_type} placement in {city} from {} ({} districts)",
        provider.name(),
        districts.len()
    );

    let result = match provider.complete(&prompt).await {
        Ok(reply) => {
            log::debug!("Raw suggestion reply: {reply}");
            parse_suggestion(&reply)
        }
        Err(e) => Err(e),
    };

    result.unwrap_or_else(|e| {
        log::warn!("Building suggestion failed: {e}");
        BuildingSuggestion::fallback(&e.to_string())
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Provider returning a canned reply or error.
    pub struct CannedProvider(pub Result<&'static str, &'static str>);

    #[async_trait::async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
            self.0.map(ToString::to_string).map_err(|message| AiError::Provider {
                message: message.to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    fn districts() -> Vec<DistrictSummary> {
        vec![DistrictSummary {
            name: "Октябрьский район".to_string(),
            population_density: 3800,
            lat: 42.84,
            lng: 74.61,
        }]
    }

    #[test]
    fn prompt_lists_districts() {
        let prompt = build_prompt(BuildingType::School, "Бишкек", &districts());
        assert!(prompt.contains("\"School\""));
        assert!(prompt.contains("- Октябрьский район: 3800 (lat: 42.8400, lng: 74.6100)"));
    }

    #[test]
    fn prompt_without_districts_says_so() {
        let prompt = build_prompt(BuildingType::Park, "Бишкек", &[]);
        assert!(prompt.contains("No population density data"));
    }

    #[tokio::test]
    async fn parses_fenced_reply() {
        let provider = CannedProvider(Ok(
            "```json\n{\"district\": \"Октябрьский\", \"coordinates\": {\"lat\": 42.87, \"lng\": 74.58}, \
             \"confidence\": 8.5, \"reasoning\": \"Dense and central\"}\n```",
        ));
        let suggestion =
            suggest_location(Some(&provider), BuildingType::School, "Бишкек", &districts()).await;

        assert_eq!(suggestion.district, "Октябрьский");
        assert!((suggestion.confidence - 8.5).abs() < f64::EPSILON);
        assert!((suggestion.coordinates.lat - 42.87).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn unparseable_reply_falls_back() {
        let provider = CannedProvider(Ok("I think the north is nice."));
        let suggestion =
            suggest_location(Some(&provider), BuildingType::Hospital, "Бишкек", &districts()).await;

        assert_eq!(suggestion.district, NO_DATA_DISTRICT);
        assert!((suggestion.confidence - 1.0).abs() < f64::EPSILON);
        assert!(suggestion.coordinates.lat.abs() < f64::EPSILON);
        assert!(
            suggestion
                .reasoning
                .starts_with("Failed to get a recommendation from the AI: JSON error")
        );
    }

    #[tokio::test]
    async fn provider_error_falls_back() {
        let provider = CannedProvider(Err("quota exceeded"));
        let suggestion = suggest_location(Some(&provider), BuildingType::Park, "Бишкек", &[]).await;
        assert_eq!(
            suggestion.reasoning,
            "Failed to get a recommendation from the AI: Provider error: quota exceeded"
        );
    }

    #[tokio::test]
    async fn missing_provider_falls_back() {
        let suggestion = suggest_location(None, BuildingType::Pharmacy, "Бишкек", &districts()).await;
        assert_eq!(suggestion.district, NO_DATA_DISTRICT);
    }
}
