//! Overpass QL client.
//!
//! Queries are POSTed as the raw request body. Responses are
//! `{"elements": [...]}` where each element is a node (`lat`/`lon`), a way
//! or relation with `out center` (`center.lat`/`center.lon`), or a relation
//! with `out geom` (`members[].geometry`).

use std::time::Duration;

use crate::OsmError;

/// POSTs an Overpass QL query and returns the raw `elements` array.
///
/// # Errors
///
/// Returns [`OsmError::Network`] if the request fails or times out,
/// [`OsmError::Status`] for a non-2xx response, and [`OsmError::Parse`]
/// if the body is not JSON or has no `elements` array.
pub async fn run_query(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
    timeout: Duration,
) -> Result<Vec<serde_json::Value>, OsmError> {
    let resp = client
        .post(base_url)
        .body(query.to_string())
        .timeout(timeout)
        .send()
        .await
        .map_err(OsmError::from_transport)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(OsmError::Status {
            status: status.as_u16(),
        });
    }

    let body = resp.text().await.map_err(OsmError::from_transport)?;
    parse_elements(&body)
}

/// Extracts the `elements` array from an Overpass response body.
///
/// # Errors
///
/// Returns [`OsmError::Parse`] if the body is not JSON or has no
/// `elements` array.
pub fn parse_elements(body: &str) -> Result<Vec<serde_json::Value>, OsmError> {
    let mut body: serde_json::Value = serde_json::from_str(body).map_err(|e| OsmError::Parse {
        message: format!("Overpass response is not JSON: {e}"),
    })?;

    match body.get_mut("elements").map(serde_json::Value::take) {
        Some(serde_json::Value::Array(elements)) => Ok(elements),
        _ => Err(OsmError::Parse {
            message: "Overpass response has no elements array".to_string(),
        }),
    }
}

/// Position of an element: a node's own coordinates, or the `center` of a
/// way or relation. `None` when the element has neither.
#[must_use]
pub fn element_position(element: &serde_json::Value) -> Option<(f64, f64)> {
    let source = match element.get("type")?.as_str()? {
        "node" => element,
        "way" | "relation" => element.get("center")?,
        _ => return None,
    };

    let lat = source.get("lat")?.as_f64()?;
    let lon = source.get("lon")?.as_f64()?;
    Some((lat, lon))
}

/// Reads a string tag from an element's `tags` object.
#[must_use]
pub fn tag<'a>(element: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    element
        .get("tags")?
        .get(key)?
        .as_str()
        .filter(|value| !value.is_empty())
}

/// Wraps one or more statements in an Overpass union with a JSON header
/// and output mode.
#[must_use]
pub fn union_query(timeout_secs: u64, statements: &[String], output: &str) -> String {
    let mut query = format!("[out:json][timeout:{timeout_secs}];\n(\n");
    for statement in statements {
        query.push_str("  ");
        query.push_str(statement);
        query.push_str(";\n");
    }
    query.push_str(");\n");
    query.push_str(output);
    query.push(';');
    query
}
