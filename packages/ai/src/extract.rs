//! Tolerant extraction of JSON payloads from model replies.

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Returns the JSON-looking part of a model reply.
///
/// * With a ```` ```json ```` fence: the text after it, up to the next
///   fence (or the end).
/// * Otherwise, with any ```` ``` ```` fence: the text after the first
///   fence, up to the next one (or the end).
/// * Otherwise the whole reply.
///
/// The result is trimmed. No JSON validation happens here.
#[must_use]
pub fn extract_json_block(text: &str) -> &str {
    let body = if let Some(start) = text.find(JSON_FENCE) {
        &text[start + JSON_FENCE.len()..]
    } else if let Some(start) = text.find(FENCE) {
        &text[start + FENCE.len()..]
    } else {
        return text.trim();
    };

    body.find(FENCE).map_or(body, |end| &body[..end]).trim()
}
