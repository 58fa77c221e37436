//! Field-level sanitization applied between parsing and validation.

use serde_json::Value;
use tracing::debug;

const DEFAULT_CONFIDENCE: i64 = 80;
const DEFAULT_IMPORTANCE: i64 = 5;

/// Coerce and clamp the numeric fields the model most often gets wrong.
///
/// Works on the decoded document in place. Each array is handled
/// independently; a missing or non-array `keyFindings`/`timestampEvents`
/// is left untouched and schema validation decides its fate.
pub(crate) fn sanitize(doc: &mut Value) {
    if let Some(findings) = doc.get_mut("keyFindings").and_then(Value::as_array_mut) {
        findings.retain(|item| {
            let keep = item.is_object();
            if !keep {
                debug!("Dropping non-object keyFindings element: {item}");
            }
            keep
        });
        for finding in findings.iter_mut() {
            let confidence = coerce_int(finding.get("confidenceScore"), DEFAULT_CONFIDENCE)
                .clamp(0, 100);
            finding["confidenceScore"] = Value::from(confidence);

            if !finding
                .get("relatedTimestamps")
                .map(Value::is_array)
                .unwrap_or(false)
            {
                finding["relatedTimestamps"] = Value::Array(Vec::new());
            }
        }
    }

    if let Some(events) = doc.get_mut("timestampEvents").and_then(Value::as_array_mut) {
        events.retain(|item| {
            let keep = item.is_object();
            if !keep {
                debug!("Dropping non-object timestampEvents element: {item}");
            }
            keep
        });
        for event in events.iter_mut() {
            let seconds = coerce_float(event.get("timestampSeconds"), 0.0).max(0.0);
            event["timestampSeconds"] = Value::from(seconds);

            let importance =
                coerce_int(event.get("importanceScore"), DEFAULT_IMPORTANCE).clamp(1, 10);
            event["importanceScore"] = Value::from(importance);
        }
    }
}

/// Integer coercion via float cast, so "87.6" becomes 87.
fn coerce_int(value: Option<&Value>, default: i64) -> i64 {
    coerce_float(value, default as f64) as i64
}

fn coerce_float(value: Option<&Value>, default: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => f,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_is_noop_on_valid_data() {
        let mut doc = json!({
            "keyFindings": [{"confidenceScore": 90, "relatedTimestamps": [1.0]}],
            "timestampEvents": [{"timestampSeconds": 2.5, "importanceScore": 7}]
        });
        let before = doc.clone();
        sanitize(&mut doc);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_string_confidence_coerced_via_float_cast() {
        let mut doc = json!({"keyFindings": [{"confidenceScore": "87.6"}]});
        sanitize(&mut doc);
        assert_eq!(doc["keyFindings"][0]["confidenceScore"], 87);
    }

    #[test]
    fn test_unparsable_confidence_defaults_to_80() {
        let mut doc = json!({"keyFindings": [{"confidenceScore": "very high"}]});
        sanitize(&mut doc);
        assert_eq!(doc["keyFindings"][0]["confidenceScore"], 80);

        let mut doc = json!({"keyFindings": [{}]});
        sanitize(&mut doc);
        assert_eq!(doc["keyFindings"][0]["confidenceScore"], 80);
    }

    #[test]
    fn test_confidence_clamped_to_range() {
        let mut doc = json!({"keyFindings": [{"confidenceScore": 150}, {"confidenceScore": -3}]});
        sanitize(&mut doc);
        assert_eq!(doc["keyFindings"][0]["confidenceScore"], 100);
        assert_eq!(doc["keyFindings"][1]["confidenceScore"], 0);
    }

    #[test]
    fn test_related_timestamps_forced_to_array() {
        let mut doc = json!({"keyFindings": [{"confidenceScore": 50, "relatedTimestamps": "1,2"}]});
        sanitize(&mut doc);
        assert_eq!(doc["keyFindings"][0]["relatedTimestamps"], json!([]));
    }

    #[test]
    fn test_non_object_elements_dropped() {
        let mut doc = json!({
            "keyFindings": ["stray string", {"confidenceScore": 10}, 42],
            "timestampEvents": [null, {"timestampSeconds": 1.0, "importanceScore": 3}]
        });
        sanitize(&mut doc);
        assert_eq!(doc["keyFindings"].as_array().unwrap().len(), 1);
        assert_eq!(doc["timestampEvents"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_event_defaults_and_clamps() {
        let mut doc = json!({"timestampEvents": [
            {"timestampSeconds": "nope", "importanceScore": "high"},
            {"timestampSeconds": -4.0, "importanceScore": 99}
        ]});
        sanitize(&mut doc);
        assert_eq!(doc["timestampEvents"][0]["timestampSeconds"], 0.0);
        assert_eq!(doc["timestampEvents"][0]["importanceScore"], 5);
        assert_eq!(doc["timestampEvents"][1]["timestampSeconds"], 0.0);
        assert_eq!(doc["timestampEvents"][1]["importanceScore"], 10);
    }

    #[test]
    fn test_non_array_fields_left_untouched() {
        let mut doc = json!({"keyFindings": "oops", "timestampEvents": {"a": 1}});
        let before = doc.clone();
        sanitize(&mut doc);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let mut doc = json!({
            "keyFindings": [{"confidenceScore": "87.6"}],
            "timestampEvents": [{"importanceScore": 0}]
        });
        sanitize(&mut doc);
        let once = doc.clone();
        sanitize(&mut doc);
        assert_eq!(doc, once);
    }
}
