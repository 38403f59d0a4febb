//! Takeout sidecar metadata extraction.
//!
//! A sidecar document is free-form JSON whose shape has drifted across
//! Takeout generations, so extraction is lenient field-by-field: a missing
//! or malformed field yields `None` for that field, while a document that
//! is not JSON at all is a hard [`SidecarError`] the caller must classify.
//!
//! ## Field resolution
//!
//! Each field is resolved independently; the first usable source wins:
//!
//! - **Timestamp**: `photoTakenTime.timestamp` → `creationTime.timestamp`.
//!   Takeout writes epoch seconds as JSON strings; numeric values are
//!   accepted too.
//! - **Description**: `description` → `caption`. Empty strings count as
//!   absent.
//! - **Keywords**: one per `people[].name`, in source order. Duplicates are
//!   kept.
//! - **Geolocation**: `geoDataExif` → `geoData`. A block is usable only if
//!   latitude and longitude are both numeric and not both exactly zero;
//!   (0, 0) is Takeout's "location unknown" sentinel, not a real fix off
//!   the coast of Ghana. Altitude passes through only when numeric.
//!
//! Extraction is pure over the document text; the single file read happens
//! in the caller.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("invalid sidecar JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Normalized metadata for one media file, as extracted from its sidecar.
///
/// Built fresh per sidecar and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFields {
    /// Capture time as epoch seconds (UTC).
    pub captured_at: Option<i64>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    /// People names, in sidecar order.
    pub keywords: Vec<String>,
}

impl MetadataFields {
    /// True when there is nothing to write to the target file.
    pub fn is_empty(&self) -> bool {
        self.captured_at.is_none()
            && self.description.is_none()
            && self.latitude.is_none()
            && self.keywords.is_empty()
    }
}

/// Parse a sidecar document into [`MetadataFields`].
pub fn extract_fields(content: &str) -> Result<MetadataFields, SidecarError> {
    let doc: Value = serde_json::from_str(content)?;

    let mut fields = MetadataFields {
        captured_at: timestamp_of(&doc, "photoTakenTime")
            .or_else(|| timestamp_of(&doc, "creationTime")),
        description: text_of(&doc, "description").or_else(|| text_of(&doc, "caption")),
        ..MetadataFields::default()
    };

    if let Some(people) = doc.get("people").and_then(Value::as_array) {
        for person in people {
            if let Some(name) = person.get("name").and_then(Value::as_str)
                && !name.is_empty()
            {
                fields.keywords.push(name.to_string());
            }
        }
    }

    if let Some((lat, lon, alt)) =
        geo_of(doc.get("geoDataExif")).or_else(|| geo_of(doc.get("geoData")))
    {
        fields.latitude = Some(lat);
        fields.longitude = Some(lon);
        fields.altitude = alt;
    }

    Ok(fields)
}

/// Read `<key>.timestamp` as epoch seconds, accepting string or integer.
fn timestamp_of(doc: &Value, key: &str) -> Option<i64> {
    let raw = doc.get(key)?.get("timestamp")?;
    match raw {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Read a top-level string field, treating empty as absent.
fn text_of(doc: &Value, key: &str) -> Option<String> {
    doc.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Accept a geo block only if lat/lon are numeric and not both zero.
fn geo_of(block: Option<&Value>) -> Option<(f64, f64, Option<f64>)> {
    let block = block?;
    let lat = block.get("latitude")?.as_f64()?;
    let lon = block.get("longitude")?.as_f64()?;
    if lat == 0.0 && lon == 0.0 {
        return None;
    }
    let alt = block.get("altitude").and_then(Value::as_f64);
    Some((lat, lon, alt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_taken_time_preferred_over_creation_time() {
        let fields = extract_fields(
            r#"{"photoTakenTime": {"timestamp": "1681564222"},
                "creationTime": {"timestamp": "1681500000"}}"#,
        )
        .unwrap();
        assert_eq!(fields.captured_at, Some(1681564222));
    }

    #[test]
    fn creation_time_used_when_taken_time_missing() {
        let fields = extract_fields(r#"{"creationTime": {"timestamp": "1681500000"}}"#).unwrap();
        assert_eq!(fields.captured_at, Some(1681500000));
    }

    #[test]
    fn creation_time_used_when_taken_time_unparseable() {
        let fields = extract_fields(
            r#"{"photoTakenTime": {"timestamp": "not-a-number"},
                "creationTime": {"timestamp": 1681500000}}"#,
        )
        .unwrap();
        assert_eq!(fields.captured_at, Some(1681500000));
    }

    #[test]
    fn numeric_timestamp_accepted() {
        let fields = extract_fields(r#"{"photoTakenTime": {"timestamp": 1681564222}}"#).unwrap();
        assert_eq!(fields.captured_at, Some(1681564222));
    }

    #[test]
    fn missing_timestamp_is_none() {
        let fields = extract_fields(r#"{"title": "IMG_0001.jpg"}"#).unwrap();
        assert_eq!(fields.captured_at, None);
    }

    #[test]
    fn description_preferred_over_caption() {
        let fields = extract_fields(r#"{"description": "dawn", "caption": "other"}"#).unwrap();
        assert_eq!(fields.description.as_deref(), Some("dawn"));
    }

    #[test]
    fn empty_description_falls_back_to_caption() {
        let fields = extract_fields(r#"{"description": "", "caption": "fallback"}"#).unwrap();
        assert_eq!(fields.description.as_deref(), Some("fallback"));
    }

    #[test]
    fn people_become_keywords_in_order_with_duplicates() {
        let fields = extract_fields(
            r#"{"people": [{"name": "Alice"}, {"name": "Bob"}, {"name": ""},
                           {"name": "Alice"}, {"notname": "x"}]}"#,
        )
        .unwrap();
        assert_eq!(fields.keywords, vec!["Alice", "Bob", "Alice"]);
    }

    #[test]
    fn geo_exif_preferred_over_geo_data() {
        let fields = extract_fields(
            r#"{"geoDataExif": {"latitude": 52.5, "longitude": 13.4, "altitude": 34.0},
                "geoData": {"latitude": 1.0, "longitude": 2.0}}"#,
        )
        .unwrap();
        assert_eq!(fields.latitude, Some(52.5));
        assert_eq!(fields.longitude, Some(13.4));
        assert_eq!(fields.altitude, Some(34.0));
    }

    #[test]
    fn zero_zero_coordinates_are_rejected_as_sentinel() {
        let fields = extract_fields(
            r#"{"geoData": {"latitude": 0.0, "longitude": 0.0, "altitude": 12.0}}"#,
        )
        .unwrap();
        assert_eq!(fields.latitude, None);
        assert_eq!(fields.longitude, None);
        assert_eq!(fields.altitude, None);
    }

    #[test]
    fn zero_zero_exif_falls_back_to_geo_data() {
        let fields = extract_fields(
            r#"{"geoDataExif": {"latitude": 0, "longitude": 0},
                "geoData": {"latitude": -22.9, "longitude": -43.2}}"#,
        )
        .unwrap();
        assert_eq!(fields.latitude, Some(-22.9));
        assert_eq!(fields.longitude, Some(-43.2));
    }

    #[test]
    fn single_zero_axis_is_a_valid_coordinate() {
        let fields = extract_fields(r#"{"geoData": {"latitude": 0.0, "longitude": 13.4}}"#).unwrap();
        assert_eq!(fields.latitude, Some(0.0));
        assert_eq!(fields.longitude, Some(13.4));
    }

    #[test]
    fn non_numeric_coordinates_are_rejected() {
        let fields =
            extract_fields(r#"{"geoData": {"latitude": "52.5", "longitude": 13.4}}"#).unwrap();
        assert_eq!(fields.latitude, None);
    }

    #[test]
    fn altitude_only_passes_through_when_numeric() {
        let fields = extract_fields(
            r#"{"geoData": {"latitude": 52.5, "longitude": 13.4, "altitude": "high"}}"#,
        )
        .unwrap();
        assert_eq!(fields.latitude, Some(52.5));
        assert_eq!(fields.altitude, None);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            extract_fields("{not json"),
            Err(SidecarError::Parse(_))
        ));
    }

    #[test]
    fn empty_document_yields_empty_fields() {
        let fields = extract_fields("{}").unwrap();
        assert!(fields.is_empty());
        assert_eq!(fields, MetadataFields::default());
    }
}
