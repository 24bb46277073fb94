//! Flickr search response decoding.
//!
//! The service is loose about types (`page` is sometimes a string, sizes
//! are numeric strings), so decoding walks a `serde_json::Value` instead of
//! deriving a strict schema. Bad photo records are dropped one by one.

use serde_json::Value;
use tracing::trace;

use crate::domain::entities::{PageResult, Photo};
use crate::domain::errors::ParseError;

const PHOTOS_KEY: &str = "photos";
const PHOTO_LIST_KEY: &str = "photo";
const URL_KEY: &str = "url_s";
const WIDTH_KEY: &str = "width_s";
const HEIGHT_KEY: &str = "height_s";

/// Decodes raw response bytes into a page of photos.
///
/// # Errors
/// Returns `ParseError::InvalidJson` if the body is not JSON, otherwise
/// whatever [`parse_search_response`] reports.
pub fn parse_search_bytes(body: &[u8]) -> Result<PageResult, ParseError> {
    let raw: Value =
        serde_json::from_slice(body).map_err(|e| ParseError::invalid_json(e.to_string()))?;
    parse_search_response(&raw)
}

/// Decodes a parsed search response into a page of photos.
///
/// # Errors
/// Returns `ParseError::Service` for a `stat: fail` envelope and
/// `ParseError::MalformedEnvelope` when the `photos` object is missing.
pub fn parse_search_response(raw: &Value) -> Result<PageResult, ParseError> {
    if let Some(err) = service_error(raw) {
        return Err(err);
    }

    let photos = raw
        .get(PHOTOS_KEY)
        .and_then(Value::as_object)
        .ok_or(ParseError::MalformedEnvelope)?;

    let page = photos.get("page").map_or(0, as_page_number);
    let total_pages = photos.get("pages").map_or(0, as_page_number);

    let records = photos
        .get(PHOTO_LIST_KEY)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let parsed: Vec<Photo> = records.iter().filter_map(parse_photo).collect();

    if parsed.len() < records.len() {
        trace!(
            dropped = records.len() - parsed.len(),
            kept = parsed.len(),
            "Dropped invalid photo records"
        );
    }

    Ok(PageResult::new(page, total_pages, parsed))
}

fn service_error(raw: &Value) -> Option<ParseError> {
    if raw.get("stat").and_then(Value::as_str) != Some("fail") {
        return None;
    }
    Some(ParseError::Service {
        code: raw.get("code").and_then(Value::as_i64).unwrap_or(0),
        message: raw
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
    })
}

fn parse_photo(record: &Value) -> Option<Photo> {
    let url = record.get(URL_KEY)?.as_str()?;
    let width = as_dimension(record.get(WIDTH_KEY)?)?;
    let height = as_dimension(record.get(HEIGHT_KEY)?)?;
    Some(Photo::new(url, width, height))
}

fn as_dimension(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

fn as_page_number(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
