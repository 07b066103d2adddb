use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Saved result for one analysis item of a report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportItemResult {
    #[serde(default, deserialize_with = "lenient_text")]
    pub item_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub specification: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub result: String,
}

impl ReportItemResult {
    pub fn new(
        item_name: impl Into<String>,
        specification: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            item_name: item_name.into(),
            specification: specification.into(),
            result: result.into(),
        }
    }
}

/// The caller-supplied, mutable part of a report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_code: String,
    #[serde(default = "epoch_date_string")]
    pub analysis_date: String,
    #[serde(default)]
    pub analyst_name: String,
    #[serde(default)]
    pub analysis_items: Vec<ReportItemResult>,
}

/// A persisted analysis report.
///
/// `id` and `created_at` are owned by the store. Fields this version does not
/// know about are kept in `extra` so an update never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_code: String,
    #[serde(default = "epoch_date_string", deserialize_with = "lenient_text")]
    pub analysis_date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub analyst_name: String,
    #[serde(default)]
    pub analysis_items: Vec<ReportItemResult>,
    #[serde(with = "timestamp", default = "epoch_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp", default = "epoch_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Report {
    /// Materialize a new record from a payload.
    #[must_use]
    pub fn from_input(id: String, input: &ReportInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            product_name: input.product_name.clone(),
            product_code: input.product_code.clone(),
            analysis_date: input.analysis_date.clone(),
            analyst_name: input.analyst_name.clone(),
            analysis_items: input.analysis_items.clone(),
            created_at: now,
            updated_at: now,
            extra: BTreeMap::new(),
        }
    }

    /// Replace every mutable field from `input`. `id`, `created_at` and
    /// unknown fields are untouched.
    pub fn apply(&mut self, input: &ReportInput, updated_at: DateTime<Utc>) {
        self.product_name.clone_from(&input.product_name);
        self.product_code.clone_from(&input.product_code);
        self.analysis_date.clone_from(&input.analysis_date);
        self.analyst_name.clone_from(&input.analyst_name);
        self.analysis_items.clone_from(&input.analysis_items);
        self.updated_at = updated_at;
    }

    /// Sort key for listings. Malformed dates collapse to the epoch.
    #[must_use]
    pub fn date_sort_key(&self) -> NaiveDateTime {
        parse_analysis_date(&self.analysis_date).unwrap_or_else(|| DateTime::UNIX_EPOCH.naive_utc())
    }
}

/// Parse an `analysisDate` value: a plain `YYYY-MM-DD` date or an ISO-8601
/// date-time (with or without offset).
#[must_use]
pub fn parse_analysis_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    raw.parse::<NaiveDateTime>().ok()
}

/// Order reports newest analysis date first. Stable for equal dates.
pub fn sort_newest_first(reports: &mut [Report]) {
    reports.sort_by_key(|r| std::cmp::Reverse(r.date_sort_key()));
}

fn epoch_date_string() -> String {
    "1970-01-01".to_string()
}

const fn epoch_timestamp() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// Text fields written by other clients are not always strings. Scalars keep
/// their JSON text; `null`, arrays and objects read as empty.
fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}

/// RFC 3339 on write; RFC 3339 or naive ISO-8601 (read as UTC) on read.
/// Anything else reads as the epoch.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = Value::deserialize(d)?;
        Ok(raw
            .as_str()
            .and_then(parse)
            .unwrap_or(DateTime::UNIX_EPOCH))
    }

    /// Parse a stored timestamp string.
    #[must_use]
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
    }
}
