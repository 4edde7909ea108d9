#![forbid(unsafe_code)]

use serde::{Deserialize, Deserializer, Serialize};

/// One line of the settlement event log (the `event_log` route).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLogLine {
    /// Lantern year the line belongs to. The server sends numbers or numeric
    /// strings; a missing or non-numeric value never matches a year query.
    #[serde(
        default,
        deserialize_with = "lenient_year",
        skip_serializing_if = "Option::is_none"
    )]
    pub ly: Option<i64>,
    #[serde(default)]
    pub event: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireYear {
    Null,
    Int(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

fn integral(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
}

/// Numeric coercion of the browser's `Number(ly)`: `null`, `""` and `false`
/// are year 0, `"3.0"` is year 3. A missing field stays `None`.
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match WireYear::deserialize(deserializer)? {
        WireYear::Null => Some(0),
        WireYear::Int(v) => Some(v),
        WireYear::Float(v) => integral(v),
        WireYear::Flag(v) => Some(i64::from(v)),
        WireYear::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0)
            } else {
                trimmed.parse::<f64>().ok().and_then(integral)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_event_log_01_year_accepts_numbers_and_numeric_strings() {
        let lines: Vec<EventLogLine> = serde_json::from_value(serde_json::json!([
            {"ly": 3, "event": "a"},
            {"ly": "3", "event": "b"},
            {"ly": 3.0, "event": "c"},
            {"ly": "three", "event": "d"},
            {"event": "e"},
            {"ly": null, "event": "f"},
            {"ly": "3.0", "event": "g"},
            {"ly": " 4 ", "event": "h"},
            {"ly": "2.5", "event": "i"},
            {"ly": "", "event": "j"}
        ]))
        .unwrap();
        let years: Vec<Option<i64>> = lines.iter().map(|l| l.ly).collect();
        assert_eq!(
            years,
            vec![
                Some(3),
                Some(3),
                Some(3),
                None,
                None,
                Some(0),
                Some(3),
                Some(4),
                None,
                Some(0)
            ]
        );
    }

    #[test]
    fn at_event_log_02_unknown_fields_are_kept() {
        let line: EventLogLine = serde_json::from_value(serde_json::json!({
            "ly": 1, "event": "x", "created_by": "someone@example.com"
        }))
        .unwrap();
        assert_eq!(
            line.extra.get("created_by").and_then(|v| v.as_str()),
            Some("someone@example.com")
        );
    }
}
