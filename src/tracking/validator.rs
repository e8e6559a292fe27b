use crate::db::NewClick;
use serde::{Deserialize, Deserializer, de};
use serde_json::Value;
use std::fmt;

/// Click payload as posted by a page. Every field is optional so that a
/// missing field is reported by [`validate`] rather than by the decoder.
///
/// Numeric fields accept JSON integers, whole-number floats (`10.0`) and
/// integer strings (`"10"`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackPayload {
    #[serde(default, deserialize_with = "lenient_integer")]
    pub x: Option<i64>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub y: Option<i64>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub viewport_w: Option<i64>,
    #[serde(default, deserialize_with = "lenient_integer")]
    pub viewport_h: Option<i64>,
    pub url: Option<String>,
}

fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                    .map(|float| float as i64)
            })
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected an integer, got {number}"))),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected an integer, got \"{text}\""))),
        other => Err(de::Error::custom(format!("expected an integer, got {other}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Missing(&'static str),
    Negative { field: &'static str, value: i64 },
    NotPositive { field: &'static str, value: i64 },
    EmptyUrl,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(field) => write!(f, "{field} is required"),
            Self::Negative { field, value } => {
                write!(f, "{field} must be greater than or equal to 0 (got {value})")
            }
            Self::NotPositive { field, value } => {
                write!(f, "{field} must be greater than 0 (got {value})")
            }
            Self::EmptyUrl => write!(f, "url must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub fn validate(payload: TrackPayload) -> Result<NewClick, ValidationError> {
    let x = non_negative("x", payload.x)?;
    let y = non_negative("y", payload.y)?;
    let viewport_w = positive("viewport_w", payload.viewport_w)?;
    let viewport_h = positive("viewport_h", payload.viewport_h)?;

    let url = payload.url.ok_or(ValidationError::Missing("url"))?;
    if url.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    Ok(NewClick {
        x,
        y,
        viewport_w,
        viewport_h,
        url,
    })
}

fn non_negative(field: &'static str, value: Option<i64>) -> Result<i64, ValidationError> {
    let value = value.ok_or(ValidationError::Missing(field))?;
    (value >= 0)
        .then_some(value)
        .ok_or(ValidationError::Negative { field, value })
}

fn positive(field: &'static str, value: Option<i64>) -> Result<i64, ValidationError> {
    let value = value.ok_or(ValidationError::Missing(field))?;
    (value > 0)
        .then_some(value)
        .ok_or(ValidationError::NotPositive { field, value })
}

#[cfg(test)]
mod tests {
    use super::{TrackPayload, ValidationError, validate};
    use serde_json::json;

    fn payload() -> TrackPayload {
        TrackPayload {
            x: Some(10),
            y: Some(20),
            viewport_w: Some(1920),
            viewport_h: Some(1080),
            url: Some("/home".to_string()),
        }
    }

    #[test]
    fn accepts_valid_payload() {
        let click = validate(payload()).expect("valid payload");
        assert_eq!((click.x, click.y), (10, 20));
        assert_eq!((click.viewport_w, click.viewport_h), (1920, 1080));
        assert_eq!(click.url, "/home");
    }

    #[test]
    fn zero_coordinates_are_allowed() {
        let click = validate(TrackPayload {
            x: Some(0),
            y: Some(0),
            ..payload()
        })
        .expect("origin click");
        assert_eq!((click.x, click.y), (0, 0));
    }

    #[test]
    fn rejects_negative_coordinate() {
        let error = validate(TrackPayload {
            x: Some(-1),
            ..payload()
        })
        .unwrap_err();
        assert_eq!(
            error,
            ValidationError::Negative {
                field: "x",
                value: -1
            }
        );
    }

    #[test]
    fn rejects_zero_viewport() {
        let error = validate(TrackPayload {
            viewport_w: Some(0),
            ..payload()
        })
        .unwrap_err();
        assert_eq!(
            error,
            ValidationError::NotPositive {
                field: "viewport_w",
                value: 0
            }
        );
        assert_eq!(error.to_string(), "viewport_w must be greater than 0 (got 0)");
    }

    #[test]
    fn rejects_missing_and_empty_url() {
        let missing = validate(TrackPayload {
            url: None,
            ..payload()
        })
        .unwrap_err();
        assert_eq!(missing, ValidationError::Missing("url"));

        let empty = validate(TrackPayload {
            url: Some(String::new()),
            ..payload()
        })
        .unwrap_err();
        assert_eq!(empty, ValidationError::EmptyUrl);
    }

    #[test]
    fn reports_missing_numeric_field() {
        let error = validate(TrackPayload {
            viewport_h: None,
            ..payload()
        })
        .unwrap_err();
        assert_eq!(error.to_string(), "viewport_h is required");
    }

    #[test]
    fn numeric_strings_and_whole_floats_decode_as_integers() {
        let payload: TrackPayload = serde_json::from_value(json!({
            "x": "10",
            "y": 20.0,
            "viewport_w": " 1920 ",
            "viewport_h": 1080,
            "url": "/home"
        }))
        .expect("lenient payload");

        let click = validate(payload).expect("valid payload");
        assert_eq!((click.x, click.y), (10, 20));
        assert_eq!((click.viewport_w, click.viewport_h), (1920, 1080));
    }

    #[test]
    fn fractional_and_non_numeric_values_fail_to_decode() {
        for value in [json!(1.5), json!("1.5"), json!("ten"), json!(true), json!([1])] {
            let decoded = serde_json::from_value::<TrackPayload>(json!({
                "x": value.clone(),
                "y": 0,
                "viewport_w": 10,
                "viewport_h": 10,
                "url": "/home"
            }));
            assert!(decoded.is_err(), "value: {value}");
        }
    }

    #[test]
    fn null_counts_as_missing() {
        let payload: TrackPayload = serde_json::from_value(json!({
            "x": null,
            "y": 0,
            "viewport_w": 10,
            "viewport_h": 10,
            "url": "/home"
        }))
        .expect("decodes");

        assert_eq!(validate(payload).unwrap_err(), ValidationError::Missing("x"));
    }
}
