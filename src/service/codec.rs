//! Line codec for the prediction protocol
//!
//! Request line: `{"attributes":[v0, v1, ...]}`
//!
//! Reply line (schema version [`WIRE_VERSION`]), fields always in this order:
//! `{"index":<class index>,"dist":[p0, ...],"label":"<class label>"}`
//!
//! Error line: `ERROR: <message>`
//!
//! Lines are returned without their trailing newline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::protocol::ERROR_PREFIX;
pub use crate::constants::protocol::WIRE_VERSION;
use crate::models::{FeatureVector, Prediction};

/// Errors raised while decoding or encoding protocol lines
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed request: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("malformed request: expected a JSON object")]
    NotAnObject,

    #[error("expected {expected} attributes, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("distribution contains a non-finite value at class {index}")]
    NonFinite { index: usize },

    #[error("malformed reply: {0}")]
    MalformedReply(#[source] serde_json::Error),

    #[error("failed to encode reply: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct RequestLine {
    attributes: Vec<f64>,
}

#[derive(Serialize)]
struct ReplyLine<'a> {
    index: usize,
    dist: &'a [f64],
    label: &'a str,
}

#[derive(Deserialize)]
struct OwnedReplyLine {
    index: usize,
    dist: Vec<f64>,
    label: String,
}

/// How decoded attribute arrays are fitted to the model's dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionPolicy {
    /// Zero-pad short arrays, drop trailing extras
    Lenient,
    /// Reject any length other than the expected one
    Strict,
}

impl DimensionPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            DimensionPolicy::Strict
        } else {
            DimensionPolicy::Lenient
        }
    }
}

/// Decode one request line into a feature vector of `expected` attributes
pub fn decode_request(
    line: &str,
    expected: usize,
    policy: DimensionPolicy,
) -> Result<FeatureVector, CodecError> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(CodecError::Malformed)?;
    if !value.is_object() {
        return Err(CodecError::NotAnObject);
    }
    let request: RequestLine = serde_json::from_value(value).map_err(CodecError::Malformed)?;
    let mut values = request.attributes;
    if values.len() != expected {
        if policy == DimensionPolicy::Strict {
            return Err(CodecError::DimensionMismatch {
                expected,
                actual: values.len(),
            });
        }
        values.resize(expected, 0.0);
    }
    Ok(FeatureVector::from_values(values))
}

/// Encode a request line, as a client would send it
pub fn encode_request(attributes: &[f64]) -> Result<String, CodecError> {
    serde_json::to_string(&RequestLine {
        attributes: attributes.to_vec(),
    })
    .map_err(CodecError::Encode)
}

/// Encode one prediction as a reply line
pub fn encode_reply(prediction: &Prediction) -> Result<String, CodecError> {
    // serde_json writes NaN and infinities as `null`, which would break the schema.
    if let Some(index) = prediction.dist.iter().position(|p| !p.is_finite()) {
        return Err(CodecError::NonFinite { index });
    }
    serde_json::to_string(&ReplyLine {
        index: prediction.index,
        dist: &prediction.dist,
        label: &prediction.label,
    })
    .map_err(CodecError::Encode)
}

/// Decode a reply line, as a client would read it
pub fn decode_reply(line: &str) -> Result<Prediction, CodecError> {
    let reply: OwnedReplyLine = serde_json::from_str(line).map_err(CodecError::MalformedReply)?;
    Ok(Prediction {
        index: reply.index,
        dist: reply.dist,
        label: reply.label,
    })
}

/// Format an error line; embedded line breaks are flattened so the error stays one line
pub fn encode_error(message: &str) -> String {
    let flat: String = message
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    format!("{}: {}", ERROR_PREFIX, flat)
}

/// True when a reply line is an error line
pub fn is_error_line(line: &str) -> bool {
    line.strip_prefix(ERROR_PREFIX)
        .map_or(false, |rest| rest.starts_with(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_exact_length() {
        let features = decode_request(r#"{"attributes":[5.1,3.5,1.4,0.2]}"#, 4, DimensionPolicy::Lenient).unwrap();
        assert_eq!(features.as_slice(), &[5.1, 3.5, 1.4, 0.2]);
    }

    #[test]
    fn test_decode_pads_and_truncates_when_lenient() {
        let short = decode_request(r#"{"attributes":[1, 2]}"#, 4, DimensionPolicy::Lenient).unwrap();
        assert_eq!(short.as_slice(), &[1.0, 2.0, 0.0, 0.0]);

        let long = decode_request(r#"{"attributes":[1,2,3,4,5,6]}"#, 4, DimensionPolicy::Lenient).unwrap();
        assert_eq!(long.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_decode_strict_rejects_mismatch() {
        let err = decode_request(r#"{"attributes":[1, 2]}"#, 4, DimensionPolicy::Strict).unwrap_err();
        assert!(matches!(err, CodecError::DimensionMismatch { expected: 4, actual: 2 }));
        assert!(decode_request(r#"{"attributes":[1,2,3,4]}"#, 4, DimensionPolicy::Strict).is_ok());
    }

    #[test]
    fn test_decode_ignores_unknown_keys() {
        let features = decode_request(r#"{"id":7,"attributes":[1]}"#, 1, DimensionPolicy::Lenient).unwrap();
        assert_eq!(features.as_slice(), &[1.0]);
    }

    #[test]
    fn test_decode_rejections() {
        for line in ["[[1,2]]", "3.5", "null"] {
            let err = decode_request(line, 2, DimensionPolicy::Lenient).unwrap_err();
            assert!(matches!(err, CodecError::NotAnObject), "accepted {:?}", line);
        }
        for line in [
            "not json",
            r#"{"attrs":[1,2]}"#,
            r#"{"attributes":"1,2"}"#,
            r#"{"attributes":[1,"2"]}"#,
            r#"{"attributes":[1,null]}"#,
            "",
        ] {
            let err = decode_request(line, 2, DimensionPolicy::Lenient).unwrap_err();
            assert!(matches!(err, CodecError::Malformed(_)), "accepted {:?}", line);
        }
    }

    #[test]
    fn test_reply_field_order_is_fixed() {
        let line = encode_reply(&Prediction {
            index: 0,
            dist: vec![0.98, 0.02, 0.0],
            label: "setosa".into(),
        })
        .unwrap();
        assert_eq!(line, r#"{"index":0,"dist":[0.98,0.02,0.0],"label":"setosa"}"#);
    }

    #[test]
    fn test_reply_round_trip() {
        let prediction = Prediction {
            index: 2,
            dist: vec![0.1, 0.2, 0.7],
            label: "virginica \"v\"".into(),
        };
        let decoded = decode_reply(&encode_reply(&prediction).unwrap()).unwrap();
        assert_eq!(decoded, prediction);
    }

    #[test]
    fn test_request_round_trip() {
        let attributes = [5.1, -3.5, 0.0, 1e-9];
        let line = encode_request(&attributes).unwrap();
        let decoded = decode_request(&line, attributes.len(), DimensionPolicy::Strict).unwrap();
        assert_eq!(decoded.as_slice(), &attributes);
    }

    #[test]
    fn test_reply_rejects_non_finite() {
        let err = encode_reply(&Prediction {
            index: 0,
            dist: vec![0.5, f64::NAN],
            label: "a".into(),
        })
        .unwrap_err();
        assert!(matches!(err, CodecError::NonFinite { index: 1 }));
    }

    #[test]
    fn test_error_line_is_single_line() {
        let line = encode_error("bad\nthing\r\nhere");
        assert_eq!(line, "ERROR: bad thing  here");
        assert!(is_error_line(&line));
        assert!(!is_error_line(r#"{"index":0}"#));
        assert!(!is_error_line("ERRORS everywhere"));
    }
}
