use std::fmt;

use serde_json::Value;

use super::error::EndpointError;

/// One step of a response path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(idx) => write!(f, "{}", idx),
        }
    }
}

/// A parsed dot/bracket expression such as `choices[0].message.content`.
///
/// `choices[0].message.content` and `choices.0.message.content` parse to the
/// same segments. Any token made only of ASCII digits is an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl ResponsePath {
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        let segments = tokenize(raw)?;
        if segments.is_empty() {
            return Err(EndpointError::ExtractionPath(
                "Response path is empty".to_string(),
            ));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Walk `value` and return the non-empty string found at the end of the path.
    pub fn extract(&self, value: &Value) -> Result<String, EndpointError> {
        let mut current = value;
        for segment in &self.segments {
            current = step(current, segment)?;
        }

        match current {
            Value::String(text) if !text.is_empty() => Ok(text.clone()),
            other => Err(EndpointError::TypeMismatch {
                path: self.raw.clone(),
                found: json_type_name(other),
            }),
        }
    }
}

/// Parse `path` and extract the text it points at in one go.
pub fn extract(value: &Value, path: &str) -> Result<String, EndpointError> {
    ResponsePath::parse(path)?.extract(value)
}

fn tokenize(raw: &str) -> Result<Vec<PathSegment>, EndpointError> {
    raw.split(['.', '[', ']'])
        .filter(|token| !token.is_empty())
        .map(|token| {
            if token.bytes().all(|b| b.is_ascii_digit()) {
                token.parse::<usize>().map(PathSegment::Index).map_err(|_| {
                    EndpointError::ExtractionPath(format!(
                        "Array index \"{}\" is too large",
                        token
                    ))
                })
            } else {
                Ok(PathSegment::Key(token.to_string()))
            }
        })
        .collect()
}

fn step<'a>(current: &'a Value, segment: &PathSegment) -> Result<&'a Value, EndpointError> {
    match (segment, current) {
        (_, Value::Null) => Err(stopped_at(segment, "value is null")),
        (PathSegment::Key(key), Value::Object(map)) => map
            .get(key)
            .ok_or_else(|| stopped_at(segment, "key not found")),
        (PathSegment::Index(idx), Value::Array(items)) => items.get(*idx).ok_or_else(|| {
            stopped_at(
                segment,
                &format!("index out of bounds for array of length {}", items.len()),
            )
        }),
        (PathSegment::Key(_), other) => Err(stopped_at(
            segment,
            &format!("expected an object, found {}", json_type_name(other)),
        )),
        (PathSegment::Index(_), other) => Err(stopped_at(
            segment,
            &format!("expected an array, found {}", json_type_name(other)),
        )),
    }
}

fn stopped_at(segment: &PathSegment, reason: &str) -> EndpointError {
    EndpointError::ExtractionPath(format!(
        "Could not extract text: path stopped at \"{}\" ({})",
        segment, reason
    ))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(s) if s.is_empty() => "empty string",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
