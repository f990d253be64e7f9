//! Line-protocol metric serialization.
//!
//! Canonical records serialize to `series[,tag=val...] field=val[,...]`:
//! string values escape embedded spaces, integers carry a trailing `i`,
//! booleans render bare, floats render as-is. Absent tags and fields are
//! skipped entirely - a present-but-null value is never emitted. Insertion
//! order of tags and fields is preserved.
//!
//! [`parse_line`] is the inverse, used for validating round-trip fidelity
//! rather than for production data flow.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// A typed field value in a metric line.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Integer, serialized with a trailing `i`.
    Integer(i64),
    /// Float, serialized as-is.
    Float(f64),
    /// Boolean, serialized bare.
    Bool(bool),
    /// String, serialized quoted with spaces escaped.
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}i"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "\"{}\"", escape_spaces(v)),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

fn escape_spaces(s: &str) -> String {
    s.replace(' ', "\\ ")
}

/// Insertion-ordered builder for one metric line.
///
/// `tag_opt`/`field_opt` skip absent values entirely, preserving the
/// canonical-record rule that "source did not report this" never serializes.
#[derive(Debug, Clone)]
pub struct LineBuilder {
    series: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
}

impl LineBuilder {
    /// Start a line for the named series.
    pub fn new(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Add a tag.
    pub fn tag(mut self, key: &str, value: impl ToString) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a tag when the value is present; skip it entirely otherwise.
    pub fn tag_opt<T: ToString>(self, key: &str, value: Option<&T>) -> Self {
        match value {
            Some(value) => self.tag(key, value.to_string()),
            None => self,
        }
    }

    /// Add a field.
    pub fn field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    /// Add a field when the value is present; skip it entirely otherwise.
    pub fn field_opt<T: Into<FieldValue> + Clone>(self, key: &str, value: Option<&T>) -> Self {
        match value {
            Some(value) => self.field(key, value.clone()),
            None => self,
        }
    }

    /// Render the line.
    ///
    /// With zero fields the field section is omitted entirely; such a line
    /// is not valid line protocol, so callers skip records that have
    /// nothing to report rather than emitting them.
    pub fn build(self) -> String {
        let mut line = self.series;
        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(key);
            line.push('=');
            line.push_str(&escape_spaces(value));
        }
        if self.fields.is_empty() {
            return line;
        }
        line.push(' ');
        let fields = self
            .fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        line.push_str(&fields);
        line
    }
}

/// A metric line parsed back into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    /// Series name.
    pub measurement: String,
    /// Tag set, in map form.
    pub tags: BTreeMap<String, String>,
    /// Field set, in map form.
    pub fields: BTreeMap<String, FieldValue>,
    /// Trailing timestamp, when present.
    pub timestamp: Option<i64>,
}

/// Malformed line-protocol input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineParseError {
    #[error("empty line")]
    Empty,

    #[error("no field section in line")]
    MissingFields,

    #[error("malformed tag '{0}'")]
    MalformedTag(String),

    #[error("malformed field '{0}'")]
    MalformedField(String),

    #[error("malformed timestamp '{0}'")]
    MalformedTimestamp(String),
}

/// Split on `separator`, honoring backslash escapes.
fn split_unescaped(s: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Like [`split_unescaped`] but keeps escapes intact for later handling and
/// never splits inside double quotes.
fn split_sections(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    let mut quoted = false;
    for c in s.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == '"' {
            quoted = !quoted;
            current.push(c);
        } else if c == ' ' && !quoted {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

fn parse_field_value(raw: &str) -> Option<FieldValue> {
    if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Some(FieldValue::Text(inner.replace("\\ ", " ")));
    }
    match raw {
        "true" => return Some(FieldValue::Bool(true)),
        "false" => return Some(FieldValue::Bool(false)),
        _ => {}
    }
    if let Some(digits) = raw.strip_suffix('i') {
        return digits.parse::<i64>().ok().map(FieldValue::Integer);
    }
    raw.parse::<f64>().ok().map(FieldValue::Float)
}

/// Parse a line-protocol string back into `{measurement, tags, fields,
/// timestamp}`.
///
/// # Errors
/// [`LineParseError`] naming the malformed piece.
pub fn parse_line(line: &str) -> Result<ParsedLine, LineParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(LineParseError::Empty);
    }

    let sections = split_sections(line);
    if sections.len() < 2 {
        return Err(LineParseError::MissingFields);
    }

    // Section 0: measurement plus comma-joined tags.
    let head = split_unescaped(&sections[0], ',');
    let measurement = head[0].clone();
    let mut tags = BTreeMap::new();
    for pair in &head[1..] {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| LineParseError::MalformedTag(pair.clone()))?;
        tags.insert(key.to_string(), value.to_string());
    }

    // Section 1: comma-joined fields.
    let mut fields = BTreeMap::new();
    for pair in split_sections_fields(&sections[1]) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| LineParseError::MalformedField(pair.clone()))?;
        let value =
            parse_field_value(value).ok_or_else(|| LineParseError::MalformedField(pair.clone()))?;
        fields.insert(key.to_string(), value);
    }
    if fields.is_empty() {
        return Err(LineParseError::MissingFields);
    }

    // Optional trailing timestamp.
    let timestamp = match sections.get(2) {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| LineParseError::MalformedTimestamp(raw.clone()))?,
        ),
        None => None,
    };

    Ok(ParsedLine {
        measurement,
        tags,
        fields,
        timestamp,
    })
}

/// Split the field section on commas, never inside quotes, keeping escapes.
fn split_sections_fields(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    let mut quoted = false;
    for c in s.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == '"' {
            quoted = !quoted;
            current.push(c);
        } else if c == ',' && !quoted {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}
