use crate::pagination::offset::Offset;
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::{collections::HashSet, fmt, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Header line has no fields")]
    Empty,

    #[error("Duplicate header field: {0}")]
    DuplicateField(String),
}

/// Ordered field names taken from the first line of a source.
///
/// The header fixes the arity every data record must match. It is shared
/// between the source, the binder and every parameter row, hence the `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    fields: Arc<[String]>,
}

impl Header {
    pub fn new(fields: Vec<String>) -> Result<Self, HeaderError> {
        if fields.is_empty() {
            return Err(HeaderError::Empty);
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(HeaderError::DuplicateField(field.clone()));
            }
        }

        Ok(Header {
            fields: fields.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

/// A single data line, split into fields and tagged with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Zero-based position among the data records of the source (header excluded).
    pub offset: Offset,
    fields: Vec<String>,
}

impl Record {
    pub fn new(offset: Offset, fields: Vec<String>) -> Self {
        Record { offset, fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.fields.join(", "))
    }
}

/// One record's values keyed by the header's field names, in header order.
///
/// Serializes as a JSON object so a batch of rows can travel as a single
/// list parameter of a write query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRow {
    pub offset: Offset,
    header: Header,
    values: Vec<String>,
}

impl ParameterRow {
    /// Callers must guarantee `values.len() == header.len()`; the binder is
    /// the only place that constructs rows.
    pub fn new(offset: Offset, header: Header, values: Vec<String>) -> Self {
        debug_assert_eq!(header.len(), values.len());
        ParameterRow {
            offset,
            header,
            values,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.header
            .iter()
            .position(|field| field == name)
            .map(|idx| self.values[idx].as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .iter()
            .zip(self.values.iter().map(String::as_str))
    }
}

impl Serialize for ParameterRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl fmt::Display for ParameterRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("}")
    }
}
