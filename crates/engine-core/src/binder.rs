use crate::error::BindError;
use model::records::{
    batch::{Chunk, WriteBatch},
    row::{Header, ParameterRow, Record},
};

/// Maps records onto the header, field by field and position by position.
///
/// Values stay as raw strings; any typing happens inside the write query.
#[derive(Debug, Clone)]
pub struct ParameterBinder {
    header: Header,
}

impl ParameterBinder {
    pub fn new(header: Header) -> Self {
        ParameterBinder { header }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn bind(&self, record: Record) -> Result<ParameterRow, BindError> {
        if record.len() != self.header.len() {
            return Err(BindError::FieldCountMismatch {
                offset: record.offset,
                expected: self.header.len(),
                found: record.len(),
                record: record.to_string(),
            });
        }

        let offset = record.offset;
        Ok(ParameterRow::new(
            offset,
            self.header.clone(),
            record.into_fields(),
        ))
    }

    /// Binds a whole chunk, failing on the first record that does not fit.
    pub fn bind_chunk(&self, chunk: Chunk) -> Result<WriteBatch, BindError> {
        let rows = chunk
            .records
            .into_iter()
            .map(|record| self.bind(record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WriteBatch::new(chunk.seq, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::pagination::offset::Offset;

    fn binder() -> ParameterBinder {
        let header = Header::new(vec!["id".into(), "name".into(), "email".into()]).unwrap();
        ParameterBinder::new(header)
    }

    fn record(offset: u64, fields: &[&str]) -> Record {
        Record::new(
            Offset::new(offset),
            fields.iter().map(|f| f.to_string()).collect(),
        )
    }

    #[test]
    fn binds_every_header_field() {
        let row = binder()
            .bind(record(4, &["42", "Ada", "ada@example.com"]))
            .unwrap();

        assert_eq!(row.offset, Offset::new(4));
        assert_eq!(row.get("id"), Some("42"));
        assert_eq!(row.get("name"), Some("Ada"));
        assert_eq!(row.get("email"), Some("ada@example.com"));
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn empty_fields_bind_as_empty_strings() {
        let row = binder().bind(record(0, &["1", "", ""])).unwrap();
        assert_eq!(row.get("name"), Some(""));
    }

    #[test]
    fn short_record_is_rejected() {
        let err = binder().bind(record(7, &["1", "Ada"])).unwrap_err();
        assert_eq!(
            err,
            BindError::FieldCountMismatch {
                offset: Offset::new(7),
                expected: 3,
                found: 2,
                record: "[1, Ada]".to_string(),
            }
        );
    }

    #[test]
    fn chunk_binding_keeps_sequence_and_order() {
        let chunk = Chunk::new(
            2,
            vec![record(3, &["1", "a", "x"]), record(4, &["2", "b", "y"])],
        );
        let batch = binder().bind_chunk(chunk).unwrap();

        assert_eq!(batch.seq, 2);
        assert_eq!(batch.last_row().and_then(|r| r.get("id")), Some("2"));
    }

    #[test]
    fn chunk_binding_stops_at_first_bad_record() {
        let chunk = Chunk::new(1, vec![record(0, &["1", "a", "x"]), record(1, &["2"])]);
        let err = binder().bind_chunk(chunk).unwrap_err();
        assert!(matches!(err, BindError::FieldCountMismatch { found: 1, .. }));
    }
}
