use crate::{
    pagination::offset::Offset,
    records::row::{ParameterRow, Record},
};

/// Consecutive records grouped for one write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based sequence number of this chunk within the run.
    pub seq: usize,
    pub records: Vec<Record>,
}

impl Chunk {
    pub fn new(seq: usize, records: Vec<Record>) -> Self {
        Chunk { seq, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Offset of the first record, i.e. where a restart would begin if this
    /// chunk never commits.
    pub fn start(&self) -> Option<Offset> {
        self.records.first().map(|r| r.offset)
    }
}

/// Bound rows of one chunk, submitted to the store as a single list parameter.
#[derive(Debug, Clone)]
pub struct WriteBatch {
    pub seq: usize,
    pub rows: Vec<ParameterRow>,
}

impl WriteBatch {
    pub fn new(seq: usize, rows: Vec<ParameterRow>) -> Self {
        WriteBatch { seq, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_row(&self) -> Option<&ParameterRow> {
        self.rows.last()
    }
}
