use model::{pagination::offset::Offset, records::row::ParameterRow};
use serde::Serialize;
use std::fmt;
use tracing::error;

/// Where to restart a failed load.
///
/// `offset` counts data records from the first one after the header and is
/// what the next run takes as its start offset. `line_index` is the same
/// position counted in file lines, header included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumePoint {
    pub offset: Offset,
    pub line_index: u64,
    pub failed_chunk: Option<usize>,
    pub last_committed: Option<String>,
    pub last_attempted: Option<String>,
    /// The failed chunk's commit was sent but never confirmed.
    pub commit_unconfirmed: bool,
}

impl fmt::Display for ResumePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Set start offset to {} (start_at line {}) to resume",
            self.offset, self.line_index
        )?;
        if let Some(row) = &self.last_committed {
            write!(f, "; last committed row: {row}")?;
        }
        if let Some(row) = &self.last_attempted {
            write!(f, "; last row attempted: {row}")?;
        }
        if self.commit_unconfirmed {
            let chunk = self
                .failed_chunk
                .map_or_else(|| "the failed chunk".to_string(), |seq| format!("chunk {seq}"));
            write!(
                f,
                "; commit of {chunk} was not confirmed, check whether its last row \
                 is in the graph and if so resume after that chunk instead"
            )?;
        }
        Ok(())
    }
}

/// Tracks the commit point of a load.
///
/// Only chunks whose transaction committed move the offset forward; a failed
/// chunk contributes nothing.
#[derive(Debug, Clone)]
pub struct ResumeReporter {
    start: Offset,
    committed: u64,
    last_committed: Option<ParameterRow>,
}

impl ResumeReporter {
    pub fn new(start: Offset) -> Self {
        Self {
            start,
            committed: 0,
            last_committed: None,
        }
    }

    pub fn record_commit(&mut self, rows: usize, last_row: Option<&ParameterRow>) {
        self.committed += rows as u64;
        if let Some(row) = last_row {
            self.last_committed = Some(row.clone());
        }
    }

    pub fn committed_rows(&self) -> u64 {
        self.committed
    }

    pub fn committed_offset(&self) -> Offset {
        self.start + self.committed
    }

    /// Builds the resume guidance for a failure and logs it.
    pub fn report(&self, failed_chunk: Option<usize>, last_attempted: Option<String>) -> ResumePoint {
        self.build(failed_chunk, last_attempted, false)
    }

    /// Like [`ResumeReporter::report`], for a chunk whose commit was sent but
    /// never confirmed. The offset still excludes that chunk.
    pub fn report_unconfirmed(
        &self,
        failed_chunk: Option<usize>,
        last_attempted: Option<String>,
    ) -> ResumePoint {
        self.build(failed_chunk, last_attempted, true)
    }

    fn build(
        &self,
        failed_chunk: Option<usize>,
        last_attempted: Option<String>,
        commit_unconfirmed: bool,
    ) -> ResumePoint {
        let offset = self.committed_offset();
        let point = ResumePoint {
            offset,
            line_index: offset.line_index(),
            failed_chunk,
            last_committed: self.last_committed.as_ref().map(ToString::to_string),
            last_attempted,
            commit_unconfirmed,
        };

        error!(
            resume_offset = %point.offset,
            resume_line = point.line_index,
            failed_chunk = ?point.failed_chunk,
            commit_unconfirmed,
            last_committed = point.last_committed.as_deref().unwrap_or("-"),
            last_attempted = point.last_attempted.as_deref().unwrap_or("-"),
            "Load stopped; restart from the reported offset"
        );
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::records::row::Header;

    fn row(offset: u64, id: &str) -> ParameterRow {
        let header = Header::new(vec!["id".to_string()]).unwrap();
        ParameterRow::new(Offset::new(offset), header, vec![id.to_string()])
    }

    #[test]
    fn failed_chunk_contributes_nothing() {
        let mut reporter = ResumeReporter::new(Offset::ZERO);
        reporter.record_commit(1000, Some(&row(999, "999")));
        reporter.record_commit(1000, Some(&row(1999, "1999")));

        let point = reporter.report(Some(3), Some("{id=2999}".to_string()));

        assert_eq!(point.offset, Offset::new(2000));
        assert_eq!(point.line_index, 2001);
        assert_eq!(point.failed_chunk, Some(3));
        assert_eq!(point.last_committed.as_deref(), Some("{id=1999}"));
    }

    #[test]
    fn offset_builds_on_the_start_offset() {
        let mut reporter = ResumeReporter::new(Offset::new(500));
        reporter.record_commit(250, None);
        assert_eq!(reporter.committed_offset(), Offset::new(750));
        assert_eq!(reporter.committed_rows(), 250);
    }

    #[test]
    fn failure_before_any_commit_resumes_at_start() {
        let reporter = ResumeReporter::new(Offset::new(40));
        let point = reporter.report(Some(1), None);
        assert_eq!(point.offset, Offset::new(40));
        assert_eq!(point.last_committed, None);
    }

    #[test]
    fn message_names_offset_and_rows() {
        let point = ResumePoint {
            offset: Offset::new(2000),
            line_index: 2001,
            failed_chunk: Some(3),
            last_committed: Some("{id=1999}".to_string()),
            last_attempted: Some("{id=2999}".to_string()),
            commit_unconfirmed: false,
        };
        assert_eq!(
            point.to_string(),
            "Set start offset to 2000 (start_at line 2001) to resume; \
             last committed row: {id=1999}; last row attempted: {id=2999}"
        );
    }

    #[test]
    fn unconfirmed_commit_is_flagged_in_the_message() {
        let mut reporter = ResumeReporter::new(Offset::ZERO);
        reporter.record_commit(1000, Some(&row(999, "999")));

        let point = reporter.report_unconfirmed(Some(2), Some("{id=1999}".to_string()));

        assert_eq!(point.offset, Offset::new(1000));
        assert!(point.commit_unconfirmed);
        assert!(point.to_string().ends_with(
            "commit of chunk 2 was not confirmed, check whether its last row \
             is in the graph and if so resume after that chunk instead"
        ));
    }
}
