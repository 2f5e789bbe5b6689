use crate::file::delimited::{error::FileError, format::FileFormat};
use model::{
    pagination::offset::Offset,
    records::row::{Header, Record},
};
use std::{
    fs::File,
    io::{BufRead, BufReader, Lines, Read},
    path::Path,
};
use tracing::{debug, info, trace, warn};

const UTF8_BOM: char = '\u{feff}';

/// Ordered, skippable stream of records read from a delimited input.
///
/// The first line is always consumed as the [`Header`]. Every following
/// physical line is one record, blank lines included, so a record's offset
/// plus one is always its line number. The next `start` data records are
/// read and discarded the first time the stream is polled; everything after
/// that is yielded in file order. Re-opening the same (byte-identical) input
/// with a larger `start` reproduces exactly the remaining suffix.
pub struct RecordSource<R: Read> {
    format: FileFormat,
    header: Header,
    lines: Lines<BufReader<R>>,
    start: Offset,
    /// Offset of the next record the underlying reader will produce.
    position: Offset,
    skipped: u64,
    exhausted: bool,
}

impl RecordSource<File> {
    pub fn open(path: &Path, format: FileFormat, start: Offset) -> Result<Self, FileError> {
        let file = File::open(path).map_err(|source| FileError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), %format, %start, "Opened record source");
        Self::from_reader(file, format, start)
    }
}

impl<R: Read> RecordSource<R> {
    pub fn from_reader(reader: R, format: FileFormat, start: Offset) -> Result<Self, FileError> {
        let mut lines = BufReader::new(reader).lines();

        let header = match lines.next() {
            Some(Ok(line)) => {
                let line = line.trim_start_matches(UTF8_BOM);
                let fields = format
                    .split_line(line)
                    .map_err(|source| FileError::Parse { line: 0, source })?;
                Header::new(fields)?
            }
            Some(Err(source)) => return Err(FileError::Read { line: 0, source }),
            None => return Err(FileError::MissingHeader),
        };

        debug!(fields = ?header.fields(), "Read header");

        Ok(RecordSource {
            format,
            header,
            lines,
            start,
            position: Offset::ZERO,
            skipped: 0,
            exhausted: false,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn start(&self) -> Offset {
        self.start
    }

    /// Number of data records discarded to reach the start offset.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn read_next(&mut self) -> Option<Result<Record, FileError>> {
        if self.exhausted {
            return None;
        }

        let line = match self.lines.next() {
            Some(Ok(line)) => line,
            Some(Err(source)) => {
                // Errors are not resumable mid-line; stop after reporting.
                self.exhausted = true;
                return Some(Err(FileError::Read {
                    line: self.position.line_index(),
                    source,
                }));
            }
            None => {
                self.exhausted = true;
                return None;
            }
        };

        let offset = self.position;
        match self.format.split_line(&line) {
            Ok(fields) => {
                self.position.advance(1);
                Some(Ok(Record::new(offset, fields)))
            }
            Err(source) => {
                self.exhausted = true;
                Some(Err(FileError::Parse {
                    line: offset.line_index(),
                    source,
                }))
            }
        }
    }

    fn skip_to_start(&mut self) -> Result<(), FileError> {
        while self.position < self.start {
            match self.read_next() {
                Some(Ok(record)) => {
                    trace!(offset = %record.offset, "Skipping record before start offset");
                    self.skipped += 1;
                }
                Some(Err(e)) => return Err(e),
                None => {
                    warn!(
                        start = %self.start,
                        available = self.skipped,
                        "Source ended before reaching the start offset"
                    );
                    return Ok(());
                }
            }
        }

        if self.skipped > 0 {
            info!(skipped = self.skipped, "Skipped records before start offset");
        }
        Ok(())
    }
}

impl<R: Read> Iterator for RecordSource<R> {
    type Item = Result<Record, FileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position < self.start
            && !self.exhausted
            && let Err(e) = self.skip_to_start()
        {
            return Some(Err(e));
        }

        let next = self.read_next();
        if let Some(Ok(record)) = &next {
            trace!(offset = %record.offset, record = %record, "Read record");
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tsv(lines: &[&str]) -> String {
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    fn collect<R: Read>(source: RecordSource<R>) -> Vec<Record> {
        source.collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn header_is_never_yielded_as_data() {
        let data = tsv(&["id\tname", "1\talpha", "2\tbeta"]);
        let source =
            RecordSource::from_reader(data.as_bytes(), FileFormat::Tsv, Offset::ZERO).unwrap();

        assert_eq!(source.header().fields(), ["id", "name"]);
        let records = collect(source);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields(), ["1", "alpha"]);
        assert_eq!(records[0].offset, Offset::new(0));
        assert_eq!(records[1].offset, Offset::new(1));
    }

    #[test]
    fn skips_start_offset_records_after_header() {
        let mut lines = vec!["id".to_string()];
        lines.extend((0..10).map(|i| i.to_string()));
        let data = lines.join("\n");

        let mut source =
            RecordSource::from_reader(data.as_bytes(), FileFormat::Tsv, Offset::new(4)).unwrap();
        let first = source.next().unwrap().unwrap();
        assert_eq!(first.fields(), ["4"]);
        assert_eq!(first.offset, Offset::new(4));
        assert_eq!(source.skipped(), 4);

        let rest = collect(source);
        assert_eq!(rest.len(), 5);
    }

    #[test]
    fn restart_with_larger_offset_reproduces_suffix() {
        let data = tsv(&["k", "a", "b", "c", "d", "e"]);

        let full = collect(
            RecordSource::from_reader(data.as_bytes(), FileFormat::Tsv, Offset::ZERO).unwrap(),
        );
        let resumed = collect(
            RecordSource::from_reader(data.as_bytes(), FileFormat::Tsv, Offset::new(3)).unwrap(),
        );

        assert_eq!(resumed, full[3..].to_vec());
    }

    #[test]
    fn start_beyond_end_yields_nothing() {
        let data = tsv(&["k", "a", "b"]);
        let source =
            RecordSource::from_reader(data.as_bytes(), FileFormat::Tsv, Offset::new(10)).unwrap();
        assert!(collect(source).is_empty());
    }

    #[test]
    fn keeps_trailing_empty_fields_and_ragged_rows() {
        let data = tsv(&["a\tb\tc", "1\t\t", "2"]);
        let records = collect(
            RecordSource::from_reader(data.as_bytes(), FileFormat::Tsv, Offset::ZERO).unwrap(),
        );
        assert_eq!(records[0].fields(), ["1", "", ""]);
        assert_eq!(records[1].fields(), ["2"]);
    }

    #[test]
    fn blank_lines_are_records_with_one_empty_field() {
        let data = "id\tname\n1\ta\n\n2\tb\n";
        let records = collect(
            RecordSource::from_reader(data.as_bytes(), FileFormat::Tsv, Offset::ZERO).unwrap(),
        );

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].fields(), [""]);
        assert_eq!(records[1].offset, Offset::new(1));
        assert_eq!(records[2].fields(), ["2", "b"]);
        assert_eq!(records[2].offset.line_index(), 3);
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let data = "id,name\r\n1,a\r\n";
        let records = collect(
            RecordSource::from_reader(data.as_bytes(), FileFormat::Csv, Offset::ZERO).unwrap(),
        );
        assert_eq!(records[0].fields(), ["1", "a"]);
    }

    #[test]
    fn strips_byte_order_mark_from_header() {
        let data = "\u{feff}id,name\n1,x\n";
        let source =
            RecordSource::from_reader(data.as_bytes(), FileFormat::Csv, Offset::ZERO).unwrap();
        assert_eq!(source.header().fields(), ["id", "name"]);
    }

    #[test]
    fn empty_input_has_no_header() {
        let result = RecordSource::from_reader("".as_bytes(), FileFormat::Tsv, Offset::ZERO);
        assert!(matches!(result, Err(FileError::MissingHeader)));
    }

    #[test]
    fn duplicate_header_is_rejected() {
        let result =
            RecordSource::from_reader("id,id\n1,2\n".as_bytes(), FileFormat::Csv, Offset::ZERO);
        assert!(matches!(result, Err(FileError::InvalidHeader(_))));
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let result = RecordSource::open(&dir.path().join("nope.tsv"), FileFormat::Tsv, Offset::ZERO);
        assert!(matches!(result, Err(FileError::SourceUnavailable { .. })));
    }

    #[test]
    fn opens_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genes.tsv");
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", tsv(&["id\tname", "1\tx"])).unwrap();

        let source = RecordSource::open(&path, FileFormat::Tsv, Offset::ZERO).unwrap();
        assert_eq!(collect(source).len(), 1);
    }
}
