use crate::file::delimited::error::FileError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Layout of a delimited data file.
///
/// Tab- and pipe-separated files are split verbatim on the delimiter; only
/// comma-separated files honour double-quoted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileFormat {
    Csv,
    Tsv,
    Psv,
}

impl FileFormat {
    pub fn delimiter(&self) -> u8 {
        match self {
            FileFormat::Csv => b',',
            FileFormat::Tsv => b'\t',
            FileFormat::Psv => b'|',
        }
    }

    /// Extension of the extracted data file, dot included.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => ".csv",
            FileFormat::Tsv => ".tsv",
            FileFormat::Psv => ".psv",
        }
    }

    fn quoting(&self) -> bool {
        matches!(self, FileFormat::Csv)
    }

    fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.delimiter())
            .quoting(self.quoting())
            .has_headers(false)
            .flexible(true);
        builder
    }

    /// Splits one physical line into its fields. Trailing empty fields are
    /// kept and a blank line is a single empty field, so field counts are
    /// always checked downstream.
    pub fn split_line(&self, line: &str) -> Result<Vec<String>, csv::Error> {
        if !self.quoting() {
            let delimiter = char::from(self.delimiter());
            return Ok(line.split(delimiter).map(String::from).collect());
        }

        let mut reader = self.reader_builder().from_reader(line.as_bytes());
        match reader.records().next() {
            Some(record) => Ok(record?.iter().map(String::from).collect()),
            None => Ok(vec![String::new()]),
        }
    }
}

impl FromStr for FileFormat {
    type Err = FileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CSV" => Ok(FileFormat::Csv),
            "TSV" => Ok(FileFormat::Tsv),
            "PSV" => Ok(FileFormat::Psv),
            _ => Err(FileError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileFormat::Csv => "CSV",
            FileFormat::Tsv => "TSV",
            FileFormat::Psv => "PSV",
        };
        f.write_str(name)
    }
}
