use connectors::file::delimited::{format::FileFormat, source::RecordSource};
use model::pagination::offset::Offset;
use std::{
    fs::File,
    io::{Cursor, Write},
    path::Path,
};
use zip::{ZipWriter, write::SimpleFileOptions};

/// Tab-separated content with an `id\tname` header and ids `1..=count`.
pub fn people_tsv(count: u64) -> String {
    let mut out = String::from("id\tname\n");
    for i in 1..=count {
        out.push_str(&format!("{i}\tperson-{i}\n"));
    }
    out
}

pub fn tsv_source(content: &str, start: u64) -> RecordSource<Cursor<Vec<u8>>> {
    RecordSource::from_reader(
        Cursor::new(content.as_bytes().to_vec()),
        FileFormat::Tsv,
        Offset::new(start),
    )
    .unwrap()
}

/// Writes `content` as the single entry `entry` of a zip archive at `path`.
pub fn write_zip(path: &Path, entry: &str, content: &str) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    zip.start_file(entry, SimpleFileOptions::default()).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
    zip.finish().unwrap();
}

pub fn ids(range: std::ops::RangeInclusive<u64>) -> Vec<String> {
    range.map(|i| i.to_string()).collect()
}
