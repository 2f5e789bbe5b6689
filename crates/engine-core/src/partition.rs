use model::records::{batch::Chunk, row::Record};
use std::num::NonZeroUsize;
use tracing::debug;

/// Groups a record stream into consecutive chunks of at most `size` records.
///
/// Every chunk except the last holds exactly `size` records; the last holds
/// the remainder and is never empty. Chunks are numbered from 1. A read
/// error is forwarded as-is and ends the stream; records gathered for the
/// unfinished chunk are dropped, as nothing of them was written.
pub struct ChunkPartitioner<I> {
    records: I,
    size: NonZeroUsize,
    next_seq: usize,
    done: bool,
}

impl<I, E> ChunkPartitioner<I>
where
    I: Iterator<Item = Result<Record, E>>,
{
    pub fn new(records: I, size: NonZeroUsize) -> Self {
        ChunkPartitioner {
            records,
            size,
            next_seq: 1,
            done: false,
        }
    }

    /// The wrapped record stream.
    pub fn source(&self) -> &I {
        &self.records
    }
}

impl<I, E> Iterator for ChunkPartitioner<I>
where
    I: Iterator<Item = Result<Record, E>>,
{
    type Item = Result<Chunk, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut records = Vec::with_capacity(self.size.get());
        while records.len() < self.size.get() {
            match self.records.next() {
                Some(Ok(record)) => records.push(record),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if records.is_empty() {
            return None;
        }

        let chunk = Chunk::new(self.next_seq, records);
        self.next_seq += 1;
        debug!(chunk = chunk.seq, records = chunk.len(), "Partitioned chunk");
        Some(Ok(chunk))
    }
}
