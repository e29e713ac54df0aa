use std::fmt;
use std::num::NonZeroUsize;

/// Identifies a chunk within one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkId(pub usize);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk-{}", self.0)
    }
}

/// A contiguous run of work items handed to a single worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<T> {
    pub id: ChunkId,
    pub items: Vec<T>,
}

impl<T> Chunk<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split `items` into at most `worker_count` contiguous chunks.
///
/// Chunk sizes differ by at most one, larger chunks first, and concatenating
/// the chunks in order gives back the input. An empty input yields no chunks.
pub fn distribute<T>(items: Vec<T>, worker_count: NonZeroUsize) -> Vec<Chunk<T>> {
    let total = items.len();
    let count = worker_count.get().min(total);
    if count == 0 {
        return Vec::new();
    }

    let base = total / count;
    let remainder = total % count;

    let mut chunks = Vec::with_capacity(count);
    let mut iter = items.into_iter();
    for i in 0..count {
        let len = base + usize::from(i < remainder);
        chunks.push(Chunk {
            id: ChunkId(i),
            items: iter.by_ref().take(len).collect(),
        });
    }
    chunks
}
