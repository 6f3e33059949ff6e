//! Chunk planning for block-blob uploads

use bytes::Bytes;
use lobup_errors::Error;
use lobup_net::encode_block_id;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Minimum width of a block identifier's sequence number
const BLOCK_ID_WIDTH: usize = 4;

/// One slice of the payload and the block it becomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub offset: u64,
    pub len: u64,
    /// Zero-padded sequence id, e.g. `0000`
    pub block_id: String,
}

impl Chunk {
    /// Block id as transmitted to storage
    #[must_use]
    pub fn encoded_block_id(&self) -> String {
        encode_block_id(&self.block_id)
    }
}

/// Ordered split of a file into fixed-size chunks
///
/// The plan is the single source of truth for block order: chunks are
/// uploaded in plan order and the committed block list is taken from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
    chunks: Vec<Chunk>,
}

impl ChunkPlan {
    /// Plan chunks for `total_size` bytes
    ///
    /// An empty file still produces one empty chunk so that a block list can
    /// be committed. A `chunk_size` of zero is treated as one byte.
    #[must_use]
    pub fn new(total_size: u64, chunk_size: u64) -> Self {
        let chunk_size = chunk_size.max(1);
        let count = usize::try_from(total_size.div_ceil(chunk_size).max(1)).unwrap_or(usize::MAX);
        // Every id in a blob must have the same length
        let width = BLOCK_ID_WIDTH.max((count - 1).to_string().len());

        let mut chunks = Vec::with_capacity(count);
        let mut offset = 0u64;
        for index in 0..count {
            let len = chunk_size.min(total_size - offset);
            chunks.push(Chunk {
                index,
                offset,
                len,
                block_id: format!("{index:0width$}"),
            });
            offset += len;
        }

        Self {
            total_size,
            chunk_size,
            chunks,
        }
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    #[must_use]
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Encoded block ids in commit order
    #[must_use]
    pub fn block_list(&self) -> Vec<String> {
        self.chunks.iter().map(Chunk::encoded_block_id).collect()
    }

    #[must_use]
    pub fn is_last(&self, chunk: &Chunk) -> bool {
        chunk.index + 1 == self.chunks.len()
    }
}

/// Read one chunk's bytes from the payload file
pub(crate) async fn read_chunk(file: &mut tokio::fs::File, chunk: &Chunk, path: &Path) -> Result<Bytes, Error> {
    let len = usize::try_from(chunk.len)
        .map_err(|_| Error::internal(format!("chunk {} too large for memory", chunk.index)))?;
    let mut buf = vec![0u8; len];
    file.seek(std::io::SeekFrom::Start(chunk.offset))
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    file.read_exact(&mut buf)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_fourteen_mib_in_six_mib_chunks() {
        let plan = ChunkPlan::new(14 * MIB, 6 * MIB);
        let lens: Vec<u64> = plan.chunks().iter().map(|c| c.len).collect();
        let ids: Vec<&str> = plan.chunks().iter().map(|c| c.block_id.as_str()).collect();
        assert_eq!(lens, vec![6 * MIB, 6 * MIB, 2 * MIB]);
        assert_eq!(ids, vec!["0000", "0001", "0002"]);
        assert!(plan.is_last(&plan.chunks()[2]));
        assert_eq!(plan.block_list()[0], "MDAwMA==");
    }

    #[test]
    fn test_empty_file_has_one_chunk() {
        let plan = ChunkPlan::new(0, 6 * MIB);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.chunks()[0].len, 0);
    }

    #[test]
    fn test_ids_widen_uniformly_past_four_digits() {
        let plan = ChunkPlan::new(10_001, 1);
        assert_eq!(plan.chunks()[0].block_id, "00000");
        assert_eq!(plan.chunks()[10_000].block_id, "10000");
    }

    #[tokio::test]
    async fn test_read_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload");
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let plan = ChunkPlan::new(1000, 300);
        let mut file = tokio::fs::File::open(&path).await.unwrap();
        let last = read_chunk(&mut file, &plan.chunks()[3], &path).await.unwrap();
        assert_eq!(&last[..], &data[900..]);
        let first = read_chunk(&mut file, &plan.chunks()[0], &path).await.unwrap();
        assert_eq!(&first[..], &data[..300]);
    }

    proptest! {
        #[test]
        fn chunks_cover_file_exactly(size in 0u64..200_000, chunk_size in 64u64..70_000) {
            let plan = ChunkPlan::new(size, chunk_size);
            let expected = usize::try_from(size.div_ceil(chunk_size).max(1)).unwrap();
            prop_assert_eq!(plan.len(), expected);

            let mut next = 0u64;
            for chunk in plan.chunks() {
                prop_assert_eq!(chunk.offset, next);
                prop_assert!(chunk.len <= chunk_size);
                next += chunk.len;
            }
            prop_assert_eq!(next, size);
        }

        #[test]
        fn block_ids_are_ascending_and_deterministic(size in 0u64..500_000, chunk_size in 100u64..5_000) {
            let plan = ChunkPlan::new(size, chunk_size);
            prop_assert_eq!(plan.chunks()[0].block_id.as_str(), "0000");
            let width = plan.chunks()[0].block_id.len();
            for pair in plan.chunks().windows(2) {
                prop_assert!(pair[0].block_id < pair[1].block_id);
                prop_assert_eq!(pair[1].block_id.len(), width);
            }
            prop_assert_eq!(plan.block_list(), ChunkPlan::new(size, chunk_size).block_list());
        }
    }
}
