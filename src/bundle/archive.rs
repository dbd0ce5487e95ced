//! Tar packing with streaming compression.
//!
//! Each tile becomes one ustar entry named `{zoom}/{x}/{y}`: a 512-byte
//! header, the payload, and zero padding to the next 512-byte boundary. The
//! archive ends with two zero blocks. Bytes go straight through the selected
//! encoder as they are produced, so the uncompressed archive is never held in
//! memory when a compressor is in use.

use async_compression::tokio::write::{BrotliEncoder, GzipEncoder};
use bytes::Bytes;
use tar::{EntryType, Header};
use tokio::io::AsyncWriteExt;

use super::format::Compression;
use crate::coord::TileCoord;

/// Tar block size.
pub const BLOCK_SIZE: usize = 512;

const ZERO_BLOCK: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

/// A fetched tile waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub coord: TileCoord,
    pub data: Bytes,
}

impl TileRecord {
    pub fn new(coord: TileCoord, data: Bytes) -> Self {
        Self { coord, data }
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// Output side of the archive: identity or one of the compressors.
enum Encoder {
    Identity(Vec<u8>),
    Gzip(GzipEncoder<Vec<u8>>),
    Brotli(BrotliEncoder<Vec<u8>>),
}

impl Encoder {
    fn new(compression: Compression) -> Self {
        match compression {
            Compression::None => Encoder::Identity(Vec::new()),
            Compression::Gzip => Encoder::Gzip(GzipEncoder::new(Vec::new())),
            Compression::Brotli => Encoder::Brotli(BrotliEncoder::new(Vec::new())),
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            Encoder::Identity(buf) => {
                buf.extend_from_slice(data);
                Ok(())
            }
            Encoder::Gzip(encoder) => encoder.write_all(data).await,
            Encoder::Brotli(encoder) => encoder.write_all(data).await,
        }
    }

    async fn finish(self) -> std::io::Result<Vec<u8>> {
        match self {
            Encoder::Identity(buf) => Ok(buf),
            Encoder::Gzip(mut encoder) => {
                encoder.shutdown().await?;
                Ok(encoder.into_inner())
            }
            Encoder::Brotli(mut encoder) => {
                encoder.shutdown().await?;
                Ok(encoder.into_inner())
            }
        }
    }
}

// =============================================================================
// ArchiveWriter
// =============================================================================

/// Writes tile records as tar entries through the chosen compression.
///
/// Entries appear in the order they are appended. Headers use mtime 0 so the
/// same tiles always produce the same bytes.
///
/// # Example
///
/// ```
/// use bulk_tile_server::bundle::{ArchiveWriter, Compression, TileRecord};
/// use bulk_tile_server::coord::TileCoord;
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() -> std::io::Result<()> {
///     let mut writer = ArchiveWriter::new(Compression::None);
///     let coord = TileCoord::new(10, 5, 5).unwrap();
///     writer.append(&TileRecord::new(coord, Bytes::from_static(b"tile"))).await?;
///     let archive = writer.finish().await?;
///
///     // header + one padded data block + two-block trailer
///     assert_eq!(archive.len(), 512 + 512 + 1024);
///     Ok(())
/// }
/// ```
pub struct ArchiveWriter {
    encoder: Encoder,
    entries: usize,
}

impl ArchiveWriter {
    pub fn new(compression: Compression) -> Self {
        Self {
            encoder: Encoder::new(compression),
            entries: 0,
        }
    }

    /// Append one entry named after the record's coordinate.
    pub async fn append(&mut self, record: &TileRecord) -> std::io::Result<()> {
        let header = entry_header(&record.coord.to_string(), record.data.len() as u64)?;
        self.encoder.write_all(header.as_bytes()).await?;
        self.encoder.write_all(&record.data).await?;

        let remainder = record.data.len() % BLOCK_SIZE;
        if remainder != 0 {
            self.encoder
                .write_all(&ZERO_BLOCK[..BLOCK_SIZE - remainder])
                .await?;
        }

        self.entries += 1;
        Ok(())
    }

    /// Number of entries written so far.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Write the end-of-archive trailer and flush the compressor.
    pub async fn finish(mut self) -> std::io::Result<Bytes> {
        self.encoder.write_all(&ZERO_BLOCK).await?;
        self.encoder.write_all(&ZERO_BLOCK).await?;
        let data = self.encoder.finish().await?;
        Ok(Bytes::from(data))
    }
}

fn entry_header(name: &str, size: u64) -> std::io::Result<Header> {
    let mut header = Header::new_ustar();
    header.set_path(name)?;
    header.set_size(size);
    header.set_mode(0o644);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header.set_entry_type(EntryType::Regular);
    header.set_cksum();
    Ok(header)
}
