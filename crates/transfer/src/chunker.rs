use std::io::Read;
use std::path::Path;

use peerdrop_protocol::{CHUNK_SIZE, FileMeta};

use crate::TransferError;

/// Reads a source file as a sequence of fixed-size indexed chunks.
///
/// Owns the file handle and its read cursor for the duration of one
/// transfer. Chunk `total` is fixed at open time from the file size;
/// every chunk but the last carries exactly [`CHUNK_SIZE`] bytes.
pub struct FileChunker {
    file: std::fs::File,
    meta: FileMeta,
    total: u32,
    next_index: u32,
    bytes_read: u64,
}

impl FileChunker {
    /// Opens `path` and derives its [`FileMeta`] from filesystem
    /// attributes.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".into());
        let mime_type = mime_for_path(path).to_string();

        let total = size.div_ceil(CHUNK_SIZE as u64) as u32;

        Ok(Self {
            file,
            meta: FileMeta {
                name,
                size,
                mime_type,
            },
            total,
            next_index: 0,
            bytes_read: 0,
        })
    }

    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }

    /// `ceil(size / CHUNK_SIZE)`.
    pub fn total_chunks(&self) -> u32 {
        self.total
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Reads the next chunk. Returns `None` once all chunks are out.
    ///
    /// A file that shrinks mid-read surfaces as an I/O error rather than
    /// an undersized stream.
    pub fn next_chunk(&mut self) -> Result<Option<(u32, Vec<u8>)>, TransferError> {
        if self.next_index >= self.total {
            return Ok(None);
        }

        let remaining = self.meta.size - self.bytes_read;
        let read_size = std::cmp::min(remaining, CHUNK_SIZE as u64) as usize;
        let mut buf = vec![0u8; read_size];
        self.file.read_exact(&mut buf)?;

        let index = self.next_index;
        self.next_index += 1;
        self.bytes_read += read_size as u64;
        Ok(Some((index, buf)))
    }
}

/// Best-effort MIME type from the file extension.
///
/// The original attribute source (the host environment's file type) is
/// unavailable here; unknown extensions fall back to octet-stream.
fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}
