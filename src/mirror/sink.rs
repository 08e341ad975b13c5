// src/mirror/sink.rs
// =============================================================================
// This module is the filesystem side of the mirror.
//
// - Directories are created with create_dir_all, which succeeds when the
//   directory already exists. Sibling tasks may race to create the same
//   directory and that is fine.
// - Files are written through a ChunkWriter: whatever sizes the network
//   hands us, the file is written in fixed 128 KiB chunks, in order.
// - Names coming from urls are checked before they touch the filesystem,
//   so a decoded "%2F" or ".." can never escape the destination.
// =============================================================================

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Size of every chunk written to disk, except possibly the last one
pub const CHUNK_SIZE: usize = 128 * 1024;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("'{name}' cannot be used as a file or directory name")]
    UnsafeName { name: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SinkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        SinkError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// Joins a single url-derived name onto a directory
//
// Rejects anything that is not exactly one normal path component.
pub fn child_path(dir: &Path, name: &str) -> Result<PathBuf, SinkError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if unsafe_name {
        return Err(SinkError::UnsafeName {
            name: name.to_string(),
        });
    }
    Ok(dir.join(name))
}

// Creates a directory if it does not exist yet
pub async fn ensure_dir(path: &Path) -> Result<(), SinkError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| SinkError::io(path, e))
}

// Re-chunks a byte stream into CHUNK_SIZE writes on one file
#[derive(Debug)]
pub struct ChunkWriter {
    path: PathBuf,
    file: File,
    buffer: Vec<u8>,
    chunks_written: usize,
    bytes_written: u64,
}

/// What a finished ChunkWriter put on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: u64,
    pub chunks: usize,
}

impl ChunkWriter {
    // Creates (or truncates) the file
    pub async fn create(path: PathBuf) -> Result<Self, SinkError> {
        let file = File::create(&path)
            .await
            .map_err(|e| SinkError::io(&path, e))?;

        Ok(Self {
            path,
            file,
            buffer: Vec::with_capacity(CHUNK_SIZE),
            chunks_written: 0,
            bytes_written: 0,
        })
    }

    pub async fn push(&mut self, mut data: &[u8]) -> Result<(), SinkError> {
        while !data.is_empty() {
            let room = CHUNK_SIZE - self.buffer.len();
            let take = room.min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.buffer.len() == CHUNK_SIZE {
                self.write_buffer().await?;
            }
        }
        Ok(())
    }

    // Writes the final partial chunk and flushes the file
    pub async fn finish(mut self) -> Result<WrittenFile, SinkError> {
        self.write_buffer().await?;
        self.file
            .flush()
            .await
            .map_err(|e| SinkError::io(&self.path, e))?;

        Ok(WrittenFile {
            path: self.path,
            bytes: self.bytes_written,
            chunks: self.chunks_written,
        })
    }

    async fn write_buffer(&mut self) -> Result<(), SinkError> {
        // empty chunks are never written
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.file
            .write_all(&self.buffer)
            .await
            .map_err(|e| SinkError::io(&self.path, e))?;

        self.bytes_written += self.buffer.len() as u64;
        self.chunks_written += 1;
        self.buffer.clear();
        Ok(())
    }
}
