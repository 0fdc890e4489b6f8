use crate::errors::WriteError;
use crate::generator_client::GeneratedObject;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Append-only writer for the accumulation buffer: one object per line,
/// created on first use, never truncated while the cycle is filling.
#[derive(Debug, Clone)]
pub struct BufferWriter {
    path: PathBuf,
}

impl BufferWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a batch and return the buffer size in bytes after the write,
    /// so the threshold check never acts on a stale size.
    pub async fn append(&self, objects: &[GeneratedObject]) -> Result<u64, WriteError> {
        // One contiguous write per batch keeps line boundaries intact even if
        // the process dies between iterations.
        let mut payload = String::new();
        for object in objects {
            payload.push_str(&object.text);
            payload.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| WriteError::Open {
                path: self.path.clone(),
                source,
            })?;

        file.write_all(payload.as_bytes())
            .await
            .map_err(|source| WriteError::Append {
                path: self.path.clone(),
                source,
            })?;
        file.flush().await.map_err(|source| WriteError::Append {
            path: self.path.clone(),
            source,
        })?;

        let size = file
            .metadata()
            .await
            .map_err(|source| WriteError::Append {
                path: self.path.clone(),
                source,
            })?
            .len();

        debug!(
            appended = objects.len(),
            buffer_bytes = size,
            "appended batch to accumulation buffer"
        );
        Ok(size)
    }

    /// Current buffer size in bytes; a missing file counts as empty.
    pub async fn len(&self) -> Result<u64, WriteError> {
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(source) => Err(WriteError::Open {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Delete and recreate the buffer empty, closing one accumulation cycle.
    pub async fn reset(&self) -> Result<(), WriteError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(WriteError::Reset {
                    path: self.path.clone(),
                    source,
                })
            }
        }
        fs::File::create(&self.path)
            .await
            .map_err(|source| WriteError::Reset {
                path: self.path.clone(),
                source,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn object(text: &str) -> GeneratedObject {
        GeneratedObject {
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn append_creates_file_and_reports_size_after_write() {
        let dir = tempdir().unwrap();
        let writer = BufferWriter::new(dir.path().join("buffer.txt"));

        let size = writer.append(&[object("1.аист"), object("2.банан")]).await.unwrap();
        assert_eq!(size, writer.len().await.unwrap());

        let contents = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(contents, "1.аист\n2.банан\n");
    }

    #[tokio::test]
    async fn append_never_truncates_existing_content() {
        let dir = tempdir().unwrap();
        let writer = BufferWriter::new(dir.path().join("buffer.txt"));

        writer.append(&[object("1.аист")]).await.unwrap();
        writer.append(&[object("2.банан")]).await.unwrap();

        let contents = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(contents, "1.аист\n2.банан\n");
    }

    #[tokio::test]
    async fn len_of_missing_buffer_is_zero() {
        let dir = tempdir().unwrap();
        let writer = BufferWriter::new(dir.path().join("buffer.txt"));
        assert_eq!(writer.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reset_leaves_an_empty_buffer_in_place() {
        let dir = tempdir().unwrap();
        let writer = BufferWriter::new(dir.path().join("buffer.txt"));

        writer.append(&[object("1.аист")]).await.unwrap();
        writer.reset().await.unwrap();

        assert!(writer.path().exists());
        assert_eq!(writer.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reset_of_missing_buffer_creates_it() {
        let dir = tempdir().unwrap();
        let writer = BufferWriter::new(dir.path().join("buffer.txt"));
        writer.reset().await.unwrap();
        assert!(writer.path().exists());
    }
}
