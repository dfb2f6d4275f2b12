//! Packaging local files as file messages.
//!
//! Files are read fully into memory and base64 encoded, so an optional size
//! ceiling is checked against file metadata before anything is read.

use std::path::Path;

use anonchat_shared::FileInfo;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::FileTransferError;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransferEncoder {
    max_bytes: Option<u64>,
}

impl FileTransferEncoder {
    pub fn new(max_bytes: Option<u64>) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> Option<u64> {
        self.max_bytes
    }

    /// Read a file from disk and package it. The mime type is guessed from
    /// the extension.
    pub async fn encode_path(&self, path: impl AsRef<Path>) -> Result<FileInfo, FileTransferError> {
        let path = path.as_ref();
        let read_err = |source| FileTransferError::Read {
            path: path.to_path_buf(),
            source,
        };

        let metadata = tokio::fs::metadata(path).await.map_err(read_err)?;
        if !metadata.is_file() {
            return Err(FileTransferError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        self.check_size(&name, metadata.len())?;

        let bytes = tokio::fs::read(path).await.map_err(read_err)?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        tracing::debug!(file = %name, size = bytes.len(), mime = %mime, "encoded file");
        self.encode_bytes(name, Some(mime.essence_str()), &bytes)
    }

    /// Package bytes already in memory.
    pub fn encode_bytes(
        &self,
        name: impl Into<String>,
        mime_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<FileInfo, FileTransferError> {
        let name = name.into();
        self.check_size(&name, bytes.len() as u64)?;
        Ok(FileInfo {
            name,
            size_bytes: bytes.len() as u64,
            mime_type: mime_type
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_MIME_TYPE)
                .to_string(),
            base64_content: BASE64.encode(bytes),
        })
    }

    /// Package a `data:<mime>;base64,<payload>` URL, as produced by browser
    /// file readers. The header is stripped and the payload kept as is.
    pub fn encode_data_url(
        &self,
        name: impl Into<String>,
        data_url: &str,
    ) -> Result<FileInfo, FileTransferError> {
        let name = name.into();
        let (mime, payload) = split_data_url(data_url)
            .ok_or_else(|| FileTransferError::InvalidDataUrl("missing base64 header".to_string()))?;
        let size = BASE64
            .decode(payload)
            .map_err(|e| FileTransferError::InvalidDataUrl(e.to_string()))?
            .len() as u64;
        self.check_size(&name, size)?;
        Ok(FileInfo {
            name,
            size_bytes: size,
            mime_type: if mime.is_empty() {
                DEFAULT_MIME_TYPE.to_string()
            } else {
                mime.to_string()
            },
            base64_content: payload.to_string(),
        })
    }

    /// Check an already packaged file against the size ceiling.
    pub fn check_file_info(&self, file_info: &FileInfo) -> Result<(), FileTransferError> {
        self.check_size(&file_info.name, file_info.size_bytes)
    }

    fn check_size(&self, name: &str, size: u64) -> Result<(), FileTransferError> {
        match self.max_bytes {
            Some(limit) if size > limit => Err(FileTransferError::TooLarge {
                name: name.to_string(),
                size,
                limit,
            }),
            _ => Ok(()),
        }
    }
}

/// Strip a data-URI header, returning the bare payload. Input without a
/// header is returned unchanged.
pub fn strip_data_uri(payload: &str) -> &str {
    split_data_url(payload).map_or(payload, |(_, body)| body)
}

fn split_data_url(data_url: &str) -> Option<(&str, &str)> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, body) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn encodes_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello world")
            .unwrap();

        let info = FileTransferEncoder::default().encode_path(&path).await.unwrap();
        assert_eq!(info.name, "hello.txt");
        assert_eq!(info.size_bytes, 11);
        assert_eq!(info.mime_type, "text/plain");
        assert_eq!(info.decode_content().unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn unknown_extension_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.zzzunknown");
        std::fs::write(&path, [0u8, 1, 2]).unwrap();

        let info = FileTransferEncoder::default().encode_path(&path).await.unwrap();
        assert_eq!(info.mime_type, DEFAULT_MIME_TYPE);
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileTransferEncoder::default()
            .encode_path(dir.path().join("nope.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, FileTransferError::Read { .. }));
    }

    #[tokio::test]
    async fn directories_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileTransferEncoder::default()
            .encode_path(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, FileTransferError::NotAFile { .. }));
    }

    #[tokio::test]
    async fn size_ceiling_is_checked_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![7u8; 64]).unwrap();

        let err = FileTransferEncoder::new(Some(32))
            .encode_path(&path)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FileTransferError::TooLarge { size: 64, limit: 32, .. }
        ));
    }

    #[test]
    fn data_url_header_is_stripped() {
        let info = FileTransferEncoder::default()
            .encode_data_url("a.png", "data:image/png;base64,AAEC")
            .unwrap();
        assert_eq!(info.base64_content, "AAEC");
        assert_eq!(info.mime_type, "image/png");
        assert_eq!(info.size_bytes, 3);

        assert_eq!(strip_data_uri("data:text/plain;base64,aGk="), "aGk=");
        assert_eq!(strip_data_uri("aGk="), "aGk=");
    }

    #[test]
    fn malformed_data_urls_are_rejected() {
        let encoder = FileTransferEncoder::default();
        assert!(encoder.encode_data_url("x", "aGk=").is_err());
        assert!(encoder.encode_data_url("x", "data:text/plain,hi").is_err());
        assert!(encoder
            .encode_data_url("x", "data:text/plain;base64,@@@")
            .is_err());
    }

    #[test]
    fn packaged_files_are_checked_against_the_ceiling() {
        let encoder = FileTransferEncoder::new(Some(4));
        let small = encoder.encode_bytes("s.bin", None, b"abcd").unwrap();
        assert!(encoder.check_file_info(&small).is_ok());

        let big = FileTransferEncoder::default()
            .encode_bytes("b.bin", None, b"abcdef")
            .unwrap();
        assert!(matches!(
            encoder.check_file_info(&big),
            Err(FileTransferError::TooLarge { size: 6, limit: 4, .. })
        ));
    }

    #[test]
    fn empty_mime_falls_back() {
        let info = FileTransferEncoder::default()
            .encode_bytes("x", Some(""), b"x")
            .unwrap();
        assert_eq!(info.mime_type, DEFAULT_MIME_TYPE);
    }
}
