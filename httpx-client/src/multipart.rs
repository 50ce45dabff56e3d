//! `multipart/form-data` encoding.

use crate::error::ConfigError;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Opens a fresh reader over a file attachment's content.
pub type FileOpener = Arc<dyn Fn() -> io::Result<Box<dyn Read + Send>> + Send + Sync>;

/// Where a file attachment's bytes come from.
#[derive(Clone)]
pub enum FileSource {
    /// A file on disk, opened when the form is encoded.
    Path(PathBuf),
    /// In-memory content.
    Bytes(Bytes),
    /// A caller-supplied opener.
    Opener(FileOpener),
}

impl FileSource {
    /// Open the source for reading.
    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        match self {
            Self::Path(path) => Ok(Box::new(File::open(path)?)),
            Self::Bytes(bytes) => Ok(Box::new(io::Cursor::new(bytes.clone()))),
            Self::Opener(open) => open(),
        }
    }
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Opener(_) => f.write_str("Opener(..)"),
        }
    }
}

/// A file attachment in a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Filename sent in the part's `Content-Disposition`.
    pub filename: String,
    /// Source of the file's content.
    pub source: FileSource,
}

impl FilePart {
    /// Attachment read from disk when the form is encoded.
    pub fn path(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            source: FileSource::Path(path.into()),
        }
    }

    /// Attachment with in-memory content.
    pub fn bytes(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            source: FileSource::Bytes(content.into()),
        }
    }

    /// Attachment opened through `open` when the form is encoded.
    pub fn opener<F>(filename: impl Into<String>, open: F) -> Self
    where
        F: Fn() -> io::Result<Box<dyn Read + Send>> + Send + Sync + 'static,
    {
        Self {
            filename: filename.into(),
            source: FileSource::Opener(Arc::new(open)),
        }
    }
}

/// Text fields and file attachments of a multipart form.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    /// Text fields, one part per value.
    pub values: BTreeMap<String, Vec<String>>,
    /// File fields, one part per attachment.
    pub files: BTreeMap<String, Vec<FilePart>>,
}

impl MultipartForm {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text value.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Add a file attachment.
    pub fn file(mut self, name: impl Into<String>, file: FilePart) -> Self {
        self.files.entry(name.into()).or_default().push(file);
        self
    }
}

/// Streams parts into an underlying writer.
pub struct MultipartWriter<W> {
    writer: W,
    boundary: String,
    has_parts: bool,
}

impl<W: Write> MultipartWriter<W> {
    /// Create a writer with a random boundary.
    pub fn new(writer: W) -> Self {
        Self::with_boundary(writer, generate_boundary())
    }

    /// Create a writer with a fixed boundary.
    pub fn with_boundary(writer: W, boundary: impl Into<String>) -> Self {
        Self {
            writer,
            boundary: boundary.into(),
            has_parts: false,
        }
    }

    /// The boundary separating parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `Content-Type` header value for the body being written.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    fn begin_part(&mut self, disposition: &str, content_type: Option<&str>) -> io::Result<&mut W> {
        if self.has_parts {
            write!(self.writer, "\r\n--{}\r\n", self.boundary)?;
        } else {
            write!(self.writer, "--{}\r\n", self.boundary)?;
        }
        self.has_parts = true;

        write!(self.writer, "Content-Disposition: {disposition}\r\n")?;
        if let Some(content_type) = content_type {
            write!(self.writer, "Content-Type: {content_type}\r\n")?;
        }
        self.writer.write_all(b"\r\n")?;
        Ok(&mut self.writer)
    }

    /// Write a text field part.
    pub fn write_field(&mut self, name: &str, value: &str) -> io::Result<()> {
        let disposition = format!("form-data; name=\"{}\"", escape_quotes(name));
        self.begin_part(&disposition, None)?.write_all(value.as_bytes())
    }

    /// Start a file part; its content is written to the returned writer.
    pub fn create_form_file(&mut self, name: &str, filename: &str) -> io::Result<&mut W> {
        let disposition = format!(
            "form-data; name=\"{}\"; filename=\"{}\"",
            escape_quotes(name),
            escape_quotes(filename)
        );
        self.begin_part(&disposition, Some("application/octet-stream"))
    }

    /// Write the closing boundary and return the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.has_parts {
            write!(self.writer, "\r\n--{}--\r\n", self.boundary)?;
        } else {
            write!(self.writer, "--{}--\r\n", self.boundary)?;
        }
        Ok(self.writer)
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Generate a random boundary string.
pub fn generate_boundary() -> String {
    format!(
        "{:016x}{:016x}{:016x}",
        fastrand::u64(..),
        fastrand::u64(..),
        fastrand::u64(..)
    )
}

/// Encode `form` into an in-memory body.
///
/// Returns the body and the matching `Content-Type` value. Any failure
/// to open or copy an attachment aborts the encoding; nothing written so
/// far is returned.
pub fn encode(form: &MultipartForm) -> Result<(Bytes, String), ConfigError> {
    encode_with_boundary(form, generate_boundary())
}

pub(crate) fn encode_with_boundary(
    form: &MultipartForm,
    boundary: String,
) -> Result<(Bytes, String), ConfigError> {
    let mut writer = MultipartWriter::with_boundary(Vec::new(), boundary);

    for (name, values) in &form.values {
        for value in values {
            writer.write_field(name, value).map_err(ConfigError::Multipart)?;
        }
    }

    for (name, files) in &form.files {
        for file in files {
            let file_error = |source| ConfigError::MultipartFile {
                field: name.clone(),
                filename: file.filename.clone(),
                source,
            };

            let part = writer
                .create_form_file(name, &file.filename)
                .map_err(ConfigError::Multipart)?;
            let mut reader = file.source.open().map_err(file_error)?;
            io::copy(&mut reader, part).map_err(file_error)?;
        }
    }

    let content_type = writer.content_type();
    let body = writer.finish().map_err(ConfigError::Multipart)?;
    tracing::trace!(size = body.len(), "Encoded multipart body");

    Ok((Bytes::from(body), content_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "test-boundary";

    #[test]
    fn test_single_field() {
        let form = MultipartForm::new().text("key", "value");
        let (body, content_type) = encode_with_boundary(&form, BOUNDARY.into()).unwrap();

        assert_eq!(content_type, "multipart/form-data; boundary=test-boundary");
        assert_eq!(
            body,
            "--test-boundary\r\n\
             Content-Disposition: form-data; name=\"key\"\r\n\
             \r\n\
             value\r\n\
             --test-boundary--\r\n"
        );
    }

    #[test]
    fn test_fields_and_files() {
        let form = MultipartForm::new()
            .text("title", "report")
            .file("upload", FilePart::bytes("a.txt", "alpha"))
            .file("upload", FilePart::bytes("b.txt", "beta"));
        let (body, _) = encode_with_boundary(&form, BOUNDARY.into()).unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert_eq!(text.matches("--test-boundary\r\n").count(), 3);
        assert!(text.contains(
            "Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
             Content-Type: application/octet-stream\r\n\r\nalpha"
        ));
        assert!(text.contains("filename=\"b.txt\""));
        assert!(text.find("name=\"title\"").unwrap() < text.find("a.txt").unwrap());
        assert!(text.ends_with("\r\n--test-boundary--\r\n"));
    }

    #[test]
    fn test_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"on disk").unwrap();

        let form = MultipartForm::new().file("doc", FilePart::path("notes.txt", &path));
        let (body, _) = encode(&form).unwrap();

        assert!(String::from_utf8_lossy(&body).contains("on disk"));
    }

    #[test]
    fn test_missing_file_aborts() {
        let form = MultipartForm::new()
            .text("key", "value")
            .file("doc", FilePart::path("gone.txt", "/nonexistent/gone.txt"));

        match encode(&form) {
            Err(ConfigError::MultipartFile { field, filename, .. }) => {
                assert_eq!(field, "doc");
                assert_eq!(filename, "gone.txt");
            }
            other => panic!("expected multipart file error, got {other:?}"),
        }
    }

    #[test]
    fn test_copy_failure_aborts() {
        struct Failing;

        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk on fire"))
            }
        }

        let form = MultipartForm::new().file(
            "doc",
            FilePart::opener("broken.bin", || Ok(Box::new(Failing) as Box<dyn Read + Send>)),
        );

        assert!(matches!(encode(&form), Err(ConfigError::MultipartFile { .. })));
    }

    #[test]
    fn test_quotes_are_escaped() {
        let form = MultipartForm::new().file("f", FilePart::bytes("a\"b.txt", "x"));
        let (body, _) = encode_with_boundary(&form, BOUNDARY.into()).unwrap();

        assert!(String::from_utf8_lossy(&body).contains("filename=\"a\\\"b.txt\""));
    }

    #[test]
    fn test_empty_form() {
        let (body, _) = encode_with_boundary(&MultipartForm::new(), BOUNDARY.into()).unwrap();
        assert_eq!(body, "--test-boundary--\r\n");
    }

    #[test]
    fn test_random_boundaries_differ() {
        let a = generate_boundary();
        assert_eq!(a.len(), 48);
        assert_ne!(a, generate_boundary());
    }
}
