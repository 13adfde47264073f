//! Request body variants and the codec dispatcher that turns the active
//! variant into wire bytes plus a content type.

use crate::error::HttpError;
use crate::multimap::MultiMap;
use bytes::Bytes;
use http::HeaderValue;
use rand::Rng;
use std::fmt;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Which body variant a resolved configuration carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyVariant {
    /// No body
    Empty,
    /// Caller-supplied bytes or reader, passed through unchanged
    Raw,
    /// Text rendering of a value
    Data,
    /// URL-encoded form fields
    Form,
    /// Serialized JSON
    Json,
    /// `multipart/form-data` file upload
    Files,
}

/// Where a multipart file part reads its bytes from.
pub enum FileSource {
    Path(PathBuf),
    Handle {
        file_name: String,
        file: tokio::fs::File,
    },
}

pub struct FilePart {
    pub(crate) field: String,
    pub(crate) source: FileSource,
}

/// The single active body of a call. Setting a variant replaces the previous one.
pub enum BodyKind {
    Empty,
    Reader(Box<dyn AsyncRead + Send + Unpin>),
    Bytes(Bytes),
    Data(String),
    Form(MultiMap),
    Json(Bytes),
    Files(Vec<FilePart>),
}

impl BodyKind {
    pub(crate) fn variant(&self) -> BodyVariant {
        match self {
            Self::Empty => BodyVariant::Empty,
            Self::Reader(_) | Self::Bytes(_) => BodyVariant::Raw,
            Self::Data(_) => BodyVariant::Data,
            Self::Form(_) => BodyVariant::Form,
            Self::Json(_) => BodyVariant::Json,
            Self::Files(_) => BodyVariant::Files,
        }
    }
}

impl fmt::Debug for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Form(map) => f.debug_tuple("Form").field(map).finish(),
            Self::Files(parts) => f
                .debug_list()
                .entries(parts.iter().map(|part| &part.field))
                .finish(),
            other => write!(f, "{:?}", other.variant()),
        }
    }
}

/// Output of the codec dispatcher.
#[derive(Debug)]
pub struct EncodedBody {
    pub(crate) bytes: Bytes,
    /// Content type implied by the variant; `None` leaves the caller's header alone
    pub(crate) content_type: Option<HeaderValue>,
    /// Payload size: body length, or the summed file sizes for uploads
    pub(crate) size: u64,
}

impl EncodedBody {
    fn plain(bytes: Bytes, content_type: Option<HeaderValue>) -> Self {
        let size = bytes.len() as u64;
        Self {
            bytes,
            content_type,
            size,
        }
    }
}

/// Encode the active body variant.
pub async fn encode(body: BodyKind) -> Result<EncodedBody, HttpError> {
    match body {
        BodyKind::Empty => Ok(EncodedBody::plain(Bytes::new(), None)),
        BodyKind::Reader(mut reader) => {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await?;
            Ok(EncodedBody::plain(Bytes::from(buf), None))
        }
        BodyKind::Bytes(bytes) => Ok(EncodedBody::plain(bytes, None)),
        BodyKind::Data(text) => Ok(EncodedBody::plain(Bytes::from(text), None)),
        BodyKind::Form(fields) => {
            let encoded = fields.encode()?;
            Ok(EncodedBody::plain(
                Bytes::from(encoded),
                Some(HeaderValue::from_static(FORM_CONTENT_TYPE)),
            ))
        }
        BodyKind::Json(bytes) => Ok(EncodedBody::plain(
            bytes,
            Some(HeaderValue::from_static(JSON_CONTENT_TYPE)),
        )),
        BodyKind::Files(parts) => encode_files(parts).await,
    }
}

async fn encode_files(parts: Vec<FilePart>) -> Result<EncodedBody, HttpError> {
    let mut writer = MultipartWriter::new();
    let mut size = 0u64;
    for part in parts {
        size += match part.source {
            FileSource::Path(path) => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let file = tokio::fs::File::open(&path).await?;
                writer.write_file(&part.field, &file_name, file).await?
            }
            FileSource::Handle { file_name, file } => {
                writer.write_file(&part.field, &file_name, file).await?
            }
        };
    }
    let (bytes, content_type) = writer.finish();
    Ok(EncodedBody {
        bytes,
        content_type: Some(HeaderValue::from_str(&content_type)?),
        size,
    })
}

/// Minimal `multipart/form-data` writer with one file per part.
pub struct MultipartWriter {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartWriter {
    pub(crate) fn new() -> Self {
        let nonce: u128 = rand::rng().random();
        Self {
            boundary: format!("{nonce:032x}"),
            buf: Vec::new(),
        }
    }

    pub(crate) fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Stream `reader` into a new part; returns the number of file bytes copied.
    pub(crate) async fn write_file<R>(
        &mut self,
        field: &str,
        file_name: &str,
        mut reader: R,
    ) -> std::io::Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let header = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            self.boundary,
            escape_param(field),
            escape_param(file_name),
            mime::APPLICATION_OCTET_STREAM,
        );
        self.buf.extend_from_slice(header.as_bytes());
        let copied = tokio::io::copy(&mut reader, &mut self.buf).await?;
        self.buf.extend_from_slice(b"\r\n");
        Ok(copied)
    }

    /// Close the body; returns it with its `Content-Type` value.
    pub(crate) fn finish(mut self) -> (Bytes, String) {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        let content_type = format!("{}; boundary={}", mime::MULTIPART_FORM_DATA, self.boundary);
        (Bytes::from(self.buf), content_type)
    }
}

/// Quote-escape a disposition parameter; CR and LF are percent-encoded.
fn escape_param(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
