//! Request bodies and body materialization.
//!
//! A [`BodySource`] is what callers hand to the builder. Materializing it
//! produces a [`Body`]: the stream itself, plus a replay function and a
//! known length when the source is one of the in-memory kinds.

use bytes::{Bytes, BytesMut};
use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

/// Produces a fresh, independent stream over a body's content.
pub type Replay = Arc<dyn Fn() -> Box<dyn Read + Send> + Send + Sync>;

/// A byte source accepted by [`RequestBuilder::body`](crate::RequestBuilder::body).
///
/// The in-memory kinds are snapshotted so the body can be replayed on
/// retry. [`BodySource::Reader`] is opaque: its length is unknown and it
/// can be read exactly once.
pub enum BodySource {
    /// Growable in-memory buffer.
    Buffer(BytesMut),
    /// Reader over a fixed byte slice.
    Slice(Cursor<Bytes>),
    /// Reader over a string.
    Text(Cursor<String>),
    /// Any other reader.
    Reader(Box<dyn Read + Send>),
}

impl BodySource {
    /// Wrap an arbitrary reader as an opaque, non-replayable source.
    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::Reader(Box::new(reader))
    }
}

impl fmt::Debug for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer(buf) => f.debug_tuple("Buffer").field(&buf.len()).finish(),
            Self::Slice(cursor) => f.debug_tuple("Slice").field(&cursor.get_ref().len()).finish(),
            Self::Text(cursor) => f.debug_tuple("Text").field(&cursor.get_ref().len()).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<BytesMut> for BodySource {
    fn from(buf: BytesMut) -> Self {
        Self::Buffer(buf)
    }
}

impl From<Bytes> for BodySource {
    fn from(bytes: Bytes) -> Self {
        Self::Slice(Cursor::new(bytes))
    }
}

impl From<Vec<u8>> for BodySource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Slice(Cursor::new(Bytes::from(bytes)))
    }
}

impl From<&'static [u8]> for BodySource {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Slice(Cursor::new(Bytes::from_static(bytes)))
    }
}

impl From<Cursor<Bytes>> for BodySource {
    fn from(cursor: Cursor<Bytes>) -> Self {
        Self::Slice(cursor)
    }
}

impl From<String> for BodySource {
    fn from(text: String) -> Self {
        Self::Text(Cursor::new(text))
    }
}

impl From<&str> for BodySource {
    fn from(text: &str) -> Self {
        Self::Text(Cursor::new(text.to_owned()))
    }
}

impl From<Cursor<String>> for BodySource {
    fn from(cursor: Cursor<String>) -> Self {
        Self::Text(cursor)
    }
}

enum Stream {
    Empty,
    Reader(Box<dyn Read + Send>),
}

/// A materialized request body.
///
/// Reading the body (it implements [`Read`]) consumes the original
/// stream. Replayable bodies can hand out any number of fresh streams
/// through [`Body::try_clone`] or [`Body::replay`].
pub struct Body {
    stream: Stream,
    replay: Option<Replay>,
    content_length: Option<u64>,
}

impl Body {
    /// The canonical empty body: replayable, with a known length of zero.
    pub fn empty() -> Self {
        Self {
            stream: Stream::Empty,
            replay: Some(Arc::new(|| -> Box<dyn Read + Send> { Box::new(io::empty()) })),
            content_length: Some(0),
        }
    }

    /// A replayable body over an immutable snapshot.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let snapshot: Bytes = bytes.into();
        if snapshot.is_empty() {
            return Self::empty();
        }

        let content_length = Some(snapshot.len() as u64);
        let stream = Stream::Reader(Box::new(Cursor::new(snapshot.clone())));
        let replay: Replay =
            Arc::new(move || -> Box<dyn Read + Send> { Box::new(Cursor::new(snapshot.clone())) });

        Self {
            stream,
            replay: Some(replay),
            content_length,
        }
    }

    /// An opaque body of unknown length that can be read once.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            stream: Stream::Reader(Box::new(reader)),
            replay: None,
            content_length: None,
        }
    }

    /// Whether this is the canonical empty body.
    pub fn is_empty(&self) -> bool {
        matches!(self.stream, Stream::Empty)
    }

    /// Whether fresh copies of this body can be produced.
    pub fn is_replayable(&self) -> bool {
        self.replay.is_some()
    }

    /// Known length in bytes; `None` when the length is unknown.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// The replay function, if the body has one.
    pub fn replay(&self) -> Option<&Replay> {
        self.replay.as_ref()
    }

    /// A fresh, independent copy of this body, if it is replayable.
    pub fn try_clone(&self) -> Option<Body> {
        let replay = self.replay.as_ref()?;
        let stream = if self.is_empty() {
            Stream::Empty
        } else {
            Stream::Reader(replay())
        };

        Some(Self {
            stream,
            replay: Some(Arc::clone(replay)),
            content_length: self.content_length,
        })
    }

    /// The stream to transmit for one execution attempt.
    ///
    /// Replayable bodies return a fresh stream every time. An opaque body
    /// hands out its original stream once; later attempts get whatever is
    /// left of it, which is nothing.
    pub fn stream_for_attempt(&mut self) -> Box<dyn Read + Send> {
        if let Some(replay) = &self.replay {
            return replay();
        }
        match std::mem::replace(&mut self.stream, Stream::Reader(Box::new(io::empty()))) {
            Stream::Empty => Box::new(io::empty()),
            Stream::Reader(reader) => reader,
        }
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stream {
            Stream::Empty => Ok(0),
            Stream::Reader(reader) => reader.read(buf),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("empty", &self.is_empty())
            .field("replayable", &self.is_replayable())
            .field("content_length", &self.content_length)
            .finish()
    }
}

impl From<BodySource> for Body {
    fn from(source: BodySource) -> Self {
        materialize(source)
    }
}

/// Turn a body source into a [`Body`].
///
/// In-memory sources are snapshotted from their current read position:
/// the length is the number of unread bytes, and the replay function
/// serves that snapshot regardless of what later happens to the
/// original stream. A replayable source with nothing left to read
/// becomes [`Body::empty`].
pub fn materialize(source: BodySource) -> Body {
    match source {
        BodySource::Buffer(buf) => Body::from_bytes(buf.freeze()),
        BodySource::Slice(cursor) => {
            let position = cursor.position();
            Body::from_bytes(unread(cursor.into_inner(), position))
        }
        BodySource::Text(cursor) => {
            let position = cursor.position();
            Body::from_bytes(unread(Bytes::from(cursor.into_inner()), position))
        }
        BodySource::Reader(reader) => Body {
            stream: Stream::Reader(reader),
            replay: None,
            content_length: None,
        },
    }
}

fn unread(bytes: Bytes, position: u64) -> Bytes {
    let start = usize::try_from(position)
        .unwrap_or(usize::MAX)
        .min(bytes.len());
    bytes.slice(start..)
}
