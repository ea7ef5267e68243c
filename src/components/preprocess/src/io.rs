use derive_more::IsVariant;
use std::{
    io::{ErrorKind, Read, Write},
    sync::Arc,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum ReadStatus {
    /// This many bytes were placed in the buffer
    Data(usize),
    /// Nothing available right now, more input may arrive later
    WouldBlock,
    /// No more input will ever arrive
    End,
}

/// Source of input chunks.
///
/// Once `End` has been returned, every later call must return `End` again.
pub trait Readable {
    fn read_chunk(&mut self, buffer: &mut Vec<u8>) -> std::io::Result<ReadStatus>;
}

/// Destination of preprocessed output
pub trait Sink {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Called after each processed chunk
    fn commit(&mut self) -> std::io::Result<()>;
}

impl<W: Write> Sink for W {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.write_all(bytes)
    }

    fn commit(&mut self) -> std::io::Result<()> {
        self.flush()
    }
}

/// Chunked input over anything implementing [`Read`]
pub struct ReaderInput<R: Read> {
    reader: R,
    chunk_size: usize,
    ended: bool,
}

impl<R: Read> ReaderInput<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            ended: false,
        }
    }
}

impl<R: Read> Readable for ReaderInput<R> {
    fn read_chunk(&mut self, buffer: &mut Vec<u8>) -> std::io::Result<ReadStatus> {
        if self.ended {
            return Ok(ReadStatus::End);
        }

        buffer.resize(self.chunk_size, 0);

        match self.reader.read(buffer) {
            Ok(0) => {
                buffer.clear();
                self.ended = true;
                Ok(ReadStatus::End)
            }
            Ok(count) => {
                buffer.truncate(count);
                Ok(ReadStatus::Data(count))
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                buffer.clear();
                Ok(ReadStatus::WouldBlock)
            }
            Err(err) => Err(err),
        }
    }
}

/// In-memory input delivered in fixed-size chunks.
///
/// When stalling, every chunk is preceded by a `WouldBlock`, which mimics
/// input that trickles in from a slow source.
#[derive(Clone, Debug)]
pub struct MemoryInput {
    content: Arc<[u8]>,
    position: usize,
    chunk_size: usize,
    stalling: bool,
    stalled: bool,
}

impl MemoryInput {
    pub fn new(content: impl Into<Arc<[u8]>>, chunk_size: usize) -> Self {
        Self {
            content: content.into(),
            position: 0,
            chunk_size: chunk_size.max(1),
            stalling: false,
            stalled: false,
        }
    }

    pub fn stalling(self) -> Self {
        Self {
            stalling: true,
            ..self
        }
    }
}

impl Readable for MemoryInput {
    fn read_chunk(&mut self, buffer: &mut Vec<u8>) -> std::io::Result<ReadStatus> {
        buffer.clear();

        if self.position >= self.content.len() {
            return Ok(ReadStatus::End);
        }

        if self.stalling && !self.stalled {
            self.stalled = true;
            return Ok(ReadStatus::WouldBlock);
        }

        self.stalled = false;

        let end = (self.position + self.chunk_size).min(self.content.len());
        buffer.extend_from_slice(&self.content[self.position..end]);
        self.position = end;
        Ok(ReadStatus::Data(buffer.len()))
    }
}

#[test]
fn test_memory_input_chunks() {
    let mut input = MemoryInput::new(&b"abcde"[..], 2);
    let mut buffer = Vec::new();
    let mut chunks = Vec::new();

    while let ReadStatus::Data(_) = input.read_chunk(&mut buffer).unwrap() {
        chunks.push(String::from_utf8(buffer.clone()).unwrap());
    }

    assert_eq!(chunks, ["ab", "cd", "e"]);
    assert_eq!(input.read_chunk(&mut buffer).unwrap(), ReadStatus::End);
}

#[test]
fn test_memory_input_stalls_between_chunks() {
    let mut input = MemoryInput::new(&b"abc"[..], 2).stalling();
    let mut buffer = Vec::new();

    assert_eq!(input.read_chunk(&mut buffer).unwrap(), ReadStatus::WouldBlock);
    assert_eq!(input.read_chunk(&mut buffer).unwrap(), ReadStatus::Data(2));
    assert_eq!(input.read_chunk(&mut buffer).unwrap(), ReadStatus::WouldBlock);
    assert_eq!(input.read_chunk(&mut buffer).unwrap(), ReadStatus::Data(1));
    assert_eq!(input.read_chunk(&mut buffer).unwrap(), ReadStatus::End);
}

#[test]
fn test_reader_input_reaches_end() {
    let mut input = ReaderInput::new(&b"xyz"[..], 8);
    let mut buffer = Vec::new();

    assert_eq!(input.read_chunk(&mut buffer).unwrap(), ReadStatus::Data(3));
    assert_eq!(buffer, b"xyz");
    assert_eq!(input.read_chunk(&mut buffer).unwrap(), ReadStatus::End);
    assert_eq!(input.read_chunk(&mut buffer).unwrap(), ReadStatus::End);
}
