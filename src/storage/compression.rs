//! Block-framed zstd streams.
//!
//! Input is cut into fixed blocks of [`FRAME_INPUT_BYTES`]; each block is compressed
//! on its own and written as `[len: i32 LE][len compressed bytes]`. A frame with
//! `len == 0` ends the stream. Because payload spans in a region file are zero
//! padded, the padding after the terminator also reads as an end marker.

use std::io::{self, Read, Write};

use crate::error::{Result, StorageError};

/// Uncompressed bytes per frame.
pub const FRAME_INPUT_BYTES: usize = 8192;
/// Upper bound accepted for a single compressed frame.
pub const MAX_FRAME_BYTES: usize = FRAME_INPUT_BYTES + FRAME_INPUT_BYTES / 2;

/// Compressing writer producing length-prefixed frames.
pub struct FrameWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
    level: i32,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W, level: i32) -> Self {
        FrameWriter {
            inner,
            buffer: Vec::with_capacity(FRAME_INPUT_BYTES),
            level,
        }
    }

    fn emit_frame(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let compressed = zstd::bulk::compress(&self.buffer, self.level)?;
        self.inner
            .write_all(&(compressed.len() as i32).to_le_bytes())?;
        self.inner.write_all(&compressed)?;
        self.buffer.clear();
        Ok(())
    }

    /// Writes any pending partial block plus the terminator frame and returns the
    /// inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.emit_frame()?;
        self.inner.write_all(&0i32.to_le_bytes())?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for FrameWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = FRAME_INPUT_BYTES - self.buffer.len();
        let taken = room.min(buf.len());
        self.buffer.extend_from_slice(&buf[..taken]);
        if self.buffer.len() == FRAME_INPUT_BYTES {
            self.emit_frame()?;
        }
        Ok(taken)
    }

    /// Flushes the inner writer only; partial blocks stay buffered until they fill
    /// up or [`FrameWriter::finish`] is called.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decompressing reader over a frame stream.
pub struct FrameReader<R: Read> {
    inner: R,
    current: Vec<u8>,
    position: usize,
    finished: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        FrameReader {
            inner,
            current: Vec::new(),
            position: 0,
            finished: false,
        }
    }

    /// Loads the next frame. Returns `false` once the terminator has been read.
    pub fn next_frame(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }

        let mut length_bytes = [0u8; 4];
        read_fully(&mut self.inner, &mut length_bytes)?;
        let length = i32::from_le_bytes(length_bytes);

        if length == 0 {
            self.finished = true;
            self.current.clear();
            self.position = 0;
            return Ok(false);
        }
        if length < 0 || length as usize > MAX_FRAME_BYTES {
            return Err(StorageError::Corrupt(format!(
                "compressed frame length {length} out of range"
            )));
        }

        let mut compressed = vec![0u8; length as usize];
        read_fully(&mut self.inner, &mut compressed)?;

        self.current = zstd::bulk::decompress(&compressed, FRAME_INPUT_BYTES)
            .map_err(|e| StorageError::Corrupt(format!("frame does not decompress: {e}")))?;
        self.position = 0;
        Ok(true)
    }

    /// Reads the remaining stream into a vector.
    pub fn read_all(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.current[self.position..]);
        while self.next_frame()? {
            out.extend_from_slice(&self.current);
        }
        Ok(out)
    }
}

impl<R: Read> Read for FrameReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.position == self.current.len() {
            let more = self
                .next_frame()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if !more {
                return Ok(0);
            }
        }

        let available = &self.current[self.position..];
        let copied = available.len().min(buf.len());
        buf[..copied].copy_from_slice(&available[..copied]);
        self.position += copied;
        Ok(copied)
    }
}

fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(StorageError::ShortRead {
                    needed: buf.len(),
                    available: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Compresses `bytes` into a complete frame stream.
pub fn compress(bytes: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut writer = FrameWriter::new(Vec::new(), level);
    writer.write_all(bytes)?;
    Ok(writer.finish()?)
}

/// Decompresses a frame stream produced by [`compress`].
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    FrameReader::new(bytes).read_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn multi_frame_stream_reads_back() {
        let input = sample(3 * FRAME_INPUT_BYTES + 100);
        let compressed = compress(&input, 3).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), input);

        let mut reader = FrameReader::new(&compressed[..]);
        let mut via_read = Vec::new();
        reader.read_to_end(&mut via_read).unwrap();
        assert_eq!(via_read, input);
    }

    #[test]
    fn empty_input_is_just_a_terminator() {
        let compressed = compress(&[], 3).unwrap();
        assert_eq!(compressed, 0i32.to_le_bytes());
        assert!(decompress(&compressed).unwrap().is_empty());
    }

    #[test]
    fn zero_padding_ends_the_stream() {
        let input = sample(500);
        let mut compressed = compress(&input, 3).unwrap();
        compressed.truncate(compressed.len() - 4);
        compressed.resize(compressed.len() + 64, 0);
        assert_eq!(decompress(&compressed).unwrap(), input);
    }

    #[test]
    fn negative_length_is_corrupt() {
        let bytes = (-5i32).to_le_bytes();
        assert!(matches!(decompress(&bytes), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn truncated_frame_is_short_read() {
        let compressed = compress(&sample(1000), 3).unwrap();
        let result = decompress(&compressed[..10]);
        assert!(matches!(result, Err(StorageError::ShortRead { .. })));
    }

    #[test]
    fn missing_terminator_is_short_read() {
        let compressed = compress(&sample(1000), 3).unwrap();
        let result = decompress(&compressed[..compressed.len() - 4]);
        assert!(matches!(
            result,
            Err(StorageError::ShortRead { needed: 4, available: 0 })
        ));
    }
}
