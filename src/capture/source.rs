//! Frame sources.
//!
//! The shipped source reads headerless 8-bit grayscale frames of a fixed
//! size, which is what `ffmpeg -f rawvideo -pix_fmt gray` produces.

use crate::capture::types::Frame;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Something that yields frames until end of stream.
pub trait FrameSource {
    /// Next frame, `Ok(None)` at a clean end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

/// Errors that stop frame capture.
#[derive(Debug)]
pub enum CaptureError {
    /// Frame dimensions were zero
    InvalidDimensions { width: usize, height: usize },
    /// Could not open the source
    Open(String),
    /// Read failed mid-stream
    Io(String),
    /// Stream ended partway through a frame
    Truncated { expected: usize, got: usize },
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::InvalidDimensions { width, height } => {
                write!(f, "Invalid frame dimensions {width}x{height}")
            }
            CaptureError::Open(e) => write!(f, "Could not open capture source: {e}"),
            CaptureError::Io(e) => write!(f, "Capture read error: {e}"),
            CaptureError::Truncated { expected, got } => {
                write!(f, "Truncated frame: expected {expected} bytes, got {got}")
            }
        }
    }
}

impl std::error::Error for CaptureError {}

/// Reads fixed-size raw grayscale frames from any byte stream.
pub struct RawFrameReader<R: Read> {
    reader: R,
    width: usize,
    height: usize,
}

impl<R: Read> RawFrameReader<R> {
    pub fn new(reader: R, width: usize, height: usize) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::InvalidDimensions { width, height });
        }
        Ok(Self {
            reader,
            width,
            height,
        })
    }

    fn frame_len(&self) -> usize {
        self.width * self.height
    }
}

impl RawFrameReader<BufReader<File>> {
    /// Open a raw frame file.
    pub fn open(path: &Path, width: usize, height: usize) -> Result<Self, CaptureError> {
        let file = File::open(path).map_err(|e| CaptureError::Open(format!("{path:?}: {e}")))?;
        Self::new(BufReader::new(file), width, height)
    }
}

impl<R: Read> FrameSource for RawFrameReader<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let expected = self.frame_len();
        let mut buf = vec![0u8; expected];
        let mut filled = 0;

        while filled < expected {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CaptureError::Io(e.to_string())),
            }
        }

        match filled {
            0 => Ok(None),
            n if n < expected => Err(CaptureError::Truncated { expected, got: n }),
            _ => Ok(Frame::new(self.width, self.height, buf)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_frames_until_eof() {
        let bytes: Vec<u8> = (0..12).collect();
        let mut reader = RawFrameReader::new(Cursor::new(bytes), 3, 2).unwrap();

        let first = reader.next_frame().unwrap().unwrap();
        assert_eq!(first.luma(), &[0, 1, 2, 3, 4, 5]);
        let second = reader.next_frame().unwrap().unwrap();
        assert_eq!(second.luma(), &[6, 7, 8, 9, 10, 11]);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_partial_frame_is_an_error() {
        let mut reader = RawFrameReader::new(Cursor::new(vec![0u8; 8]), 3, 2).unwrap();
        assert!(reader.next_frame().unwrap().is_some());
        assert!(matches!(
            reader.next_frame(),
            Err(CaptureError::Truncated {
                expected: 6,
                got: 2
            })
        ));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(RawFrameReader::new(Cursor::new(Vec::new()), 0, 4).is_err());
    }
}
