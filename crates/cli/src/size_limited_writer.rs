// vm-sample - Bytecode VM Sample Payload
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::io::{self, Write};

/// Wraps a `Write` and keeps at most `max_bytes` of what is written to it.
/// Bytes past the cap are counted and dropped; writes never fail because of
/// the cap.
pub struct SizeLimitedWriter<W: Write> {
    inner: W,
    max_bytes: u64,
    written: u64,
    dropped: u64,
}

impl<W: Write> SizeLimitedWriter<W> {
    pub fn new(inner: W, max_bytes: u64) -> Self {
        Self {
            inner,
            max_bytes,
            written: 0,
            dropped: 0,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn bytes_dropped(&self) -> u64 {
        self.dropped
    }

    /// True once any byte has been dropped.
    pub fn limit_exceeded(&self) -> bool {
        self.dropped > 0
    }
}

impl<W: Write> Write for SizeLimitedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = self.max_bytes.saturating_sub(self.written);
        let keep = buf
            .len()
            .min(usize::try_from(remaining).unwrap_or(usize::MAX));

        if keep > 0 {
            let n = self.inner.write(&buf[..keep])?;
            self.written += n as u64;
            if n < keep {
                return Ok(n);
            }
        }

        self.dropped += (buf.len() - keep) as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_limit() {
        let mut writer = SizeLimitedWriter::new(Vec::new(), 100);

        writer.write_all(b"Hello").unwrap();
        assert_eq!(writer.bytes_written(), 5);
        assert!(!writer.limit_exceeded());
        assert_eq!(writer.get_ref(), b"Hello");
    }

    #[test]
    fn test_exactly_at_limit_is_not_exceeded() {
        let mut writer = SizeLimitedWriter::new(Vec::new(), 5);

        writer.write_all(b"Hello").unwrap();
        assert!(!writer.limit_exceeded());

        writer.write_all(b" World").unwrap();
        assert_eq!(writer.bytes_written(), 5);
        assert_eq!(writer.bytes_dropped(), 6);
        assert!(writer.limit_exceeded());
        assert_eq!(writer.get_ref(), b"Hello");
    }

    #[test]
    fn test_split_write_keeps_prefix() {
        let mut writer = SizeLimitedWriter::new(Vec::new(), 10);

        writer.write_all(b"Hello World!").unwrap();
        assert_eq!(writer.bytes_written(), 10);
        assert_eq!(writer.bytes_dropped(), 2);
        assert_eq!(writer.get_ref(), b"Hello Worl");
    }
}
