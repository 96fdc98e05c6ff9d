// Refrain - A Statsd client that keeps your gauges fresh!
//
// Copyright 2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io::{self, Write};
use std::mem;

#[derive(Debug, Default)]
struct WriterMetrics {
    inner_write: u64,
    buf_write: u64,
    flushed: u64,
}

/// Buffered implementation of the `Write` trait that joins each input
/// with a line separator and writes up to `capacity` lines in a single
/// call to the underlying writer.
///
/// Each call to `write` is treated as one complete line. Once the number
/// of buffered lines reaches the capacity, all of them are written to the
/// underlying writer as one payload. A capacity of `None` means lines are
/// only written when the writer is flushed or dropped.
///
/// The separator is only placed *between* lines, the payload passed to the
/// underlying writer never ends with one.
#[derive(Debug)]
pub struct MultiLineWriter<T>
where
    T: Write,
{
    lines: usize,
    capacity: Option<usize>,
    metrics: WriterMetrics,
    buf: Vec<u8>,
    inner: T,
    line_ending: Vec<u8>,
}

impl<T> MultiLineWriter<T>
where
    T: Write,
{
    /// Create a new buffered `MultiLineWriter` instance that separates
    /// lines with a newline character ('\n').
    pub fn new(inner: T, cap: Option<usize>) -> MultiLineWriter<T> {
        Self::with_ending(inner, cap, "\n")
    }

    /// Create a new buffered `MultiLineWriter` instance that separates
    /// lines with the given line ending.
    pub fn with_ending(inner: T, cap: Option<usize>, end: &str) -> MultiLineWriter<T> {
        MultiLineWriter {
            lines: 0,
            capacity: normalize(cap),
            metrics: WriterMetrics::default(),
            buf: Vec::new(),
            inner,
            line_ending: Vec::from(end.as_bytes()),
        }
    }

    /// Gets a reference to the underlying writer.
    #[allow(dead_code)]
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Number of lines that will be written together.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Change the number of lines written together.
    ///
    /// If the lines already buffered meet the new capacity, they are
    /// written to the underlying writer immediately.
    pub fn set_capacity(&mut self, cap: Option<usize>) -> io::Result<()> {
        self.capacity = normalize(cap);
        if self.is_full() {
            self.flush()?;
        }

        Ok(())
    }

    /// Number of lines buffered but not yet written.
    pub fn buffered(&self) -> usize {
        self.lines
    }

    fn is_full(&self) -> bool {
        match self.capacity {
            Some(cap) => self.lines >= cap,
            None => false,
        }
    }

    #[allow(dead_code)]
    fn get_metrics(&self) -> &WriterMetrics {
        &self.metrics
    }
}

impl<T> Write for MultiLineWriter<T>
where
    T: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.lines > 0 {
            self.buf.extend_from_slice(&self.line_ending);
        }

        self.metrics.buf_write += 1;
        self.buf.extend_from_slice(buf);
        self.lines += 1;

        if self.is_full() {
            self.flush()?;
        }

        // Only the number of bytes from the provided buffer are returned
        // per the `Write::write` contract, not the separators.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.lines == 0 {
            return self.inner.flush();
        }

        // Buffered lines are discarded even if the write fails so that a
        // broken writer doesn't cause them to be sent twice.
        let payload = mem::take(&mut self.buf);
        self.lines = 0;
        self.metrics.flushed += 1;
        self.metrics.inner_write += 1;
        self.inner.write(&payload)?;
        self.inner.flush()
    }
}

impl<T> Drop for MultiLineWriter<T>
where
    T: Write,
{
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn normalize(cap: Option<usize>) -> Option<usize> {
    cap.map(|c| c.max(1))
}
