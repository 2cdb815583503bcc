//! Line Source - Seekless reader over a delimited text stream
//!
//! The header line and the first data line are read (and cached) when the
//! source is opened, so callers can inspect them before iterating and then
//! visit every data row, the first one included, in a single loop. Nothing is
//! ever re-read: pipes and stdin work the same as regular files.

use crate::error::{Result, SqawkError};
use crate::ingestion::tokenizer::{count_fields, strip_line_terminator, tokenize, Row};
use regex::Regex;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// How to open a [`LineSource`]
#[derive(Clone, Debug)]
pub struct LineSourceOptions {
    pub separator: char,

    /// Skip leading lines until one matches this pattern
    pub preamble: Option<String>,

    /// First line is data; column names are synthesized
    pub no_header: bool,

    /// Copy skipped preamble lines to the side channel
    pub echo_skipped: bool,
}

impl Default for LineSourceOptions {
    fn default() -> Self {
        Self {
            separator: '\t',
            preamble: None,
            no_header: false,
            echo_skipped: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReadState {
    NotStarted,
    FirstRowPending,
    Streaming,
    Exhausted,
}

pub struct LineSource<R> {
    reader: R,
    separator: char,
    header_line: Option<String>,
    first_data_line: String,
    first_data_line_no: usize,
    field_count: usize,
    rows_emitted: u64,
    lines_read: usize,
    eof: bool,
    state: ReadState,
}

impl<R: BufRead> LineSource<R> {
    /// Open a source over `reader`, consuming the preamble (if a pattern is
    /// given), the header (unless `no_header`) and the first data line.
    ///
    /// Skipped preamble lines are written verbatim to `skipped` when
    /// `echo_skipped` is set.
    pub fn open(reader: R, options: &LineSourceOptions, skipped: &mut dyn Write) -> Result<Self> {
        let preamble = options
            .preamble
            .as_deref()
            .map(Regex::new)
            .transpose()?;

        let mut source = Self {
            reader,
            separator: options.separator,
            header_line: None,
            first_data_line: String::new(),
            first_data_line_no: 0,
            field_count: 0,
            rows_emitted: 0,
            lines_read: 0,
            eof: false,
            state: ReadState::NotStarted,
        };

        let first = match preamble {
            Some(re) => source.skip_preamble(&re, options.echo_skipped, skipped)?,
            None => source.read_raw_line()?,
        };
        let first = first.ok_or_else(|| unexpected_eof("stream ended before the first line"))?;

        source.field_count = count_fields(&first, source.separator);

        if options.no_header {
            source.first_data_line = first;
            source.first_data_line_no = source.lines_read;
        } else {
            source.header_line = Some(first);
            let data = source
                .read_raw_line()?
                .ok_or_else(|| unexpected_eof("stream ended before the first data line"))?;
            source.first_data_line = data;
            source.first_data_line_no = source.lines_read;
        }

        debug!(
            "Opened line source: {} field(s), header {}",
            source.field_count,
            if source.header_line.is_some() { "present" } else { "absent" }
        );

        source.state = ReadState::FirstRowPending;
        Ok(source)
    }

    fn skip_preamble(
        &mut self,
        pattern: &Regex,
        echo: bool,
        skipped: &mut dyn Write,
    ) -> Result<Option<String>> {
        while let Some(line) = self.read_raw_line()? {
            if pattern.is_match(strip_line_terminator(&line)) {
                return Ok(Some(line));
            }
            if echo {
                skipped.write_all(line.as_bytes())?;
            }
        }
        if echo {
            skipped.flush()?;
        }
        Ok(None)
    }

    fn read_raw_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            self.eof = true;
            return Ok(None);
        }
        // An unterminated line can only be the last one
        if buf.last() != Some(&b'\n') {
            self.eof = true;
        }
        self.lines_read += 1;
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    pub fn field_count(&self) -> usize {
        self.field_count
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// The header line as read, terminator included; `None` with `no_header`.
    pub fn header(&self) -> Option<&str> {
        self.header_line.as_deref()
    }

    /// Column names from the header, or `f1`, `f2`, ... when there is none.
    pub fn header_fields(&self) -> Result<Row> {
        match &self.header_line {
            Some(header) => self.split(header, 1),
            None => Ok((1..=self.field_count).map(|i| format!("f{}", i)).collect()),
        }
    }

    pub fn first_data_line(&self) -> &str {
        &self.first_data_line
    }

    pub fn first_data_fields(&self) -> Result<Row> {
        self.split(&self.first_data_line, self.first_data_line_no)
    }

    /// Next data line, terminator included. The first call returns the
    /// cached first data line; `None` once the stream is drained.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        match self.state {
            ReadState::FirstRowPending => {
                self.state = ReadState::Streaming;
                self.rows_emitted += 1;
                Ok(Some(self.first_data_line.clone()))
            }
            ReadState::Streaming => match self.read_raw_line()? {
                Some(line) => {
                    self.rows_emitted += 1;
                    Ok(Some(line))
                }
                None => {
                    self.state = ReadState::Exhausted;
                    Ok(None)
                }
            },
            ReadState::NotStarted | ReadState::Exhausted => Ok(None),
        }
    }

    /// Next data row split into fields; same sequencing as [`Self::next_line`].
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        let first = self.state == ReadState::FirstRowPending;
        let line = match self.next_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        let line_no = if first { self.first_data_line_no } else { self.lines_read };
        self.split(&line, line_no).map(Some)
    }

    /// Rows handed out so far by `next_line`/`next_row`.
    pub fn rows_emitted(&self) -> u64 {
        self.rows_emitted
    }

    /// Whether the underlying stream has reported end of input.
    pub fn at_end(&self) -> bool {
        self.eof
    }

    fn split(&self, line: &str, line_no: usize) -> Result<Row> {
        tokenize(line, self.separator, self.field_count).map_err(|e| SqawkError::MalformedRow {
            line: line_no,
            expected: e.expected,
            found: e.found,
        })
    }
}

fn unexpected_eof(msg: &str) -> SqawkError {
    SqawkError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, msg.to_string()))
}
