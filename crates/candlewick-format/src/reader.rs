//! Line-oriented tick import.

use std::io::{BufRead, Lines};

use candlewick_types::Tick;

use crate::{FormatError, InputFormat};

/// Iterator over ticks read from a CSV or NDJSON source.
///
/// Blank lines and lines starting with `#` are skipped, as is a leading CSV
/// header. Each bad row yields an error carrying its line number and the
/// iterator keeps going.
#[derive(Debug)]
pub struct TickReader<R> {
    lines: Lines<R>,
    format: InputFormat,
    line_no: usize,
}

impl<R: BufRead> TickReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R, format: InputFormat) -> Self {
        Self {
            lines: reader.lines(),
            format,
            line_no: 0,
        }
    }

    /// Returns the number of lines consumed so far.
    #[must_use]
    pub const fn line_no(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for TickReader<R> {
    type Item = Result<Tick, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if self.format == InputFormat::Csv && self.line_no == 1 && crate::csv::is_tick_header(line) {
                continue;
            }
            return Some(match self.format {
                InputFormat::Csv => crate::csv::parse_tick_row(line, self.line_no),
                InputFormat::Ndjson => crate::json::parse_tick_line(line, self.line_no),
            });
        }
    }
}
