// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Line-oriented update source.
use std::io::BufRead;
use std::sync::Arc;

use crate::error::UpdateError;
use crate::update::Update;

/// Field delimiter used when none is configured.
pub const DEFAULT_DELIMITER: char = ',';

/// Reads delimiter-separated update records, one per line.
///
/// Blank lines are skipped. Each record must carry 7 fields
/// `(op, u, v, w, label_u, label_v, edge_label)` or 8 with a trailing integer
/// timestamp. Malformed lines are yielded as errors and iteration continues
/// with the next line; callers decide whether to stop.
pub struct UpdateReader<R> {
    inner: R,
    delimiter: char,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> UpdateReader<R> {
    /// Wraps a buffered reader using [`DEFAULT_DELIMITER`].
    pub fn new(inner: R) -> Self {
        Self::with_delimiter(inner, DEFAULT_DELIMITER)
    }

    /// Wraps a buffered reader with an explicit field delimiter.
    pub fn with_delimiter(inner: R, delimiter: char) -> Self {
        Self {
            inner,
            delimiter,
            line_no: 0,
            buf: String::new(),
        }
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for UpdateReader<R> {
    type Item = Result<Update, UpdateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => return Some(Err(UpdateError::Io(err))),
            }
            self.line_no += 1;
            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            return Some(parse_line(line, self.delimiter, self.line_no));
        }
    }
}

/// Parses one record. `line` is used for error reporting only.
pub(crate) fn parse_line(text: &str, delimiter: char, line: usize) -> Result<Update, UpdateError> {
    let fields: Vec<&str> = text.split(delimiter).map(str::trim).collect();
    if fields.len() != 7 && fields.len() != 8 {
        return Err(UpdateError::FieldCount {
            line,
            found: fields.len(),
        });
    }
    if fields[1].is_empty() {
        return Err(UpdateError::EmptyField { line, field: "u" });
    }
    if fields[2].is_empty() {
        return Err(UpdateError::EmptyField { line, field: "v" });
    }
    let timestamp = match fields.get(7) {
        Some(raw) => Some(raw.parse().map_err(|_| UpdateError::Timestamp {
            line,
            value: (*raw).to_owned(),
        })?),
        None => None,
    };
    Ok(Update {
        op: fields[0].to_owned(),
        u: Arc::from(fields[1]),
        v: Arc::from(fields[2]),
        weight: fields[3].to_owned(),
        label_u: fields[4].to_owned(),
        label_v: fields[5].to_owned(),
        edge_label: fields[6].to_owned(),
        timestamp,
    })
}
