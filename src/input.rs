//! Sample sources
//!
//! A sample is one top-level JSON object. Documents yield their object (or
//! the objects of a top-level array); line-delimited input yields one
//! object per line and skips anything else.

use serde_json::{Map, Value};
use std::io::{BufRead, Cursor, Read};
use std::str::FromStr;
use tracing::debug;

use crate::error::{Error, Result};

pub type Sample = Map<String, Value>;

/// How the input bytes are split into samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// One document if the whole input parses, otherwise lines
    #[default]
    Auto,
    /// A single object or an array of objects
    Document,
    /// Newline-delimited objects, read as a stream
    Lines,
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "auto" => Ok(InputMode::Auto),
            "document" => Ok(InputMode::Document),
            "lines" => Ok(InputMode::Lines),
            other => Err(format!(
                "unknown input mode '{}' (expected auto, document or lines)",
                other
            )),
        }
    }
}

/// Iterator over the samples of one input
pub enum SampleSource<'a> {
    Document {
        samples: std::vec::IntoIter<Sample>,
        total: usize,
    },
    Lines(LineSamples<'a>),
}

impl<'a> SampleSource<'a> {
    /// Open `reader` in the given mode
    ///
    /// Document parsing happens here, so document errors surface before any
    /// sample is handed out.
    pub fn open<R: BufRead + 'a>(mut reader: R, mode: InputMode) -> Result<Self> {
        match mode {
            InputMode::Lines => Ok(SampleSource::Lines(LineSamples::new(Box::new(reader)))),
            InputMode::Document => {
                let mut content = Vec::new();
                reader.read_to_end(&mut content)?;
                let value = parse_document(&content)?;
                SampleSource::from_document(value)
            }
            InputMode::Auto => {
                let mut content = Vec::new();
                reader.read_to_end(&mut content)?;
                match parse_document(&content) {
                    Ok(value) => SampleSource::from_document(value),
                    Err(err) => {
                        debug!(error = %err, "input is not a single document, reading lines");
                        Ok(SampleSource::Lines(LineSamples::new(Box::new(Cursor::new(content)))))
                    }
                }
            }
        }
    }

    fn from_document(value: Value) -> Result<Self> {
        let samples: Vec<Sample> = match value {
            Value::Object(obj) => vec![obj],
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(Error::EmptyInput);
                }
                let count = items.len();
                let objects: Vec<Sample> = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(obj) => Some(obj),
                        _ => None,
                    })
                    .collect();
                if objects.len() < count {
                    debug!(skipped = count - objects.len(), "skipped non-object array elements");
                }
                objects
            }
            other => {
                return Err(Error::input(format!(
                    "top-level value is {}, expected an object or an array of objects",
                    describe(&other)
                )))
            }
        };

        if samples.is_empty() {
            return Err(Error::EmptyInput);
        }

        let total = samples.len();
        Ok(SampleSource::Document {
            samples: samples.into_iter(),
            total,
        })
    }

    /// Number of samples, when known up front
    pub fn total_hint(&self) -> Option<usize> {
        match self {
            SampleSource::Document { total, .. } => Some(*total),
            SampleSource::Lines(_) => None,
        }
    }

    /// Lines skipped so far as malformed or non-object
    pub fn skipped(&self) -> usize {
        match self {
            SampleSource::Document { .. } => 0,
            SampleSource::Lines(lines) => lines.skipped,
        }
    }
}

impl Iterator for SampleSource<'_> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SampleSource::Document { samples, .. } => samples.next().map(Ok),
            SampleSource::Lines(lines) => lines.next(),
        }
    }
}

/// Streaming reader of newline-delimited objects
pub struct LineSamples<'a> {
    reader: Box<dyn BufRead + 'a>,
    buffer: Vec<u8>,
    line: usize,
    skipped: usize,
}

impl<'a> LineSamples<'a> {
    pub fn new(reader: Box<dyn BufRead + 'a>) -> Self {
        LineSamples {
            reader,
            buffer: Vec::new(),
            line: 0,
            skipped: 0,
        }
    }
}

impl Iterator for LineSamples<'_> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            // bytes, so a line that is not UTF-8 is skipped like any other
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => return Some(Err(err.into())),
            }
            self.line += 1;

            if self.buffer.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<Value>(&self.buffer) {
                Ok(Value::Object(obj)) => return Some(Ok(obj)),
                Ok(other) => {
                    debug!(line = self.line, kind = describe(&other), "skipping non-object line");
                    self.skipped += 1;
                }
                Err(err) => {
                    debug!(line = self.line, error = %err, "skipping malformed line");
                    self.skipped += 1;
                }
            }
        }
    }
}

/// Parse a complete document with the SIMD parser
fn parse_document(content: &[u8]) -> Result<Value> {
    // the parser rewrites its buffer in place
    let mut scratch = content.to_vec();
    simd_json::serde::from_slice::<Value>(&mut scratch).map_err(|err| Error::input(err.to_string()))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
