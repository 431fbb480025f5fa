//! Opening workload sources and reading them line by line.

use crate::utils::error::LoadError;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Open a file path or `http(s)://` URL as a buffered reader
pub fn open_reader(source: &str) -> Result<Box<dyn BufRead>, LoadError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        debug!("Fetching workload from: {}", source);
        let response = reqwest::blocking::get(source)
            .and_then(|r| r.error_for_status())
            .map_err(|e| LoadError::Fetch {
                url: source.to_string(),
                source: e,
            })?;
        return Ok(Box::new(BufReader::new(response)));
    }

    debug!("Opening workload file: {}", source);
    let file = File::open(source)?;
    Ok(Box::new(BufReader::new(file)))
}

/// Line reader that tracks positions and holds the first fatal error.
///
/// Once `fail` has been called no further lines are produced.
pub(crate) struct LineSource {
    reader: Box<dyn BufRead>,
    line_number: usize,
    buf: String,
    error: Option<LoadError>,
    done: bool,
}

impl LineSource {
    pub fn open(source: &str) -> Result<Self, LoadError> {
        Ok(Self::new(open_reader(source)?))
    }

    pub fn new(reader: Box<dyn BufRead>) -> Self {
        Self {
            reader,
            line_number: 0,
            buf: String::new(),
            error: None,
            done: false,
        }
    }

    /// Next line with its 1-based number, terminator removed
    pub fn next_line(&mut self) -> Option<(usize, String)> {
        if self.done {
            return None;
        }

        self.buf.clear();
        match self.reader.read_line(&mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                self.line_number += 1;
                let line = self.buf.trim_end_matches(['\n', '\r']).to_string();
                Some((self.line_number, line))
            }
            Err(e) => {
                self.fail(LoadError::Io(e));
                None
            }
        }
    }

    /// Record a fatal error; only the first one is kept
    pub fn fail(&mut self, err: LoadError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.done = true;
    }

    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Surface the stored failure, if any
    pub fn close(&mut self) -> Result<(), LoadError> {
        self.done = true;
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
