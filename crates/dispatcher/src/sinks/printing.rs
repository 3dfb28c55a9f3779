//! PrintingSink - writes `param timestamp value` lines

use std::io::{self, Stdout, Write};

use contracts::{Sink, SinkError, Timestamp};

/// Sink that prints every reading on its own line
pub struct PrintingSink<W = Stdout> {
    name: String,
    out: W,
}

impl PrintingSink<Stdout> {
    /// Print to standard output
    pub fn stdout(name: impl Into<String>) -> Self {
        Self::new(name, io::stdout())
    }
}

impl<W: Write + Send> PrintingSink<W> {
    pub fn new(name: impl Into<String>, out: W) -> Self {
        Self {
            name: name.into(),
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Sink for PrintingSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_value(
        &mut self,
        param_name: &str,
        timestamp: Timestamp,
        value: f64,
    ) -> Result<(), SinkError> {
        writeln!(self.out, "{param_name} {timestamp} {value}")
            .map_err(|e| SinkError::process(&self.name, param_name, e.to_string()))
    }

    fn finalise(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}
