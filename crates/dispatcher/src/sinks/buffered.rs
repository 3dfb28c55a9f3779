//! BufferedSink - collects readings per parameter and writes them on finalise
//!
//! Timestamps are rounded to a fixed resolution before buffering, so a
//! reading landing on an already-buffered slot replaces it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DurationRound, TimeDelta};
use contracts::{Sink, SinkError, Timestamp};
use tracing::{debug, error, info, instrument};

use crate::error::FeedError;

/// Rounding resolution for buffered timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Second,
    Minute,
    Hour,
    Day,
}

impl Resolution {
    fn step(self) -> TimeDelta {
        match self {
            Self::Second => TimeDelta::seconds(1),
            Self::Minute => TimeDelta::minutes(1),
            Self::Hour => TimeDelta::hours(1),
            Self::Day => TimeDelta::days(1),
        }
    }

    /// Round to the nearest multiple of the resolution, halves rounding up
    pub fn round(self, timestamp: Timestamp) -> Result<Timestamp, chrono::RoundingError> {
        timestamp.duration_round(self.step())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s" | "second" | "seconds" => Ok(Self::Second),
            "min" | "minute" | "minutes" => Ok(Self::Minute),
            "h" | "hour" | "hours" => Ok(Self::Hour),
            "d" | "day" | "days" => Ok(Self::Day),
            other => Err(format!(
                "unknown resolution '{other}', expected second, minute, hour or day"
            )),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        };
        f.write_str(name)
    }
}

/// Persists one parameter's buffered series
pub trait BufferWriter: Send {
    /// Write `series` (ascending by timestamp) for `param_name`
    fn write_buffer(
        &mut self,
        param_name: &str,
        series: &BTreeMap<Timestamp, f64>,
    ) -> std::io::Result<()>;
}

/// Sink buffering readings until `finalise`
pub struct BufferedSink<W> {
    name: String,
    resolution: Resolution,
    buffers: HashMap<String, BTreeMap<Timestamp, f64>>,
    writer: W,
}

impl<W: BufferWriter> BufferedSink<W> {
    pub fn new(name: impl Into<String>, resolution: Resolution, writer: W) -> Self {
        Self {
            name: name.into(),
            resolution,
            buffers: HashMap::new(),
            writer,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Number of readings waiting for `param_name`
    pub fn buffered(&self, param_name: &str) -> usize {
        self.buffers.get(param_name).map_or(0, BTreeMap::len)
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<W: BufferWriter> Sink for BufferedSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_value(
        &mut self,
        param_name: &str,
        timestamp: Timestamp,
        value: f64,
    ) -> Result<(), SinkError> {
        let slot = self
            .resolution
            .round(timestamp)
            .map_err(|e| SinkError::process(&self.name, param_name, e.to_string()))?;

        self.buffers
            .entry(param_name.to_string())
            .or_default()
            .insert(slot, value);
        Ok(())
    }

    #[instrument(name = "buffered_sink_finalise", skip(self), fields(sink = %self.name))]
    fn finalise(&mut self) -> Result<(), SinkError> {
        let mut params: Vec<String> = self.buffers.keys().cloned().collect();
        params.sort();

        let mut failed = Vec::new();
        for param in params {
            let Some(series) = self.buffers.get(&param) else {
                continue;
            };
            if series.is_empty() {
                continue;
            }
            match self.writer.write_buffer(&param, series) {
                Ok(()) => {
                    debug!(sink = %self.name, param = %param, points = series.len(), "buffer written");
                    self.buffers.remove(&param);
                }
                Err(e) => {
                    error!(sink = %self.name, param = %param, error = %e, "buffer write failed");
                    failed.push(format!("{param}: {e}"));
                }
            }
        }

        if failed.is_empty() {
            info!(sink = %self.name, "buffers flushed");
            Ok(())
        } else {
            Err(SinkError::finalise(&self.name, failed.join("; ")))
        }
    }
}

/// Appends `timestamp,value` rows to `<dir>/<param>.csv`
#[derive(Debug, Clone)]
pub struct CsvWriter {
    dir: PathBuf,
}

impl CsvWriter {
    /// Create the writer, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File receiving `param_name`'s rows
    pub fn path_for(&self, param_name: &str) -> PathBuf {
        let file: String = param_name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{file}.csv"))
    }
}

impl BufferWriter for CsvWriter {
    fn write_buffer(
        &mut self,
        param_name: &str,
        series: &BTreeMap<Timestamp, f64>,
    ) -> std::io::Result<()> {
        let path = self.path_for(param_name);
        let is_new = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut out = BufWriter::new(file);

        if is_new {
            writeln!(out, "timestamp,value")?;
        }
        for (timestamp, value) in series {
            writeln!(out, "{},{value}", timestamp.to_rfc3339())?;
        }
        out.flush()
    }
}

/// Buffered sink persisting to CSV files
pub type CsvSink = BufferedSink<CsvWriter>;

impl CsvSink {
    /// Create from params map (for the component registry)
    ///
    /// Recognised params: `dir` (default `./output`) and `resolution`
    /// (default `second`).
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, FeedError> {
        let name = name.into();
        let resolution = match params.get("resolution") {
            Some(raw) => raw
                .parse::<Resolution>()
                .map_err(|e| FeedError::sink_creation(&name, e))?,
            None => Resolution::default(),
        };
        let dir = params
            .get("dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));
        let writer =
            CsvWriter::new(dir).map_err(|e| FeedError::sink_creation(&name, e.to_string()))?;

        Ok(Self::new(name, resolution, writer))
    }
}
