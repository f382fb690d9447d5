//! Result sinks
//!
//! Each sink is one output CSV file plus the single background thread that
//! owns it. Any thread may submit records through a [`SinkHandle`]; the
//! writer applies them in the order the submissions completed. Closing a sink
//! queues a close command behind every earlier write, so `close()` returns only
//! once everything submitted before it is on disk.
//!
//! A sink that ends up with no records deletes its file.

use crossbeam_channel::{unbounded, Receiver, Sender};
use rlcheck_core::{Error, IndicatorRecord, Result, StatEvent};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tracing::{debug, error, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Which partition a sink collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkRole {
    /// Already blocked by the existing policy
    Blocked,
    /// Needs to be added to the policy
    Policy,
    /// Unsupported or failed classification
    Error,
}

impl SinkRole {
    /// All roles, in the order sinks are opened and closed
    pub const ALL: [SinkRole; 3] = [SinkRole::Blocked, SinkRole::Policy, SinkRole::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::Policy => "policy",
            Self::Error => "error",
        }
    }

    /// `<dir>/<run stamp>_<role>_<input file name>`
    pub fn output_path(&self, dir: &Path, run_stamp: &str, input: &Path) -> PathBuf {
        let input_name = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input.csv".to_string());
        dir.join(format!("{}_{}_{}", run_stamp, self.as_str(), input_name))
    }
}

impl From<StatEvent> for SinkRole {
    fn from(event: StatEvent) -> Self {
        match event {
            StatEvent::Blocked => Self::Blocked,
            StatEvent::Policy => Self::Policy,
            StatEvent::Error => Self::Error,
        }
    }
}

impl std::fmt::Display for SinkRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkOptions {
    /// Field delimiter, must be ASCII
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Prefix the file with a UTF-8 byte order mark (spreadsheet friendly)
    #[serde(default = "default_true")]
    pub write_bom: bool,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            write_bom: true,
        }
    }
}

fn default_delimiter() -> char {
    ';'
}

fn default_true() -> bool {
    true
}

/// Commands sent to the writer thread
enum SinkCommand {
    /// Append a record
    Write(IndicatorRecord),

    /// Flush and stop
    Close,
}

/// Outcome of a closed sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub role: SinkRole,

    /// Output file, `None` when nothing was written and the file was removed
    pub path: Option<PathBuf>,

    /// Records written
    pub written: u64,

    /// Records the writer failed to encode or write
    pub failed: u64,
}

/// Cloneable submission side of a sink, handed to workers
#[derive(Clone)]
pub struct SinkHandle {
    role: SinkRole,
    sender: Sender<SinkCommand>,
}

impl SinkHandle {
    /// Queue a record for writing; returns immediately
    pub fn submit(&self, record: IndicatorRecord) -> Result<()> {
        self.sender
            .send(SinkCommand::Write(record))
            .map_err(|_| Error::output(format!("{} sink is closed", self.role)))
    }

    pub fn role(&self) -> SinkRole {
        self.role
    }
}

/// An output file owned by a dedicated writer thread
pub struct ResultSink {
    role: SinkRole,
    path: PathBuf,
    sender: Sender<SinkCommand>,
    writer: Option<JoinHandle<SinkReport>>,
}

impl ResultSink {
    /// Open the destination, write the header and start the writer thread
    ///
    /// Fails if the file cannot be created; nothing can be written safely then.
    pub fn create(
        path: impl Into<PathBuf>,
        role: SinkRole,
        schema: &[String],
        options: &SinkOptions,
    ) -> Result<Self> {
        let path = path.into();
        if !options.delimiter.is_ascii() {
            return Err(Error::config(format!(
                "output delimiter {:?} is not ASCII",
                options.delimiter
            )));
        }

        let mut file = File::create(&path)
            .map_err(|e| Error::output(format!("cannot open {}: {}", path.display(), e)))?;
        if options.write_bom {
            file.write_all(UTF8_BOM)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter as u8)
            .from_writer(file);
        writer.write_record(schema)?;
        writer.flush()?;

        let (sender, receiver) = unbounded();
        let schema = schema.to_vec();
        let writer_path = path.clone();
        let handle = std::thread::Builder::new()
            .name(format!("rlcheck-sink-{}", role))
            .spawn(move || run_writer(role, writer_path, writer, schema, receiver))?;

        debug!(role = %role, path = %path.display(), "sink opened");

        Ok(Self {
            role,
            path,
            sender,
            writer: Some(handle),
        })
    }

    /// Queue a record for writing; returns immediately
    pub fn submit(&self, record: IndicatorRecord) -> Result<()> {
        self.handle().submit(record)
    }

    /// A submission handle for other threads
    pub fn handle(&self) -> SinkHandle {
        SinkHandle {
            role: self.role,
            sender: self.sender.clone(),
        }
    }

    pub fn role(&self) -> SinkRole {
        self.role
    }

    /// Destination path (may be removed on close if left empty)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for every submitted record to be written, then release the file
    pub fn close(mut self) -> Result<SinkReport> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| Error::internal(format!("{} sink already closed", self.role)))?;

        self.sender
            .send(SinkCommand::Close)
            .map_err(|_| Error::internal(format!("{} sink writer exited early", self.role)))?;

        writer
            .join()
            .map_err(|_| Error::internal(format!("{} sink writer panicked", self.role)))
    }
}

impl Drop for ResultSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            let _ = self.sender.send(SinkCommand::Close);
            if writer.join().is_err() {
                error!(role = %self.role, "sink writer panicked");
            }
        }
    }
}

/// Writer loop; the only code that touches the file after creation
fn run_writer(
    role: SinkRole,
    path: PathBuf,
    mut writer: csv::Writer<File>,
    schema: Vec<String>,
    receiver: Receiver<SinkCommand>,
) -> SinkReport {
    let mut written = 0u64;
    let mut failed = 0u64;

    while let Ok(command) = receiver.recv() {
        match command {
            SinkCommand::Write(record) => match writer.write_record(record.values_for(&schema)) {
                Ok(()) => written += 1,
                Err(e) => {
                    failed += 1;
                    error!(role = %role, indicator = record.indicator(), "failed to write record: {}", e);
                }
            },
            SinkCommand::Close => break,
        }
    }

    if let Err(e) = writer.flush() {
        error!(role = %role, "failed to flush {}: {}", path.display(), e);
    }
    drop(writer);

    let path = if written == 0 {
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(role = %role, "failed to remove empty output {}: {}", path.display(), e);
        }
        None
    } else {
        Some(path)
    };

    debug!(role = %role, written, failed, "sink closed");

    SinkReport {
        role,
        path,
        written,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn schema() -> Vec<String> {
        rlcheck_core::output_schema(&["ThreatType", "Indicator"])
    }

    fn record(indicator: &str) -> IndicatorRecord {
        IndicatorRecord::new()
            .with("ThreatType", "Domain")
            .with("Indicator", indicator)
    }

    #[test]
    fn test_output_path() {
        let path = SinkRole::Policy.output_path(
            Path::new("/tmp/out"),
            "20240101120000",
            Path::new("/data/feeds/iocs.csv"),
        );
        assert_eq!(path, PathBuf::from("/tmp/out/20240101120000_policy_iocs.csv"));
    }

    #[test]
    fn test_writes_records_in_submit_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let options = SinkOptions {
            delimiter: ',',
            write_bom: false,
        };
        let sink = ResultSink::create(&path, SinkRole::Blocked, &schema(), &options).unwrap();

        let handle = sink.handle();
        for i in 0..100 {
            let mut rec = record(&format!("host{}.example", i));
            rec.set("BC_RiskLevel", "9");
            handle.submit(rec).unwrap();
        }

        let report = sink.close().unwrap();
        assert_eq!(report.written, 100);
        assert_eq!(report.failed, 0);
        assert_eq!(report.path.as_deref(), Some(path.as_path()));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "ThreatType,Indicator,BC_RiskLevel,BC_Category");
        assert_eq!(lines[1], "Domain,host0.example,9,");
        assert_eq!(lines[100], "Domain,host99.example,9,");
        assert_eq!(lines.len(), 101);
    }

    #[test]
    fn test_bom_and_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let sink = ResultSink::create(&path, SinkRole::Policy, &schema(), &SinkOptions::default()).unwrap();

        let mut rec = record("example.org");
        rec.set("BC_Category", "Technology/Internet, Search Engines/Portals");
        sink.submit(rec).unwrap();
        sink.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with("ThreatType;Indicator;BC_RiskLevel;BC_Category"));
        assert!(text.contains("Domain;example.org;;Technology/Internet, Search Engines/Portals"));
    }

    #[test]
    fn test_empty_sink_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        let sink = ResultSink::create(&path, SinkRole::Error, &schema(), &SinkOptions::default()).unwrap();
        assert!(path.exists());

        let report = sink.close().unwrap();
        assert_eq!(report.written, 0);
        assert!(report.path.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_closes_and_waits_for_writer() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.csv");
        let written = dir.path().join("written.csv");

        let sink = ResultSink::create(&empty, SinkRole::Blocked, &schema(), &SinkOptions::default()).unwrap();
        drop(sink);
        assert!(!empty.exists());

        let sink = ResultSink::create(&written, SinkRole::Policy, &schema(), &SinkOptions::default()).unwrap();
        let handle = sink.handle();
        handle.submit(record("kept.example")).unwrap();
        drop(sink);

        let content = std::fs::read_to_string(&written).unwrap();
        assert!(content.contains("Domain;kept.example;;"));
        assert!(handle.submit(record("late.example")).is_err());
    }

    #[test]
    fn test_concurrent_submitters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let sink = ResultSink::create(&path, SinkRole::Policy, &schema(), &SinkOptions::default()).unwrap();

        let threads: Vec<_> = (0..8)
            .map(|t| {
                let handle = sink.handle();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        handle.submit(record(&format!("t{}-{}.example", t, i))).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let report = sink.close().unwrap();
        assert_eq!(report.written, 2000);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .from_path(&path)
            .unwrap();
        assert_eq!(reader.records().count(), 2000);
    }

    #[test]
    fn test_submit_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let sink = ResultSink::create(
            dir.path().join("out.csv"),
            SinkRole::Blocked,
            &schema(),
            &SinkOptions::default(),
        )
        .unwrap();
        let handle = sink.handle();
        sink.close().unwrap();

        assert!(handle.submit(record("late.example")).is_err());
    }

    #[test]
    fn test_unopenable_destination_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let result = ResultSink::create(&path, SinkRole::Blocked, &schema(), &SinkOptions::default());
        assert!(matches!(result, Err(Error::Output(_))));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let dir = TempDir::new().unwrap();
        let options = SinkOptions {
            delimiter: '§',
            write_bom: false,
        };
        let result = ResultSink::create(dir.path().join("out.csv"), SinkRole::Policy, &schema(), &options);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
