//! Shared fixtures for pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use rlcheck_classifiers::{BlockPolicy, Category, ClassificationResult, ClassifyError, ThreatClassifier};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Deterministic classifier answering from a fixed table
///
/// Unknown indicators get risk level 1 with no categories (policy output).
pub struct StaticClassifier {
    policy: BlockPolicy,
    answers: HashMap<String, Result<(Vec<Category>, u32), ClassifyError>>,
    latency: Option<Duration>,
    calls: AtomicU32,
}

impl StaticClassifier {
    pub fn new() -> Self {
        Self {
            policy: BlockPolicy::default(),
            answers: HashMap::new(),
            latency: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_answer(mut self, indicator: &str, categories: Vec<Category>, risk_level: u32) -> Self {
        self.answers
            .insert(indicator.to_string(), Ok((categories, risk_level)));
        self
    }

    pub fn with_error(mut self, indicator: &str, error: ClassifyError) -> Self {
        self.answers.insert(indicator.to_string(), Err(error));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ThreatClassifier for StaticClassifier {
    async fn classify(&self, indicator: &str) -> Result<ClassificationResult, ClassifyError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.answers.get(indicator) {
            Some(Ok((categories, risk_level))) => Ok(self.policy.evaluate(categories, Some(*risk_level))),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(self.policy.evaluate(&[], Some(1))),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Classifier that panics for indicators containing `PANIC`
pub struct PanickingClassifier;

#[async_trait]
impl ThreatClassifier for PanickingClassifier {
    async fn classify(&self, indicator: &str) -> Result<ClassificationResult, ClassifyError> {
        if indicator.contains("PANIC") {
            panic!("classifier blew up on {}", indicator);
        }
        Ok(ClassificationResult::new(3))
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// Write an input CSV with `ThreatType,Indicator,Source` columns
pub fn write_input(dir: &Path, name: &str, rows: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path).unwrap();
    writer.write_record(["ThreatType", "Indicator", "Source"]).unwrap();
    for (threat_type, indicator) in rows {
        writer.write_record([*threat_type, *indicator, "unit-test"]).unwrap();
    }
    writer.flush().unwrap();
    path
}

/// Read an output file into header + rows keyed by column name
pub fn read_output(path: &Path) -> (Vec<String>, Vec<HashMap<String, String>>) {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .unwrap();
    let headers: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let rows = reader
        .records()
        .map(|row| {
            let row = row.unwrap();
            headers
                .iter()
                .cloned()
                .zip(row.iter().map(str::to_string))
                .collect()
        })
        .collect();
    (headers, rows)
}

/// Indicators found in an output file, empty if the file does not exist
pub fn indicators_in(path: Option<&Path>) -> Vec<String> {
    match path {
        Some(path) => read_output(path)
            .1
            .into_iter()
            .map(|row| row["Indicator"].clone())
            .collect(),
        None => Vec::new(),
    }
}

/// Number of files in a directory
pub fn file_count(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

/// In-memory log sink for a fmt subscriber
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
