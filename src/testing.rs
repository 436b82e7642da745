// Fixtures shared by the unit tests.
use crate::taxonomy::ArchiveFetcher;
use crate::{Error, Result};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, body) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub struct CountingFetcher {
    archive: Vec<u8>,
    calls: Arc<AtomicUsize>,
}

impl CountingFetcher {
    pub fn new(archive: Vec<u8>) -> Self {
        Self {
            archive,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl ArchiveFetcher for CountingFetcher {
    fn fetch(&self, _source: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Widen the race window for concurrent callers.
        std::thread::sleep(Duration::from_millis(20));
        Ok(self.archive.clone())
    }
}

pub struct FailingFetcher;

impl ArchiveFetcher for FailingFetcher {
    fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        Err(Error::NotFound(source.to_string()))
    }
}

pub fn write(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, body).unwrap();
}
