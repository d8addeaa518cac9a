#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::rc::Rc;

use camino::Utf8PathBuf;
use pride_curator::archive::{ArchiveClient, ArchiveSession};
use pride_curator::config::ArchiveSettings;
use pride_curator::error::CuratorError;

pub const ROOT: &str = "/pride/data/archive/";

#[derive(Default)]
struct ArchiveState {
    dirs: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    connects: Cell<usize>,
    retrieved: RefCell<Vec<String>>,
}

/// In-memory archive keyed by remote directory path.
#[derive(Clone, Default)]
pub struct MockArchive {
    state: Rc<RefCell<ArchiveState>>,
}

fn key(path: &str) -> String {
    path.trim_end_matches('/').to_string()
}

impl MockArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(self, path: &str, entries: &[&str]) -> Self {
        self.state.borrow_mut().dirs.insert(
            key(path),
            entries.iter().map(|entry| entry.to_string()).collect(),
        );
        self
    }

    pub fn file(self, path: &str, content: &[u8]) -> Self {
        self.state
            .borrow_mut()
            .files
            .insert(key(path), content.to_vec());
        self
    }

    pub fn failing(self, path: &str) -> Self {
        self.state.borrow_mut().failing.insert(key(path));
        self
    }

    pub fn connects(&self) -> usize {
        self.state.borrow().connects.get()
    }

    pub fn retrieved(&self) -> Vec<String> {
        self.state.borrow().retrieved.borrow().clone()
    }
}

pub struct MockSession {
    state: Rc<RefCell<ArchiveState>>,
}

impl ArchiveClient for MockArchive {
    type Session = MockSession;

    fn connect(&self) -> Result<MockSession, CuratorError> {
        let state = self.state.borrow();
        state.connects.set(state.connects.get() + 1);
        Ok(MockSession {
            state: Rc::clone(&self.state),
        })
    }
}

impl ArchiveSession for MockSession {
    fn list(&mut self, path: &str) -> Result<Vec<String>, CuratorError> {
        let state = self.state.borrow();
        let path = key(path);
        if state.failing.contains(&path) {
            return Err(CuratorError::Archive(format!("550 {path}: permission denied")));
        }
        state
            .dirs
            .get(&path)
            .cloned()
            .ok_or_else(|| CuratorError::Archive(format!("550 {path}: no such directory")))
    }

    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, CuratorError> {
        let state = self.state.borrow();
        let path = key(remote_path);
        let content = state
            .files
            .get(&path)
            .ok_or_else(|| CuratorError::Archive(format!("550 {path}: no such file")))?;
        sink.write_all(content)
            .map_err(|err| CuratorError::Filesystem(err.to_string()))?;
        state.retrieved.borrow_mut().push(path);
        Ok(content.len() as u64)
    }
}

pub fn settings(years: &[&str]) -> ArchiveSettings {
    ArchiveSettings {
        host: "ftp.example.org".to_string(),
        port: 21,
        root: ROOT.to_string(),
        years: years.iter().map(|year| year.to_string()).collect(),
    }
}

pub fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

pub fn gzip(content: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}
