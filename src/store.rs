use crate::snapshot::SESSION_SLOT_KEY;
use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Single-slot durable key-value store for the serialized session.
///
/// Writes are best-effort: a failed write returns `false` and the live
/// session carries on. Erase never propagates failure at all.
pub trait SlotStore {
    fn read(&self) -> Option<String>;
    fn write(&mut self, raw: &str) -> bool;
    fn erase(&mut self);
}

/// Production store keeping the slot as a JSON file in the state directory
#[derive(Debug, Clone)]
pub struct FileSlotStore {
    path: PathBuf,
}

impl FileSlotStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    /// Slot file under $HOME/.local/state/pacer, falling back to the
    /// platform data directory.
    fn default_path() -> PathBuf {
        let file_name = format!("{}.json", SESSION_SLOT_KEY);
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("pacer")
                .join(file_name)
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "pacer") {
            proj_dirs.data_local_dir().join(file_name)
        } else {
            PathBuf::from(file_name)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSlotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotStore for FileSlotStore {
    fn read(&self) -> Option<String> {
        fs::read_to_string(&self.path).ok()
    }

    fn write(&mut self, raw: &str) -> bool {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("warning: could not create session directory: {}", e);
                return false;
            }
        }
        match fs::write(&self.path, raw) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("warning: could not save session: {}", e);
                false
            }
        }
    }

    fn erase(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => eprintln!("warning: could not erase session slot: {}", e),
        }
    }
}

/// In-memory store for unit tests, with injectable read/write failures
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStore {
    slot: Option<String>,
    pub fail_writes: bool,
    pub fail_reads: bool,
    write_count: usize,
    erase_count: usize,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    pub fn set_slot(&mut self, raw: impl Into<String>) {
        self.slot = Some(raw.into());
    }

    pub fn write_count(&self) -> usize {
        self.write_count
    }

    pub fn erase_count(&self) -> usize {
        self.erase_count
    }
}

impl SlotStore for MemorySlotStore {
    fn read(&self) -> Option<String> {
        if self.fail_reads {
            return None;
        }
        self.slot.clone()
    }

    fn write(&mut self, raw: &str) -> bool {
        if self.fail_writes {
            return false;
        }
        self.slot = Some(raw.to_string());
        self.write_count += 1;
        true
    }

    fn erase(&mut self) {
        self.erase_count += 1;
        self.slot = None;
    }
}
