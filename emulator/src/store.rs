use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use detector_core::record::{RECORD_CLEAR, RECORD_ERASED, RECORD_SIZE};
use detector_core::{PersistentStore, StoreError};

pub const DEFAULT_STORE_PATH: &str = "mrd.dat";

/// Keeps the reset record in a 4-byte little-endian file, standing in for
/// the flash filesystem a board would use.
///
/// A missing file reads as the cleared record, which the tracker takes as
/// "no prior cycle". Writes are staged until
/// `commit`, so dropping the store without committing models a reset that
/// interrupted the update.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    staged: Option<u32>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staged: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file contents directly, bypassing the record encoding.
    pub fn overwrite(path: &Path, word: u32) -> io::Result<()> {
        fs::write(path, word.to_le_bytes())
    }

    /// Removes the file. A file that is already gone is not an error.
    pub fn erase(path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }

    fn load(&self) -> io::Result<u32> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(RECORD_CLEAR),
            Err(err) => return Err(err),
        };
        // A truncated file is damaged, not absent.
        Ok(bytes
            .get(..RECORD_SIZE)
            .and_then(|prefix| <[u8; RECORD_SIZE]>::try_from(prefix).ok())
            .map_or(RECORD_ERASED, u32::from_le_bytes))
    }
}

impl PersistentStore for FileStore {
    fn ready(&self) -> bool {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.is_dir(),
            _ => true,
        }
    }

    fn read(&mut self) -> Result<u32, StoreError> {
        if let Some(word) = self.staged {
            return Ok(word);
        }
        self.load().map_err(|_| StoreError::Read)
    }

    fn write(&mut self, value: u32) -> Result<(), StoreError> {
        self.staged = Some(value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if let Some(word) = self.staged {
            Self::overwrite(&self.path, word).map_err(|_| StoreError::Write)?;
            self.staged = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detector_core::record::RECORD_BEGIN;

    fn scratch(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "detector-emulator-{}-{name}.dat",
            std::process::id()
        ));
        FileStore::erase(&path).unwrap();
        path
    }

    #[test]
    fn missing_file_reads_as_cleared() {
        let path = scratch("missing");
        let mut store = FileStore::open(&path);
        assert!(store.ready());
        assert_eq!(store.read(), Ok(RECORD_CLEAR));
    }

    #[test]
    fn committed_word_survives_reopen() {
        let path = scratch("round-trip");
        let mut store = FileStore::open(&path);
        store.write(RECORD_BEGIN).unwrap();
        store.commit().unwrap();
        drop(store);

        assert_eq!(fs::read(&path).unwrap(), RECORD_BEGIN.to_le_bytes());
        assert_eq!(FileStore::open(&path).read(), Ok(RECORD_BEGIN));
        FileStore::erase(&path).unwrap();
    }

    #[test]
    fn uncommitted_write_is_lost_on_reopen() {
        let path = scratch("uncommitted");
        FileStore::overwrite(&path, 0xFFFD_0002).unwrap();

        let mut store = FileStore::open(&path);
        store.write(RECORD_BEGIN).unwrap();
        assert_eq!(store.read(), Ok(RECORD_BEGIN));
        drop(store);

        assert_eq!(FileStore::open(&path).read(), Ok(0xFFFD_0002));
        FileStore::erase(&path).unwrap();
    }

    #[test]
    fn truncated_file_reads_as_erased() {
        let path = scratch("truncated");
        fs::write(&path, [0x01, 0x00]).unwrap();
        assert_eq!(FileStore::open(&path).read(), Ok(RECORD_ERASED));
        FileStore::erase(&path).unwrap();
    }

    #[test]
    fn missing_directory_is_not_ready() {
        let path = std::env::temp_dir()
            .join(format!("detector-emulator-absent-{}", std::process::id()))
            .join("mrd.dat");
        let mut store = FileStore::open(path);
        assert!(!store.ready());
        assert_eq!(store.read(), Ok(RECORD_CLEAR));
    }
}
