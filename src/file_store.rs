//! Per-file open-handle registry over a data directory.
//!
//! Keeps one long-lived handle per registered file name, open for the
//! lifetime of the store, since a table here is three named files rather
//! than one sequence of numbered pages in a single file.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct FileStore {
    dir: PathBuf,
    handles: HashMap<String, File>,
}

impl FileStore {
    /// Opens (creating if absent) the data directory, then opens every
    /// regular top-level file in it, registering each under its file name.
    pub fn open(dir: impl AsRef<Path>) -> Result<FileStore, Error> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let mut handles = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let f = OpenOptions::new().read(true).write(true).open(entry.path())?;
            log::trace!("file store: opened existing file {name}");
            handles.insert(name, f);
        }
        Ok(FileStore { dir, handles })
    }

    /// Registers a brand-new, empty file. Fails if a file of that name is
    /// already registered or already exists on disk.
    pub fn create(&mut self, name: &str) -> Result<(), Error> {
        if self.handles.contains_key(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let path = self.dir.join(name);
        let f = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        log::debug!("file store: created {name}");
        self.handles.insert(name.to_string(), f);
        Ok(())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    fn handle(&self, name: &str) -> Result<&File, Error> {
        self.handles
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn handle_mut(&mut self, name: &str) -> Result<&mut File, Error> {
        self.handles
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn size(&self, name: &str) -> Result<u64, Error> {
        Ok(self.handle(name)?.metadata()?.len())
    }

    pub fn read_at(&mut self, name: &str, offset: u64, len: usize) -> Result<Vec<u8>, Error> {
        let f = self.handle_mut(name)?;
        f.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0_u8; len];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_all(&mut self, name: &str) -> Result<Vec<u8>, Error> {
        let len = self.size(name)?;
        self.read_at(name, 0, len as usize)
    }

    /// Writes `bytes` at `offset`, overwriting existing bytes in place or
    /// appending (when `offset` equals the file's current size); it never
    /// leaves a gap.
    pub fn write_at(&mut self, name: &str, offset: u64, bytes: &[u8]) -> Result<(), Error> {
        let f = self.handle_mut(name)?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_read_write_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = FileStore::open(dir.path()).unwrap();
        fs.create("t.table").unwrap();
        assert_eq!(fs.size("t.table").unwrap(), 0);
        fs.write_at("t.table", 0, b"hello").unwrap();
        assert_eq!(fs.read_all("t.table").unwrap(), b"hello");
        assert_eq!(fs.read_at("t.table", 1, 3).unwrap(), b"ell");
    }

    #[test]
    fn test_create_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = FileStore::open(dir.path()).unwrap();
        fs.create("t.schema").unwrap();
        assert!(matches!(fs.create("t.schema"), Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = FileStore::open(dir.path()).unwrap();
        assert!(matches!(fs.size("nope"), Err(Error::NotFound(_))));
        assert!(matches!(fs.read_all("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_reopen_picks_up_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut fs = FileStore::open(dir.path()).unwrap();
            fs.create("t.fsm").unwrap();
            fs.write_at("t.fsm", 0, &[1, 2, 3, 4]).unwrap();
        }
        let mut fs2 = FileStore::open(dir.path()).unwrap();
        assert!(fs2.exists("t.fsm"));
        assert_eq!(fs2.read_all("t.fsm").unwrap(), vec![1, 2, 3, 4]);
    }
}
