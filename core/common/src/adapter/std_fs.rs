//! std::fs による FileSystem 実装

use crate::error::Error;
use crate::ports::outbound::FileSystem;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct StdFileSystem;

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::io_msg(format!("Failed to {} '{}': {}", action, path.display(), e))
}

impl FileSystem for StdFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, Error> {
        std::fs::read_to_string(path).map_err(|e| io_error("read", path, e))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), Error> {
        std::fs::create_dir_all(path).map_err(|e| io_error("create directory", path, e))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn open_append(&self, path: &Path) -> Result<Box<dyn Write + Send>, Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_error("open for append", path, e))?;
        Ok(Box::new(file))
    }
}
