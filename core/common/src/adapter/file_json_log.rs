//! JSONL ログをファイルへ追記する Log 実装
//!
//! stderr へのエラー表示とは別チャネル。書き込みに失敗しても呼び出し側は無視してよい。

use crate::error::Error;
use crate::ports::outbound::{FileSystem, Log, LogRecord};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct FileJsonLog {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl FileJsonLog {
    /// 親ディレクトリは最初の書き込みのときに作る
    pub fn new(fs: Arc<dyn FileSystem>, path: impl AsRef<Path>) -> Self {
        Self {
            fs,
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Log for FileJsonLog {
    fn log(&self, record: &LogRecord) -> Result<(), Error> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            self.fs.create_dir_all(dir)?;
        }
        let mut w = self.fs.open_append(&self.path)?;
        w.write_all(line.as_bytes())
            .and_then(|_| w.flush())
            .map_err(|e| Error::io_msg(format!("Failed to write log '{}': {}", self.path.display(), e)))
    }
}

/// 何も出力しない Log 実装（テスト用・ログファイル未設定時）
#[derive(Debug, Clone, Default)]
pub struct NoopLog;

impl Log for NoopLog {
    fn log(&self, _record: &LogRecord) -> Result<(), Error> {
        Ok(())
    }
}
