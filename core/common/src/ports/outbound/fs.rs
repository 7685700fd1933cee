//! ファイルシステム Outbound ポート
//!
//! config.json の読み込みと JSONL ログの追記だけがファイルに触れる。

use crate::error::Error;
use std::io::Write;
use std::path::Path;

/// ファイルシステム抽象（Outbound ポート）
///
/// 実装は `common::adapter::StdFileSystem`。
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, Error>;

    fn create_dir_all(&self, path: &Path) -> Result<(), Error>;

    /// 通常ファイルとして存在するか
    fn is_file(&self, path: &Path) -> bool;

    /// 追記用に開く（無ければ作る）。Writer を drop すると閉じる。
    fn open_append(&self, path: &Path) -> Result<Box<dyn Write + Send>, Error>;
}
