//! アダプター（ports::outbound の標準実装）
//!
//! usecase は trait 経由でのみファイル・時刻・HTTP・環境変数に触れる。
//! ここには標準実装（Std* / Reqwest* / FileJsonLog）を置き、テストではモックを注入する。

pub mod file_json_log;
pub mod reqwest_transport;
pub mod std_clock;
pub mod std_env_resolver;
pub mod std_fs;
pub mod std_key_generator;

pub use file_json_log::{FileJsonLog, NoopLog};
pub use reqwest_transport::ReqwestTransport;
pub use std_clock::StdClock;
pub use std_env_resolver::StdEnvResolver;
pub use std_fs::StdFileSystem;
pub use std_key_generator::StdKeyGenerator;
