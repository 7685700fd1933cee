//! Outbound ポート: アプリが外界（FS・時刻・環境変数・HTTP・ログ等）を使うための trait

pub mod clock;
pub mod env_resolver;
pub mod fs;
pub mod http_transport;
pub mod key_generator;
pub mod log;

pub use clock::Clock;
pub use env_resolver::EnvResolver;
pub use fs::FileSystem;
pub use http_transport::{HttpRequest, HttpResponse, HttpTransport, Method};
pub use key_generator::KeyGenerator;
pub use log::{now_iso8601, Log, LogLevel, LogRecord};
