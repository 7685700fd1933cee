//! テスト用: 台本どおりに応答する HttpTransport と、固定時刻・連番キー


#[cfg(test)]
pub use stub::{FixedClock, ScriptedTransport, SeqKeyGenerator};
