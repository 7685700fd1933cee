//! people 固有のアダプター
//!
//! 標準実装は common::adapter にあるので、ここにはテスト用の偽実装だけを置く。

mod scripted;

#[cfg(test)]
pub use scripted::{FixedClock, ScriptedTransport, SeqKeyGenerator};
