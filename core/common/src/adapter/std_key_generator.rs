//! IdempotencyKey を生成する KeyGenerator の標準実装（Clock + 乱数サフィックス）

use crate::domain::IdempotencyKey;
use crate::ports::outbound::{Clock, KeyGenerator};
use rand::Rng;
use std::sync::Arc;

const SUFFIX_LEN: usize = 10;

/// 0-9, A-Z, a-z の base62
const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// `<unix-ms>-<base62 乱数>` 形式のキーを返す標準実装
pub struct StdKeyGenerator {
    clock: Arc<dyn Clock>,
}

impl StdKeyGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl KeyGenerator for StdKeyGenerator {
    fn next_key(&self) -> IdempotencyKey {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        IdempotencyKey::new(format!("{}-{}", self.clock.now_ms(), suffix))
    }
}
