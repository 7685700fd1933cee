//! 壁時計による Clock 実装

use crate::ports::outbound::Clock;

#[derive(Debug, Clone, Default)]
pub struct StdClock;

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        // 1970 年より前を返すことはないが、負値は 0 に丸める
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}
