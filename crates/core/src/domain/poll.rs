use std::time::Duration;

/// ステータスポーリングの試行回数と待機間隔。
///
/// 既定値は 240 回・初回 30 秒・上限 60 秒。待機間隔は 30, 60, 60, ... となる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 240,
            initial_interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    /// 待機間隔の列（倍々で増え、上限で頭打ち）。
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next: self.initial_interval,
            max: self.max_interval,
        }
    }
}

/// 指数バックオフの待機間隔。終わりのないイテレータ。
/// 初回は `initial_interval` をそのまま使い、以降は `min(前回 * 2, max_interval)`。
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current.saturating_mul(2).min(self.max);
        Some(current)
    }
}
