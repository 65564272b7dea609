use std::time::{Duration, Instant};

/// Coalesces a burst of triggers into a single deadline: every `touch`
/// pushes the deadline to `now + delay`, so the action fires only after a
/// quiet period. The host drives the clock; no timer thread is involved.
/// 將密集觸發合併為單一期限；每次 `touch` 都會把期限往後推。
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arms (or extends) the deadline.
    /// 啟動或延長期限。
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether the quiet period has elapsed.
    /// 靜止時間是否已經結束。
    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    pub fn reset(&mut self) {
        self.deadline = None;
    }
}
