use std::time::Duration;

/// Delay applied after each streamed chunk by default.
pub const DEFAULT_PACING: Duration = Duration::from_millis(25);

/// Typing-speed delay between rendered chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    delay: Duration,
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// No delay at all.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_disabled(&self) -> bool {
        self.delay.is_zero()
    }

    pub async fn pause(&self) {
        if !self.is_disabled() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn default_is_twenty_five_millis() {
        assert_eq!(Pacer::default().delay(), Duration::from_millis(25));
        assert!(Pacer::disabled().is_disabled());
        assert!(Pacer::from_millis(0).is_disabled());
    }

    #[tokio::test]
    async fn pause_waits_at_least_the_delay() {
        let pacer = Pacer::from_millis(20);
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
