/// Game clock.
///
/// Elapsed time is computed from a start instant rather than accumulated
/// by ticks, so a slow frame never makes the clock drift. The display only
/// changes once per second because it is truncated to whole seconds.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Default)]
pub struct GameTimer {
    started: Option<Instant>,
    /// Set when stopped: the elapsed time at that moment.
    frozen: Option<Duration>,
}

impl GameTimer {
    pub fn start(&mut self, now: Instant) {
        self.started = Some(now);
        self.frozen = None;
    }

    pub fn stop(&mut self, now: Instant) {
        if self.frozen.is_none() {
            self.frozen = Some(self.elapsed(now));
        }
    }

    pub fn reset(&mut self) {
        *self = GameTimer::default();
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_running(&self) -> bool {
        self.started.is_some() && self.frozen.is_none()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        if let Some(d) = self.frozen {
            return d;
        }
        match self.started {
            Some(t) => now.saturating_duration_since(t),
            None => Duration::ZERO,
        }
    }

    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        self.elapsed(now).as_secs()
    }
}

/// `MM:SS`, zero padded. Minutes keep growing past 99.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// `Xm Ys`, used for statistics totals and best times.
pub fn format_duration_words(secs: u64) -> String {
    format!("{}m {}s", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_after_125_seconds() {
        assert_eq!(format_clock(125), "02:05");
    }

    #[test]
    fn clock_edges() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(6000), "100:00");
    }

    #[test]
    fn words_format() {
        assert_eq!(format_duration_words(3725), "62m 5s");
    }

    #[test]
    fn running_timer_measures_from_start() {
        let t0 = Instant::now();
        let mut timer = GameTimer::default();
        timer.start(t0);
        assert!(timer.is_running());
        assert_eq!(timer.elapsed_secs(t0 + Duration::from_millis(125_400)), 125);
        assert_eq!(format_clock(timer.elapsed_secs(t0 + Duration::from_secs(125))), "02:05");
    }

    #[test]
    fn stopped_timer_freezes() {
        let t0 = Instant::now();
        let mut timer = GameTimer::default();
        timer.start(t0);
        timer.stop(t0 + Duration::from_secs(30));
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_secs(t0 + Duration::from_secs(500)), 30);
        // second stop keeps the first reading
        timer.stop(t0 + Duration::from_secs(90));
        assert_eq!(timer.elapsed_secs(t0 + Duration::from_secs(500)), 30);
    }

    #[test]
    fn idle_timer_reads_zero() {
        let timer = GameTimer::default();
        assert_eq!(timer.elapsed(Instant::now()), Duration::ZERO);
        assert!(!timer.is_running());
    }
}
