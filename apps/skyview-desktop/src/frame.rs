use std::time::{Duration, Instant};

/// Paces the frame loop to a target rate.
///
/// `tick` returns the clamped delta since the previous frame and schedules
/// the next deadline; the event loop sleeps until [`FrameLimiter::deadline`].
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    period: Option<Duration>,
    last: Instant,
    deadline: Instant,
    frame_index: u64,
}

const DT_MIN: Duration = Duration::from_micros(100);
const DT_MAX: Duration = Duration::from_millis(250);

impl FrameLimiter {
    /// A target of zero disables the cap.
    pub fn new(target_fps: u32) -> Self {
        Self::starting_at(target_fps, Instant::now())
    }

    fn starting_at(target_fps: u32, now: Instant) -> Self {
        let period = (target_fps > 0).then(|| Duration::from_secs_f64(1.0 / target_fps as f64));
        Self {
            period,
            last: now,
            deadline: now,
            frame_index: 0,
        }
    }

    /// When the next frame is due, or `None` when uncapped.
    pub fn deadline(&self) -> Option<Instant> {
        self.period.map(|_| self.deadline)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.period.is_none() || now >= self.deadline
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f32 {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(DT_MIN, DT_MAX);
        self.last = now;
        if let Some(period) = self.period {
            // Skip missed deadlines instead of bursting to catch up.
            self.deadline = (self.deadline + period).max(now);
        }
        self.frame_index = self.frame_index.wrapping_add(1);
        dt.as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_fps_schedules_sixteen_millis_apart() {
        let start = Instant::now();
        let mut limiter = FrameLimiter::starting_at(60, start);
        assert!(limiter.is_due(start));
        limiter.tick_at(start);
        let deadline = limiter.deadline().unwrap();
        let gap = deadline - start;
        assert!(gap > Duration::from_millis(16) && gap < Duration::from_millis(17));
        assert!(!limiter.is_due(start + Duration::from_millis(5)));
        assert!(limiter.is_due(deadline));
    }

    #[test]
    fn delta_is_clamped() {
        let start = Instant::now();
        let mut limiter = FrameLimiter::starting_at(60, start);
        let dt = limiter.tick_at(start + Duration::from_secs(5));
        assert_eq!(dt, DT_MAX.as_secs_f32());
        let dt = limiter.tick_at(start + Duration::from_secs(5));
        assert_eq!(dt, DT_MIN.as_secs_f32());
    }

    #[test]
    fn late_frames_do_not_accumulate_debt() {
        let start = Instant::now();
        let mut limiter = FrameLimiter::starting_at(60, start);
        let late = start + Duration::from_secs(1);
        limiter.tick_at(late);
        assert!(limiter.deadline().unwrap() >= late);
        assert_eq!(limiter.frame_index(), 1);
    }

    #[test]
    fn zero_target_is_uncapped() {
        let limiter = FrameLimiter::new(0);
        assert!(limiter.deadline().is_none());
        assert!(limiter.is_due(Instant::now()));
    }
}
