/// Reserves back-to-back slots for the single melodic lane.
///
/// The cursor only moves forward. A burst of requests queues up one beat
/// apart instead of stacking on top of each other.
#[derive(Debug, Clone)]
pub struct Scheduler {
    next_available: f64,
}

impl Scheduler {
    /// Start the cursor at `now` on the audio clock.
    pub fn new(now: f64) -> Self {
        Self {
            next_available: now,
        }
    }

    pub fn next_available(&self) -> f64 {
        self.next_available
    }

    /// Claim the next slot at `tempo` beats per minute and return its start.
    pub fn reserve_slot(&mut self, now: f64, tempo: f64) -> f64 {
        let start = now.max(self.next_available);
        self.next_available = start + beat_duration(tempo);
        start
    }
}

/// Seconds per beat.
pub fn beat_duration(tempo: f64) -> f64 {
    60.0 / tempo
}
