use std::time::Instant;

pub struct Timer {
    active: bool,
    timestamp: Instant,
}

impl Timer {
    pub fn new(active: bool) -> Timer {
        Timer {
            active,
            timestamp: timestamp(),
        }
    }

    pub fn stop(&mut self) -> f32 {
        assert!(self.active);
        let curr = timestamp();
        let last = self.timestamp;
        self.timestamp = curr;

        (curr - last).as_millis() as f32
    }
}

pub fn timestamp() -> Instant {
    Instant::now()
}
