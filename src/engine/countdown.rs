// src/engine/countdown.rs

use serde::Serialize;

/// Below this many seconds the timer is shown as urgent.
pub const URGENCY_THRESHOLD_SECS: u64 = 600;

/// Exam countdown, decremented once per second by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    time_left: u64,
}

/// What a client needs to draw the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownView {
    pub time_left: u64,
    pub formatted: String,
    pub urgent: bool,
    pub expired: bool,
}

impl Countdown {
    pub fn new(seconds: u64) -> Self {
        Self { time_left: seconds }
    }

    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    /// Advances one second. Returns true on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.time_left == 0 {
            return false;
        }
        self.time_left -= 1;
        self.time_left == 0
    }

    /// `mm:ss`; minutes are not wrapped into hours.
    pub fn formatted(&self) -> String {
        format!("{:02}:{:02}", self.time_left / 60, self.time_left % 60)
    }

    pub fn is_urgent(&self) -> bool {
        self.time_left < URGENCY_THRESHOLD_SECS
    }

    pub fn is_expired(&self) -> bool {
        self.time_left == 0
    }

    pub fn view(&self) -> CountdownView {
        CountdownView {
            time_left: self.time_left,
            formatted: self.formatted(),
            urgent: self.is_urgent(),
            expired: self.is_expired(),
        }
    }
}
