//! Operator ramp-up sequencer.
//!
//! When output starts (front panel or the start-ramp box command) the
//! intensity climbs from zero to full over a few seconds; the output
//! stage multiplies the reported percentage into every intensity it
//! derives. The `ramp_time` advanced setting slows the climb: the
//! counter advances once every `(ramp_time >> 5) + 1` foreground
//! passes.

/// Ramp percentage state machine.
pub struct RampSequencer {
    active: bool,
    counter: u8,
    sub: u8,
}

impl RampSequencer {
    pub const fn new() -> Self {
        RampSequencer {
            active: false,
            counter: 0,
            sub: 0,
        }
    }

    /// Begin a ramp from zero.
    pub fn start(&mut self) {
        self.active = true;
        self.counter = 0;
        self.sub = 0;
    }

    /// Abort any ramp in progress.
    pub fn stop(&mut self) {
        self.active = false;
        self.counter = 0;
        self.sub = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance one foreground pass.
    pub fn tick(&mut self, ramp_time: u8) {
        if !self.active {
            return;
        }
        let divisor = (ramp_time >> 5) + 1;
        self.sub += 1;
        if self.sub < divisor {
            return;
        }
        self.sub = 0;
        self.counter += 1;
        if self.counter >= 100 {
            self.counter = 100;
            self.active = false;
        }
    }

    /// Current percentage for intensity scaling: the live counter
    /// mid-ramp, 100 once complete, 0 while output is disabled.
    pub fn percent(&self, output_enabled: bool) -> u8 {
        if self.active {
            self.counter
        } else if output_enabled {
            100
        } else {
            0
        }
    }
}

impl Default for RampSequencer {
    fn default() -> Self {
        Self::new()
    }
}
