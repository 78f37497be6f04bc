//! Biphasic pulse generator.
//!
//! Each output channel is a five-phase state machine driven by a
//! periodic compare-match interrupt with 1 µs resolution:
//!
//! ```text
//! POSITIVE (width)      Gate+ high, Gate- low
//!   → DEADTIME1 (4 µs)  both low
//!   → NEGATIVE (width)  Gate+ low, Gate- high
//!   → DEADTIME2 (4 µs)  both low
//!   → GAP (remainder)   both low
//!   → POSITIVE …
//! ```
//!
//! The ISR owns the active width/period and the phase; the foreground
//! owns a pending-parameter cell. New parameters are consumed only at
//! the start of GAP, never mid-pulse, so every POSITIVE/NEGATIVE pair
//! uses one consistent parameter set and the output never carries a net
//! DC component.
//!
//! # Handoff
//!
//! [`PulseShared`] packs `(dirty, width, period)` into one atomic word.
//! The foreground publishes with a single release store; the ISR
//! consumes with load + compare-exchange, so a publication racing the
//! consume is never lost - it is simply picked up at the next GAP.
//!
//! # Short-counter channels
//!
//! A channel whose compare register cannot hold a full gap (for example
//! an 8-bit timer) passes the register width as `max_compare`; long
//! gaps are then counted down in segments across repeated GAP firings.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embedded_hal::digital::OutputPin;

use crate::constants::{
    DEAD_TIME_US, IDLE_REARM_US, MIN_PERIOD_US, MIN_WIDTH_US,
};

/// Submitted period was below the absolute floor. The submission is
/// still applied with the period clamped to the floor; the error only
/// reports that clamping happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubmissionRejected;

/// H-bridge drive states, as seen by the pulse state machine.
pub trait HBridge {
    /// Gate+ high, Gate- low.
    fn drive_positive(&mut self);
    /// Gate+ low, Gate- high.
    fn drive_negative(&mut self);
    /// Both gates low.
    fn all_off(&mut self);
}

/// [`HBridge`] over a pair of `embedded-hal` output pins.
pub struct PinBridge<P, N> {
    pos: P,
    neg: N,
}

impl<P: OutputPin, N: OutputPin> PinBridge<P, N> {
    pub fn new(pos: P, neg: N) -> Self {
        PinBridge { pos, neg }
    }
}

impl<P: OutputPin, N: OutputPin> HBridge for PinBridge<P, N> {
    fn drive_positive(&mut self) {
        let _ = self.neg.set_low();
        let _ = self.pos.set_high();
    }

    fn drive_negative(&mut self) {
        let _ = self.pos.set_low();
        let _ = self.neg.set_high();
    }

    fn all_off(&mut self) {
        let _ = self.pos.set_low();
        let _ = self.neg.set_low();
    }
}

/// Pulse state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Positive,
    Deadtime1,
    Negative,
    Deadtime2,
    Gap,
}

// Pending-cell layout: bit 31 dirty, bits 23:16 width, bits 15:0 period.
const PENDING_DIRTY: u32 = 1 << 31;

fn pack(width_us: u8, period_us: u16) -> u32 {
    PENDING_DIRTY | ((width_us as u32) << 16) | period_us as u32
}

/// Foreground side of one pulse channel: the pending-parameter cell and
/// the gate flag. Lives in a `static` shared with the channel's ISR.
pub struct PulseShared {
    pending: AtomicU32,
    gate: AtomicBool,
}

impl PulseShared {
    pub const fn new() -> Self {
        PulseShared {
            pending: AtomicU32::new(0),
            gate: AtomicBool::new(false),
        }
    }

    /// Publish new pulse parameters. They take effect at the start of
    /// the next GAP phase, atomically for a whole biphasic pair.
    ///
    /// Width is clamped to `[20, 255]` µs. A period below 500 µs is
    /// clamped to 500 and reported as [`SubmissionRejected`]; periods
    /// up to 65535 µs pass through unchanged.
    pub fn submit(&self, width_us: u8, period_us: u16) -> Result<(), SubmissionRejected> {
        let width = width_us.max(MIN_WIDTH_US);
        let (period, result) = if period_us < MIN_PERIOD_US {
            (MIN_PERIOD_US, Err(SubmissionRejected))
        } else {
            (period_us, Ok(()))
        };
        // Release pairs with the ISR's acquire load; the packed word
        // carries the dirty flag so a 16-bit period can never tear.
        self.pending.store(pack(width, period), Ordering::Release);
        result
    }

    /// Turn the gate on. The ISR begins the next POSITIVE phase at the
    /// next GAP boundary.
    pub fn set_gate(&self, on: bool) {
        self.gate.store(on, Ordering::Release);
    }

    pub fn gate(&self) -> bool {
        self.gate.load(Ordering::Acquire)
    }

    /// Turn the gate off and immediately drive both bridge pins low, so
    /// the bridge cannot stay energized until the ISR next runs. The
    /// pin write happens inside a critical section; the ISR cannot fire
    /// between the gate clear and the pins going low.
    pub fn force_off<B: HBridge>(&self, bridge: &mut B) {
        critical_section::with(|_| {
            self.gate.store(false, Ordering::Release);
            bridge.all_off();
        });
    }
}

impl Default for PulseShared {
    fn default() -> Self {
        Self::new()
    }
}

/// ISR side of one pulse channel.
///
/// The owning interrupt calls [`service`](Self::service) on every
/// compare match and reloads its compare register with the returned
/// duration.
pub struct PulseChannel {
    width_us: u16,
    period_us: u16,
    phase: Phase,
    gap_remaining: u16,
    max_compare: u16,
}

impl PulseChannel {
    /// `max_compare` is the largest value the channel's compare
    /// register can hold; pass `u16::MAX` for a full 16-bit timer.
    pub const fn new(max_compare: u16) -> Self {
        PulseChannel {
            width_us: 100,
            period_us: 5000,
            phase: Phase::Gap,
            gap_remaining: 0,
            max_compare,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Active parameters `(width_us, period_us)` as last consumed.
    pub fn active(&self) -> (u16, u16) {
        (self.width_us, self.period_us)
    }

    /// Advance the state machine one compare match. Returns the
    /// duration of the next phase in microseconds; the caller loads it
    /// into the compare register.
    pub fn service<B: HBridge>(&mut self, shared: &PulseShared, bridge: &mut B) -> u16 {
        match self.phase {
            Phase::Gap => {
                if self.gap_remaining > 0 {
                    let chunk = self.gap_remaining.min(self.max_compare);
                    self.gap_remaining -= chunk;
                    return chunk;
                }

                let raw = shared.pending.load(Ordering::Acquire);
                if raw & PENDING_DIRTY != 0 {
                    self.width_us = (raw >> 16) as u16 & 0xFF;
                    self.period_us = raw as u16;
                    // Clear dirty only if the cell is unchanged; a
                    // fresher publication stays pending for the next
                    // GAP rather than being dropped.
                    let _ = shared.pending.compare_exchange(
                        raw,
                        raw & !PENDING_DIRTY,
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    );
                }

                if !shared.gate.load(Ordering::Acquire) {
                    bridge.all_off();
                    return IDLE_REARM_US;
                }

                bridge.drive_positive();
                self.phase = Phase::Positive;
                self.width_us
            }

            Phase::Positive => {
                bridge.all_off();
                self.phase = Phase::Deadtime1;
                DEAD_TIME_US
            }

            Phase::Deadtime1 => {
                // A gate dropped mid-pulse keeps the pins low from
                // here on; the truncated pair is the price of a tight
                // shutoff.
                if !shared.gate.load(Ordering::Acquire) {
                    bridge.all_off();
                    self.phase = Phase::Gap;
                    return IDLE_REARM_US;
                }
                bridge.drive_negative();
                self.phase = Phase::Negative;
                self.width_us
            }

            Phase::Negative => {
                bridge.all_off();
                self.phase = Phase::Deadtime2;
                DEAD_TIME_US
            }

            Phase::Deadtime2 => {
                // gap = period - 2*width - 2*deadtime, floored at one
                // dead time when the period cannot fit the pulse pair.
                let used = self.width_us * 2 + DEAD_TIME_US * 2;
                let gap = if self.period_us > used {
                    self.period_us - used
                } else {
                    DEAD_TIME_US
                };

                self.phase = Phase::Gap;
                if gap <= self.max_compare {
                    self.gap_remaining = 0;
                    gap
                } else {
                    self.gap_remaining = gap - self.max_compare;
                    self.max_compare
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records pin levels and how long each configuration was held.
    #[derive(Default)]
    struct TraceBridge {
        pos: bool,
        neg: bool,
        /// (pos, neg, duration_us) per completed segment.
        segments: std::vec::Vec<(bool, bool, u16)>,
    }

    extern crate std;

    impl HBridge for TraceBridge {
        fn drive_positive(&mut self) {
            self.pos = true;
            self.neg = false;
        }
        fn drive_negative(&mut self) {
            self.pos = false;
            self.neg = true;
        }
        fn all_off(&mut self) {
            self.pos = false;
            self.neg = false;
        }
    }

    fn run(
        ch: &mut PulseChannel,
        shared: &PulseShared,
        bridge: &mut TraceBridge,
        fires: usize,
    ) {
        for _ in 0..fires {
            let dur = ch.service(shared, bridge);
            bridge.segments.push((bridge.pos, bridge.neg, dur));
        }
    }

    #[test]
    fn biphasic_cycle_shape() {
        let shared = PulseShared::new();
        let mut ch = PulseChannel::new(u16::MAX);
        let mut bridge = TraceBridge::default();

        shared.submit(120, 1000).unwrap();
        shared.set_gate(true);

        // First fire consumes the pending parameters and starts POSITIVE.
        run(&mut ch, &shared, &mut bridge, 5);
        let segs = &bridge.segments;
        assert_eq!(segs[0], (true, false, 120)); // positive
        assert_eq!(segs[1], (false, false, 4)); // dead time
        assert_eq!(segs[2], (false, true, 120)); // negative
        assert_eq!(segs[3], (false, false, 4)); // dead time
        // gap = 1000 - 240 - 8
        assert_eq!(segs[4], (false, false, 752));
    }

    #[test]
    fn handoff_waits_for_gap() {
        let shared = PulseShared::new();
        let mut ch = PulseChannel::new(u16::MAX);
        let mut bridge = TraceBridge::default();

        shared.submit(100, 1000).unwrap();
        shared.set_gate(true);
        let _ = ch.service(&shared, &mut bridge); // POSITIVE with width 100

        // New parameters mid-pulse: the running pair must finish at the
        // old width.
        shared.submit(200, 2000).unwrap();
        assert_eq!(ch.service(&shared, &mut bridge), 4); // deadtime1
        assert_eq!(ch.service(&shared, &mut bridge), 100); // negative, old width
        assert_eq!(ch.service(&shared, &mut bridge), 4); // deadtime2
        let _gap = ch.service(&shared, &mut bridge);
        // Next pair uses the new width.
        assert_eq!(ch.service(&shared, &mut bridge), 200);
        assert_eq!(ch.active(), (200, 2000));
    }

    #[test]
    fn pairs_never_mix_widths() {
        // Submissions interleaved arbitrarily with ISR fires: every
        // POSITIVE segment's width must equal the following NEGATIVE
        // segment's width.
        let shared = PulseShared::new();
        let mut ch = PulseChannel::new(u16::MAX);
        let mut bridge = TraceBridge::default();
        shared.set_gate(true);

        let widths = [55u8, 90, 130, 200, 70, 255];
        let mut next = 0;
        for fire in 0..200 {
            if fire % 7 == 0 {
                shared.submit(widths[next % widths.len()], 3000).unwrap();
                next += 1;
            }
            let dur = ch.service(&shared, &mut bridge);
            bridge.segments.push((bridge.pos, bridge.neg, dur));
        }

        let segs = &bridge.segments;
        for i in 0..segs.len().saturating_sub(2) {
            if segs[i].0 {
                // positive → deadtime → negative
                assert_eq!(segs[i + 1], (false, false, 4));
                assert_eq!(segs[i + 2].1, true);
                assert_eq!(segs[i].2, segs[i + 2].2, "half-widths differ at {}", i);
            }
        }
    }

    #[test]
    fn gate_off_holds_pins_low() {
        let shared = PulseShared::new();
        let mut ch = PulseChannel::new(u16::MAX);
        let mut bridge = TraceBridge::default();

        shared.submit(100, 1000).unwrap();
        shared.set_gate(true);
        let _ = ch.service(&shared, &mut bridge); // mid-pulse, pins driven
        assert!(bridge.pos);

        shared.force_off(&mut bridge);
        assert!(!bridge.pos && !bridge.neg);

        // Pins stay low across every subsequent fire, even though the
        // gate dropped mid-pulse: the negative half is abandoned.
        for _ in 0..20 {
            let _ = ch.service(&shared, &mut bridge);
            assert!(!bridge.pos && !bridge.neg);
        }

        // Re-enabling the gate resumes from a clean GAP boundary.
        shared.set_gate(true);
        let dur = ch.service(&shared, &mut bridge);
        assert!(bridge.pos && !bridge.neg);
        assert_eq!(dur, 100);
    }

    #[test]
    fn short_counter_splits_long_gaps() {
        let shared = PulseShared::new();
        let mut ch = PulseChannel::new(250);
        let mut bridge = TraceBridge::default();

        shared.submit(100, 2000).unwrap();
        shared.set_gate(true);
        for _ in 0..4 {
            let _ = ch.service(&shared, &mut bridge);
        }
        // gap = 2000 - 208 = 1792, delivered as 250-us segments.
        let mut total = 0u32;
        loop {
            let dur = ch.service(&shared, &mut bridge);
            if bridge.pos {
                break; // next pulse started
            }
            assert!(dur <= 250);
            total += dur as u32;
        }
        assert_eq!(total, 1792);
    }

    #[test]
    fn width_and_period_clamps() {
        let shared = PulseShared::new();
        assert_eq!(shared.submit(5, 400), Err(SubmissionRejected));
        // The clamped parameters still land.
        let mut ch = PulseChannel::new(u16::MAX);
        let mut bridge = TraceBridge::default();
        shared.set_gate(true);
        let _ = ch.service(&shared, &mut bridge);
        assert_eq!(ch.active(), (MIN_WIDTH_US as u16, MIN_PERIOD_US));
    }

    #[test]
    fn degenerate_period_uses_minimum_gap() {
        let shared = PulseShared::new();
        let mut ch = PulseChannel::new(u16::MAX);
        let mut bridge = TraceBridge::default();

        // 2*width + 2*deadtime = 518 > 500: the gap floors at one dead
        // time instead of going negative.
        shared.submit(255, 500).unwrap();
        shared.set_gate(true);
        for _ in 0..4 {
            let _ = ch.service(&shared, &mut bridge);
        }
        let gap = ch.service(&shared, &mut bridge);
        assert_eq!(gap, DEAD_TIME_US);
    }
}
