//! Timer-driven parameter modulation engine.
//!
//! Runs at the foreground tick rate (~244 Hz, one call every 4 ms) and
//! sweeps the four parameter groups of each channel block between their
//! `min` and `max` bounds. Every derived timer is phased off a single
//! wrapping 8-bit tick counter:
//!
//! | select bits 0-1 | fires |
//! |---|---|
//! | `00` | never (group is static, source resolution only) |
//! | `01` | every tick (~244 Hz) |
//! | `10` | every 8th tick (~30 Hz) |
//! | `11` | on counter wrap (~1 Hz) |
//!
//! A group's `min` and rate can each be re-sourced every step from one
//! of four places (own field, an advanced setting, the scaled knob, or
//! the other channel's matching field), optionally bitwise-inverted.
//! Hitting a sweep bound runs the group's boundary action; module
//! triggers are mailboxed into one slot per channel (first trigger wins)
//! and drained by the dispatcher after both channels have stepped, so
//! bytecode never runs from inside the sweep loop.
//!
//! Sweep direction is not stored in the block. It lives in a small
//! shadow here and is re-derived from the field values alone by
//! [`ParamEngine::init_directions`] after every mode entry or module
//! execution; the block stays self-describing.

use crate::channel::{action, gate, gate_select, group, reg, select, Channel, ChannelBlock};
use crate::config::SystemConfig;

/// Number of engine ticks per count of the slow master timer
/// (128 ticks ≈ 1.91 Hz).
const SLOW_TIMER_DIVIDER: u8 = 128;

/// Map the raw knob to a block's configured range. `high` is the value
/// at full deflection, `low` at zero; `high < low` yields an inverted
/// response.
pub fn scale_knob(raw: u8, high: u8, low: u8) -> u8 {
    if high >= low {
        low + ((raw as u16 * (high - low) as u16) >> 8) as u8
    } else {
        low - ((raw as u16 * (low - high) as u16) >> 8) as u8
    }
}

/// Resolve a 3-bit source index. Index 0 reads the group's own field,
/// 1 the group-specific advanced setting, 2 the scaled knob, 3 the
/// other channel's field; bit 0x4 inverts the result. Nonsense indices
/// cannot occur (the index is masked to three bits).
fn resolve_source(index: u8, own: u8, advanced: u8, knob: u8, other: u8) -> u8 {
    let value = match index & 0x03 {
        0 => own,
        1 => advanced,
        2 => knob,
        _ => other,
    };
    if index & select::SRC_INVERT != 0 {
        !value
    } else {
        value
    }
}

/// Snapshot of the fields one channel exposes to the other as sweep
/// sources. Channel A reads B's pre-step values; B reads A's post-step
/// values, matching the fixed A-then-B stepping order.
#[derive(Clone, Copy)]
struct PeerView {
    group_value: [u8; 4],
    next_timer_max: u8,
}

impl PeerView {
    fn capture(ch: &ChannelBlock) -> Self {
        PeerView {
            group_value: [
                ch.field(group::RAMP, group::VALUE),
                ch.field(group::INTENSITY, group::VALUE),
                ch.field(group::FREQ, group::VALUE),
                ch.field(group::WIDTH, group::VALUE),
            ],
            next_timer_max: ch.byte(reg::NEXT_MODULE_TIMER_MAX),
        }
    }
}

/// The per-channel engine scratch that lives outside the register
/// blocks: tick counters, direction shadow, gate-timer phase, and the
/// pending-module mailboxes.
pub struct ParamEngine {
    tick: u8,
    slow_sub: u8,
    slow_timer: u16,
    /// One direction bit per group, bit set = sweeping down.
    dir_down: [u8; 2],
    /// Gate timer phase: set while counting the off interval.
    gate_off_phase: [bool; 2],
    gate_timer: [u8; 2],
    pending: [Option<u8>; 2],
}

impl ParamEngine {
    pub const fn new() -> Self {
        ParamEngine {
            tick: 0,
            slow_sub: 0,
            slow_timer: 0,
            dir_down: [0; 2],
            gate_off_phase: [false; 2],
            gate_timer: [0; 2],
            pending: [None, None],
        }
    }

    /// Reset all engine scratch. Part of the mode-entry protocol.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Wrapping tick counter, the phase reference for derived timers.
    pub fn tick_count(&self) -> u8 {
        self.tick
    }

    /// Slow master timer, counting at ~1.91 Hz.
    pub fn slow_count(&self) -> u16 {
        self.slow_timer
    }

    /// Take the pending module trigger for one channel, if any.
    pub fn take_pending(&mut self, ch: Channel) -> Option<u8> {
        self.pending[ch.index()].take()
    }

    /// Rebuild the direction shadow from the blocks alone: each group
    /// heads for its nearest sweep endpoint (ties go up), and the gate
    /// timers restart in the phase matching the current gate bit.
    /// Called after every mode entry and after every boundary-triggered
    /// module execution.
    pub fn init_directions(&mut self, a: &ChannelBlock, b: &ChannelBlock) {
        for (idx, ch) in [a, b].into_iter().enumerate() {
            let mut flags = 0u8;
            for (bit, base) in group::ALL.into_iter().enumerate() {
                if infer_dir_down(
                    ch.field(base, group::VALUE),
                    ch.field(base, group::MIN),
                    ch.field(base, group::MAX),
                ) {
                    flags |= 1 << bit;
                }
            }
            self.dir_down[idx] = flags;
            self.gate_off_phase[idx] = ch.gate_value() & gate::ON == 0;
            self.gate_timer[idx] = 0;
        }
    }

    /// Advance the engine one tick: gate timers, then channel A's four
    /// groups and next-module timer, then channel B's. Boundary module
    /// triggers collect in the per-channel mailboxes for the dispatcher
    /// to drain afterwards.
    pub fn tick(&mut self, a: &mut ChannelBlock, b: &mut ChannelBlock, cfg: &SystemConfig) {
        self.tick = self.tick.wrapping_add(1);
        self.slow_sub += 1;
        if self.slow_sub >= SLOW_TIMER_DIVIDER {
            self.slow_sub = 0;
            self.slow_timer = self.slow_timer.wrapping_add(1);
        }

        self.update_gate_timer(0, a, cfg);
        self.update_gate_timer(1, b, cfg);

        self.pending = [None, None];

        let peer = PeerView::capture(b);
        let knob_a = {
            let (high, low) = a.knob_range();
            scale_knob(cfg.multi_adjust, high, low)
        };
        self.step_channel(0, a, peer, knob_a, cfg);
        self.step_next_module(0, a, knob_a, cfg.tempo, peer.next_timer_max);

        let peer = PeerView::capture(a);
        let knob_b = {
            let (high, low) = b.knob_range();
            scale_knob(cfg.multi_adjust, high, low)
        };
        self.step_channel(1, b, peer, knob_b, cfg);
        self.step_next_module(1, b, knob_b, cfg.tempo, peer.next_timer_max);
    }

    fn fires(&self, timer_sel: u8) -> bool {
        match timer_sel {
            select::TIMER_FAST => true,
            select::TIMER_MED => self.tick & 0x07 == 0,
            select::TIMER_SLOW => self.tick == 0,
            _ => false,
        }
    }

    fn step_channel(
        &mut self,
        idx: usize,
        ch: &mut ChannelBlock,
        peer: PeerView,
        knob: u8,
        cfg: &SystemConfig,
    ) {
        // Group order is fixed: ramp, intensity, frequency, width.
        // Each group's min/rate sources map to its own advanced pair.
        let advanced: [(u8, u8); 4] = [
            (cfg.ramp_level, cfg.ramp_time),
            (cfg.depth, cfg.tempo),
            (cfg.frequency, cfg.effect),
            (cfg.width, cfg.pace),
        ];

        for (bit, base) in group::ALL.into_iter().enumerate() {
            let timer_sel = ch.field(base, group::SELECT) & select::TIMER_MASK;
            if timer_sel != select::TIMER_NONE && !self.fires(timer_sel) {
                continue;
            }
            let (adv_min, adv_rate) = advanced[bit];
            let mut down = self.dir_down[idx] & (1 << bit) != 0;
            let trigger = step_group(
                ch,
                base,
                adv_min,
                adv_rate,
                knob,
                peer.group_value[bit],
                &mut down,
            );
            if down {
                self.dir_down[idx] |= 1 << bit;
            } else {
                self.dir_down[idx] &= !(1 << bit);
            }
            if let Some(module) = trigger {
                self.pending[idx].get_or_insert(module);
            }
        }
    }

    fn update_gate_timer(&mut self, idx: usize, ch: &mut ChannelBlock, cfg: &SystemConfig) {
        let sel = ch.byte(reg::GATE_SELECT);
        let timer_sel = sel & select::TIMER_MASK;
        if timer_sel == select::TIMER_NONE || !self.fires(timer_sel) {
            return;
        }

        let (high, low) = ch.knob_range();
        let knob = scale_knob(cfg.multi_adjust, high, low);

        let mut on_time = ch.byte(reg::GATE_ONTIME);
        if sel & gate_select::ON_FROM_KNOB != 0 {
            on_time = knob;
        } else if sel & gate_select::ON_FROM_EFFECT != 0 {
            on_time = cfg.effect;
        }
        let on_time = on_time.max(1);

        let mut off_time = ch.byte(reg::GATE_OFFTIME);
        if sel & gate_select::OFF_FROM_KNOB != 0 {
            off_time = knob;
        } else if sel & gate_select::OFF_FROM_TEMPO != 0 {
            off_time = cfg.tempo;
        }
        let off_time = off_time.max(1);

        self.gate_timer[idx] += 1;
        if !self.gate_off_phase[idx] {
            if self.gate_timer[idx] >= on_time {
                self.gate_timer[idx] = 0;
                self.gate_off_phase[idx] = true;
                ch.set_gate_value(ch.gate_value() & !gate::ON);
            }
        } else if self.gate_timer[idx] >= off_time {
            self.gate_timer[idx] = 0;
            self.gate_off_phase[idx] = false;
            ch.set_gate_value(ch.gate_value() | gate::ON);
            ch.set_byte(
                reg::GATE_TRANSITIONS,
                ch.byte(reg::GATE_TRANSITIONS).wrapping_add(1),
            );
        }
    }

    fn step_next_module(
        &mut self,
        idx: usize,
        ch: &mut ChannelBlock,
        knob: u8,
        adv: u8,
        peer_max: u8,
    ) {
        let sel = ch.byte(reg::NEXT_MODULE_SELECT);
        let timer_sel = sel & select::TIMER_MASK;
        if timer_sel == select::TIMER_NONE || !self.fires(timer_sel) {
            return;
        }

        let rate_idx = (sel >> select::RATE_SRC_SHIFT) & select::SRC_MASK;
        let max = resolve_source(
            rate_idx,
            ch.byte(reg::NEXT_MODULE_TIMER_MAX),
            adv,
            knob,
            peer_max,
        )
        .max(1);

        let cur = ch.byte(reg::NEXT_MODULE_TIMER_CUR).wrapping_add(1);
        if cur >= max {
            ch.set_byte(reg::NEXT_MODULE_TIMER_CUR, 0);
            self.pending[idx].get_or_insert(ch.byte(reg::NEXT_MODULE_NUMBER));
        } else {
            ch.set_byte(reg::NEXT_MODULE_TIMER_CUR, cur);
        }
    }
}

impl Default for ParamEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Initial sweep direction for one group, from field values alone.
fn infer_dir_down(value: u8, min: u8, max: u8) -> bool {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if hi == lo {
        return false;
    }
    if value >= hi {
        return true;
    }
    if value <= lo {
        return false;
    }
    // Nearest endpoint wins, ties go up.
    (hi - value) > (value - lo)
}

/// Step one parameter group for one firing opportunity. Returns a
/// module number if a boundary action requested one.
fn step_group(
    ch: &mut ChannelBlock,
    base: u8,
    adv_min: u8,
    adv_rate: u8,
    knob: u8,
    peer_value: u8,
    dir_down: &mut bool,
) -> Option<u8> {
    let sel = ch.field(base, group::SELECT);
    let timer_sel = sel & select::TIMER_MASK;

    if timer_sel == select::TIMER_NONE {
        // Static group: the min source, if any, drives the value
        // directly each tick.
        let src = (sel >> select::MIN_SRC_SHIFT) & select::SRC_MASK;
        if src != 0 {
            let value = ch.field(base, group::VALUE);
            ch.set_field(
                base,
                group::VALUE,
                resolve_source(src, value, adv_min, knob, peer_value),
            );
        }
        return None;
    }

    // Timer-driven group; the caller has already checked this tick's
    // rate phase.
    let rate_idx = (sel >> select::RATE_SRC_SHIFT) & select::SRC_MASK;
    let rate = resolve_source(rate_idx, ch.field(base, group::RATE), adv_rate, knob, peer_value)
        .max(1);

    let timer = ch.field(base, group::TIMER).wrapping_add(1);
    if timer < rate {
        ch.set_field(base, group::TIMER, timer);
        return None;
    }
    ch.set_field(base, group::TIMER, 0);

    let min_idx = (sel >> select::MIN_SRC_SHIFT) & select::SRC_MASK;
    if min_idx != 0 {
        let min = ch.field(base, group::MIN);
        ch.set_field(
            base,
            group::MIN,
            resolve_source(min_idx, min, adv_min, knob, peer_value),
        );
    }

    let step = ch.field(base, group::STEP);
    if step == 0 {
        return None;
    }

    let value = ch.field(base, group::VALUE);
    let min = ch.field(base, group::MIN);
    let max = ch.field(base, group::MAX);

    if !*dir_down {
        let next = value as u16 + step as u16;
        if next > max as u16 {
            let code = ch.field(base, group::ACTION_MAX);
            boundary(ch, base, code, true, dir_down)
        } else {
            ch.set_field(base, group::VALUE, next as u8);
            None
        }
    } else {
        let next = value as i16 - step as i16;
        if next < min as i16 {
            let code = ch.field(base, group::ACTION_MIN);
            boundary(ch, base, code, false, dir_down)
        } else {
            ch.set_field(base, group::VALUE, next as u8);
            None
        }
    }
}

/// Execute a sweep-boundary action. `at_max` tells which endpoint was
/// crossed. Every action clamps the value onto the endpoint itself;
/// a reversal's first step away happens on the next firing tick.
fn boundary(
    ch: &mut ChannelBlock,
    base: u8,
    code: u8,
    at_max: bool,
    dir_down: &mut bool,
) -> Option<u8> {
    let min = ch.field(base, group::MIN);
    let max = ch.field(base, group::MAX);
    let endpoint = if at_max { max } else { min };

    match code {
        action::REVERSE | action::REVERSE_TOGGLE => {
            if code == action::REVERSE_TOGGLE {
                ch.set_gate_value(ch.gate_value() ^ gate::ALT_POL);
            }
            ch.set_field(base, group::VALUE, endpoint);
            *dir_down = at_max;
            None
        }
        action::LOOP => {
            // Wrap to the opposite endpoint, direction unchanged.
            ch.set_field(base, group::VALUE, if at_max { min } else { max });
            None
        }
        action::STOP => {
            ch.set_field(base, group::VALUE, endpoint);
            let sel = ch.field(base, group::SELECT);
            ch.set_field(base, group::SELECT, sel & !select::TIMER_MASK);
            None
        }
        code if action::is_module(code) => {
            ch.set_field(base, group::VALUE, endpoint);
            Some(code)
        }
        _ => {
            ch.set_field(base, group::VALUE, endpoint);
            None
        }
    }
}
