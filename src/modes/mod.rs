//! Mode dispatcher.
//!
//! Maps mode indices to their initial bytecode modules, owns the mode
//! entry protocol (defaults, module execution, post fix-ups, direction
//! re-init), the split-mode double-init, the random-rotation mode, and
//! the deferred command mailbox through which the menu and the host
//! request mode changes without re-entering the engine mid-tick.

pub mod interp;
pub mod programs;
pub mod user;

use crate::channel::{group, ChannelBlock};
use crate::config::SystemConfig;
use crate::engine::ParamEngine;
use crate::prng::Prng;
use programs::{MODULES, MODULE_COUNT};
use user::UserPrograms;

/// Mode indices. Modes 0-16 are engine-driven built-ins, 17-23 run the
/// user program slots, 24 drives each channel from its own selection.
pub mod mode {
    pub const WAVES: u8 = 0;
    pub const STROKE: u8 = 1;
    pub const CLIMB: u8 = 2;
    pub const COMBO: u8 = 3;
    pub const INTENSE: u8 = 4;
    pub const RHYTHM: u8 = 5;
    pub const AUDIO1: u8 = 6;
    pub const AUDIO2: u8 = 7;
    pub const AUDIO3: u8 = 8;
    pub const RANDOM1: u8 = 9;
    pub const RANDOM2: u8 = 10;
    pub const TOGGLE: u8 = 11;
    pub const ORGASM: u8 = 12;
    pub const TORMENT: u8 = 13;
    pub const PHASE1: u8 = 14;
    pub const PHASE2: u8 = 15;
    pub const PHASE3: u8 = 16;
    pub const USER1: u8 = 17;
    pub const SPLIT: u8 = 24;
}

/// Total number of modes.
pub const MODE_COUNT: u8 = 25;

/// Asynchronous requests from the menu or the host. A single-slot
/// mailbox holds at most one; a newer request silently supersedes an
/// unconsumed older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    SetMode(u8),
    Pause,
    Next,
    Prev,
    Reload,
    StartRamp,
}

/// Initial modules per built-in mode, `None` padding unused slots.
const MODE_MODULES: [[Option<u8>; 2]; 17] = [
    [Some(11), Some(12)], // Waves
    [Some(3), Some(4)],   // Stroke
    [Some(5), Some(8)],   // Climb
    [Some(13), Some(33)], // Combo
    [Some(14), Some(2)],  // Intense
    [Some(15), None],     // Rhythm
    [Some(23), None],     // Audio 1
    [Some(23), None],     // Audio 2
    [Some(34), None],     // Audio 3
    [None, None],         // Random 1 (rotates)
    [Some(32), None],     // Random 2
    [Some(18), None],     // Toggle
    [Some(24), None],     // Orgasm
    [Some(28), None],     // Torment
    [Some(20), Some(21)], // Phase 1
    [Some(20), Some(21)], // Phase 2
    [Some(22), None],     // Phase 3
];

/// Modes the random-rotation mode draws from.
const ROTATION_POOL: [u8; 6] = [
    mode::WAVES,
    mode::STROKE,
    mode::CLIMB,
    mode::COMBO,
    mode::INTENSE,
    mode::RHYTHM,
];

/// Random-rotation scratch: the active sub-mode and its deadline on
/// the slow (~1.91 Hz) timer.
struct Rotation {
    sub_mode: Option<u8>,
    started: u16,
    duration: u16,
}

impl Rotation {
    const fn new() -> Self {
        Rotation {
            sub_mode: None,
            started: 0,
            duration: 0,
        }
    }
}

/// Mode dispatcher state.
pub struct ModeDispatcher {
    current_mode: u8,
    split_a: u8,
    split_b: u8,
    paused: bool,
    rotation: Rotation,
    deferred: Option<Command>,
}

impl ModeDispatcher {
    pub const fn new() -> Self {
        ModeDispatcher {
            current_mode: mode::WAVES,
            split_a: mode::WAVES,
            split_b: mode::WAVES,
            paused: false,
            rotation: Rotation::new(),
            deferred: None,
        }
    }

    pub fn mode(&self) -> u8 {
        self.current_mode
    }

    pub fn split_modes(&self) -> (u8, u8) {
        (self.split_a, self.split_b)
    }

    /// Set the split-mode channel selections, clamping anything at or
    /// beyond the split mode itself back to the first mode.
    pub fn set_split_modes(&mut self, mode_a: u8, mode_b: u8) {
        self.split_a = if mode_a < mode::SPLIT { mode_a } else { 0 };
        self.split_b = if mode_b < mode::SPLIT { mode_b } else { 0 };
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause/mute toggle: a paused dispatcher skips ticks entirely, so
    /// all engine state freezes in place.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Post a deferred command. Last write wins; the foreground
    /// consumes the mailbox strictly between ticks.
    pub fn request(&mut self, cmd: Command) {
        self.deferred = Some(cmd);
    }

    /// Take the pending deferred command, if any.
    pub fn take_deferred(&mut self) -> Option<Command> {
        self.deferred.take()
    }

    /// Mode entry. The caller is responsible for silencing the outputs
    /// (gates off, DAC to full-scale) around this call; everything
    /// block- and engine-side happens here.
    pub fn select_mode(
        &mut self,
        mode_number: u8,
        a: &mut ChannelBlock,
        b: &mut ChannelBlock,
        engine: &mut ParamEngine,
        user: &UserPrograms,
        prng: &mut Prng,
    ) {
        let mode_number = if mode_number < MODE_COUNT { mode_number } else { 0 };
        self.current_mode = mode_number;
        self.paused = false;
        engine.reset();

        if mode_number == mode::RANDOM1 {
            a.load_defaults();
            b.load_defaults();
            self.rotation = Rotation::new();
        } else if mode_number == mode::SPLIT {
            self.init_split(a, b, user, prng);
        } else {
            init_mode_modules(mode_number, a, b, user, prng);
        }

        engine.init_directions(a, b);
    }

    /// One engine tick plus housekeeping: random rotation, the sweep
    /// itself, and draining this tick's boundary-triggered modules.
    pub fn update(
        &mut self,
        a: &mut ChannelBlock,
        b: &mut ChannelBlock,
        engine: &mut ParamEngine,
        user: &UserPrograms,
        prng: &mut Prng,
        cfg: &SystemConfig,
    ) {
        if self.paused {
            return;
        }

        if self.current_mode == mode::RANDOM1 {
            self.rotation_check(a, b, engine, user, prng);
        }

        engine.tick(a, b, cfg);

        for ch in [crate::channel::Channel::A, crate::channel::Channel::B] {
            if let Some(module) = engine.take_pending(ch) {
                if (module as usize) < MODULE_COUNT {
                    interp::execute(MODULES[module as usize], a, b, prng);
                    engine.init_directions(a, b);
                }
            }
        }
    }

    fn rotation_check(
        &mut self,
        a: &mut ChannelBlock,
        b: &mut ChannelBlock,
        engine: &mut ParamEngine,
        user: &UserPrograms,
        prng: &mut Prng,
    ) {
        let now = engine.slow_count();
        let due = match self.rotation.sub_mode {
            None => true,
            Some(_) => now.wrapping_sub(self.rotation.started) >= self.rotation.duration,
        };
        if !due {
            return;
        }

        let sub = ROTATION_POOL[prng.next8() as usize % ROTATION_POOL.len()];
        self.rotation.sub_mode = Some(sub);
        self.rotation.started = now;
        // 3-22 slow counts, roughly 1.5 to 12 seconds per sub-mode.
        self.rotation.duration = 3 + (prng.next8() % 20) as u16;

        init_mode_modules(sub, a, b, user, prng);
        engine.init_directions(a, b);
    }

    /// Split-mode init. Modules write relative to the apply-channel
    /// mask, so each sub-mode runs in its own pass against a reset
    /// block pair with the mask pinned to one channel; the resulting
    /// blocks are snapshotted and finally restored together.
    fn init_split(
        &mut self,
        a: &mut ChannelBlock,
        b: &mut ChannelBlock,
        user: &UserPrograms,
        prng: &mut Prng,
    ) {
        reset_blocks(a, b);
        a.set_apply_channel(0x01);
        interp::execute(MODULES[1], a, b, prng);
        setup_mode(self.split_a, a, b, user, prng);
        let saved_a = a.clone();

        reset_blocks(a, b);
        a.set_apply_channel(0x02);
        interp::execute(MODULES[1], a, b, prng);
        setup_mode(self.split_b, a, b, user, prng);
        // Audio/phase fix-ups write channel A's gate and output flags
        // directly, outside the mask routing; carry them over to B.
        b.set_gate_value(a.gate_value());
        b.set_output_flags(a.output_flags());
        let saved_b = b.clone();

        *a = saved_a;
        *b = saved_b;
        a.set_apply_channel(0x03);
    }
}

impl Default for ModeDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Sweep-bound fix-ups applied on top of the default image at every
/// mode entry, before any module runs.
fn apply_mode_init(ch: &mut ChannelBlock) {
    ch.set_field(group::INTENSITY, group::MIN, 0x9B);
    ch.set_field(group::INTENSITY, group::RATE, 0xFF);
    ch.set_field(group::FREQ, group::MIN, 0xA8);
    ch.set_field(group::FREQ, group::MAX, 0xFF);
    ch.set_field(group::FREQ, group::RATE, 0xFF);
    ch.set_field(group::WIDTH, group::MIN, 0x00);
    ch.set_field(group::WIDTH, group::MAX, 0xB3);
    ch.set_field(group::WIDTH, group::RATE, 0xFF);
}

fn reset_blocks(a: &mut ChannelBlock, b: &mut ChannelBlock) {
    a.load_defaults();
    b.load_defaults();
    apply_mode_init(a);
    apply_mode_init(b);
}

/// Reset both blocks and run a mode's configuration.
fn init_mode_modules(
    mode_number: u8,
    a: &mut ChannelBlock,
    b: &mut ChannelBlock,
    user: &UserPrograms,
    prng: &mut Prng,
) {
    reset_blocks(a, b);
    a.set_apply_channel(0x03);
    setup_mode(mode_number, a, b, user, prng);
    a.set_apply_channel(0x03);
}

/// Run a mode's initial modules and post fix-ups against the blocks as
/// currently masked.
fn setup_mode(
    mode_number: u8,
    a: &mut ChannelBlock,
    b: &mut ChannelBlock,
    user: &UserPrograms,
    prng: &mut Prng,
) {
    if (mode::USER1..mode::SPLIT).contains(&mode_number) {
        user.execute((mode_number - mode::USER1) as usize, a, b);
        return;
    }

    // Callers never pass the split mode itself: select_mode routes it
    // to init_split, and the split selections are clamped below it.
    for module in MODE_MODULES[mode_number as usize].into_iter().flatten() {
        interp::execute(MODULES[module as usize], a, b, prng);
    }

    if mode_number == mode::PHASE2 {
        interp::execute(MODULES[35], a, b, prng);
    }

    match mode_number {
        mode::AUDIO1 => {
            a.set_gate_value(0x47);
            b.set_gate_value(0x47);
            a.set_output_flags(0x40);
        }
        mode::AUDIO2 => {
            a.set_gate_value(0x47);
            b.set_gate_value(0x47);
        }
        mode::AUDIO3 => {
            a.set_gate_value(0x67);
            b.set_gate_value(0x67);
            a.set_output_flags(0x04);
        }
        mode::PHASE1 | mode::PHASE2 => {
            a.set_output_flags(0x05);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::select;

    struct Rig {
        a: ChannelBlock,
        b: ChannelBlock,
        engine: ParamEngine,
        dispatcher: ModeDispatcher,
        user: UserPrograms,
        prng: Prng,
        cfg: SystemConfig,
    }

    impl Rig {
        fn new() -> Self {
            Rig {
                a: ChannelBlock::new(),
                b: ChannelBlock::new(),
                engine: ParamEngine::new(),
                dispatcher: ModeDispatcher::new(),
                user: UserPrograms::new(),
                prng: Prng::new(0xBEEF),
                cfg: SystemConfig::factory(),
            }
        }

        fn select(&mut self, m: u8) {
            self.dispatcher.select_mode(
                m,
                &mut self.a,
                &mut self.b,
                &mut self.engine,
                &self.user,
                &mut self.prng,
            );
        }

        fn tick(&mut self) {
            self.dispatcher.update(
                &mut self.a,
                &mut self.b,
                &mut self.engine,
                &self.user,
                &mut self.prng,
                &self.cfg,
            );
        }
    }

    #[test]
    fn waves_entry_configures_both_sweeps() {
        let mut rig = Rig::new();
        rig.select(mode::WAVES);

        assert_eq!(rig.a.field(group::FREQ, group::SELECT), 0x41);
        assert_eq!(rig.a.field(group::FREQ, group::MIN), 0xA8);
        assert_eq!(rig.a.field(group::FREQ, group::MAX), 0xFF);
        assert_eq!(rig.a.field(group::FREQ, group::STEP), 1);
        assert_eq!(rig.a.field(group::WIDTH, group::SELECT), 0x41);
        assert_eq!(rig.a.field(group::WIDTH, group::MIN), 0x00);
        assert_eq!(rig.a.field(group::WIDTH, group::MAX), 0xB3);
        assert_eq!(rig.a.field(group::WIDTH, group::STEP), 3);
        // Channel B got the same sweeps with its own width step.
        assert_eq!(rig.b.field(group::WIDTH, group::STEP), 2);
    }

    #[test]
    fn mode_entry_is_idempotent() {
        let mut rig = Rig::new();
        rig.select(mode::WAVES);
        let snap_a = rig.a.clone();
        let snap_b = rig.b.clone();

        // Let the engine disturb the blocks, then re-enter.
        for _ in 0..300 {
            rig.tick();
        }
        rig.select(mode::WAVES);
        assert_eq!(rig.a, snap_a);
        assert_eq!(rig.b, snap_b);
    }

    #[test]
    fn climb_chain_advances_through_its_stages() {
        let mut rig = Rig::new();
        rig.cfg.multi_adjust = 255; // fastest sweep rate
        rig.select(mode::CLIMB);

        assert_eq!(rig.a.field(group::FREQ, group::STEP), 1);
        assert_eq!(rig.a.field(group::FREQ, group::ACTION_MIN), 6);

        // Full down-sweep at step 1 from 255 to min 8, then module 6.
        let mut step2_seen = false;
        for _ in 0..2000 {
            rig.tick();
            if rig.a.field(group::FREQ, group::STEP) == 2 {
                step2_seen = true;
                break;
            }
        }
        assert!(step2_seen, "module 6 never ran");
        assert_eq!(rig.a.field(group::FREQ, group::ACTION_MIN), 7);
        assert_eq!(rig.a.freq_value(), 0xFF, "module 6 restarts the sweep");

        let mut step4_seen = false;
        for _ in 0..2000 {
            rig.tick();
            if rig.a.field(group::FREQ, group::STEP) == 4 {
                step4_seen = true;
                break;
            }
        }
        assert!(step4_seen, "module 7 never ran");
        assert_eq!(rig.a.field(group::FREQ, group::ACTION_MIN), 5);

        let mut wrapped = false;
        for _ in 0..2000 {
            rig.tick();
            if rig.a.field(group::FREQ, group::STEP) == 1 {
                wrapped = true;
                break;
            }
        }
        assert!(wrapped, "chain did not return to module 5");
        assert_eq!(rig.a.field(group::FREQ, group::ACTION_MIN), 6);
    }

    #[test]
    fn split_init_isolates_the_channels() {
        // Reference: what each mode alone produces for its channel.
        let mut waves = Rig::new();
        waves.select(mode::WAVES);
        let mut climb = Rig::new();
        climb.select(mode::CLIMB);

        let mut rig = Rig::new();
        rig.dispatcher.set_split_modes(mode::WAVES, mode::CLIMB);
        rig.select(mode::SPLIT);

        // Channel A carries Waves' parameter groups, B carries Climb's.
        for base in [group::INTENSITY, group::FREQ, group::WIDTH] {
            for field in [
                group::VALUE,
                group::MIN,
                group::MAX,
                group::STEP,
                group::SELECT,
            ] {
                assert_eq!(
                    rig.a.field(base, field),
                    waves.a.field(base, field),
                    "A group {base:#04x} field {field}"
                );
                assert_eq!(
                    rig.b.field(base, field),
                    climb.b.field(base, field),
                    "B group {base:#04x} field {field}"
                );
            }
        }
        assert_eq!(rig.a.apply_channel(), 0x03);
    }

    #[test]
    fn random_rotation_picks_a_pool_mode_on_first_update() {
        let mut rig = Rig::new();
        rig.select(mode::RANDOM1);
        // Quiescent until the first update: pure defaults, no sweep
        // bound fix-ups yet.
        assert_eq!(rig.a.field(group::FREQ, group::MIN), 0x09);
        let snap = rig.a.clone();

        rig.tick();
        // A sub-mode's entry ran: bounds were fixed up and modules
        // configured the block.
        assert_ne!(rig.a, snap);
        assert_eq!(rig.dispatcher.mode(), mode::RANDOM1);
    }

    #[test]
    fn stop_action_survives_only_until_reentry() {
        let mut rig = Rig::new();
        rig.select(mode::WAVES);
        // The ramp group STOPs at its maximum; once there it stays.
        for _ in 0..2000 {
            rig.tick();
        }
        assert_eq!(rig.a.ramp_value(), 0xFF);
        assert_eq!(
            rig.a.field(group::RAMP, group::SELECT) & select::TIMER_MASK,
            select::TIMER_NONE
        );
        rig.select(mode::WAVES);
        assert_eq!(rig.a.ramp_value(), 0x9C);
        assert_ne!(
            rig.a.field(group::RAMP, group::SELECT) & select::TIMER_MASK,
            select::TIMER_NONE
        );
    }

    #[test]
    fn deferred_mailbox_is_last_write_wins() {
        let mut d = ModeDispatcher::new();
        d.request(Command::SetMode(3));
        d.request(Command::Next);
        assert_eq!(d.take_deferred(), Some(Command::Next));
        assert_eq!(d.take_deferred(), None);
    }

    #[test]
    fn paused_dispatcher_freezes_all_state() {
        let mut rig = Rig::new();
        rig.select(mode::WAVES);
        for _ in 0..10 {
            rig.tick();
        }
        rig.dispatcher.toggle_pause();
        let snap_a = rig.a.clone();
        let tick = rig.engine.tick_count();
        for _ in 0..50 {
            rig.tick();
        }
        assert_eq!(rig.a, snap_a);
        assert_eq!(rig.engine.tick_count(), tick);
    }
}
