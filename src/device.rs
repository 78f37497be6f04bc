//! Engine context.
//!
//! Everything with device lifetime - the two channel blocks, runtime
//! config, engine scratch, dispatcher, PRNG, ramp sequencer, and the
//! mirrored box state - collected into one struct so firmware can hold
//! a single `static` and tests can instantiate as many independent
//! devices as they like.

use crate::audio;
use crate::channel::{Channel, ChannelBlock};
use crate::config::SystemConfig;
use crate::constants::DAC_MAX;
use crate::control::OutputControl;
use crate::engine::ParamEngine;
use crate::modes::user::UserPrograms;
use crate::modes::{mode, Command, ModeDispatcher, MODE_COUNT};
use crate::output::{self, ChannelDrive};
use crate::persist::{self, Store};
use crate::prng::Prng;
use crate::ramp::RampSequencer;

/// The whole engine, as one value.
pub struct Device {
    pub channel_a: ChannelBlock,
    pub channel_b: ChannelBlock,
    pub config: SystemConfig,
    pub engine: ParamEngine,
    pub dispatcher: ModeDispatcher,
    pub user: UserPrograms,
    pub prng: Prng,
    ramp: RampSequencer,
    output_enabled: bool,
    /// Channel A's output-control flags, mirrored each tick for the
    /// collaborators that need them without touching the blocks.
    output_flags: u8,
    pot_lockout: u8,
    level_adc: [u16; 2],
    battery: u8,
}

impl Device {
    /// Build a device with factory settings. Seed the PRNG from a
    /// hardware entropy source (timer jitter); it must be nonzero to
    /// be useful, and [`Prng`](crate::prng::Prng) enforces that.
    pub fn new(seed: u16) -> Self {
        Device {
            channel_a: ChannelBlock::new(),
            channel_b: ChannelBlock::new(),
            config: SystemConfig::factory(),
            engine: ParamEngine::new(),
            dispatcher: ModeDispatcher::new(),
            user: UserPrograms::new(),
            prng: Prng::new(seed),
            ramp: RampSequencer::new(),
            output_enabled: false,
            output_flags: 0,
            pot_lockout: 0,
            level_adc: [0; 2],
            battery: 0,
        }
    }

    // ── Boot and persistence ───────────────────────────────────────

    /// Load settings, split selections, and user programs from the
    /// store. Integrity failures silently keep factory defaults.
    pub fn load_settings<S: Store>(&mut self, store: &mut S) {
        persist::load_config(store, &mut self.config);
        let (a, b) = persist::load_split_modes(store);
        self.dispatcher.set_split_modes(a, b);
        self.config.split_a_mode = a;
        self.config.split_b_mode = b;
        self.user.load(store);
    }

    /// Write settings and split selections back.
    pub fn save_settings<S: Store>(&mut self, store: &mut S) {
        persist::save_config(store, &self.config);
        let (a, b) = self.dispatcher.split_modes();
        persist::save_split_modes(store, a, b);
    }

    // ── Foreground inputs ──────────────────────────────────────────

    /// Latest multi-adjust knob sample.
    pub fn set_knob(&mut self, value: u8) {
        self.config.multi_adjust = value;
    }

    /// Latest level-pot samples, raw 10-bit.
    pub fn set_levels(&mut self, a: u16, b: u16) {
        self.level_adc = [a, b];
    }

    /// Latest battery estimate, 0-255.
    pub fn set_battery(&mut self, level: u8) {
        self.battery = level;
    }

    pub fn level_adc(&self, ch: Channel) -> u16 {
        self.level_adc[ch.index()]
    }

    pub fn battery(&self) -> u8 {
        self.battery
    }

    pub fn pot_lockout(&self) -> u8 {
        self.pot_lockout
    }

    pub fn set_pot_lockout(&mut self, flags: u8) {
        self.pot_lockout = flags;
    }

    pub fn output_flags(&self) -> u8 {
        self.output_flags
    }

    // ── Mode control ───────────────────────────────────────────────

    /// Post an asynchronous request; it is applied at the top of the
    /// next foreground pass, never mid-tick.
    pub fn request(&mut self, cmd: Command) {
        self.dispatcher.request(cmd);
    }

    /// Consume any pending deferred command. Call at the top of each
    /// foreground pass, strictly between ticks.
    pub fn poll_deferred<O: OutputControl>(&mut self, out: &mut O) {
        let Some(cmd) = self.dispatcher.take_deferred() else {
            return;
        };
        match cmd {
            Command::SetMode(n) => self.select_mode(n, out),
            Command::Pause => self.dispatcher.toggle_pause(),
            Command::Next => {
                let m = self.dispatcher.mode();
                if m + 1 < MODE_COUNT {
                    self.select_mode(m + 1, out);
                }
            }
            Command::Prev => {
                let m = self.dispatcher.mode();
                if m > 0 {
                    self.select_mode(m - 1, out);
                }
            }
            Command::Reload => self.select_mode(self.dispatcher.mode(), out),
            Command::StartRamp => self.start_output(),
        }
    }

    /// Full mode entry: silence the outputs, rebuild the blocks, and
    /// restart the engine.
    pub fn select_mode<O: OutputControl>(&mut self, mode_number: u8, out: &mut O) {
        out.set_dac(Channel::A, DAC_MAX);
        out.set_dac(Channel::B, DAC_MAX);
        out.set_gate(Channel::A, false);
        out.set_gate(Channel::B, false);

        self.dispatcher.select_mode(
            mode_number,
            &mut self.channel_a,
            &mut self.channel_b,
            &mut self.engine,
            &self.user,
            &mut self.prng,
        );
        self.config.current_mode = self.dispatcher.mode();
        self.output_flags = self.channel_a.output_flags();
    }

    // ── Per-tick work ──────────────────────────────────────────────

    /// One engine tick (call every 4 ms).
    pub fn tick(&mut self) {
        self.dispatcher.update(
            &mut self.channel_a,
            &mut self.channel_b,
            &mut self.engine,
            &self.user,
            &mut self.prng,
            &self.config,
        );
        self.output_flags = self.channel_a.output_flags();
    }

    /// Advance the operator ramp one foreground pass.
    pub fn ramp_tick(&mut self) {
        self.ramp.tick(self.config.ramp_time);
    }

    /// Replace a channel's intensity with the audio envelope. Only the
    /// audio modes listen; in every other mode this is a no-op.
    pub fn apply_audio(&mut self, ch: Channel, sample: u16) {
        if !matches!(
            self.dispatcher.mode(),
            mode::AUDIO1 | mode::AUDIO2 | mode::AUDIO3
        ) {
            return;
        }
        let block = match ch {
            Channel::A => &mut self.channel_a,
            Channel::B => &mut self.channel_b,
        };
        block.set_intensity_value(audio::envelope(sample));
    }

    // ── Output ─────────────────────────────────────────────────────

    /// Enable output and begin the intensity ramp.
    pub fn start_output(&mut self) {
        self.output_enabled = true;
        self.ramp.start();
    }

    /// Disable output entirely.
    pub fn stop_output(&mut self) {
        self.output_enabled = false;
        self.ramp.stop();
    }

    pub fn output_enabled(&self) -> bool {
        self.output_enabled
    }

    /// Current operator ramp percentage.
    pub fn ramp_percent(&self) -> u8 {
        self.ramp.percent(self.output_enabled)
    }

    /// Derive one channel's drive parameters for this pass.
    pub fn drive(&self, ch: Channel) -> ChannelDrive {
        let block = match ch {
            Channel::A => &self.channel_a,
            Channel::B => &self.channel_b,
        };
        output::derive(
            block,
            self.config.power_level,
            self.level_adc[ch.index()],
            self.ramp_percent(),
            self.output_enabled,
        )
    }

    // ── Whole-block operations (box commands) ──────────────────────

    pub fn swap_channels(&mut self) {
        core::mem::swap(&mut self.channel_a, &mut self.channel_b);
    }

    pub fn copy_a_to_b(&mut self) {
        self.channel_b = self.channel_a.clone();
    }

    pub fn copy_b_to_a(&mut self) {
        self.channel_a = self.channel_b.clone();
    }
}
