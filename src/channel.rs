//! Per-channel register block.
//!
//! Each channel's entire live state is a 64-byte register file with a
//! contractual layout: bytecode modules and the host protocol address it
//! by byte offset, so the field order here can never change. The block
//! is stored as a packed byte array with named accessors on top, which
//! keeps offset-indexed access free of any layout assumptions.
//!
//! Channel A's block sits at addresses `0x080-0x0BF`, channel B's at
//! `0x180-0x1BF`. Anything outside those windows resolves to a scratch
//! byte so stray writes land somewhere harmless.

/// Output channel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    A,
    B,
}

impl Channel {
    /// Index into per-channel arrays.
    pub fn index(self) -> usize {
        match self {
            Channel::A => 0,
            Channel::B => 1,
        }
    }

    /// The opposite channel.
    pub fn other(self) -> Channel {
        match self {
            Channel::A => Channel::B,
            Channel::B => Channel::A,
        }
    }
}

/// Register-file length in bytes.
pub const BLOCK_LEN: usize = 64;

/// Base register address of channel A's block.
pub const BASE_A: u16 = 0x080;

/// Base register address of channel B's block.
pub const BASE_B: u16 = 0x180;

/// Byte offsets of the named registers within a block.
pub mod reg {
    pub const RETRY_COUNT: u8 = 0x02;
    pub const OUTPUT_FLAGS: u8 = 0x03;
    pub const COND_MODULE: u8 = 0x04;
    /// Which channel(s) channel-A-relative writes land on: bit 0 = A,
    /// bit 1 = B.
    pub const APPLY_CHANNEL: u8 = 0x05;
    /// Value the knob maps to at full deflection.
    pub const KNOB_RANGE_HIGH: u8 = 0x06;
    /// Value the knob maps to at zero deflection.
    pub const KNOB_RANGE_LOW: u8 = 0x07;
    pub const ROUTINE_TIMER_LO: u8 = 0x08;
    pub const ROUTINE_TIMER_MID: u8 = 0x09;
    pub const ROUTINE_TIMER_HI: u8 = 0x0A;
    pub const ROUTINE_TIMER_SLOWER: u8 = 0x0B;
    /// Scratch byte used by the bytecode store/load ops.
    pub const BANK: u8 = 0x0C;
    pub const RANDOM_MIN: u8 = 0x0D;
    pub const RANDOM_MAX: u8 = 0x0E;
    pub const AUDIO_TRIGGER_MODULE: u8 = 0x0F;
    pub const GATE_VALUE: u8 = 0x10;
    pub const GATE_WANT_A: u8 = 0x11;
    pub const GATE_WANT_B: u8 = 0x12;
    pub const NEXT_MODULE_TIMER_CUR: u8 = 0x14;
    pub const NEXT_MODULE_TIMER_MAX: u8 = 0x15;
    pub const NEXT_MODULE_SELECT: u8 = 0x16;
    pub const NEXT_MODULE_NUMBER: u8 = 0x17;
    pub const GATE_ONTIME: u8 = 0x18;
    pub const GATE_OFFTIME: u8 = 0x19;
    pub const GATE_SELECT: u8 = 0x1A;
    pub const GATE_TRANSITIONS: u8 = 0x1B;
}

/// Parameter-group base offsets and the fixed field order within each
/// nine-byte group.
pub mod group {
    pub const RAMP: u8 = 0x1C;
    pub const INTENSITY: u8 = 0x25;
    pub const FREQ: u8 = 0x2E;
    pub const WIDTH: u8 = 0x37;

    /// The four groups in stepping order.
    pub const ALL: [u8; 4] = [RAMP, INTENSITY, FREQ, WIDTH];

    pub const VALUE: u8 = 0;
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 2;
    pub const RATE: u8 = 3;
    pub const STEP: u8 = 4;
    pub const ACTION_MIN: u8 = 5;
    pub const ACTION_MAX: u8 = 6;
    pub const SELECT: u8 = 7;
    pub const TIMER: u8 = 8;
}

/// Select-byte layout: timer rate in bits 0-1, min source in bits 2-4,
/// rate source in bits 5-7. Source indices are 3 bits with 0x4 meaning
/// "invert the resolved value".
pub mod select {
    pub const TIMER_MASK: u8 = 0x03;
    /// Group is static; only source resolution runs.
    pub const TIMER_NONE: u8 = 0x00;
    /// Fires every engine tick (~244 Hz).
    pub const TIMER_FAST: u8 = 0x01;
    /// Fires every eighth tick (~30 Hz).
    pub const TIMER_MED: u8 = 0x02;
    /// Fires once per tick-counter wrap (~1 Hz).
    pub const TIMER_SLOW: u8 = 0x03;

    pub const MIN_SRC_SHIFT: u8 = 2;
    pub const RATE_SRC_SHIFT: u8 = 5;
    pub const SRC_MASK: u8 = 0x07;
    /// Within a source index: bitwise-invert the resolved value.
    pub const SRC_INVERT: u8 = 0x04;
}

/// Bits of the `gate_value` register.
pub mod gate {
    /// Output is pulsing.
    pub const ON: u8 = 0x01;
    pub const POL_MASK: u8 = 0x06;
    pub const POL_NEG: u8 = 0x02;
    pub const POL_POS: u8 = 0x04;
    pub const POL_BIPHASIC: u8 = 0x06;
    /// Toggled by the REVERSE_TOGGLE boundary action.
    pub const ALT_POL: u8 = 0x08;
    pub const INV_POL: u8 = 0x10;
    /// Audio modes: frequency follows the audio input.
    pub const AUDIO_FREQ: u8 = 0x20;
    /// Audio modes: intensity follows the audio input.
    pub const AUDIO_INT: u8 = 0x40;
}

/// Source-selection flag bits of the `gate_select` register (shared
/// with the timer-rate bits 0-1).
pub mod gate_select {
    /// Off-time comes from the tempo advanced setting.
    pub const OFF_FROM_TEMPO: u8 = 0x04;
    /// Off-time comes from the scaled knob.
    pub const OFF_FROM_KNOB: u8 = 0x08;
    /// On-time comes from the effect advanced setting.
    pub const ON_FROM_EFFECT: u8 = 0x20;
    /// On-time comes from the scaled knob.
    pub const ON_FROM_KNOB: u8 = 0x40;
}

/// Boundary action codes stored in a group's `action_min`/`action_max`
/// bytes. Values `0x00-0xDB` name a bytecode module instead.
pub mod action {
    pub const REVERSE: u8 = 0xFF;
    pub const REVERSE_TOGGLE: u8 = 0xFE;
    pub const LOOP: u8 = 0xFD;
    pub const STOP: u8 = 0xFC;

    /// Whether an action byte names a module.
    pub fn is_module(code: u8) -> bool {
        code <= 0xDB
    }
}

/// Power-on register image. Leaves the engine quiescent apart from the
/// ramp group's soft-start sweep until a mode's modules configure it.
const DEFAULTS: [u8; BLOCK_LEN] = [
    0x00, // +00 unused
    0x00, // +01 unused
    0x02, // +02 retry_count
    0x00, // +03 output_control_flags
    0x00, // +04 cond_module
    0x03, // +05 apply_channel = both
    0x01, // +06 knob_range_high
    0xFF, // +07 knob_range_low
    0x00, // +08 routine_timer_lo
    0x00, // +09 routine_timer_mid
    0x00, // +0A routine_timer_hi
    0x00, // +0B routine_timer_slower
    0x00, // +0C bank
    0x00, // +0D random_min
    0x08, // +0E random_max
    0x00, // +0F audio_trigger_module
    0x07, // +10 gate_value = on, biphasic
    0x00, // +11 gate_want_a
    0x00, // +12 gate_want_b
    0x00, // +13 unused
    0x00, // +14 next_module_timer_cur
    0xFF, // +15 next_module_timer_max
    0x00, // +16 next_module_select
    0x00, // +17 next_module_number
    0x3E, // +18 gate_ontime
    0x3E, // +19 gate_offtime
    0x00, // +1A gate_select = no timer
    0x00, // +1B gate_transitions
    0x9C, // +1C ramp_value = 156
    0x9C, // +1D ramp_min
    0xFF, // +1E ramp_max
    0x07, // +1F ramp_rate
    0x01, // +20 ramp_step
    0xFC, // +21 ramp_action_min = STOP
    0xFC, // +22 ramp_action_max = STOP
    0x01, // +23 ramp_select = fast timer
    0x00, // +24 ramp_timer
    0xFF, // +25 intensity_value
    0xCD, // +26 intensity_min
    0xFF, // +27 intensity_max
    0x01, // +28 intensity_rate
    0x01, // +29 intensity_step
    0xFF, // +2A intensity_action_min = REVERSE
    0xFF, // +2B intensity_action_max = REVERSE
    0x00, // +2C intensity_select = no timer
    0x00, // +2D intensity_timer
    0x16, // +2E freq_value = 22
    0x09, // +2F freq_min
    0x64, // +30 freq_max
    0x01, // +31 freq_rate
    0x01, // +32 freq_step
    0xFF, // +33 freq_action_min = REVERSE
    0xFF, // +34 freq_action_max = REVERSE
    0x08, // +35 freq_select = no timer, knob min source
    0x00, // +36 freq_timer
    0x82, // +37 width_value = 130
    0x32, // +38 width_min
    0xC8, // +39 width_max
    0x01, // +3A width_rate
    0x01, // +3B width_step
    0xFF, // +3C width_action_min = REVERSE
    0xFF, // +3D width_action_max = REVERSE
    0x04, // +3E width_select = no timer, advanced min source
    0x00, // +3F width_timer
];

/// One channel's 64-byte register file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBlock {
    bytes: [u8; BLOCK_LEN],
}

impl ChannelBlock {
    /// A block initialized to the power-on image.
    pub const fn new() -> Self {
        ChannelBlock { bytes: DEFAULTS }
    }

    /// Reset every register to the power-on image.
    pub fn load_defaults(&mut self) {
        self.bytes = DEFAULTS;
    }

    /// Read the register at a block-relative offset.
    #[inline]
    pub fn byte(&self, offset: u8) -> u8 {
        self.bytes[offset as usize & (BLOCK_LEN - 1)]
    }

    /// Write the register at a block-relative offset.
    #[inline]
    pub fn set_byte(&mut self, offset: u8, value: u8) {
        self.bytes[offset as usize & (BLOCK_LEN - 1)] = value;
    }

    /// The raw register file.
    pub fn as_bytes(&self) -> &[u8; BLOCK_LEN] {
        &self.bytes
    }

    /// The raw register file, mutable.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; BLOCK_LEN] {
        &mut self.bytes
    }

    /// Read a field of one parameter group.
    #[inline]
    pub fn field(&self, base: u8, field: u8) -> u8 {
        self.byte(base + field)
    }

    /// Write a field of one parameter group.
    #[inline]
    pub fn set_field(&mut self, base: u8, field: u8, value: u8) {
        self.set_byte(base + field, value);
    }

    pub fn apply_channel(&self) -> u8 {
        self.byte(reg::APPLY_CHANNEL)
    }

    pub fn set_apply_channel(&mut self, mask: u8) {
        self.set_byte(reg::APPLY_CHANNEL, mask);
    }

    pub fn gate_value(&self) -> u8 {
        self.byte(reg::GATE_VALUE)
    }

    pub fn set_gate_value(&mut self, value: u8) {
        self.set_byte(reg::GATE_VALUE, value);
    }

    pub fn output_flags(&self) -> u8 {
        self.byte(reg::OUTPUT_FLAGS)
    }

    pub fn set_output_flags(&mut self, value: u8) {
        self.set_byte(reg::OUTPUT_FLAGS, value);
    }

    pub fn knob_range(&self) -> (u8, u8) {
        (self.byte(reg::KNOB_RANGE_HIGH), self.byte(reg::KNOB_RANGE_LOW))
    }

    pub fn random_bounds(&self) -> (u8, u8) {
        (self.byte(reg::RANDOM_MIN), self.byte(reg::RANDOM_MAX))
    }

    pub fn ramp_value(&self) -> u8 {
        self.field(group::RAMP, group::VALUE)
    }

    pub fn intensity_value(&self) -> u8 {
        self.field(group::INTENSITY, group::VALUE)
    }

    pub fn set_intensity_value(&mut self, value: u8) {
        self.set_field(group::INTENSITY, group::VALUE, value);
    }

    pub fn freq_value(&self) -> u8 {
        self.field(group::FREQ, group::VALUE)
    }

    pub fn width_value(&self) -> u8 {
        self.field(group::WIDTH, group::VALUE)
    }
}

impl Default for ChannelBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a register address falls inside a channel block window.
pub fn addr_in_block(addr: u16) -> bool {
    (BASE_A..BASE_A + BLOCK_LEN as u16).contains(&addr)
        || (BASE_B..BASE_B + BLOCK_LEN as u16).contains(&addr)
}

/// Resolve a 9-bit register address to a byte reference, routing
/// everything outside the two block windows to the caller's scratch
/// byte. Stray bytecode or protocol writes therefore land somewhere
/// defined instead of being an error.
pub fn register_mut<'a>(
    a: &'a mut ChannelBlock,
    b: &'a mut ChannelBlock,
    scratch: &'a mut u8,
    addr: u16,
) -> &'a mut u8 {
    if (BASE_B..BASE_B + BLOCK_LEN as u16).contains(&addr) {
        &mut b.bytes[(addr - BASE_B) as usize]
    } else if (BASE_A..BASE_A + BLOCK_LEN as u16).contains(&addr) {
        &mut a.bytes[(addr - BASE_A) as usize]
    } else {
        *scratch = 0;
        scratch
    }
}
