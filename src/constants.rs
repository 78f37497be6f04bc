//! Timing, output-stage, and identity constants.

/// Dead time between H-bridge polarity transitions, in microseconds.
/// Both FETs are held off for this long to prevent shoot-through.
pub const DEAD_TIME_US: u16 = 4;

/// Minimum pulse half-cycle width in microseconds (engine floor).
pub const MIN_WIDTH_US: u8 = 20;

/// Minimum pulse period in microseconds (2 kHz maximum pulse rate).
pub const MIN_PERIOD_US: u16 = 500;

/// Compare value loaded while a channel idles with its gate off; the
/// state machine re-checks the gate at this interval.
pub const IDLE_REARM_US: u16 = 250;

/// Largest compare value the short (8-bit) pulse timer can hold. Gaps
/// longer than this are counted down in segments.
pub const SHORT_TIMER_MAX_US: u16 = 250;

/// Foreground engine tick interval in milliseconds.
pub const TICK_INTERVAL_MS: u32 = 4;

/// 10-bit DAC full-scale code. The DAC is inverted: full scale is
/// minimum output.
pub const DAC_MAX: u16 = 1023;

/// Per-power-level DAC scaling: `(base, modulation)` for Low, Normal,
/// High. Output DAC code starts from `base` and the level pot swings it
/// by up to `modulation` counts downward (toward more output).
pub const POWER_LEVELS: [(u16, u16); 3] = [(650, 220), (590, 330), (500, 440)];

/// Box model byte reported at virtual address 0x00FC.
pub const BOX_MODEL: u8 = 0x0C;

/// Firmware version bytes reported at 0x00FD-0x00FF.
pub const FIRMWARE_VERSION: [u8; 3] = [0x01, 0x06, 0x00];

/// Offset between internal mode indices and mode numbers on the wire.
pub const WIRE_MODE_BASE: u8 = 0x76;
