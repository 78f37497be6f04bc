//! Output copy and intensity scaling.
//!
//! Each foreground pass reads the live channel blocks and converts
//! engine state into concrete drive parameters: gate, pulse timing in
//! microseconds, and a 10-bit DAC code. The DAC is wired inverted
//! (a higher code means less output), so attenuation multiplies the
//! distance from full scale.

use crate::channel::{gate, ChannelBlock};
use crate::constants::{DAC_MAX, POWER_LEVELS};

/// One channel's drive parameters for this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelDrive {
    /// Whether the pulse gate should be on.
    pub gate: bool,
    /// Pulse half-cycle width in microseconds.
    pub width_us: u8,
    /// Pulse period in microseconds.
    pub period_us: u16,
    /// Inverted 10-bit DAC code.
    pub dac: u16,
}

/// Frequency bytes below this drive no pulses; the period parks at a
/// near-silent sentinel.
const FREQ_FLOOR: u8 = 2;

/// Sentinel period for a parked channel.
const PARKED_PERIOD_US: u16 = 65_000;

/// Derive one channel's drive from its block.
///
/// - `power_level` indexes the Low/Normal/High DAC table;
/// - `level_adc` is the channel's front-panel level pot, 0-1023;
/// - `ramp_percent` is the menu ramp in `[0, 100]`;
/// - `output_enabled` gates everything off until the operator starts
///   output.
pub fn derive(
    ch: &ChannelBlock,
    power_level: u8,
    level_adc: u16,
    ramp_percent: u8,
    output_enabled: bool,
) -> ChannelDrive {
    let freq = ch.freq_value();
    let gate_on = ch.gate_value() & gate::ON != 0 && output_enabled && freq >= FREQ_FLOOR;

    let period_us = if freq >= FREQ_FLOOR {
        (freq as u16) << 8
    } else {
        PARKED_PERIOD_US
    };
    let width_us = 70 + ((ch.width_value() as u16 * 180) >> 8) as u8;

    // Engine intensity scaled by the mode's ramp sweep, then by the
    // operator's ramp-up percentage.
    let intensity = (ch.intensity_value() as u32 * ch.ramp_value() as u32) >> 8;
    let intensity = intensity * ramp_percent.min(100) as u32 / 100;

    let (base, modulation) = {
        let level = (power_level as usize).min(POWER_LEVELS.len() - 1);
        POWER_LEVELS[level]
    };
    let level_adc = level_adc.min(DAC_MAX);
    let dac = base as u32 + (modulation as u32 * (DAC_MAX - level_adc) as u32) / 1024;
    // Attenuate toward full scale (inverted DAC).
    let dac = DAC_MAX as u32 - ((DAC_MAX as u32 - dac.min(DAC_MAX as u32)) * intensity) / 256;

    ChannelDrive {
        gate: gate_on,
        width_us,
        period_us,
        dac: dac.min(DAC_MAX as u32) as u16,
    }
}
