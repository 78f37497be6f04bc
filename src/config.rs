//! Runtime configuration.
//!
//! Every field is a single byte, so the menu and the serial handler may
//! write any field at any time without tearing; the engine only reads.

/// Runtime settings shared between the engine, menu, and host protocol.
///
/// Constructed from persistent storage at boot (falling back to factory
/// defaults on an integrity failure) and written back on explicit save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    /// Active mode index.
    pub current_mode: u8,
    /// Master power level: 0 = Low, 1 = Normal, 2 = High.
    pub power_level: u8,
    /// Non-zero when the split-screen channel selection is in use.
    pub split_mode: u8,
    /// Mode driving channel A while in split mode.
    pub split_a_mode: u8,
    /// Mode driving channel B while in split mode.
    pub split_b_mode: u8,
    /// Channel A base intensity.
    pub intensity_a: u8,
    /// Channel B base intensity.
    pub intensity_b: u8,
    /// Channel A base frequency index.
    pub frequency_a: u8,
    /// Channel B base frequency index.
    pub frequency_b: u8,
    /// Channel A base pulse width index.
    pub width_a: u8,
    /// Channel B base pulse width index.
    pub width_b: u8,
    /// Multi-adjust knob position.
    pub multi_adjust: u8,
    /// Audio input gain.
    pub audio_gain: u8,
    /// Advanced: ramp target level.
    pub ramp_level: u8,
    /// Advanced: ramp duration.
    pub ramp_time: u8,
    /// Advanced: intensity sweep depth.
    pub depth: u8,
    /// Advanced: intensity cycle speed.
    pub tempo: u8,
    /// Advanced: frequency override.
    pub frequency: u8,
    /// Advanced: effect intensity.
    pub effect: u8,
    /// Advanced: width override.
    pub width: u8,
    /// Advanced: width cycle speed.
    pub pace: u8,
    /// Favourite mode index.
    pub favorite_mode: u8,
}

impl SystemConfig {
    /// Factory defaults.
    pub const fn factory() -> Self {
        SystemConfig {
            current_mode: 0,
            power_level: 1,
            split_mode: 0,
            split_a_mode: 0,
            split_b_mode: 0,
            intensity_a: 128,
            intensity_b: 128,
            frequency_a: 5,
            frequency_b: 5,
            width_a: 25,
            width_b: 25,
            multi_adjust: 128,
            audio_gain: 128,
            ramp_level: 128,
            ramp_time: 0,
            depth: 50,
            tempo: 50,
            frequency: 107,
            effect: 128,
            width: 130,
            pace: 50,
            favorite_mode: 0,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self::factory()
    }
}
