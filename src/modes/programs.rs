//! Built-in bytecode module library.
//!
//! Each module is a short immutable program, executed once to
//! (re)configure the channel register blocks; the parameter engine then
//! runs autonomously until a boundary action or next-module timer
//! requests another module. Modes chain by writing a module number into
//! a group's `action_min`/`action_max` byte or the next-module slot.
//!
//! Encoding: `SET` opcodes are `0x80 | offset` (channel-A relative,
//! routed by the apply-channel mask) or `0xC0 | offset` (channel B
//! direct); see `modes::interp` for the full grammar.

/// Module 0 - force both gates off.
const GATES_OFF: &[u8] = &[
    0x90, 0x06, // gate_value = biphasic, output off
    0x00,
];

/// Module 1 - force both gates on.
const GATES_ON: &[u8] = &[
    0x90, 0x07, // gate_value = biphasic, output on
    0x00,
];

/// Module 2 - Intense, channel B: slow gate duty cycle.
const INTENSE_B: &[u8] = &[
    0xD8, 0x3F, // b gate_ontime = 63
    0xD9, 0x3F, // b gate_offtime = 63
    0xDA, 0x01, // b gate_select = fast timer
    0x00,
];

/// Module 3 - Stroke, channel A: depth-sourced intensity sweep with
/// polarity toggles at both ends.
const STROKE_A: &[u8] = &[
    0x86, 0x00, // knob_range_high = 0
    0x87, 0x20, // knob_range_low = 32
    0xA9, 0x02, // intensity_step = 2
    0xAA, 0xFE, // intensity_action_min = REVERSE_TOGGLE
    0xAB, 0xFE, // intensity_action_max = REVERSE_TOGGLE
    0xAC, 0x55, // intensity_select: fast, min = !depth, rate = knob
    0xB5, 0x00, // freq_select = static
    0xB7, 0xFF, // width_value = 255
    0xBE, 0x00, // width_select = static
    0x90, 0x05, // gate_value = positive polarity, on
    0x00,
];

/// Module 4 - Stroke, channel B.
const STROKE_B: &[u8] = &[
    0xE6, 0xE6, // b intensity_min = 230
    0xE9, 0x01, // b intensity_step = 1
    0xEA, 0xFE, // b intensity_action_min = REVERSE_TOGGLE
    0xEB, 0xFE, // b intensity_action_max = REVERSE_TOGGLE
    0xEC, 0x41, // b intensity_select: fast, rate = knob
    0xF5, 0x00, // b freq_select = static
    0xF7, 0xD8, // b width_value = 216
    0xFE, 0x00, // b width_select = static
    0xD0, 0x05, // b gate_value = positive polarity, on
    0x00,
];

/// Module 5 - Climb, channel A, first stage; chains to 6 at the sweep
/// bottom.
const CLIMB_A1: &[u8] = &[
    0x86, 0x01, // knob_range_high = 1
    0x87, 0x64, // knob_range_low = 100
    0xB5, 0x41, // freq_select: fast, rate = knob
    0xB3, 0x06, // freq_action_min = module 6
    0xAF, 0x08, // freq_min = 8
    0xB0, 0xFF, // freq_max = 255
    0xAE, 0xFF, // freq_value = 255
    0xB2, 0x01, // freq_step = 1
    0x00,
];

/// Module 6 - Climb A, second stage; chains to 7.
const CLIMB_A2: &[u8] = &[
    0xB2, 0x02, // freq_step = 2
    0xAE, 0xFF, // freq_value = 255
    0xB3, 0x07, // freq_action_min = module 7
    0x00,
];

/// Module 7 - Climb A, third stage; chains back to 5.
const CLIMB_A3: &[u8] = &[
    0xB2, 0x04, // freq_step = 4
    0xAE, 0xFF, // freq_value = 255
    0xB3, 0x05, // freq_action_min = module 5
    0x00,
];

/// Module 8 - Climb, channel B, first stage; chains to 9.
const CLIMB_B1: &[u8] = &[
    0xEE, 0xFF, // b freq_value = 255
    0xF0, 0xFF, // b freq_max = 255
    0xEF, 0x08, // b freq_min = 8
    0xF2, 0x01, // b freq_step = 1
    0xF3, 0x09, // b freq_action_min = module 9
    0xF5, 0x41, // b freq_select: fast, rate = knob
    0x00,
];

/// Module 9 - Climb B, second stage; chains to 10.
const CLIMB_B2: &[u8] = &[
    0xF2, 0x02, // b freq_step = 2
    0xEE, 0xFF, // b freq_value = 255
    0xF3, 0x0A, // b freq_action_min = module 10
    0x00,
];

/// Module 10 - Climb B, third stage; chains back to 8.
const CLIMB_B3: &[u8] = &[
    0xF2, 0x05, // b freq_step = 5
    0xEE, 0xFF, // b freq_value = 255
    0xF3, 0x08, // b freq_action_min = module 8
    0x00,
];

/// Module 11 - Waves, channel A: frequency and width both sweep at a
/// knob-scaled rate.
const WAVES_A: &[u8] = &[
    0x86, 0x01, // knob_range_high = 1 (knob up = faster)
    0x87, 0x08, // knob_range_low = 8
    0xBE, 0x41, // width_select: fast, rate = knob
    0xBB, 0x03, // width_step = 3
    0xB5, 0x41, // freq_select: fast, rate = knob
    0xAE, 0xFA, // freq_value = 250
    0x00,
];

/// Module 12 - Waves, channel B: same sweep, slightly shallower width.
const WAVES_B: &[u8] = &[
    0xFE, 0x41, // b width_select: fast, rate = knob
    0xFB, 0x02, // b width_step = 2
    0xF5, 0x41, // b freq_select: fast, rate = knob
    0xEE, 0xFA, // b freq_value = 250
    0x00,
];

/// Module 13 - Combo, channel A: gated output with 30 Hz frequency
/// sweep and knob-inverted width.
const COMBO_A: &[u8] = &[
    0x86, 0x00, // knob_range_high = 0
    0x87, 0x40, // knob_range_low = 64
    0x9A, 0x4A, // gate_select: 30 Hz, on/off times from knob
    0xB5, 0x02, // freq_select: 30 Hz timer
    0xBE, 0x26, // width_select: 30 Hz, min = !knob
    0x00,
];

/// Module 14 - Intense, channel A: pin the knob range high.
const INTENSE_A: &[u8] = &[
    0x86, 0x09, // knob_range_high = 9
    0x00,
];

/// Module 15 - Rhythm, first beat; rotates 16 ↔ 17 via the next-module
/// timer.
const RHYTHM_1: &[u8] = &[
    0x95, 0x1F, // next_module_timer_max = 31
    0x9A, 0x49, // gate_select: fast, on from knob, off from knob
    0x96, 0x02, // next_module_select = 30 Hz
    0xA5, 0xE0, // intensity_value = 224
    0x97, 0x10, // next_module_number = 16
    0x86, 0x01, // knob_range_high = 1
    0x87, 0x17, // knob_range_low = 23
    0xB7, 0x46, // width_value = 70
    0xAB, 0xFD, // intensity_action_max = LOOP
    0xBE, 0x00, // width_select = static
    0xA9, 0x00, // intensity_step = 0
    0xAC, 0x01, // intensity_select = fast timer
    0xA6, 0xE0, // intensity_min = 224
    0x00,
];

/// Module 16 - Rhythm, accent beat.
const RHYTHM_2: &[u8] = &[
    0x97, 0x11, // next_module_number = 17
    0x5C, 0xA5, 0x01, // intensity_value ^= 1
    0x50, 0xA5, 0x01, // intensity_value += 1
    0xB7, 0xB4, // width_value = 180
    0x00,
];

/// Module 17 - Rhythm, off-beat.
const RHYTHM_3: &[u8] = &[
    0xB7, 0x46, // width_value = 70
    0x97, 0x10, // next_module_number = 16
    0x00,
];

/// Module 18 - Toggle, channel A active. The next-module timer period
/// is knob-scaled (~240 ticks at knob zero down to ~60 at full).
const TOGGLE_1: &[u8] = &[
    0x86, 0x07, // knob_range_high = 7
    0x87, 0x1E, // knob_range_low = 30
    0x96, 0x42, // next_module_select: 30 Hz, period from knob
    0x97, 0x13, // next_module_number = 19
    0xB5, 0x04, // freq_select: static, min = advanced frequency
    0xBE, 0x00, // width_select = static
    0x90, 0x07, // a gate on
    0xD0, 0x06, // b gate off
    0x00,
];

/// Module 19 - Toggle, channel B active; swaps back to 18.
const TOGGLE_2: &[u8] = &[
    0x85, 0x01, // apply_channel = A only
    0x90, 0x06, // a gate off
    0x85, 0x03, // apply_channel = both
    0x97, 0x12, // next_module_number = 18
    0xD0, 0x07, // b gate on
    0x00,
];

/// Module 20 - Phase, channel A base configuration.
const PHASE_1A: &[u8] = &[
    0x86, 0x01, // knob_range_high = 1
    0x87, 0x20, // knob_range_low = 32
    0xB5, 0x04, // freq_select: static, min = advanced frequency
    0xBE, 0x00, // width_select = static
    0xB7, 0x7D, // width_value = 125
    0x00,
];

/// Module 21 - Phase, channel B width offset: B leads A by one sweep
/// half-period.
const PHASE_2A: &[u8] = &[
    0xF7, 0x79, // b width_value = 121
    0x00,
];

/// Module 22 - Phase 3: counter-ramping intensity on the two channels.
const PHASE_3: &[u8] = &[
    0x83, 0x08, // output_control_flags = 0x08
    0xD0, 0xA0, // b gate_value = inverted polarity, audio-int flag
    0xAC, 0x01, // intensity_select = fast timer
    0x86, 0xCD, // knob_range_high = 205
    0x87, 0xD4, // knob_range_low = 212
    0xB5, 0x04, // freq_select: static, min = advanced frequency
    0xEC, 0x09, // b intensity_select: fast, min = !own
    0x00,
];

/// Module 23 - Audio 1/2: frequency from the advanced setting, width
/// static; intensity is fed by the audio follower.
const AUDIO_12: &[u8] = &[
    0xB5, 0x04, // freq_select: static, min = advanced frequency
    0xBE, 0x00, // width_select = static
    0x00,
];

/// Module 24 - Orgasm, build-up; chains to 25 at the width ceiling.
const ORGASM_1: &[u8] = &[
    0xAC, 0x00, // intensity_select = static
    0xB7, 0x32, // width_value = 50
    0xBB, 0x04, // width_step = 4
    0xBA, 0x01, // width_rate = 1
    0xB8, 0x32, // width_min = 50
    0x85, 0x01, // apply_channel = A only
    0xBE, 0x01, // a width_select = fast timer
    0xBD, 0x19, // a width_action_max = module 25
    0xFE, 0x00, // b width_select = static
    0x00,
];

/// Module 25 - Orgasm, crest; chains to 26.
const ORGASM_2: &[u8] = &[
    0x85, 0x01, // apply_channel = A only
    0xBB, 0xFF, // a width_step = 255
    0xBC, 0x1A, // a width_action_min = module 26
    0xFE, 0x01, // b width_select = fast timer
    0xFD, 0xFF, // b width_action_max = REVERSE
    0x85, 0x03, // apply_channel = both
    0x50, 0xB8, 0x02, // width_min += 2
    0x5C, 0xB8, 0x02, // width_min ^= 2
    0x00,
];

/// Module 26 - Orgasm, fall; chains to 27 from channel B.
const ORGASM_3: &[u8] = &[
    0x85, 0x01, // apply_channel = A only
    0xBE, 0x00, // a width_select = static
    0xFC, 0x1B, // b width_action_min = module 27
    0x00,
];

/// Module 27 - Orgasm, reset to a slow build.
const ORGASM_4: &[u8] = &[
    0x85, 0x01, // apply_channel = A only
    0xBE, 0x01, // a width_select = fast timer
    0xFE, 0x00, // b width_select = static
    0xBB, 0x01, // a width_step = 1
    0xFB, 0x01, // b width_step = 1
    0x00,
];

/// Module 28 - Torment, quiet phase: randomize the burst timing and
/// amplitude, then wait with gates off.
const TORMENT_1: &[u8] = &[
    0x85, 0x03, // apply_channel = both
    0xAC, 0x00, // intensity_select = static
    0xA5, 0xB0, // intensity_value = 176
    0x90, 0x06, // gates off
    0x8D, 0x05, // random_min = 5
    0x8E, 0x18, // random_max = 24
    0x4D, 0x95, // b next_module_timer_max = random
    0xD6, 0x03, // b next_module_select = slow timer
    0xAB, 0x1C, // intensity_action_max = module 28
    0x8D, 0xE0, // random_min = 224
    0x8E, 0xFF, // random_max = 255
    0x4C, 0xA7, // a intensity_max = random
    0x8D, 0x06, // random_min = 6
    0x8E, 0x3F, // random_max = 63
    0x4C, 0xA8, // a intensity_rate = random
    0x8D, 0x1D, // random_min = 29
    0x8E, 0x1F, // random_max = 31
    0x4D, 0x97, // b next_module_number = random burst (29-31)
    0xAB, 0xFF, // intensity_action_max = REVERSE
    0x00,
];

/// Module 29 - Torment burst on both channels; re-arms 28.
const TORMENT_2: &[u8] = &[
    0x85, 0x03, // apply_channel = both
    0xAC, 0x01, // intensity_select = fast timer
    0x90, 0x07, // gates on
    0xAB, 0x1C, // intensity_action_max = module 28
    0x00,
];

/// Module 30 - Torment burst on channel B only.
const TORMENT_3: &[u8] = &[
    0x85, 0x02, // apply_channel = B only
    0xEC, 0x01, // b intensity_select = fast timer
    0xD0, 0x07, // b gate on
    0xEB, 0x1C, // b intensity_action_max = module 28
    0x00,
];

/// Module 31 - Torment burst on channel A only.
const TORMENT_4: &[u8] = &[
    0x85, 0x01, // apply_channel = A only
    0xAC, 0x01, // a intensity_select = fast timer
    0x90, 0x07, // a gate on
    0xAB, 0x1C, // a intensity_action_max = module 28
    0x00,
];

/// Module 32 - Random 2: scramble every sweep rate, then re-randomize
/// on a random deadline.
const RANDOM_2: &[u8] = &[
    0x8D, 0x01, // random_min = 1
    0x8E, 0x04, // random_max = 4
    0x4D, 0xB2, // b freq_step = random
    0x4C, 0xA8, // a intensity_rate = random
    0x4D, 0xA8, // b intensity_rate = random
    0x4C, 0xB1, // a freq_rate = random
    0x4D, 0xB1, // b freq_rate = random
    0x4C, 0xBA, // a width_rate = random
    0x4D, 0xBA, // b width_rate = random
    0xBE, 0x01, // width_select = fast timer
    0xB5, 0x02, // freq_select = 30 Hz timer
    0xAC, 0x02, // intensity_select = 30 Hz timer
    0xD6, 0x03, // b next_module_select = slow timer
    0xD7, 0x20, // b next_module_number = 32
    0x8D, 0x05, // random_min = 5
    0x8E, 0x1F, // random_max = 31
    0x4D, 0x95, // b next_module_timer_max = random
    0x00,
];

/// Module 33 - Combo, channel B sweep rates.
const COMBO_B: &[u8] = &[
    0xF2, 0x02, // b freq_step = 2
    0xFB, 0x02, // b width_step = 2
    0x00,
];

/// Module 34 - Audio 3: fixed low frequency; gate flags route the
/// audio follower onto frequency as well.
const AUDIO_3: &[u8] = &[
    0xB5, 0x00, // freq_select = static
    0xBE, 0x00, // width_select = static
    0xAE, 0x0A, // freq_value = 10
    0x00,
];

/// Module 35 - Phase 2, channel B intensity counter-sweep.
const PHASE_2B: &[u8] = &[
    0xAC, 0x25, // intensity_select: fast, min = !knob
    0x00,
];

/// Number of built-in modules.
pub const MODULE_COUNT: usize = 36;

/// Module table, indexed by module number.
pub static MODULES: [&[u8]; MODULE_COUNT] = [
    GATES_OFF, GATES_ON, INTENSE_B, STROKE_A, STROKE_B, // 0-4
    CLIMB_A1, CLIMB_A2, CLIMB_A3, CLIMB_B1, CLIMB_B2, // 5-9
    CLIMB_B3, WAVES_A, WAVES_B, COMBO_A, INTENSE_A, // 10-14
    RHYTHM_1, RHYTHM_2, RHYTHM_3, TOGGLE_1, TOGGLE_2, // 15-19
    PHASE_1A, PHASE_2A, PHASE_3, AUDIO_12, ORGASM_1, // 20-24
    ORGASM_2, ORGASM_3, ORGASM_4, TORMENT_1, TORMENT_2, // 25-29
    TORMENT_3, TORMENT_4, RANDOM_2, COMBO_B, AUDIO_3, // 30-34
    PHASE_2B, // 35
];
