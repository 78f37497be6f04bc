//! Output-control seam.
//!
//! The dispatcher must be able to silence the hardware during a mode
//! transition - gates off, DAC to full scale - without knowing how the
//! firmware wired its pulse channels and DAC. The firmware implements
//! this trait over its [`PulseShared`](crate::pulse::PulseShared)
//! cells and DAC driver; tests implement it over plain fields.

use crate::channel::Channel;

/// Runtime control over the two output channels.
pub trait OutputControl {
    /// Enable or disable one channel's pulse gate.
    fn set_gate(&mut self, ch: Channel, on: bool);

    /// Load one channel's DAC code (inverted: full scale is silent).
    fn set_dac(&mut self, ch: Channel, code: u16);
}
