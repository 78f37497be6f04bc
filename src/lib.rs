//! Two-channel biphasic stimulation engine.
//!
//! Firmware core for a dual H-bridge electro-stimulation box: two
//! interrupt-driven biphasic pulse generators, a per-channel parameter
//! modulation engine, a bytecode-driven mode dispatcher, an encrypted
//! host protocol, and persistent settings. Everything hardware-facing
//! goes through traits, so the whole engine also runs under `cargo test`
//! on the host.
//!
//! # Architecture
//!
//! ```text
//! host serial ──► serial::proto ──► serial::bus ─┐
//!                                                ▼
//! buttons/menu ──► Command ──► Device (deferred mailbox)
//!                                 │
//!                    every 4 ms   ▼
//!                  ┌─────────── tick ───────────┐
//!                  │ dispatcher → ParamEngine   │
//!                  │ pending modules → interp   │
//!                  └──────────────┬─────────────┘
//!                                 ▼
//!            output::derive ──► PulseShared ──► timer ISR ──► H-bridge
//!                          └──► LTC1661 DAC (SPI)
//! ```
//!
//! # Foreground loop
//!
//! The firmware's main loop owns the pacing; the library supplies the
//! pieces:
//!
//! ```ignore
//! let mut dev = Device::new(timer_entropy_seed());
//! dev.load_settings(&mut eeprom);
//! dev.select_mode(dev.config.current_mode, &mut outputs);
//!
//! loop {
//!     watchdog.feed();
//!     dev.poll_deferred(&mut outputs);          // serial/menu requests
//!     dev.set_knob(adc.multi_adjust());
//!     dev.set_levels(adc.level_a(), adc.level_b());
//!
//!     if elapsed_ms >= 4 {
//!         dev.tick();                           // parameter engine
//!         dev.ramp_tick();
//!         for ch in [Channel::A, Channel::B] {
//!             let drive = dev.drive(ch);
//!             pulse_shared[ch].set_gate(drive.gate);
//!             let _ = pulse_shared[ch].submit(drive.width_us, drive.period_us);
//!             dac.write_channel(ch, drive.dac)?;
//!         }
//!     }
//!
//!     while let Some(byte) = rx_queue.pop() {
//!         proto.process_byte(byte, &mut DeviceBus::new(&mut dev, &mut eeprom), &mut tx);
//!     }
//! }
//! ```
//!
//! The two timer compare ISRs each own one [`pulse::PulseChannel`] and
//! call [`pulse::PulseChannel::service`], reloading their compare
//! register with the returned phase duration.

#![no_std]

pub mod audio;
pub mod channel;
pub mod config;
pub mod constants;
pub mod control;
pub mod dac;
pub mod device;
pub mod engine;
pub mod modes;
pub mod output;
pub mod persist;
pub mod prng;
pub mod pulse;
pub mod ramp;
pub mod serial;

#[cfg(test)]
mod verification_tests;

pub use channel::{Channel, ChannelBlock};
pub use device::Device;
pub use modes::Command;
