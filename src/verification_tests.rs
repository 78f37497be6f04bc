//! End-to-end verification scenarios.
//!
//! These tests run the whole engine - dispatcher, parameter engine,
//! bytecode, protocol, output stage - the way the firmware's
//! foreground loop does, and check the externally observable behaviour
//! of complete modes and host sessions:
//!
//! - **Waves dynamics:** both sweeps stay inside their bounds and
//!   reverse at the edges
//! - **Stroke depth:** the advanced depth setting bounds the intensity
//!   cycle through the inverted source path
//! - **Toggle pacing:** the knob scales the channel-alternation period
//! - **Host sessions:** handshake, key exchange, encrypted traffic,
//!   and mode switching over the wire
//! - **Foreground pass:** derived drives always satisfy the pulse
//!   generator's contracts

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use crate::channel::{gate, group, Channel};
    use crate::constants::{MIN_PERIOD_US, WIRE_MODE_BASE};
    use crate::control::OutputControl;
    use crate::device::Device;
    use crate::modes::{mode, Command};
    use crate::persist::RamStore;
    use crate::pulse::{HBridge, PulseChannel, PulseShared};
    use crate::serial::{DeviceBus, Protocol};

    struct NullOutputs;

    impl OutputControl for NullOutputs {
        fn set_gate(&mut self, _ch: Channel, _on: bool) {}
        fn set_dac(&mut self, _ch: Channel, _code: u16) {}
    }

    /// Track a byte series' excursions and direction reversals.
    struct SweepWatch {
        last: Option<u8>,
        min_seen: u8,
        max_seen: u8,
        reversals: u32,
        prev_delta: i16,
    }

    impl SweepWatch {
        fn new() -> Self {
            SweepWatch {
                last: None,
                min_seen: u8::MAX,
                max_seen: 0,
                reversals: 0,
                prev_delta: 0,
            }
        }

        fn observe(&mut self, value: u8) {
            self.min_seen = self.min_seen.min(value);
            self.max_seen = self.max_seen.max(value);
            if let Some(last) = self.last {
                let delta = value as i16 - last as i16;
                if delta != 0 {
                    if self.prev_delta != 0 && delta.signum() != self.prev_delta.signum() {
                        self.reversals += 1;
                    }
                    self.prev_delta = delta;
                }
            }
            self.last = Some(value);
        }
    }

    #[test]
    fn waves_sweeps_stay_bounded_and_reverse() {
        let mut dev = Device::new(0x5EED);
        dev.set_knob(127);
        dev.select_mode(mode::WAVES, &mut NullOutputs);

        let mut freq = SweepWatch::new();
        let mut width = SweepWatch::new();
        for _ in 0..244 {
            dev.tick();
            freq.observe(dev.channel_a.freq_value());
            width.observe(dev.channel_a.width_value());
        }

        let f = dev.channel_a.freq_value();
        assert!((168..=255).contains(&f), "frequency {f} escaped its band");
        let w = dev.channel_a.width_value();
        assert!(w <= 179, "width {w} escaped its band");
        assert!(freq.reversals >= 1, "frequency never reversed");
        assert!(width.reversals >= 1, "width never reversed");
    }

    #[test]
    fn stroke_depth_bounds_the_intensity_cycle() {
        let mut dev = Device::new(0x5EED);
        dev.set_knob(127);
        dev.config.depth = 10;
        dev.select_mode(mode::STROKE, &mut NullOutputs);

        // Min source is the inverted depth setting.
        let sel = dev.channel_a.field(group::INTENSITY, group::SELECT);
        assert_eq!((sel >> 2) & 0x07, 0x05);
        assert_eq!(dev.channel_a.field(group::INTENSITY, group::STEP), 2);

        let mut watch = SweepWatch::new();
        for _ in 0..2000 {
            dev.tick();
            watch.observe(dev.channel_a.intensity_value());
        }
        assert!(watch.min_seen >= 5, "intensity fell below the depth floor");
        assert_eq!(watch.max_seen, 255);
        assert!(watch.reversals >= 3, "intensity did not cycle");
        // The inverted depth landed in the min field.
        assert_eq!(dev.channel_a.field(group::INTENSITY, group::MIN), 245);
    }

    /// Tick until channel A's gate bit changes; returns the tick count.
    fn ticks_until_gate_flip(dev: &mut Device, limit: u32) -> u32 {
        let start = dev.channel_a.gate_value() & gate::ON;
        for n in 1..=limit {
            dev.tick();
            if dev.channel_a.gate_value() & gate::ON != start {
                return n;
            }
        }
        panic!("gate never flipped within {limit} ticks");
    }

    #[test]
    fn toggle_alternation_period_follows_the_knob() {
        let mut dev = Device::new(0x5EED);
        dev.set_knob(0);
        dev.select_mode(mode::TOGGLE, &mut NullOutputs);
        // Settle past the first partial interval.
        let _ = ticks_until_gate_flip(&mut dev, 2000);

        let slow = ticks_until_gate_flip(&mut dev, 2000);
        assert!(
            (200..=280).contains(&slow),
            "knob-zero period was {slow} ticks"
        );

        dev.set_knob(255);
        let _ = ticks_until_gate_flip(&mut dev, 2000);
        let fast = ticks_until_gate_flip(&mut dev, 2000);
        assert!(
            (48..=80).contains(&fast),
            "knob-full period was {fast} ticks"
        );

        // The channels alternate: exactly one gate on at a time.
        let a_on = dev.channel_a.gate_value() & gate::ON != 0;
        let b_on = dev.channel_b.gate_value() & gate::ON != 0;
        assert_ne!(a_on, b_on);
    }

    fn sum(bytes: &[u8]) -> u8 {
        bytes.iter().fold(0u8, |a, &b| a.wrapping_add(b))
    }

    fn feed(
        proto: &mut Protocol,
        dev: &mut Device,
        store: &mut RamStore,
        bytes: &[u8],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        let mut bus = DeviceBus::new(dev, store);
        for &b in bytes {
            proto.process_byte(b, &mut bus, &mut |r| out.push(r));
        }
        out
    }

    #[test]
    fn host_session_handshake_and_encrypted_write() {
        let mut dev = Device::new(0x1001);
        let mut store = RamStore::new();
        let mut proto = Protocol::new();

        // Sync until ready.
        assert_eq!(feed(&mut proto, &mut dev, &mut store, &[0x00]), [0x07]);

        // Key exchange with host key zero.
        let out = feed(&mut proto, &mut dev, &mut store, &[0x2F, 0x00, 0x2F]);
        assert_eq!(out[0], 0x21);
        let box_key = out[1];
        assert_eq!(out[2], 0x21u8.wrapping_add(box_key));

        // All device-bound bytes now travel XORed with box_key ^ 0x55.
        let key = box_key ^ 0x55;
        let body = [0x4D, 0x40, 0x90, 0x26];
        let mut packet = Vec::from(body);
        packet.push(sum(&body));
        let encrypted: Vec<u8> = packet.iter().map(|&b| b ^ key).collect();
        let out = feed(&mut proto, &mut dev, &mut store, &encrypted);
        assert_eq!(out, [0x06]);
        assert_eq!(dev.channel_a.gate_value(), 0x26);

        // Replies stay plaintext: read the byte back.
        let body = [0x3C, 0x40, 0x90];
        let mut packet = Vec::from(body);
        packet.push(sum(&body));
        let encrypted: Vec<u8> = packet.iter().map(|&b| b ^ key).collect();
        let out = feed(&mut proto, &mut dev, &mut store, &encrypted);
        assert_eq!(out, [0x22, 0x26, 0x22u8.wrapping_add(0x26)]);
    }

    #[test]
    fn host_mode_switch_via_box_command() {
        let mut dev = Device::new(0x1001);
        let mut store = RamStore::new();
        let mut proto = Protocol::new();
        dev.select_mode(mode::WAVES, &mut NullOutputs);

        // Plaintext write of 0x10 (next mode) to the command register.
        let body = [0x4D, 0x40, 0x70, 0x10];
        let mut packet = Vec::from(body);
        packet.push(sum(&body));
        assert_eq!(feed(&mut proto, &mut dev, &mut store, &packet), [0x06]);

        // Applied at the next foreground pass, not mid-tick.
        assert_eq!(dev.dispatcher.mode(), mode::WAVES);
        dev.poll_deferred(&mut NullOutputs);
        assert_eq!(dev.dispatcher.mode(), mode::STROKE);

        // Reading the mode register reports the wire-offset number.
        let body = [0x3C, 0x40, 0x7B];
        let mut packet = Vec::from(body);
        packet.push(sum(&body));
        let out = feed(&mut proto, &mut dev, &mut store, &packet);
        assert_eq!(out[1], mode::STROKE + WIRE_MODE_BASE);
    }

    /// Minimal H-bridge standing in for the output pins.
    #[derive(Default)]
    struct Bridge {
        pos: bool,
        neg: bool,
    }

    impl HBridge for Bridge {
        fn drive_positive(&mut self) {
            self.pos = true;
            self.neg = false;
        }
        fn drive_negative(&mut self) {
            self.pos = false;
            self.neg = true;
        }
        fn all_off(&mut self) {
            self.pos = false;
            self.neg = false;
        }
    }

    #[test]
    fn foreground_pass_feeds_the_pulse_generator_within_contract() {
        let mut dev = Device::new(0xACE1);
        let mut store = RamStore::new();
        dev.load_settings(&mut store); // blank store: factory defaults
        dev.set_knob(200);
        dev.set_levels(900, 900);
        dev.select_mode(mode::WAVES, &mut NullOutputs);
        dev.start_output();

        let shared = [PulseShared::new(), PulseShared::new()];
        let mut pulses = [PulseChannel::new(u16::MAX), PulseChannel::new(250)];
        let mut bridges = [Bridge::default(), Bridge::default()];

        for pass in 0..2000u32 {
            dev.poll_deferred(&mut NullOutputs);
            dev.tick();
            dev.ramp_tick();

            for ch in [Channel::A, Channel::B] {
                let drive = dev.drive(ch);
                assert!(drive.width_us >= 70);
                assert!(drive.period_us >= MIN_PERIOD_US);
                assert!(drive.dac <= 1023);

                let i = ch.index();
                shared[i].set_gate(drive.gate);
                shared[i]
                    .submit(drive.width_us, drive.period_us)
                    .expect("derived drive violated the pulse floor");
                // A few ISR fires per pass keeps both state machines
                // exercising the handoff.
                for _ in 0..3 {
                    let _ = pulses[i].service(&shared[i], &mut bridges[i]);
                }
            }

            // Mid-run mode hop through the deferred path.
            if pass == 700 {
                dev.request(Command::SetMode(mode::RHYTHM));
            }
        }
        assert_eq!(dev.dispatcher.mode(), mode::RHYTHM);
        assert_eq!(dev.ramp_percent(), 100);
    }
}
