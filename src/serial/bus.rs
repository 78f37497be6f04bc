//! Virtual address space for the host protocol.
//!
//! Host reads and writes address a flat 16-bit space stitched together
//! from three regions:
//!
//! | range | contents |
//! |---|---|
//! | `0x0000-0x00FF` | read-only identity (box model, firmware version) |
//! | `0x4000-0x43FF` | live state: channel blocks, config, box command |
//! | `0x8000-0x81FF` | persistent store with config fields overlaid |
//!
//! The live channel blocks appear at `0x4080-0x40BF` (A) and
//! `0x4180-0x41BF` (B), so a host can inspect or patch any engine
//! register byte-by-byte. Mode numbers cross the wire offset by
//! `0x76` from the internal indices. Unmapped reads return zero;
//! unmapped writes vanish - any byte sequence leaves the device in a
//! defined state.

use crate::channel::BLOCK_LEN;
use crate::constants::{BOX_MODEL, FIRMWARE_VERSION, WIRE_MODE_BASE};
use crate::device::Device;
use crate::modes::{Command, MODE_COUNT};
use crate::persist::{Store, CONFIG_LEN};

use super::proto::ProtocolHost;

/// Virtual addresses of the individually mapped registers.
mod vaddr {
    pub const FLASH_END: u16 = 0x0100;
    pub const BOX_MODEL: u16 = 0x00FC;
    pub const FW_MAJ: u16 = 0x00FD;
    pub const FW_MIN: u16 = 0x00FE;
    pub const FW_INT: u16 = 0x00FF;

    pub const RAM_BASE: u16 = 0x4000;
    pub const RAM_END: u16 = 0x4400;
    pub const CHAN_A_BASE: u16 = 0x4080;
    pub const CHAN_B_BASE: u16 = 0x4180;

    pub const POT_LOCKOUT: u16 = 0x400F;
    pub const LEVEL_A: u16 = 0x4064;
    pub const LEVEL_B: u16 = 0x4065;
    pub const MENU_STATE: u16 = 0x406D;
    pub const BOX_COMMAND: u16 = 0x4070;
    pub const CURRENT_MODE: u16 = 0x407B;
    pub const TOP_MODE: u16 = 0x41F3;
    pub const POWER_LEVEL: u16 = 0x41F4;
    pub const SPLIT_MODE_A: u16 = 0x41F5;
    pub const SPLIT_MODE_B: u16 = 0x41F6;
    pub const FAVOURITE: u16 = 0x41F7;
    pub const ADV_BASE: u16 = 0x41F8;
    pub const ADV_END: u16 = 0x4200;
    pub const BATTERY: u16 = 0x4203;
    pub const MULTI_ADJUST: u16 = 0x420D;
    pub const BOX_KEY: u16 = 0x4213;
    pub const POWER_SUPPLY: u16 = 0x4215;

    pub const STORE_BASE: u16 = 0x8000;
    pub const STORE_END: u16 = 0x8200;

    // Store-region offsets with live overlays.
    pub const EE_PROVISIONED: u16 = 0x0001;
    pub const EE_SERIAL_LO: u16 = 0x0002;
    pub const EE_SERIAL_HI: u16 = 0x0003;
    pub const EE_LINK_SIG1: u16 = 0x0006;
    pub const EE_LINK_SIG2: u16 = 0x0007;
    pub const EE_TOP_MODE: u16 = 0x0008;
    pub const EE_POWER_LEVEL: u16 = 0x0009;
    pub const EE_SPLIT_MODE_A: u16 = 0x000A;
    pub const EE_SPLIT_MODE_B: u16 = 0x000B;
    pub const EE_FAVOURITE: u16 = 0x000C;
    pub const EE_ADV_BASE: u16 = 0x000D;
    pub const EE_ADV_END: u16 = 0x0015;
}

/// Box commands accepted at the command register.
mod boxcmd {
    pub const RELOAD_MODE: u8 = 0x00;
    pub const NEXT_MODE: u8 = 0x10;
    pub const PREV_MODE: u8 = 0x11;
    pub const REFRESH_MODE: u8 = 0x12;
    pub const MUTE: u8 = 0x18;
    pub const SWAP_CHANNELS: u8 = 0x19;
    pub const COPY_A_TO_B: u8 = 0x1A;
    pub const COPY_B_TO_A: u8 = 0x1B;
    pub const START_RAMP: u8 = 0x21;
}

fn mode_to_wire(m: u8) -> u8 {
    m.wrapping_add(WIRE_MODE_BASE)
}

fn wire_to_mode(v: u8) -> u8 {
    let m = v.wrapping_sub(WIRE_MODE_BASE);
    if v >= WIRE_MODE_BASE && m < MODE_COUNT {
        m
    } else {
        0
    }
}

/// The device plus its persistent store, presented as the protocol's
/// flat address space.
pub struct DeviceBus<'a, S: Store> {
    device: &'a mut Device,
    store: &'a mut S,
}

impl<'a, S: Store> DeviceBus<'a, S> {
    pub fn new(device: &'a mut Device, store: &'a mut S) -> Self {
        DeviceBus { device, store }
    }

    fn read_ram(&mut self, addr: u16) -> u8 {
        if (vaddr::CHAN_A_BASE..vaddr::CHAN_A_BASE + BLOCK_LEN as u16).contains(&addr) {
            return self.device.channel_a.byte((addr - vaddr::CHAN_A_BASE) as u8);
        }
        if (vaddr::CHAN_B_BASE..vaddr::CHAN_B_BASE + BLOCK_LEN as u16).contains(&addr) {
            return self.device.channel_b.byte((addr - vaddr::CHAN_B_BASE) as u8);
        }
        if (vaddr::ADV_BASE..vaddr::ADV_END).contains(&addr) {
            return self.read_advanced((addr - vaddr::ADV_BASE) as u8);
        }

        let cfg = &self.device.config;
        match addr {
            vaddr::LEVEL_A => (self.device.level_adc(crate::channel::Channel::A) >> 2) as u8,
            vaddr::LEVEL_B => (self.device.level_adc(crate::channel::Channel::B) >> 2) as u8,
            vaddr::POT_LOCKOUT => self.device.pot_lockout(),
            vaddr::MENU_STATE => 0x02,
            // The command register is write-only.
            vaddr::BOX_COMMAND => 0xFF,
            vaddr::CURRENT_MODE | vaddr::TOP_MODE => mode_to_wire(cfg.current_mode),
            vaddr::POWER_LEVEL => cfg.power_level,
            vaddr::SPLIT_MODE_A => mode_to_wire(cfg.split_a_mode),
            vaddr::SPLIT_MODE_B => mode_to_wire(cfg.split_b_mode),
            vaddr::FAVOURITE => mode_to_wire(cfg.favorite_mode),
            vaddr::BATTERY => self.device.battery(),
            vaddr::MULTI_ADJUST => cfg.multi_adjust,
            vaddr::BOX_KEY => 0x00,
            vaddr::POWER_SUPPLY => 0x02,
            _ => 0x00,
        }
    }

    fn write_ram(&mut self, addr: u16, value: u8) {
        if (vaddr::CHAN_A_BASE..vaddr::CHAN_A_BASE + BLOCK_LEN as u16).contains(&addr) {
            self.device
                .channel_a
                .set_byte((addr - vaddr::CHAN_A_BASE) as u8, value);
            return;
        }
        if (vaddr::CHAN_B_BASE..vaddr::CHAN_B_BASE + BLOCK_LEN as u16).contains(&addr) {
            self.device
                .channel_b
                .set_byte((addr - vaddr::CHAN_B_BASE) as u8, value);
            return;
        }
        if (vaddr::ADV_BASE..vaddr::ADV_END).contains(&addr) {
            self.write_advanced((addr - vaddr::ADV_BASE) as u8, value);
            return;
        }

        match addr {
            vaddr::BOX_COMMAND => self.execute_box_command(value),
            vaddr::CURRENT_MODE => {
                let m = wire_to_mode(value);
                self.device.config.current_mode = m;
                self.device.request(Command::SetMode(m));
            }
            vaddr::POT_LOCKOUT => self.device.set_pot_lockout(value),
            vaddr::POWER_LEVEL => {
                if value <= 2 {
                    self.device.config.power_level = value;
                }
            }
            vaddr::SPLIT_MODE_A => {
                let m = wire_to_mode(value);
                self.device.config.split_a_mode = m;
                let (_, b) = self.device.dispatcher.split_modes();
                self.device.dispatcher.set_split_modes(m, b);
            }
            vaddr::SPLIT_MODE_B => {
                let m = wire_to_mode(value);
                self.device.config.split_b_mode = m;
                let (a, _) = self.device.dispatcher.split_modes();
                self.device.dispatcher.set_split_modes(a, m);
            }
            vaddr::FAVOURITE => self.device.config.favorite_mode = wire_to_mode(value),
            vaddr::MULTI_ADJUST => self.device.config.multi_adjust = value,
            _ => {}
        }
    }

    fn read_advanced(&self, index: u8) -> u8 {
        let cfg = &self.device.config;
        match index {
            0 => cfg.ramp_level,
            1 => cfg.ramp_time,
            2 => cfg.depth,
            3 => cfg.tempo,
            4 => cfg.frequency,
            5 => cfg.effect,
            6 => cfg.width,
            _ => cfg.pace,
        }
    }

    fn write_advanced(&mut self, index: u8, value: u8) {
        let cfg = &mut self.device.config;
        match index {
            0 => cfg.ramp_level = value,
            1 => cfg.ramp_time = value,
            2 => cfg.depth = value,
            3 => cfg.tempo = value,
            4 => cfg.frequency = value,
            5 => cfg.effect = value,
            6 => cfg.width = value,
            _ => cfg.pace = value,
        }
    }

    fn read_store(&mut self, offset: u16) -> u8 {
        let cfg = &self.device.config;
        match offset {
            vaddr::EE_PROVISIONED => 0x55,
            vaddr::EE_SERIAL_LO => 0x01,
            vaddr::EE_SERIAL_HI => 0x00,
            vaddr::EE_LINK_SIG1 | vaddr::EE_LINK_SIG2 => 0x01,
            vaddr::EE_TOP_MODE => mode_to_wire(cfg.current_mode),
            vaddr::EE_POWER_LEVEL => cfg.power_level,
            vaddr::EE_SPLIT_MODE_A => mode_to_wire(cfg.split_a_mode),
            vaddr::EE_SPLIT_MODE_B => mode_to_wire(cfg.split_b_mode),
            vaddr::EE_FAVOURITE => mode_to_wire(cfg.favorite_mode),
            o if (vaddr::EE_ADV_BASE..vaddr::EE_ADV_END).contains(&o) => {
                self.read_advanced((o - vaddr::EE_ADV_BASE) as u8)
            }
            _ => self.store.read_byte(offset),
        }
    }

    fn write_store(&mut self, offset: u16, value: u8) {
        match offset {
            vaddr::EE_TOP_MODE => self.device.config.current_mode = wire_to_mode(value),
            vaddr::EE_POWER_LEVEL => {
                if value <= 2 {
                    self.device.config.power_level = value;
                }
            }
            vaddr::EE_SPLIT_MODE_A => self.device.config.split_a_mode = wire_to_mode(value),
            vaddr::EE_SPLIT_MODE_B => self.device.config.split_b_mode = wire_to_mode(value),
            vaddr::EE_FAVOURITE => self.device.config.favorite_mode = wire_to_mode(value),
            vaddr::EE_PROVISIONED | vaddr::EE_LINK_SIG1 | vaddr::EE_LINK_SIG2 => {}
            o if (vaddr::EE_ADV_BASE..vaddr::EE_ADV_END).contains(&o) => {
                self.write_advanced((o - vaddr::EE_ADV_BASE) as u8, value)
            }
            // The raw settings block is not writable byte-wise; user
            // program slots and free space above it are.
            o if o as usize >= CONFIG_LEN => self.store.write_byte(o, value),
            _ => {}
        }
    }

    fn execute_box_command(&mut self, command: u8) {
        match command {
            boxcmd::RELOAD_MODE | boxcmd::REFRESH_MODE => self.device.request(Command::Reload),
            boxcmd::NEXT_MODE => self.device.request(Command::Next),
            boxcmd::PREV_MODE => self.device.request(Command::Prev),
            boxcmd::MUTE => self.device.request(Command::Pause),
            boxcmd::START_RAMP => self.device.request(Command::StartRamp),
            boxcmd::SWAP_CHANNELS => self.device.swap_channels(),
            boxcmd::COPY_A_TO_B => self.device.copy_a_to_b(),
            boxcmd::COPY_B_TO_A => self.device.copy_b_to_a(),
            // Unknown codes are ignored.
            _ => {}
        }
    }
}

impl<S: Store> ProtocolHost for DeviceBus<'_, S> {
    fn mem_read(&mut self, addr: u16) -> u8 {
        if addr < vaddr::FLASH_END {
            return match addr {
                vaddr::BOX_MODEL => BOX_MODEL,
                vaddr::FW_MAJ => FIRMWARE_VERSION[0],
                vaddr::FW_MIN => FIRMWARE_VERSION[1],
                vaddr::FW_INT => FIRMWARE_VERSION[2],
                _ => 0x00,
            };
        }
        if (vaddr::RAM_BASE..vaddr::RAM_END).contains(&addr) {
            return self.read_ram(addr);
        }
        if (vaddr::STORE_BASE..vaddr::STORE_END).contains(&addr) {
            return self.read_store(addr - vaddr::STORE_BASE);
        }
        0x00
    }

    fn mem_write(&mut self, addr: u16, value: u8) {
        if (vaddr::RAM_BASE..vaddr::RAM_END).contains(&addr) {
            self.write_ram(addr, value);
        } else if (vaddr::STORE_BASE..vaddr::STORE_END).contains(&addr) {
            self.write_store(addr - vaddr::STORE_BASE, value);
        }
    }

    fn random_key(&mut self) -> u8 {
        self.device.prng.next8()
    }
}
