//! User-programmable mode slots.
//!
//! Seven 32-byte programs live in the persistent store and are cached
//! in RAM at boot. The first byte of a slot is a validity magic; the
//! program starts at byte 1. Only SET opcodes are allowed, which keeps
//! user bytecode trivially verifiable - anything else terminates
//! execution.

use crate::channel::{register_mut, ChannelBlock, BASE_A, BASE_B};
use crate::persist::{self, Store, USER_SLOT_LEN, USER_SLOTS};

/// Validity magic stored as the first byte of a programmed slot.
pub const SLOT_MAGIC: u8 = 0xE3;

/// RAM cache of the user program slots.
pub struct UserPrograms {
    slots: [[u8; USER_SLOT_LEN]; USER_SLOTS],
}

impl UserPrograms {
    pub const fn new() -> Self {
        UserPrograms {
            slots: [[0xFF; USER_SLOT_LEN]; USER_SLOTS],
        }
    }

    /// Populate the cache from the persistent store.
    pub fn load<S: Store>(&mut self, store: &mut S) {
        for slot in 0..USER_SLOTS {
            persist::load_user_slot(store, slot, &mut self.slots[slot]);
        }
    }

    pub fn is_valid(&self, slot: usize) -> bool {
        slot < USER_SLOTS && self.slots[slot][0] == SLOT_MAGIC
    }

    /// Run a slot's program against the channel blocks. Invalid or
    /// empty slots do nothing.
    pub fn execute(&self, slot: usize, a: &mut ChannelBlock, b: &mut ChannelBlock) {
        if !self.is_valid(slot) {
            return;
        }

        let mut scratch = 0u8;
        let program = &self.slots[slot][1..];
        let mut pc = 0usize;
        while pc + 1 < program.len() {
            let op = program[pc];
            if op & 0x80 == 0 {
                break;
            }
            let offset = (op & 0x3F) as u16;
            let value = program[pc + 1];
            if op & 0x40 != 0 {
                *register_mut(a, b, &mut scratch, BASE_B + offset) = value;
            } else {
                let mask = a.apply_channel();
                if mask & 0x01 != 0 {
                    *register_mut(a, b, &mut scratch, BASE_A + offset) = value;
                }
                if mask & 0x02 != 0 {
                    *register_mut(a, b, &mut scratch, BASE_B + offset) = value;
                }
            }
            pc += 2;
        }
    }

    /// Store a program into a slot, cache and persistent store both.
    /// The final byte is forced to a terminator.
    pub fn write<S: Store>(&mut self, store: &mut S, slot: usize, program: &[u8; USER_SLOT_LEN]) {
        if slot >= USER_SLOTS {
            return;
        }
        self.slots[slot] = *program;
        self.slots[slot][USER_SLOT_LEN - 1] = 0x00;
        persist::save_user_slot(store, slot, &self.slots[slot]);
    }

    /// Invalidate a slot.
    pub fn erase<S: Store>(&mut self, store: &mut S, slot: usize) {
        if slot >= USER_SLOTS {
            return;
        }
        self.slots[slot] = [0xFF; USER_SLOT_LEN];
        persist::erase_user_slot(store, slot);
    }

    /// Copy a slot out, returning whether it holds a valid program.
    pub fn read(&self, slot: usize, out: &mut [u8; USER_SLOT_LEN]) -> bool {
        if slot >= USER_SLOTS {
            return false;
        }
        *out = self.slots[slot];
        self.is_valid(slot)
    }
}

impl Default for UserPrograms {
    fn default() -> Self {
        Self::new()
    }
}
