//! Host protocol packet machine.
//!
//! Half-duplex, packet-based link at 19200 8N1. The UART transport is
//! collaborator-owned; this state machine consumes one received byte at
//! a time and emits replies through a caller-supplied sink.
//!
//! Commands (host → device):
//!
//! | byte | meaning |
//! |---|---|
//! | `0x00` | sync; device answers `0x07` when ready |
//! | `0x08` | reset protocol state, clears encryption |
//! | `0x2F key sum` | key exchange |
//! | `0x3C hi lo sum` | read one byte |
//! | `0x(N+3)D hi lo data×N sum` | write N bytes |
//!
//! After a key exchange, device-bound bytes arrive XOR-encrypted with
//! `box_key ^ host_key ^ 0x55`; device→host traffic stays plaintext.
//! The trailing byte of every packet is the 8-bit sum of the preceding
//! bytes; a mismatch is answered with `0x07` and the packet dropped.
//! The host retries; the device never does.

/// Command opcodes sent by the host.
pub mod cmd {
    pub const SYNC: u8 = 0x00;
    pub const RESET: u8 = 0x08;
    pub const READ: u8 = 0x3C;
    /// Low nibble marking a write; the high nibble carries the length.
    pub const WRITE_NIBBLE: u8 = 0x0D;
    pub const KEY_EXCHANGE: u8 = 0x2F;
}

/// Reply opcodes sent by the device.
pub mod reply {
    pub const SYNC: u8 = 0x07;
    pub const KEY_EXCHANGE: u8 = 0x21;
    pub const READ: u8 = 0x22;
    pub const OK: u8 = 0x06;
    /// Shares the sync byte: any framing or checksum problem elicits it.
    pub const ERROR: u8 = 0x07;
}

/// Extra byte folded into the session key derivation.
const KEY_WHITENER: u8 = 0x55;

/// What the protocol needs from the rest of the device: the virtual
/// address space and a key source for the exchange.
pub trait ProtocolHost {
    fn mem_read(&mut self, addr: u16) -> u8;
    fn mem_write(&mut self, addr: u16, value: u8);
    /// One fresh box-key byte for a key exchange.
    fn random_key(&mut self) -> u8;
}

/// 8-bit sum of a packet's bytes, excluding the trailing checksum slot.
fn checksum(packet: &[u8]) -> u8 {
    packet[..packet.len() - 1]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Protocol state machine. One instance per link.
pub struct Protocol {
    key: u8,
    encrypted: bool,
    buf: [u8; 16],
    len: usize,
    expected: usize,
}

impl Protocol {
    pub const fn new() -> Self {
        Protocol {
            key: 0,
            encrypted: false,
            buf: [0; 16],
            len: 0,
            expected: 0,
        }
    }

    /// Whether a key exchange has completed this session.
    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    fn reset_packet(&mut self) {
        self.len = 0;
        self.expected = 0;
    }

    fn reset_encryption(&mut self) {
        self.key = 0;
        self.encrypted = false;
    }

    /// Feed one received byte. Replies are pushed into `tx`.
    pub fn process_byte<H: ProtocolHost>(
        &mut self,
        raw: u8,
        host: &mut H,
        tx: &mut impl FnMut(u8),
    ) {
        // Sync is recognized on the raw wire byte, and only between
        // packets; it drops any established key.
        if raw == cmd::SYNC && self.len == 0 {
            self.reset_encryption();
            tx(reply::SYNC);
            return;
        }

        let byte = if self.encrypted { raw ^ self.key } else { raw };

        if self.len >= self.buf.len() {
            self.reset_packet();
            tx(reply::ERROR);
            return;
        }
        self.buf[self.len] = byte;
        self.len += 1;

        if self.len == 1 {
            let head = self.buf[0];
            if head == cmd::RESET {
                self.reset_packet();
                self.reset_encryption();
                tx(reply::OK);
                return;
            }
            self.expected = if head & 0x0F == cmd::WRITE_NIBBLE && head >> 4 >= 3 {
                (head >> 4) as usize + 1
            } else if head == cmd::READ {
                4
            } else if head == cmd::KEY_EXCHANGE {
                3
            } else {
                // Unknown first byte: silently dropped.
                self.reset_packet();
                return;
            };
        }

        if self.len < self.expected {
            return;
        }

        let packet = &self.buf[..self.expected];
        if checksum(packet) != packet[packet.len() - 1] {
            self.reset_packet();
            tx(reply::ERROR);
            return;
        }

        let head = packet[0];
        if head == cmd::KEY_EXCHANGE {
            let host_key = packet[1];
            let box_key = host.random_key();
            let mut out = [reply::KEY_EXCHANGE, box_key, 0];
            out[2] = checksum(&out);
            for b in out {
                tx(b);
            }
            self.key = box_key ^ host_key ^ KEY_WHITENER;
            self.encrypted = true;
        } else if head == cmd::READ {
            let addr = u16::from_be_bytes([packet[1], packet[2]]);
            let mut out = [reply::READ, host.mem_read(addr), 0];
            out[2] = checksum(&out);
            for b in out {
                tx(b);
            }
        } else {
            // Write: the high nibble is the data length plus three.
            // Degenerate headers below 0x3D carry no data at all.
            let addr = u16::from_be_bytes([packet[1], packet[2]]);
            let count = ((head >> 4) as usize).saturating_sub(3);
            for i in 0..count {
                host.mem_write(addr.wrapping_add(i as u16), packet[3 + i]);
            }
            tx(reply::OK);
        }
        self.reset_packet();
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::new()
    }
}
