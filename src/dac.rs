//! LTC1661 dual 10-bit DAC driver.
//!
//! The DAC scales each channel's transformer drive level; because of
//! the output stage wiring, code 1023 is minimum output and code 0 is
//! maximum. Commands are 16-bit words over SPI, MSB first:
//!
//! ```text
//! [CMD3:CMD0 D9:D6] [D5:D0 x x]
//! ```
//!
//! The driver is generic over any [`embedded_hal::spi::SpiBus`],
//! chip-select [`OutputPin`], and [`DelayNs`] implementation; the
//! foreground owns it exclusively (ISRs never touch the DAC).
//!
//! The package's DAC-A output is wired to the channel-B transformer
//! and vice versa, so the per-channel methods swap the command codes to
//! keep logical and physical channels aligned.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::channel::Channel;
use crate::constants::DAC_MAX;

// Command codes, upper nibble of the first word byte.
const CMD_LOAD_A: u8 = 0x10;
const CMD_LOAD_B: u8 = 0x20;
const CMD_UPDATE: u8 = 0x80;
const CMD_LOAD_UPDATE_A: u8 = 0x90;
const CMD_LOAD_UPDATE_B: u8 = 0xA0;
const CMD_WAKE: u8 = 0xD0;
const CMD_SLEEP: u8 = 0xE0;

/// Bus or chip-select failure during a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<S, P> {
    Spi(S),
    Pin(P),
}

/// LTC1661 on a shared SPI bus with a dedicated chip select.
pub struct Ltc1661<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
}

impl<SPI, CS, D> Ltc1661<SPI, CS, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    /// Take ownership of the bus handle and chip select. Call
    /// [`wake`](Self::wake) before the first conversion.
    pub fn new(spi: SPI, cs: CS, delay: D) -> Self {
        Ltc1661 { spi, cs, delay }
    }

    /// Release the bus and pin.
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn send(&mut self, command: u8, value: u16) -> Result<(), Error<SPI::Error, CS::Error>> {
        let value = value.min(DAC_MAX);
        let word = [
            command | (value >> 6) as u8 & 0x0F,
            ((value & 0x3F) << 2) as u8,
        ];

        self.cs.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(1);
        let result = self.spi.write(&word).map_err(Error::Spi);
        self.delay.delay_us(1);
        // Raise CS even after a failed transfer so the bus is usable.
        let cs_result = self.cs.set_high().map_err(Error::Pin);
        result.and(cs_result)
    }

    /// Wake the DAC from power-down.
    pub fn wake(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.send(CMD_WAKE, 0)
    }

    /// Enter low-power sleep.
    pub fn sleep(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.send(CMD_SLEEP, 0)
    }

    /// Load and immediately update one channel.
    pub fn write_channel(
        &mut self,
        ch: Channel,
        value: u16,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        // Swapped to match the board wiring.
        let command = match ch {
            Channel::A => CMD_LOAD_UPDATE_B,
            Channel::B => CMD_LOAD_UPDATE_A,
        };
        self.send(command, value)
    }

    /// Update both channels simultaneously from one load sequence.
    pub fn write_both(
        &mut self,
        value_a: u16,
        value_b: u16,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.send(CMD_LOAD_B, value_a)?;
        self.send(CMD_LOAD_A, value_b)?;
        self.send(CMD_UPDATE, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern crate std;
    use std::vec::Vec;

    use core::convert::Infallible;

    #[derive(Default)]
    struct SpiMock {
        written: Vec<u8>,
    }

    impl embedded_hal::spi::ErrorType for SpiMock {
        type Error = Infallible;
    }

    impl SpiBus<u8> for SpiMock {
        fn read(&mut self, _words: &mut [u8]) -> Result<(), Infallible> {
            Ok(())
        }
        fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
            self.written.extend_from_slice(words);
            Ok(())
        }
        fn transfer(&mut self, _read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
            self.written.extend_from_slice(write);
            Ok(())
        }
        fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Infallible> {
            Ok(())
        }
        fn flush(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct PinMock {
        high: bool,
        edges: usize,
    }

    impl embedded_hal::digital::ErrorType for PinMock {
        type Error = Infallible;
    }

    impl OutputPin for PinMock {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            self.edges += 1;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            self.edges += 1;
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn word_format_packs_ten_bits() {
        let mut dac = Ltc1661::new(SpiMock::default(), PinMock::default(), NoDelay);
        dac.write_channel(Channel::B, 0x2AA).unwrap();
        let (spi, cs) = dac.release();
        // Channel B maps to the DAC-A load/update command.
        assert_eq!(spi.written, [0x90 | 0x0A, 0xA8]);
        assert!(cs.high, "chip select released");
    }

    #[test]
    fn values_clamp_to_ten_bits() {
        let mut dac = Ltc1661::new(SpiMock::default(), PinMock::default(), NoDelay);
        dac.write_channel(Channel::A, 0xFFFF).unwrap();
        let (spi, _) = dac.release();
        assert_eq!(spi.written, [0xA0 | 0x0F, 0xFC]);
    }

    #[test]
    fn write_both_loads_then_updates() {
        let mut dac = Ltc1661::new(SpiMock::default(), PinMock::default(), NoDelay);
        dac.write_both(0, 1023).unwrap();
        let (spi, cs) = dac.release();
        assert_eq!(spi.written.len(), 6);
        // Load B-wired register (channel A value 0), load A-wired
        // register (channel B value 1023), then the update word.
        assert_eq!(spi.written[0], CMD_LOAD_B);
        assert_eq!(spi.written[2], CMD_LOAD_A | 0x0F);
        assert_eq!(spi.written[4], CMD_UPDATE);
        // Three transfers, two edges each.
        assert_eq!(cs.edges, 6);
    }
}
