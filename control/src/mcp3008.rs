//! MCP3008, 8 channel 10-bit ADC read over SPI.
//!
//! A conversion is a single three byte transaction. The first byte carries
//! the start bit, the second selects single-ended mode and the channel, and
//! the last two bytes of the response carry the result:
//!
//! ```text
//!  MOSI  0000_0001  1ccc_0000  xxxx_xxxx
//!  MISO  xxxx_xxxx  xxxx_x0RR  RRRR_RRRR
//! ```

use embedded_hal::spi::{Error as _, SpiDevice};
use thiserror::Error;

use crate::source::{SampleSource, SourceError};

const CHANNELS: u8 = 8;
const START_BIT: u8 = 0x01;
const SINGLE_ENDED: u8 = 0x08;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("channel {0} is out of range, MCP3008 has channels 0 to 7")]
pub struct InvalidChannel(pub u8);

/// Sample source reading one channel of the converter.
#[derive(Debug)]
pub struct Mcp3008<SPI> {
    spi: SPI,
    channel: u8,
}

impl<SPI: SpiDevice> Mcp3008<SPI> {
    /// # Errors
    ///
    /// Fails with [`InvalidChannel`] when the channel is above 7.
    pub fn new(spi: SPI, channel: u8) -> Result<Self, InvalidChannel> {
        if channel >= CHANNELS {
            return Err(InvalidChannel(channel));
        }
        Ok(Self { spi, channel })
    }

    /// Give the bus back.
    pub fn release(self) -> SPI {
        self.spi
    }

    fn convert(&mut self) -> Result<u16, SourceError> {
        let mut frame = command(self.channel);
        self.spi
            .transfer_in_place(&mut frame)
            .map_err(|error| SourceError::Bus(error.kind()))?;
        Ok(decode(frame))
    }
}

impl<SPI: SpiDevice> SampleSource for Mcp3008<SPI> {
    fn read(&mut self) -> Result<u16, SourceError> {
        self.convert()
    }
}

fn command(channel: u8) -> [u8; 3] {
    [START_BIT, (SINGLE_ENDED | channel) << 4, 0x00]
}

fn decode(frame: [u8; 3]) -> u16 {
    (u16::from(frame[1] & 0b11) << 8) | u16::from(frame[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::{ErrorKind, ErrorType, Operation};

    #[derive(Debug)]
    struct BusError;

    impl embedded_hal::spi::Error for BusError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Overrun
        }
    }

    #[derive(Debug, Default)]
    struct MockSpi {
        response: [u8; 3],
        sent: Vec<[u8; 3]>,
        failing: bool,
    }

    impl ErrorType for MockSpi {
        type Error = BusError;
    }

    impl SpiDevice for MockSpi {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), BusError> {
            if self.failing {
                return Err(BusError);
            }
            for operation in operations.iter_mut() {
                if let Operation::TransferInPlace(words) = operation {
                    self.sent.push([words[0], words[1], words[2]]);
                    words.copy_from_slice(&self.response);
                }
            }
            Ok(())
        }
    }

    #[test]
    fn when_reading_channel_it_sends_single_ended_command() {
        let spi = MockSpi::default();
        let mut adc = Mcp3008::new(spi, 5).unwrap();
        adc.read().unwrap();
        assert_eq!(adc.release().sent, [[0x01, 0xD0, 0x00]]);
    }

    #[test]
    fn when_response_arrives_it_decodes_ten_bits() {
        let spi = MockSpi {
            response: [0xFF, 0xFA, 0x5C],
            ..MockSpi::default()
        };
        let mut adc = Mcp3008::new(spi, 0).unwrap();
        assert_eq!(adc.read(), Ok(0x25C));
    }

    #[test]
    fn when_result_is_full_scale_it_reads_1023() {
        assert_eq!(decode([0x00, 0x03, 0xFF]), 1023);
        assert_eq!(decode([0x00, 0x00, 0x00]), 0);
    }

    #[test]
    fn when_bus_fails_it_reports_bus_error() {
        let spi = MockSpi {
            failing: true,
            ..MockSpi::default()
        };
        let mut adc = Mcp3008::new(spi, 0).unwrap();
        assert_eq!(adc.read(), Err(SourceError::Bus(ErrorKind::Overrun)));
    }

    #[test]
    fn when_channel_is_out_of_range_it_is_rejected() {
        assert_eq!(
            Mcp3008::new(MockSpi::default(), 8).unwrap_err(),
            InvalidChannel(8)
        );
    }
}
