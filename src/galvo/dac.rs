//! SPI DAC driver for the mirror amplifiers.
//!
//! Each write is one 24-bit frame: command nibble, channel nibble, 16-bit value.

use embedded_hal::spi::SpiDevice;

use crate::error::OutputError;

use super::grid::GalvoAxis;
use super::mapper::GalvoSink;

/// Write the input register of one channel.
const CMD_WRITE_INPUT: u8 = 0x1;
/// Write one channel, then update all outputs.
const CMD_WRITE_UPDATE_ALL: u8 = 0x2;
/// Write and update one channel.
const CMD_WRITE_UPDATE: u8 = 0x3;

/// Two-channel 16-bit SPI DAC.
pub struct SpiDac<SPI: SpiDevice> {
    spi: SPI,
    channels: [u8; 2],
}

impl<SPI: SpiDevice> SpiDac<SPI> {
    /// X on channel 0, Y on channel 1.
    pub fn new(spi: SPI) -> Self {
        Self::with_channels(spi, 0, 1)
    }

    /// Custom channel assignment.
    pub fn with_channels(spi: SPI, x: u8, y: u8) -> Self {
        Self {
            spi,
            channels: [x & 0x0F, y & 0x0F],
        }
    }

    /// Move a single axis now, without waiting for a commit.
    pub fn write_immediate(&mut self, axis: GalvoAxis, value: u16) -> Result<(), OutputError> {
        self.write(CMD_WRITE_UPDATE, axis, value)
    }

    /// Release the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }

    fn write(&mut self, command: u8, axis: GalvoAxis, value: u16) -> Result<(), OutputError> {
        let [hi, lo] = value.to_be_bytes();
        let frame = [command << 4 | self.channels[axis as usize], hi, lo];
        self.spi.write(&frame).map_err(|_| OutputError::Spi)
    }
}

impl<SPI: SpiDevice> GalvoSink for SpiDac<SPI> {
    fn set_axis_value(
        &mut self,
        axis: GalvoAxis,
        value: u16,
        commit: bool,
    ) -> Result<(), OutputError> {
        let command = if commit {
            CMD_WRITE_UPDATE_ALL
        } else {
            CMD_WRITE_INPUT
        };
        self.write(command, axis, value)
    }
}
