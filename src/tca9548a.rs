use embedded_hal::i2c::I2c;

/// The multiplexer's default bus address.
pub const DEFAULT_ADDRESS: u8 = 0x70;

/// The number of downstream channels.
pub const NUM_CHANNELS: u8 = 8;

#[derive(Debug, PartialEq)]
pub enum Error<TI2cError> {
    /// Wrapped error from the HAL.
    Wrapped(TI2cError),
    /// The requested channel is outside 0-7.
    InvalidChannel,
}

impl<TI2cError> From<TI2cError> for Error<TI2cError> {
    fn from(error: TI2cError) -> Error<TI2cError> {
        Error::Wrapped(error)
    }
}

/// Driver for the TCA9548A.
///
/// The multiplexer's single control register is a bitmask of enabled downstream channels.
/// Several channels can be live at once, but a bus where downstream devices share addresses
/// must keep at most one enabled; this system enforces that by strict sequencing around each
/// access rather than by locking.
#[derive(Debug)]
pub struct Tca9548a<TI2c> {
    i2c: TI2c,
    address: u8,
}

impl<TI2c, TI2cError> Tca9548a<TI2c>
where
    TI2c: I2c<Error = TI2cError>,
{
    pub fn new(i2c: TI2c, address: u8) -> Tca9548a<TI2c> {
        Tca9548a { i2c, address }
    }

    /// Enables a single channel (0-7), disabling all others.
    pub fn enable_channel(&mut self, channel: u8) -> Result<(), Error<TI2cError>> {
        if channel >= NUM_CHANNELS {
            return Err(Error::InvalidChannel);
        }
        self.write_mask(1 << channel)
    }

    /// Enables exactly the channels set in the given bitmask.
    pub fn enable_mask(&mut self, mask: u8) -> Result<(), Error<TI2cError>> {
        self.write_mask(mask)
    }

    /// Disables all channels.
    pub fn disable_all(&mut self) -> Result<(), Error<TI2cError>> {
        self.write_mask(0x00)
    }

    /// Enables all 8 channels.
    pub fn enable_all(&mut self) -> Result<(), Error<TI2cError>> {
        self.write_mask(0xff)
    }

    /// Reads back the control register as a bitmask of enabled channels.
    pub fn enabled_channels(&mut self) -> Result<u8, Error<TI2cError>> {
        let mut buf = [0u8; 1];
        self.i2c.read(self.address, &mut buf)?;
        Ok(buf[0])
    }

    fn write_mask(&mut self, mask: u8) -> Result<(), Error<TI2cError>> {
        self.i2c.write(self.address, &[mask])?;
        Ok(())
    }
}
