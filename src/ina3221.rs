use embedded_hal::i2c::I2c;

/// Configuration register.
pub const REG_CONFIG: u8 = 0x00;
/// Channel 1 shunt voltage register; later channels follow at a stride of 2.
pub const REG_SHUNT_VOLTAGE_1: u8 = 0x01;
/// Channel 1 bus voltage register; later channels follow at a stride of 2.
pub const REG_BUS_VOLTAGE_1: u8 = 0x02;

const CONFIG_ENABLE_CHANNEL_1: u16 = 0x4000;
const CONFIG_ENABLE_CHANNEL_2: u16 = 0x2000;
const CONFIG_ENABLE_CHANNEL_3: u16 = 0x1000;
const CONFIG_AVG_1: u16 = 0x0400;
const CONFIG_BUS_CT_2: u16 = 0x0100;
const CONFIG_SHUNT_CT_2: u16 = 0x0020;
const CONFIG_MODE_CONTINUOUS: u16 = 0x0007;

/// The startup configuration word: all three channels enabled, continuous shunt and bus
/// measurement.
pub const DEFAULT_CONFIG: u16 = CONFIG_ENABLE_CHANNEL_1
    | CONFIG_ENABLE_CHANNEL_2
    | CONFIG_ENABLE_CHANNEL_3
    | CONFIG_AVG_1
    | CONFIG_BUS_CT_2
    | CONFIG_SHUNT_CT_2
    | CONFIG_MODE_CONTINUOUS;

/// The shunt resistance assumed by [`Ina3221::new`], in ohms.
pub const DEFAULT_SHUNT_OHMS: f32 = 0.1;

const BUS_VOLTAGE_LSB_VOLTS: f32 = 0.001;
const SHUNT_VOLTAGE_LSB_MILLIVOLTS: f32 = 0.005;

/// One of the monitor's three measurement channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    One,
    Two,
    Three,
}

impl Channel {
    fn offset(self) -> u8 {
        match self {
            Channel::One => 0,
            Channel::Two => 2,
            Channel::Three => 4,
        }
    }
}

/// Driver for the INA3221.
///
/// Bus voltages are reported in volts, shunt voltages in millivolts, current in milliamps and
/// power in watts. Current is derived from the shunt voltage and the configured shunt
/// resistance; the chip performs no calibration of its own.
#[derive(Debug)]
pub struct Ina3221<TI2c> {
    i2c: TI2c,
    address: u8,
    shunt_ohms: f32,
}

impl<TI2c, TI2cError> Ina3221<TI2c>
where
    TI2c: I2c<Error = TI2cError>,
{
    /// Constructs a driver for the monitor at the given address, assuming
    /// [`DEFAULT_SHUNT_OHMS`] shunts, and applies the default configuration.
    pub fn new(i2c: TI2c, address: u8) -> Result<Ina3221<TI2c>, TI2cError> {
        Self::with_shunt_resistor(i2c, address, DEFAULT_SHUNT_OHMS)
    }

    /// Constructs a driver for a board with a different shunt resistance (in ohms).
    pub fn with_shunt_resistor(
        i2c: TI2c,
        address: u8,
        shunt_ohms: f32,
    ) -> Result<Ina3221<TI2c>, TI2cError> {
        let mut monitor = Ina3221 {
            i2c,
            address,
            shunt_ohms,
        };
        monitor.write_register(REG_CONFIG, DEFAULT_CONFIG)?;
        Ok(monitor)
    }

    /// Writes a big-endian 16-bit value to the given register.
    pub fn write_register(&mut self, register: u8, value: u16) -> Result<(), TI2cError> {
        let bytes = value.to_be_bytes();
        self.i2c
            .write(self.address, &[register, bytes[0], bytes[1]])
    }

    /// Reads a big-endian 16-bit value from the given register.
    pub fn read_register(&mut self, register: u8) -> Result<i16, TI2cError> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(self.address, &[register], &mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }

    /// Reads a channel's bus voltage in volts. LSB = 1mV.
    pub fn bus_voltage(&mut self, channel: Channel) -> Result<f32, TI2cError> {
        let raw = self.read_register(REG_BUS_VOLTAGE_1 + channel.offset())?;
        Ok(raw as f32 * BUS_VOLTAGE_LSB_VOLTS)
    }

    /// Reads a channel's shunt voltage in millivolts. LSB = 5uV.
    pub fn shunt_voltage(&mut self, channel: Channel) -> Result<f32, TI2cError> {
        let raw = self.read_register(REG_SHUNT_VOLTAGE_1 + channel.offset())?;
        Ok(raw as f32 * SHUNT_VOLTAGE_LSB_MILLIVOLTS)
    }

    /// Reads a channel's current in milliamps, derived from the shunt voltage.
    pub fn current(&mut self, channel: Channel) -> Result<f32, TI2cError> {
        let shunt_millivolts = self.shunt_voltage(channel)?;
        Ok(shunt_millivolts / self.shunt_ohms)
    }

    /// Reads a channel's power in watts.
    pub fn power(&mut self, channel: Channel) -> Result<f32, TI2cError> {
        let voltage = self.bus_voltage(channel)?;
        let current = self.current(channel)? / 1000.0;
        Ok(voltage * current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_word() {
        assert_eq!(DEFAULT_CONFIG, 0x7527);
    }

    #[test]
    fn channel_register_stride() {
        assert_eq!(REG_SHUNT_VOLTAGE_1 + Channel::One.offset(), 0x01);
        assert_eq!(REG_BUS_VOLTAGE_1 + Channel::Two.offset(), 0x04);
        assert_eq!(REG_BUS_VOLTAGE_1 + Channel::Three.offset(), 0x06);
    }
}
