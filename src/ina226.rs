use embedded_hal::i2c::I2c;

/// Configuration register.
pub const REG_CONFIG: u8 = 0x00;
/// Shunt voltage register (signed).
pub const REG_SHUNT_VOLTAGE: u8 = 0x01;
/// Bus voltage register.
pub const REG_BUS_VOLTAGE: u8 = 0x02;
/// Power register (signed).
pub const REG_POWER: u8 = 0x03;
/// Current register (signed).
pub const REG_CURRENT: u8 = 0x04;
/// Calibration register.
pub const REG_CALIBRATION: u8 = 0x05;

const CONFIG_CONST_BITS: u16 = 0x4000;
const CONFIG_AVG_512_SAMPLES: u16 = 0x0c00;
const CONFIG_BUS_CT_588US: u16 = 0x00c0;
const CONFIG_SHUNT_CT_588US: u16 = 0x0018;
const CONFIG_MODE_CONTINUOUS: u16 = 0x0007;

/// The startup configuration word: 512-sample averaging, 588us conversion times, continuous
/// shunt and bus measurement.
pub const DEFAULT_CONFIG: u16 = CONFIG_CONST_BITS
    | CONFIG_AVG_512_SAMPLES
    | CONFIG_BUS_CT_588US
    | CONFIG_SHUNT_CT_588US
    | CONFIG_MODE_CONTINUOUS;

/// Calibration word for a 2 milliohm shunt at a 1mA/bit current resolution
/// (0.00512 / (0.002 * 0.001)).
pub const DEFAULT_CALIBRATION: u16 = 2560;

const BUS_VOLTAGE_LSB_VOLTS: f32 = 0.00125;
const SHUNT_VOLTAGE_LSB_VOLTS: f32 = 0.00001;
const CURRENT_LSB_AMPS: f32 = 0.001;
const POWER_LSB_WATTS: f32 = 0.025;

/// Driver for the INA226.
///
/// Voltages are reported in volts, current in milliamps and power in watts, matching the scale
/// factors the default calibration programs into the chip.
#[derive(Debug)]
pub struct Ina226<TI2c> {
    i2c: TI2c,
    address: u8,
    calibration: u16,
}

impl<TI2c, TI2cError> Ina226<TI2c>
where
    TI2c: I2c<Error = TI2cError>,
{
    /// Constructs a driver for the monitor at the given address and applies the default
    /// calibration and configuration.
    pub fn new(i2c: TI2c, address: u8) -> Result<Ina226<TI2c>, TI2cError> {
        Self::with_calibration(i2c, address, DEFAULT_CALIBRATION, DEFAULT_CONFIG)
    }

    /// Constructs a driver with a custom calibration and configuration word, for shunt values
    /// other than 2 milliohms.
    ///
    /// Note that the unit-converted accessors assume the default 1mA/bit current resolution.
    pub fn with_calibration(
        i2c: TI2c,
        address: u8,
        calibration: u16,
        config: u16,
    ) -> Result<Ina226<TI2c>, TI2cError> {
        let mut monitor = Ina226 {
            i2c,
            address,
            calibration,
        };
        monitor.write_register(REG_CALIBRATION, calibration)?;
        monitor.write_register(REG_CONFIG, config)?;
        Ok(monitor)
    }

    /// Writes a big-endian 16-bit value to the given register.
    pub fn write_register(&mut self, register: u8, value: u16) -> Result<(), TI2cError> {
        let bytes = value.to_be_bytes();
        self.i2c
            .write(self.address, &[register, bytes[0], bytes[1]])
    }

    /// Reads a big-endian 16-bit value from the given register.
    pub fn read_register(&mut self, register: u8) -> Result<u16, TI2cError> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(self.address, &[register], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_signed_register(&mut self, register: u8) -> Result<i16, TI2cError> {
        Ok(self.read_register(register)? as i16)
    }

    /// Reads the bus voltage in volts. LSB = 1.25mV.
    pub fn bus_voltage(&mut self) -> Result<f32, TI2cError> {
        let raw = self.read_register(REG_BUS_VOLTAGE)?;
        Ok(raw as f32 * BUS_VOLTAGE_LSB_VOLTS)
    }

    /// Reads the shunt voltage in volts. LSB = 10uV.
    pub fn shunt_voltage(&mut self) -> Result<f32, TI2cError> {
        let raw = self.read_signed_register(REG_SHUNT_VOLTAGE)?;
        Ok(raw as f32 * SHUNT_VOLTAGE_LSB_VOLTS)
    }

    /// Reads the current through the shunt in milliamps.
    ///
    /// The calibration register is rewritten before each read; the register resets on some
    /// supply glitches and a stale zero here silently zeroes every current reading.
    pub fn current(&mut self) -> Result<f32, TI2cError> {
        self.write_register(REG_CALIBRATION, self.calibration)?;
        let raw = self.read_signed_register(REG_CURRENT)?;
        Ok(raw as f32 * CURRENT_LSB_AMPS * 1000.0)
    }

    /// Reads the measured power in watts. LSB = 25mW with the default calibration.
    pub fn power(&mut self) -> Result<f32, TI2cError> {
        let raw = self.read_signed_register(REG_POWER)?;
        Ok(raw as f32 * POWER_LSB_WATTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_word() {
        assert_eq!(DEFAULT_CONFIG, 0x4cdf);
    }
}
