#![no_std]

/// Driver for reading from DHT11 humidity/temperature sensors.
pub mod dht11;
/// Driver for the INA226 single-channel current/voltage monitor.
///
/// Refer to [this datasheet](https://www.ti.com/lit/ds/symlink/ina226.pdf) for more information
/// about the device.
pub mod ina226;
/// Driver for the INA3221 three-channel current/voltage monitor.
pub mod ina3221;
/// The I2C-target command dispatcher and its shared-buffer handshake.
pub mod responder;
/// Periodic, best-effort refresh of cached sensor readings.
pub mod sampler;
/// Driver for the TCA9548A I2C bus multiplexer.
pub mod tca9548a;
/// Wind-speed estimation from an anemometer's analog-front-end voltage.
pub mod wind;
