use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::i2c::{Mock, Transaction};
use power_node::ina3221::{self, Channel};

const ADDRESS: u8 = 0x42;

fn init_transaction() -> Transaction {
    Transaction::write(ADDRESS, vec![ina3221::REG_CONFIG, 0x75, 0x27])
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn new_configures_all_channels() -> Result<(), ErrorKind> {
    let mut i2c = Mock::new(&[init_transaction()]);

    ina3221::Ina3221::new(i2c.clone(), ADDRESS)?;

    i2c.done();
    Ok(())
}

#[test]
fn new_propagates_bus_error() {
    let mut i2c = Mock::new(&[init_transaction().with_error(ErrorKind::Other)]);

    let result = ina3221::Ina3221::new(i2c.clone(), ADDRESS);
    assert!(result.is_err());

    i2c.done();
}

#[test]
fn reads_bus_voltage_per_channel() -> Result<(), ErrorKind> {
    let mut i2c = Mock::new(&[
        init_transaction(),
        // Channel 1 bus voltage at 0x02: 0x1388 = 5000mV.
        Transaction::write_read(ADDRESS, vec![0x02], vec![0x13, 0x88]),
        // Channel 3 bus voltage at 0x06: 0x0CE4 = 3300mV.
        Transaction::write_read(ADDRESS, vec![0x06], vec![0x0c, 0xe4]),
    ]);
    let mut monitor = ina3221::Ina3221::new(i2c.clone(), ADDRESS)?;

    assert_close(monitor.bus_voltage(Channel::One)?, 5.0);
    assert_close(monitor.bus_voltage(Channel::Three)?, 3.3);

    i2c.done();
    Ok(())
}

#[test]
fn reads_shunt_voltage_per_channel() -> Result<(), ErrorKind> {
    let mut i2c = Mock::new(&[
        init_transaction(),
        // Channel 2 shunt voltage at 0x03: 2000 counts of 5uV = 10mV.
        Transaction::write_read(ADDRESS, vec![0x03], vec![0x07, 0xd0]),
        // Negative flow: -400 counts = -2mV.
        Transaction::write_read(ADDRESS, vec![0x03], vec![0xfe, 0x70]),
    ]);
    let mut monitor = ina3221::Ina3221::new(i2c.clone(), ADDRESS)?;

    assert_close(monitor.shunt_voltage(Channel::Two)?, 10.0);
    assert_close(monitor.shunt_voltage(Channel::Two)?, -2.0);

    i2c.done();
    Ok(())
}

#[test]
fn derives_current_from_shunt_resistance() -> Result<(), ErrorKind> {
    let mut i2c = Mock::new(&[
        init_transaction(),
        // 10mV across the default 0.1 ohm shunt = 100mA.
        Transaction::write_read(ADDRESS, vec![0x01], vec![0x07, 0xd0]),
    ]);
    let mut monitor = ina3221::Ina3221::new(i2c.clone(), ADDRESS)?;

    assert_close(monitor.current(Channel::One)?, 100.0);

    i2c.done();
    Ok(())
}

#[test]
fn derives_current_with_custom_shunt() -> Result<(), ErrorKind> {
    let mut i2c = Mock::new(&[
        init_transaction(),
        // 10mV across 0.05 ohm = 200mA.
        Transaction::write_read(ADDRESS, vec![0x01], vec![0x07, 0xd0]),
    ]);
    let mut monitor = ina3221::Ina3221::with_shunt_resistor(i2c.clone(), ADDRESS, 0.05)?;

    assert_close(monitor.current(Channel::One)?, 200.0);

    i2c.done();
    Ok(())
}

#[test]
fn derives_power_from_voltage_and_current() -> Result<(), ErrorKind> {
    let mut i2c = Mock::new(&[
        init_transaction(),
        // 5V bus, 100mA through the shunt: 0.5W.
        Transaction::write_read(ADDRESS, vec![0x02], vec![0x13, 0x88]),
        Transaction::write_read(ADDRESS, vec![0x01], vec![0x07, 0xd0]),
    ]);
    let mut monitor = ina3221::Ina3221::new(i2c.clone(), ADDRESS)?;

    assert_close(monitor.power(Channel::One)?, 0.5);

    i2c.done();
    Ok(())
}
