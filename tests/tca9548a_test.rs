use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::i2c::{Mock, Transaction};
use power_node::tca9548a;

#[test]
fn enable_channel_writes_single_bit_mask() -> Result<(), tca9548a::Error<ErrorKind>> {
    let mut i2c = Mock::new(&[
        Transaction::write(tca9548a::DEFAULT_ADDRESS, vec![0x04]),
        Transaction::write(tca9548a::DEFAULT_ADDRESS, vec![0x80]),
    ]);
    let mut mux = tca9548a::Tca9548a::new(i2c.clone(), tca9548a::DEFAULT_ADDRESS);

    mux.enable_channel(2)?;
    mux.enable_channel(7)?;

    i2c.done();
    Ok(())
}

#[test]
fn enable_channel_rejects_out_of_range() {
    let mut i2c = Mock::new(&[]);
    let mut mux = tca9548a::Tca9548a::new(i2c.clone(), tca9548a::DEFAULT_ADDRESS);

    assert_eq!(
        mux.enable_channel(8),
        Err(tca9548a::Error::InvalidChannel::<ErrorKind>)
    );

    i2c.done();
}

#[test]
fn disable_and_enable_all() -> Result<(), tca9548a::Error<ErrorKind>> {
    let mut i2c = Mock::new(&[
        Transaction::write(tca9548a::DEFAULT_ADDRESS, vec![0x00]),
        Transaction::write(tca9548a::DEFAULT_ADDRESS, vec![0xff]),
    ]);
    let mut mux = tca9548a::Tca9548a::new(i2c.clone(), tca9548a::DEFAULT_ADDRESS);

    mux.disable_all()?;
    mux.enable_all()?;

    i2c.done();
    Ok(())
}

#[test]
fn enable_mask_passes_through() -> Result<(), tca9548a::Error<ErrorKind>> {
    let mut i2c = Mock::new(&[Transaction::write(tca9548a::DEFAULT_ADDRESS, vec![0x84])]);
    let mut mux = tca9548a::Tca9548a::new(i2c.clone(), tca9548a::DEFAULT_ADDRESS);

    mux.enable_mask(0x84)?;

    i2c.done();
    Ok(())
}

#[test]
fn reads_back_enabled_channels() -> Result<(), tca9548a::Error<ErrorKind>> {
    let mut i2c = Mock::new(&[Transaction::read(tca9548a::DEFAULT_ADDRESS, vec![0x04])]);
    let mut mux = tca9548a::Tca9548a::new(i2c.clone(), tca9548a::DEFAULT_ADDRESS);

    assert_eq!(mux.enabled_channels()?, 0x04);

    i2c.done();
    Ok(())
}

#[test]
fn write_errors_are_wrapped() {
    let mut i2c = Mock::new(&[
        Transaction::write(tca9548a::DEFAULT_ADDRESS, vec![0x01]).with_error(ErrorKind::Other)
    ]);
    let mut mux = tca9548a::Tca9548a::new(i2c.clone(), tca9548a::DEFAULT_ADDRESS);

    assert_eq!(
        mux.enable_channel(0),
        Err(tca9548a::Error::Wrapped(ErrorKind::Other))
    );

    i2c.done();
}
