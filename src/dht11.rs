use core::time::Duration;
use embedded_hal::digital::{InputPin, OutputPin};

#[derive(Debug, PartialEq)]
pub enum Error<TIoError> {
    /// Wrapped error from the HAL.
    Wrapped(TIoError),
    /// Invalid argument was provided.
    InvalidArgument,
    /// Invalid data was read for all attempts.
    BadData,
    /// No response was received.
    NoResponse,
}

impl<TIoError> From<TIoError> for Error<TIoError> {
    fn from(error: TIoError) -> Error<TIoError> {
        Error::Wrapped(error)
    }
}

/// Data read from the DHT11.
#[derive(Debug, PartialEq)]
pub struct Dht11Response {
    pub humidity: u8,
    pub humidity_decimal: u8,
    pub temperature: u8,
    pub temperature_decimal: u8,
}

impl Dht11Response {
    pub fn get_humidity(&self) -> f32 {
        self.humidity as f32 + (self.humidity_decimal as f32 * 0.1)
    }

    pub fn get_temperature(&self) -> f32 {
        self.temperature as f32 + (self.temperature_decimal as f32 * 0.1)
    }

    fn from_raw_bytes(bytes: [u8; 4]) -> Dht11Response {
        Dht11Response {
            humidity: bytes[0],
            humidity_decimal: bytes[1],
            temperature: bytes[2],
            temperature_decimal: bytes[3],
        }
    }

    fn is_valid(&self) -> bool {
        // DHT11 sensors should only be able to read temperatures from 0-50 degrees Celsius.
        // Validate that + 50% for some wiggle-room in case some sensors can go beyond this.
        ((self.humidity < 100 && self.humidity_decimal < 10)
            || (self.humidity == 100 && self.humidity_decimal == 0))
            && ((self.temperature < 75 && self.temperature_decimal < 10)
                || (self.temperature == 75 && self.temperature_decimal == 0))
    }
}

/// The minimum read interval of a DHT11.
///
/// Note that this can vary a bit by device, so check your device's datasheet to be sure. Try
/// doubling this value if you are encountering problems.
pub const MIN_READ_INTERVAL: Duration = Duration::from_millis(1000);

/// Options to modify the behavior of the DHT driver.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// The minimum time interval that must pass between reads. Cannot be below
    /// [`MIN_READ_INTERVAL`].
    pub min_read_interval: Duration,
    /// The maximum number of read attempts for any call to [`Dht11::read`].
    ///
    /// Keep in mind the `min_read_interval` when setting this option. For example, if the
    /// `min_read_interval` is set to 2 seconds, and this is set to 3 attempts, each read
    /// could take over 6 seconds.
    pub max_attempts: u8,
}

pub const DEFAULT_OPTIONS: Options = Options {
    min_read_interval: MIN_READ_INTERVAL,
    max_attempts: 1,
};

const PING_DURATION: Duration = Duration::from_millis(18);

/// Driver for a DHT11 on a single open-drain data line.
///
/// The line idles high; the driver pulls it low to request data and then samples the sensor's
/// reply by counting polling ticks per bit. Every wait phase is bounded, either by a wall-clock
/// watchdog (the initial ACK) or by a tick budget derived from the measured ACK length, so a
/// disconnected or wedged sensor can never spin the caller forever.
#[derive(Debug)]
pub struct Dht11<TPin, TimeFn, ElapsedFn, TTime>
where
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    pin: TPin,
    last_read_time: TTime,
    time_fn: TimeFn,
    elapsed_since_fn: ElapsedFn,
    options: Options,
}

impl<TPin, TError, TimeFn, ElapsedFn, TTime> Dht11<TPin, TimeFn, ElapsedFn, TTime>
where
    TPin: InputPin<Error = TError> + OutputPin<Error = TError>,
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    /// Constructs a DHT sensor that reads from the given pin, and releases the line high.
    ///
    /// Reads can sometimes be more reliable with a longer delay, eg. 2 seconds, so consider
    /// setting the `options` value with a longer minimum read interval if error rates are
    /// high. If options is `None`, then [`DEFAULT_OPTIONS`] is used.
    ///
    /// Setting [`Options::max_attempts`] to a value greater than 1 will enable [`Dht11::read`]
    /// to seamlessly retry [`Error::BadData`] errors. Note that any [`Error::NoResponse`]
    /// errors will be returned immediately. Keep in mind that the minimum read interval must
    /// pass between each attempt, so each attempt adds significantly to the duration of a read.
    ///
    /// The provided `time_fn` closure should provide some representation of a given instant that
    /// can be used with `elapsed_since_fn` to determine how much time has passed since then. It
    /// does not need to reflect real dates and times, but only needs to be capable of providing
    /// reasonably accurate durations (i.e. with millisecond precision or better).
    pub fn new(
        mut pin: TPin,
        time_fn: TimeFn,
        elapsed_since_fn: ElapsedFn,
        options: Option<Options>,
    ) -> Result<Dht11<TPin, TimeFn, ElapsedFn, TTime>, Error<TError>> {
        pin.set_high()?;
        Ok(Dht11 {
            pin,
            last_read_time: time_fn(),
            time_fn,
            elapsed_since_fn,
            options: if options.is_none() {
                DEFAULT_OPTIONS
            } else {
                let options = options.unwrap();
                if options.min_read_interval < MIN_READ_INTERVAL || options.max_attempts < 1 {
                    return Err(Error::InvalidArgument);
                }
                options
            },
        })
    }

    /// Reads data from the DHT sensor, enforcing the minimum read interval.
    ///
    /// This will asynchronously sleep using the provided `delay_fn` if `read` is called within
    /// the minimum read interval of this DHT sensor. The provided function needs to be capable
    /// of millisecond precision or better.
    ///
    /// Due to the tight timing necessary to distinguish bits in the DHT's response, this
    /// performs blocking I/O reads while receiving data. This blocking portion takes about 4ms
    /// (full range: 3200-4800us, depending on the data).
    pub async fn read<DelayFn, EmptyFuture>(
        &mut self,
        delay_fn: DelayFn,
    ) -> Result<Dht11Response, Error<TError>>
    where
        DelayFn: Copy + Fn(Duration) -> EmptyFuture,
        EmptyFuture: core::future::Future<Output = ()>,
    {
        let mut last_result: Option<Result<Dht11Response, Error<TError>>> = None;
        for _ in 0..self.options.max_attempts {
            last_result = Some(self.read_once(delay_fn).await);
            match last_result.as_ref().unwrap() {
                Ok(_) => return last_result.unwrap(),
                Err(Error::NoResponse) => return last_result.unwrap(),
                _ => {}
            };
        }
        if let Some(final_result) = last_result {
            return final_result;
        }
        panic!("DHT had no response after all attempts. This should not be possible.");
    }

    async fn read_once<DelayFn, EmptyFuture>(
        &mut self,
        delay_fn: DelayFn,
    ) -> Result<Dht11Response, Error<TError>>
    where
        DelayFn: Fn(Duration) -> EmptyFuture,
        EmptyFuture: core::future::Future<Output = ()>,
    {
        let elapsed_since_last_read = (self.elapsed_since_fn)(self.last_read_time);
        if elapsed_since_last_read < self.options.min_read_interval {
            let to_wait = self.options.min_read_interval - elapsed_since_last_read;
            delay_fn(to_wait).await;
        }

        self.request_data(delay_fn).await?;
        let bytes = self.receive_data()?;
        let result = Dht11Response::from_raw_bytes(bytes);
        if !result.is_valid() {
            return Err(Error::BadData);
        }
        Ok(result)
    }

    async fn request_data<DelayFn, EmptyFuture>(
        &mut self,
        delay_fn: DelayFn,
    ) -> Result<(), Error<TError>>
    where
        DelayFn: Fn(Duration) -> EmptyFuture,
        EmptyFuture: core::future::Future<Output = ()>,
    {
        self.pin.set_low().map_err(Error::Wrapped)?;
        delay_fn(PING_DURATION).await;
        // Release the line so the sensor can drive it.
        self.pin.set_high().map_err(Error::Wrapped)?;
        Ok(())
    }

    fn receive_data(&mut self) -> Result<[u8; 4], Error<TError>> {
        let mut bit_ticks = [0u32; 40];

        // Block for the ACK, and use this to estimate a tick budget per bit.
        let ack_counter = match read_ack(&mut self.pin, &self.time_fn, &self.elapsed_since_fn) {
            Err(err) => {
                self.finish_read()?;
                return Err(err);
            }
            Ok(count) => count,
        };
        let bit_timeout = ack_counter << 2;

        for i in 0..40 {
            bit_ticks[i] = match read_bit_with_timeout(&mut self.pin, bit_timeout) {
                Err(err) => {
                    self.finish_read()?;
                    return Err(err);
                }
                Ok(count) => count,
            };
        }
        let end_ticks = match read_end_with_timeout(&mut self.pin, bit_timeout) {
            Err(err) => {
                self.finish_read()?;
                return Err(err);
            }
            Ok(count) => count,
        };

        self.finish_read()?;

        let threshold = determine_tick_threshold(&bit_ticks);
        let high_humidity = parse_byte(&bit_ticks[0..8], threshold);
        let low_humidity = parse_byte(&bit_ticks[8..16], threshold);
        let high_temp = parse_byte(&bit_ticks[16..24], threshold);
        let low_temp = parse_byte(&bit_ticks[24..32], threshold);
        let parity = parse_byte(&bit_ticks[32..40], threshold);

        let sum: u16 =
            high_humidity as u16 + low_humidity as u16 + high_temp as u16 + low_temp as u16;
        // The last 8 bits should match the parity byte.
        let expected_parity = sum.to_be_bytes()[1];

        let end_bit = if end_ticks > threshold { 1 } else { 0 };
        if parity != expected_parity || end_bit == 1 {
            return Err(Error::BadData);
        }

        Ok([high_humidity, low_humidity, high_temp, low_temp])
    }

    fn finish_read(&mut self) -> Result<(), Error<TError>> {
        self.pin.set_high().map_err(Error::Wrapped)?;
        self.last_read_time = (self.time_fn)();
        Ok(())
    }
}

#[inline]
fn read_bit_with_timeout<TInput, TError>(
    input_pin: &mut TInput,
    timeout: u32,
) -> Result<u32, Error<TError>>
where
    TInput: InputPin<Error = TError>,
{
    let mut counter = 0u32;
    while input_pin.is_low().map_err(Error::Wrapped)? {
        counter += 1;
        if counter > timeout {
            return Err(Error::BadData);
        }
    }
    while input_pin.is_high().map_err(Error::Wrapped)? {
        counter += 1;
        if counter > timeout {
            return Err(Error::BadData);
        }
    }
    Ok(counter)
}

#[inline]
fn read_end_with_timeout<TInput, TError>(
    input_pin: &mut TInput,
    timeout: u32,
) -> Result<u32, Error<TError>>
where
    TInput: InputPin<Error = TError>,
{
    let mut counter = 0u32;
    while input_pin.is_low().map_err(Error::Wrapped)? {
        counter += 1;
        if counter > timeout {
            return Err(Error::BadData);
        }
    }
    Ok(counter)
}

#[inline]
fn read_ack<TInput, TError, TimeFn, ElapsedFn, TTime>(
    input_pin: &mut TInput,
    time_fn: TimeFn,
    elapsed_since_fn: ElapsedFn,
) -> Result<u32, Error<TError>>
where
    TInput: InputPin<Error = TError>,
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    const TIMEOUT: Duration = Duration::from_millis(2);
    const WATCHDOG_COUNTS: u32 = 1000;
    let start_time = time_fn();
    let mut counter: u32 = 0;
    let mut watchdog = |counter: u32| {
        if counter % WATCHDOG_COUNTS == 0 && elapsed_since_fn(start_time) > TIMEOUT {
            return Err(Error::NoResponse);
        }
        Ok(())
    };
    while input_pin.is_high().map_err(Error::Wrapped)? {
        counter += 1;
        watchdog(counter)?;
    }
    while input_pin.is_low().map_err(Error::Wrapped)? {
        counter += 1;
        watchdog(counter)?;
    }
    while input_pin.is_high().map_err(Error::Wrapped)? {
        counter += 1;
        watchdog(counter)?;
    }
    Ok(counter)
}

/// Picks the tick count separating short (zero) bits from long (one) bits.
///
/// The midpoint of the shortest and longest observed bit self-calibrates to however fast the
/// host happens to poll the pin. An all-zeros frame collapses the range to a single point; the
/// midpoint then equals the common tick count and no bit exceeds it.
fn determine_tick_threshold(bit_ticks: &[u32]) -> u32 {
    let mut min = u32::MAX;
    let mut max = 0;
    for ticks in bit_ticks.iter() {
        if *ticks < min {
            min = *ticks;
        }
        if *ticks > max {
            max = *ticks;
        }
    }
    min + (max - min) / 2
}

fn parse_byte(bit_ticks: &[u32], threshold: u32) -> u8 {
    let mut byte = 0u8;
    for i in 0..8 {
        if bit_ticks[i] > threshold {
            byte |= 1 << (7 - i);
        }
    }
    byte
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_is_valid {
        ($name:ident, $bytes:expr, $is_valid:expr) => {
            #[test]
            fn $name() {
                let response = Dht11Response::from_raw_bytes($bytes);
                assert_eq!(response.is_valid(), $is_valid);
            }
        };
    }

    test_is_valid!(is_valid_upper_bound, [100, 0, 75, 0], true);
    test_is_valid!(is_valid_decimal_upper_bound, [99, 9, 74, 9], true);
    test_is_valid!(is_valid_lower_bound, [0, 0, 0, 0], true);
    test_is_valid!(is_valid_humidity_too_high, [101, 0, 0, 0], false);
    test_is_valid!(is_valid_humidity_decimal_too_high, [100, 1, 0, 0], false);
    test_is_valid!(is_valid_humidity_decimal_beyond_9, [50, 10, 0, 0], false);
    test_is_valid!(is_valid_temperature_too_high, [0, 0, 76, 0], false);
    test_is_valid!(is_valid_temperature_decimal_too_high, [0, 0, 75, 1], false);
    test_is_valid!(is_valid_temperature_decimal_beyond_9, [0, 0, 20, 10], false);

    #[test]
    fn get_humidity() {
        let response = Dht11Response::from_raw_bytes([71, 2, 0, 0]);
        assert_eq!(response.get_humidity(), 71.2);
    }

    #[test]
    fn get_temperature() {
        let response = Dht11Response::from_raw_bytes([0, 0, 60, 3]);
        assert_eq!(response.get_temperature(), 60.3);
    }

    #[test]
    fn threshold_splits_distinct_tick_counts() {
        let mut ticks = [4u32; 40];
        ticks[3] = 8;
        ticks[7] = 9;
        let threshold = determine_tick_threshold(&ticks);
        assert_eq!(parse_byte(&ticks[0..8], threshold), 0b0001_0001);
    }

    #[test]
    fn threshold_of_uniform_ticks_reads_zeros() {
        let ticks = [5u32; 40];
        let threshold = determine_tick_threshold(&ticks);
        assert_eq!(parse_byte(&ticks[0..8], threshold), 0);
    }
}
