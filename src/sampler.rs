use crate::ina226::Ina226;
use crate::ina3221::{self, Ina3221};
use crate::tca9548a::Tca9548a;
use core::time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// The sampling cadence of the reference node.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// One monitored channel, in command-code order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelId {
    /// First single-channel monitor (behind the multiplexer).
    MonitorA,
    /// Second single-channel monitor (behind the multiplexer).
    MonitorB,
    /// Channel 1 of the 3-channel monitor.
    Triple1,
    /// Channel 2 of the 3-channel monitor.
    Triple2,
    /// Channel 3 of the 3-channel monitor.
    Triple3,
}

/// The number of monitored channels.
pub const CHANNEL_COUNT: usize = 5;

impl ChannelId {
    pub const ALL: [ChannelId; CHANNEL_COUNT] = [
        ChannelId::MonitorA,
        ChannelId::MonitorB,
        ChannelId::Triple1,
        ChannelId::Triple2,
        ChannelId::Triple3,
    ];

    pub fn index(self) -> usize {
        match self {
            ChannelId::MonitorA => 0,
            ChannelId::MonitorB => 1,
            ChannelId::Triple1 => 2,
            ChannelId::Triple2 => 3,
            ChannelId::Triple3 => 4,
        }
    }
}

/// The latest cached reading for one channel. Values carry the unit convention of the driver
/// that produced them: volts for voltage, milliamps for current, rounded to 2 decimals.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SampleRecord {
    pub voltage: f32,
    pub current: f32,
}

/// All cached readings, zero-initialized at startup and mutated in place on every refresh.
#[derive(Debug, Default)]
pub struct SampleStore {
    records: [SampleRecord; CHANNEL_COUNT],
}

impl SampleStore {
    pub fn new() -> SampleStore {
        SampleStore::default()
    }

    pub fn get(&self, channel: ChannelId) -> SampleRecord {
        self.records[channel.index()]
    }

    pub fn set(&mut self, channel: ChannelId, record: SampleRecord) {
        self.records[channel.index()] = record;
    }
}

/// A failed refresh of one channel. The cached record keeps its previous value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadFailure {
    pub channel: ChannelId,
}

/// Per-channel outcome of one [`Sampler::refresh_all`] pass.
#[derive(Clone, Copy, Debug)]
pub struct RefreshReport {
    results: [Result<(), ReadFailure>; CHANNEL_COUNT],
}

impl RefreshReport {
    pub fn result(&self, channel: ChannelId) -> Result<(), ReadFailure> {
        self.results[channel.index()]
    }

    pub fn all_ok(&self) -> bool {
        self.results.iter().all(|result| result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = ReadFailure> + '_ {
        self.results
            .iter()
            .filter_map(|result| result.err())
    }
}

const SETTLE_BEFORE_SELECT: Duration = Duration::from_millis(5);
const SETTLE_AFTER_SELECT: Duration = Duration::from_millis(10);
const SETTLE_BETWEEN_TRIPLE_CHANNELS: Duration = Duration::from_millis(2);

/// Refreshes every [`SampleRecord`] from its sensor.
///
/// The two single-channel monitors sit on separate multiplexer channels and share a bus
/// address; the sampler strictly sequences select-settle-read around each of them so at most
/// one is ever visible. The 3-channel monitor lives on the main bus and needs no select.
///
/// The sampler does not schedule itself. The caller decides the cadence, typically with a
/// [`Cadence`] at [`DEFAULT_SAMPLE_INTERVAL`].
#[derive(Debug)]
pub struct Sampler<TMuxI2c, TMonAI2c, TMonBI2c, TTripleI2c, TDelay> {
    mux: Tca9548a<TMuxI2c>,
    monitor_a: Ina226<TMonAI2c>,
    monitor_a_mux_channel: u8,
    monitor_b: Ina226<TMonBI2c>,
    monitor_b_mux_channel: u8,
    triple: Ina3221<TTripleI2c>,
    delay: TDelay,
}

impl<TMuxI2c, TMonAI2c, TMonBI2c, TTripleI2c, TDelay>
    Sampler<TMuxI2c, TMonAI2c, TMonBI2c, TTripleI2c, TDelay>
where
    TMuxI2c: I2c,
    TMonAI2c: I2c,
    TMonBI2c: I2c,
    TTripleI2c: I2c,
    TDelay: DelayNs,
{
    /// Constructs a sampler over already-initialized drivers.
    ///
    /// `monitor_a_mux_channel` and `monitor_b_mux_channel` name the multiplexer channels the
    /// two single-channel monitors are wired to (2 and 7 on the reference board).
    pub fn new(
        mux: Tca9548a<TMuxI2c>,
        monitor_a: Ina226<TMonAI2c>,
        monitor_a_mux_channel: u8,
        monitor_b: Ina226<TMonBI2c>,
        monitor_b_mux_channel: u8,
        triple: Ina3221<TTripleI2c>,
        delay: TDelay,
    ) -> Sampler<TMuxI2c, TMonAI2c, TMonBI2c, TTripleI2c, TDelay> {
        Sampler {
            mux,
            monitor_a,
            monitor_a_mux_channel,
            monitor_b,
            monitor_b_mux_channel,
            triple,
            delay,
        }
    }

    /// Refreshes all cached records, best effort.
    ///
    /// A channel whose read fails keeps its previous record; the failure is logged and
    /// reported, and the remaining channels are still refreshed.
    pub fn refresh_all(&mut self, store: &mut SampleStore) -> RefreshReport {
        let mut results = [Ok(()); CHANNEL_COUNT];
        results[ChannelId::MonitorA.index()] = self.refresh_monitor_a(store);
        results[ChannelId::MonitorB.index()] = self.refresh_monitor_b(store);
        for (id, channel) in [
            (ChannelId::Triple1, ina3221::Channel::One),
            (ChannelId::Triple2, ina3221::Channel::Two),
            (ChannelId::Triple3, ina3221::Channel::Three),
        ] {
            results[id.index()] = self.refresh_triple_channel(store, id, channel);
        }
        RefreshReport { results }
    }

    fn refresh_monitor_a(&mut self, store: &mut SampleStore) -> Result<(), ReadFailure> {
        let id = ChannelId::MonitorA;
        delay_for(&mut self.delay, SETTLE_BEFORE_SELECT);
        self.mux
            .enable_channel(self.monitor_a_mux_channel)
            .map_err(|error| read_failure(id, "mux select", &error))?;
        delay_for(&mut self.delay, SETTLE_AFTER_SELECT);
        let voltage = self
            .monitor_a
            .bus_voltage()
            .map_err(|error| read_failure(id, "bus voltage", &error))?;
        let current = self
            .monitor_a
            .current()
            .map_err(|error| read_failure(id, "current", &error))?;
        store.set(
            id,
            SampleRecord {
                voltage: round2(voltage),
                current: round2(current),
            },
        );
        Ok(())
    }

    fn refresh_monitor_b(&mut self, store: &mut SampleStore) -> Result<(), ReadFailure> {
        let id = ChannelId::MonitorB;
        self.mux
            .disable_all()
            .map_err(|error| read_failure(id, "mux deselect", &error))?;
        delay_for(&mut self.delay, SETTLE_BEFORE_SELECT);
        self.mux
            .enable_channel(self.monitor_b_mux_channel)
            .map_err(|error| read_failure(id, "mux select", &error))?;
        delay_for(&mut self.delay, SETTLE_AFTER_SELECT);
        let voltage = self
            .monitor_b
            .bus_voltage()
            .map_err(|error| read_failure(id, "bus voltage", &error))?;
        let current = self
            .monitor_b
            .current()
            .map_err(|error| read_failure(id, "current", &error))?;
        store.set(
            id,
            SampleRecord {
                voltage: round2(voltage),
                current: round2(current),
            },
        );
        Ok(())
    }

    fn refresh_triple_channel(
        &mut self,
        store: &mut SampleStore,
        id: ChannelId,
        channel: ina3221::Channel,
    ) -> Result<(), ReadFailure> {
        delay_for(&mut self.delay, SETTLE_BETWEEN_TRIPLE_CHANNELS);
        let voltage = self
            .triple
            .bus_voltage(channel)
            .map_err(|error| read_failure(id, "bus voltage", &error))?;
        let current = self
            .triple
            .current(channel)
            .map_err(|error| read_failure(id, "current", &error))?;
        store.set(
            id,
            SampleRecord {
                voltage: round2(voltage),
                current: round2(current),
            },
        );
        Ok(())
    }
}

fn read_failure<TError: core::fmt::Debug>(
    channel: ChannelId,
    operation: &str,
    error: &TError,
) -> ReadFailure {
    log::warn!("{:?} {} failed: {:?}", channel, operation, error);
    ReadFailure { channel }
}

fn delay_for<TDelay: DelayNs>(delay: &mut TDelay, duration: Duration) {
    delay.delay_ms(duration.as_millis() as u32);
}

/// Rounds to 2 decimals, half away from zero.
pub fn round2(value: f32) -> f32 {
    let scaled = value * 100.0;
    let adjusted = if scaled >= 0.0 {
        scaled + 0.5
    } else {
        scaled - 0.5
    };
    (adjusted as i32) as f32 / 100.0
}

/// Tracks whether a fixed interval has elapsed since the last due tick.
///
/// The provided `time_fn` closure should provide some representation of a given instant that
/// can be used with `elapsed_since_fn` to determine how much time has passed since then, with
/// millisecond precision or better.
#[derive(Debug)]
pub struct Cadence<TimeFn, ElapsedFn, TTime>
where
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    interval: Duration,
    last: TTime,
    time_fn: TimeFn,
    elapsed_since_fn: ElapsedFn,
}

impl<TimeFn, ElapsedFn, TTime> Cadence<TimeFn, ElapsedFn, TTime>
where
    TimeFn: Fn() -> TTime,
    ElapsedFn: Fn(TTime) -> Duration,
    TTime: Copy,
{
    pub fn new(
        interval: Duration,
        time_fn: TimeFn,
        elapsed_since_fn: ElapsedFn,
    ) -> Cadence<TimeFn, ElapsedFn, TTime> {
        Cadence {
            interval,
            last: time_fn(),
            time_fn,
            elapsed_since_fn,
        }
    }

    /// Returns true once per elapsed interval, resetting the reference instant when due.
    pub fn is_due(&mut self) -> bool {
        if (self.elapsed_since_fn)(self.last) >= self.interval {
            self.last = (self.time_fn)();
            return true;
        }
        false
    }
}
