use crate::sampler::{ChannelId, SampleStore};
use embedded_hal::digital::OutputPin;

/// Length of the shared target memory.
pub const BUFFER_LEN: usize = 20;
/// Offset of the status/command byte.
pub const STATUS_OFFSET: usize = 0;
/// Offset of the response payload (two little-endian f32 values).
pub const PAYLOAD_OFFSET: usize = 1;
/// Length of the response payload. Bytes beyond it are reserved.
pub const PAYLOAD_LEN: usize = 8;

/// Status value while a response is being assembled.
pub const STATUS_BUSY: u8 = 0x00;
/// Status value once the payload is complete.
pub const STATUS_READY: u8 = 0xAA;

/// A command byte the controller may write at offset 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// 0x01: report the first single-channel monitor.
    MonitorA,
    /// 0x02: report the second single-channel monitor.
    MonitorB,
    /// 0x03: report channel 1 of the 3-channel monitor.
    Triple1,
    /// 0x04: report channel 2 of the 3-channel monitor.
    Triple2,
    /// 0x05: report channel 3 of the 3-channel monitor.
    Triple3,
    /// 0x07: drive the IR-LED camera relay on. Responds with a dummy (1.0, 0.0) payload.
    RelayOn,
    /// 0x08: drive the IR-LED camera relay off. Responds with a dummy (0.0, 0.0) payload.
    RelayOff,
}

impl Command {
    /// Decodes a command byte. 0x06 is reserved and decodes as unknown.
    pub fn from_byte(byte: u8) -> Option<Command> {
        match byte {
            0x01 => Some(Command::MonitorA),
            0x02 => Some(Command::MonitorB),
            0x03 => Some(Command::Triple1),
            0x04 => Some(Command::Triple2),
            0x05 => Some(Command::Triple3),
            0x07 => Some(Command::RelayOn),
            0x08 => Some(Command::RelayOff),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Command::MonitorA => 0x01,
            Command::MonitorB => 0x02,
            Command::Triple1 => 0x03,
            Command::Triple2 => 0x04,
            Command::Triple3 => 0x05,
            Command::RelayOn => 0x07,
            Command::RelayOff => 0x08,
        }
    }

    /// The cached channel this command reports, if it is a sensor query.
    pub fn channel(self) -> Option<ChannelId> {
        match self {
            Command::MonitorA => Some(ChannelId::MonitorA),
            Command::MonitorB => Some(ChannelId::MonitorB),
            Command::Triple1 => Some(ChannelId::Triple1),
            Command::Triple2 => Some(ChannelId::Triple2),
            Command::Triple3 => Some(ChannelId::Triple3),
            _ => None,
        }
    }
}

/// How to answer a command byte that decodes to nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnknownCommandPolicy {
    /// Flip the status to READY without touching the payload, so the controller reads back
    /// whatever response was left there. This is what the reference node does.
    AckStale,
    /// Leave the status at BUSY as an explicit rejection the controller can time out on.
    RejectBusy,
}

/// What a [`Responder::poll`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The buffer was unchanged since the last poll.
    Idle,
    /// A command was consumed and answered.
    Serviced(Command),
    /// The changed buffer held an unrecognized command byte.
    UnknownCommand(u8),
}

#[derive(Debug, PartialEq)]
pub enum Error<TIoError> {
    /// The relay output could not be driven. The response payload and READY status were still
    /// written, so the controller never hangs on this.
    Relay(TIoError),
}

/// Single-command-at-a-time dispatcher over the shared target memory.
///
/// The controller writes a command byte at offset 0 and polls it until it reads
/// [`STATUS_READY`]; the payload then sits at offset 1. There is exactly one producer on each
/// side, and the status byte is the only synchronization between them, so the dispatcher only
/// mutates payload bytes while the status reads BUSY and flips it to READY strictly after the
/// payload write completes.
///
/// A consumed command is never replayed: the buffer is snapshotted after every serviced
/// request and compared byte-wise on the next poll.
#[derive(Debug)]
pub struct Responder<TRelay> {
    relay: TRelay,
    policy: UnknownCommandPolicy,
    last_seen: [u8; BUFFER_LEN],
}

impl<TRelay, TIoError> Responder<TRelay>
where
    TRelay: OutputPin<Error = TIoError>,
    TIoError: core::fmt::Debug,
{
    /// Constructs a responder with the [`UnknownCommandPolicy::AckStale`] reference behavior.
    pub fn new(relay: TRelay) -> Responder<TRelay> {
        Self::with_policy(relay, UnknownCommandPolicy::AckStale)
    }

    pub fn with_policy(relay: TRelay, policy: UnknownCommandPolicy) -> Responder<TRelay> {
        Responder {
            relay,
            policy,
            last_seen: [0u8; BUFFER_LEN],
        }
    }

    /// Services at most one command written into the shared memory since the last poll.
    ///
    /// The status byte always reaches READY for a recognized command, even when the relay
    /// output fails; the failure is reported to the caller instead of stalling the controller.
    pub fn poll(
        &mut self,
        mem: &mut [u8; BUFFER_LEN],
        store: &SampleStore,
    ) -> Result<Outcome, Error<TIoError>> {
        if *mem == self.last_seen {
            return Ok(Outcome::Idle);
        }

        let code = mem[STATUS_OFFSET];
        // Consuming the command byte doubles as the BUSY marker, and blanks the command so
        // change detection cannot replay it.
        mem[STATUS_OFFSET] = STATUS_BUSY;

        let mut relay_result = Ok(());
        let outcome = match Command::from_byte(code) {
            Some(command) => {
                if let Some(channel) = command.channel() {
                    let record = store.get(channel);
                    write_payload(mem, record.voltage, record.current);
                    log::debug!(
                        "command {:#04x}: replying {:?} = ({}, {})",
                        code,
                        channel,
                        record.voltage,
                        record.current
                    );
                } else if command == Command::RelayOn {
                    relay_result = self.relay.set_high();
                    write_payload(mem, 1.0, 0.0);
                } else {
                    relay_result = self.relay.set_low();
                    write_payload(mem, 0.0, 0.0);
                }
                mem[STATUS_OFFSET] = STATUS_READY;
                Outcome::Serviced(command)
            }
            None => {
                log::warn!("unknown command byte {:#04x}", code);
                if self.policy == UnknownCommandPolicy::AckStale {
                    mem[STATUS_OFFSET] = STATUS_READY;
                }
                Outcome::UnknownCommand(code)
            }
        };

        self.last_seen = *mem;

        if let Err(error) = relay_result {
            log::warn!("relay output failed: {:?}", error);
            return Err(Error::Relay(error));
        }
        Ok(outcome)
    }
}

/// Serializes a response payload as two little-endian f32 values at [`PAYLOAD_OFFSET`].
pub fn write_payload(mem: &mut [u8; BUFFER_LEN], value1: f32, value2: f32) {
    mem[PAYLOAD_OFFSET..PAYLOAD_OFFSET + 4].copy_from_slice(&value1.to_le_bytes());
    mem[PAYLOAD_OFFSET + 4..PAYLOAD_OFFSET + 8].copy_from_slice(&value2.to_le_bytes());
}

/// Deserializes the response payload written by [`write_payload`].
pub fn read_payload(mem: &[u8; BUFFER_LEN]) -> (f32, f32) {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&mem[PAYLOAD_OFFSET..PAYLOAD_OFFSET + 4]);
    let value1 = f32::from_le_bytes(bytes);
    bytes.copy_from_slice(&mem[PAYLOAD_OFFSET + 4..PAYLOAD_OFFSET + 8]);
    let value2 = f32::from_le_bytes(bytes);
    (value1, value2)
}
