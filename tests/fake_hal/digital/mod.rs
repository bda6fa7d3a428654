use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

#[derive(Debug, PartialEq)]
pub enum Error {}

impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        match *self {}
    }
}

/// A pin that replays a canned sequence of logic levels, one sample per read.
///
/// With no data loaded, or once the data runs out, reads report the `default_data` level
/// forever, which models a line stuck high or low.
#[derive(Debug)]
pub struct Pin {
    data_to_read: Option<Vec<u8>>,
    data_index: usize,
    default_data: bool,
}

impl Pin {
    pub fn new() -> Pin {
        Pin {
            data_to_read: None,
            data_index: 0,
            default_data: false,
        }
    }

    pub fn set_default_data(&mut self, default: bool) {
        self.default_data = default;
        self.data_to_read = None;
        self.data_index = 0;
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data_to_read = Some(data);
        self.data_index = 0;
    }

    fn next_sample(&mut self) -> Option<u8> {
        let sample = *self.data_to_read.as_ref()?.get(self.data_index)?;
        self.data_index += 1;
        Some(sample)
    }
}

impl ErrorType for Pin {
    type Error = Error;
}

impl InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        match self.next_sample() {
            None => Ok(self.default_data),
            Some(sample) => Ok(sample > 0),
        }
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        match self.next_sample() {
            None => Ok(!self.default_data),
            Some(sample) => Ok(sample == 0),
        }
    }
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
