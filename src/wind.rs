/// One calibration point of the anemometer's analog front end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalePoint {
    /// Front-end output voltage in volts.
    pub volts: f32,
    /// Wind speed in meters per second.
    pub speed: f32,
}

/// Linear voltage-to-speed scale between two calibration points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindScale {
    pub min: ScalePoint,
    pub max: ScalePoint,
}

/// The factory calibration of the reference anemometer.
pub const DEFAULT_SCALE: WindScale = WindScale {
    min: ScalePoint {
        volts: 0.12,
        speed: 2.5,
    },
    max: ScalePoint {
        volts: 0.62,
        speed: 10.3,
    },
};

/// A wind-speed estimate derived from a voltage reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindReading {
    /// Estimated wind speed in meters per second.
    pub speed: f32,
    /// True when the voltage fell outside the calibrated span. The speed is still the linear
    /// extrapolation, but should be treated as unreliable.
    pub out_of_scale: bool,
}

impl WindScale {
    /// Converts a front-end voltage into a wind-speed estimate.
    pub fn speed_from_voltage(&self, volts: f32) -> WindReading {
        let out_of_scale = !(self.min.volts <= volts && volts <= self.max.volts);
        let slope = (self.max.speed - self.min.speed) / (self.max.volts - self.min.volts);
        WindReading {
            speed: self.min.speed + slope * (volts - self.min.volts),
            out_of_scale,
        }
    }
}
