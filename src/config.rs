//! Measurement configuration types
//!
//! Each of the four configuration fields is a 2-bit code in one of the two
//! control registers. The enum discriminants are the register codes, and
//! decoding goes through `TryFrom<u8>`. A rejected conversion hands back the
//! offending code, which the driver reports as
//! [`Error::InvalidEnumValue`](crate::Error::InvalidEnumValue) instead of
//! truncating it.

/// Full-scale measurement range (CONTROL_2 bits 4-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Range {
    /// ±2 gauss
    Ga2 = 0,
    /// ±8 gauss
    Ga8 = 1,
}

impl Range {
    /// Scale factor converting raw counts to milligauss
    #[must_use]
    pub const fn mg_per_digit(self) -> f32 {
        match self {
            Self::Ga2 => 1.22,
            Self::Ga8 => 4.35,
        }
    }
}

impl TryFrom<u8> for Range {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Ga2),
            1 => Ok(Self::Ga8),
            _ => Err(code),
        }
    }
}

/// Measurement mode (CONTROL_1 bits 0-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Single-shot measurement
    Single = 0,
    /// Continuous measurement
    Continuous = 1,
}

impl TryFrom<u8> for Mode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Single),
            1 => Ok(Self::Continuous),
            _ => Err(code),
        }
    }
}

/// Output data rate (CONTROL_1 bits 2-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRate {
    /// 10 Hz
    Hz10 = 0,
    /// 50 Hz
    Hz50 = 1,
    /// 100 Hz
    Hz100 = 2,
    /// 200 Hz
    Hz200 = 3,
}

impl DataRate {
    /// Output data rate in Hz
    #[must_use]
    pub const fn rate_hz(self) -> u16 {
        match self {
            Self::Hz10 => 10,
            Self::Hz50 => 50,
            Self::Hz100 => 100,
            Self::Hz200 => 200,
        }
    }
}

impl TryFrom<u8> for DataRate {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Hz10),
            1 => Ok(Self::Hz50),
            2 => Ok(Self::Hz100),
            3 => Ok(Self::Hz200),
            _ => Err(code),
        }
    }
}

/// Internal oversampling ratio (CONTROL_1 bits 6-7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Samples {
    /// 1 sample per reported value
    One = 0,
    /// 2 samples averaged
    Two = 1,
    /// 4 samples averaged
    Four = 2,
    /// 8 samples averaged
    Eight = 3,
}

impl Samples {
    /// Number of internal measurements averaged per reported value
    #[must_use]
    pub const fn count(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

impl TryFrom<u8> for Samples {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::One),
            1 => Ok(Self::Two),
            2 => Ok(Self::Four),
            3 => Ok(Self::Eight),
            _ => Err(code),
        }
    }
}

/// Complete logical device configuration
///
/// The default is the configuration applied by `initialize()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Full-scale range
    pub range: Range,
    /// Measurement mode
    pub mode: Mode,
    /// Output data rate
    pub data_rate: DataRate,
    /// Oversampling ratio
    pub samples: Samples,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            range: Range::Ga8,
            mode: Mode::Continuous,
            data_rate: DataRate::Hz50,
            samples: Samples::Eight,
        }
    }
}

/// Divisor policy for the ten-read sampling burst
///
/// The legacy firmware divided the ten-sample sum by 9, an artifact of its
/// post-decrement loop exit. `Legacy` keeps that output bit-for-bit; `Exact`
/// divides by the number of samples taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BurstAverage {
    /// Divide by 9
    #[default]
    Legacy,
    /// Divide by 10
    Exact,
}

impl BurstAverage {
    /// Constant divisor applied to each axis sum
    #[must_use]
    pub const fn divisor(self) -> f32 {
        match self {
            Self::Legacy => 9.0,
            Self::Exact => 10.0,
        }
    }
}
