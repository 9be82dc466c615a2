#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod calibration;
pub mod config;
pub mod device;
pub mod interface;
pub mod registers;

// Re-export main types
pub use calibration::{AxisBounds, CalibrationBounds, CalibrationTracker};
pub use config::{BurstAverage, DataRate, DeviceConfig, Mode, Range, Samples};
pub use device::{DataStatus, Qmc5883Driver, Vector3};
pub use interface::I2cInterface;

/// Default QMC5883 I2C address
pub const QMC5883_ADDRESS: u8 = 0x0D;

/// Identity unlock sequence as `(register, value)` pairs
///
/// Written during initialization and read back to verify the device accepted it.
pub const IDENTITY_SEQUENCE: [(u8, u8); 3] = [
    (registers::IDENT_B, 0x01),
    (registers::IDENT_C, 0x40),
    (registers::IDENT_D, 0x01),
];

/// Value written to CONTROL_1 right after the identity sequence
pub const CONTROL_1_BRING_UP: u8 = 0x1D;

/// Driver errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device
    Bus(E),
    /// An identity register did not read back the value written during unlock
    InvalidIdentity {
        /// Identity register address
        register: u8,
        /// Value actually read back
        value: u8,
    },
    /// A configuration field decoded to a code outside its enumeration
    InvalidEnumValue(u8),
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}
