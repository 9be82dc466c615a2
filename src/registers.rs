//! Register definitions for the QMC5883
//!
//! The QMC5883 has a flat 8-bit register space. Axis data sits at 0x00-0x05,
//! followed by the status register, two control registers and three identity
//! registers that double as the configuration unlock sequence.
//!
//! The status and control registers are described with the `device-driver`
//! DSL so configuration fields are only ever touched through read-modify-write.
//! Axis data and the identity bytes are accessed as raw bytes through the
//! interface.

/// X-axis output, low byte
pub const OUT_X_L: u8 = 0x00;
/// X-axis output, high byte
pub const OUT_X_M: u8 = 0x01;
/// Y-axis output, low byte
pub const OUT_Y_L: u8 = 0x02;
/// Y-axis output, high byte
pub const OUT_Y_M: u8 = 0x03;
/// Z-axis output, low byte
pub const OUT_Z_L: u8 = 0x04;
/// Z-axis output, high byte
pub const OUT_Z_M: u8 = 0x05;
/// Status register
pub const STATUS: u8 = 0x06;
/// Primary control register (mode, data rate, oversampling)
pub const CONTROL_1: u8 = 0x09;
/// Secondary control register (range)
pub const CONTROL_2: u8 = 0x0A;
/// Identity register B
pub const IDENT_B: u8 = 0x0B;
/// Identity register C
pub const IDENT_C: u8 = 0x20;
/// Identity register D
pub const IDENT_D: u8 = 0x21;

device_driver::create_device!(
    device_name: Qmc5883,
    dsl: {
        config {
            type RegisterAddressType = u8;
            type DefaultByteOrder = BE;
        }

        /// STATUS - Data status (0x06)
        register Status {
            const ADDRESS = 0x06;
            const SIZE_BITS = 8;

            /// New data is ready
            drdy: bool = 0,
            /// A measurement exceeded the selected range
            ovl: bool = 1,
            /// Data was skipped because the output registers were not read in time
            dor: bool = 2,
            reserved_7_3: uint = 3..8,
        },

        /// CONTROL_1 - Primary control (0x09)
        register Control1 {
            const ADDRESS = 0x09;
            const SIZE_BITS = 8;

            /// Measurement mode (0=single, 1=continuous)
            mode: uint = 0..2,
            /// Output data rate (0=10Hz, 1=50Hz, 2=100Hz, 3=200Hz)
            odr: uint = 2..4,
            reserved_5_4: uint = 4..6,
            /// Oversampling ratio (0=1, 1=2, 2=4, 3=8 samples)
            osr: uint = 6..8,
        },

        /// CONTROL_2 - Secondary control (0x0A)
        register Control2 {
            const ADDRESS = 0x0A;
            const SIZE_BITS = 8;

            reserved_3_0: uint = 0..4,
            /// Full-scale range (0=±2 gauss, 1=±8 gauss)
            rng: uint = 4..6,
            /// Upper half of the range nibble, zero on a valid part
            reserved_7_6: uint = 6..8,
        }
    }
);

// Re-export commonly used types for convenience
pub use Qmc5883 as RegisterDevice;
