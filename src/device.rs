//! High-level driver API for the QMC5883
//!
//! This module provides the configuration engine and the sampling pipeline:
//! identity unlock and bring-up, typed read-modify-write access to the four
//! configuration fields, burst-averaged reads and range normalization backed
//! by the running min/max tracker.

use crate::calibration::{BURST_LEN, Burst, CalibrationTracker, NORMALIZED_MAX, NORMALIZED_MIN};
use crate::config::{BurstAverage, DataRate, DeviceConfig, Mode, Range, Samples};
use crate::registers::{self, RegisterDevice};
use crate::{CONTROL_1_BRING_UP, Error, IDENTITY_SEQUENCE};

// Only import RegisterInterface when not using async feature
#[cfg(not(feature = "async"))]
use device_driver::RegisterInterface;

#[cfg(feature = "async")]
use device_driver::AsyncRegisterInterface;

/// Three-axis sample
///
/// Holds raw counts from [`Qmc5883Driver::read_raw`] or normalized units from
/// [`Qmc5883Driver::read_normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector3 {
    /// X-axis value
    pub x: f32,
    /// Y-axis value
    pub y: f32,
    /// Z-axis value
    pub z: f32,
}

impl Vector3 {
    fn from_raw(x: i16, y: i16, z: i16) -> Self {
        Self {
            x: f32::from(x),
            y: f32::from(y),
            z: f32::from(z),
        }
    }

    fn scaled(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }
}

/// Decoded STATUS register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataStatus {
    /// A new measurement is available
    pub data_ready: bool,
    /// At least one axis exceeded the selected range
    pub overflow: bool,
    /// A measurement was dropped because the outputs were not read in time
    pub data_skipped: bool,
}

/// Main driver for the QMC5883
pub struct Qmc5883Driver<I> {
    device: RegisterDevice<I>,
    // Range last written; the scale factor is derived from it
    range: Range,
    burst_average: BurstAverage,
    calibration: CalibrationTracker,
}

impl<I> Qmc5883Driver<I> {
    /// Create a new QMC5883 driver instance
    ///
    /// No bus traffic happens here. Call `initialize()` before sampling.
    pub fn new(interface: I) -> Self {
        Self {
            device: RegisterDevice::new(interface),
            // CONTROL_2 resets to zero, which decodes as ±2 gauss
            range: Range::Ga2,
            burst_average: BurstAverage::default(),
            calibration: CalibrationTracker::new(),
        }
    }

    /// Scale factor (milligauss per count) for the range last written
    #[must_use]
    pub const fn mg_per_digit(&self) -> f32 {
        self.range.mg_per_digit()
    }

    /// Divisor policy used when averaging a sampling burst
    #[must_use]
    pub const fn burst_average(&self) -> BurstAverage {
        self.burst_average
    }

    /// Select the divisor policy used when averaging a sampling burst
    pub fn set_burst_average(&mut self, policy: BurstAverage) {
        self.burst_average = policy;
    }

    /// Running min/max calibration state
    #[must_use]
    pub const fn calibration(&self) -> &CalibrationTracker {
        &self.calibration
    }

    /// Drop the tracked bounds; the next sampling call seeds them again
    pub fn reset_calibration(&mut self) {
        self.calibration.reset();
    }

    /// Consume the driver and return the interface
    pub fn release(self) -> I {
        self.device.interface
    }

    fn seed_calibration(&mut self, average: &Vector3) {
        if self.calibration.seed_if_unseeded(average) {
            #[cfg(feature = "defmt")]
            defmt::debug!("QMC5883 calibration seeded from {}", average);
        }
    }

    fn finish_raw(&mut self, burst: &Burst) -> Vector3 {
        let average = burst.average(self.burst_average);
        self.seed_calibration(&average);
        average
    }

    fn finish_normalized(&mut self, burst: &Burst) -> Vector3 {
        let average = burst.average(self.burst_average);
        self.seed_calibration(&average);
        self.calibration.expand(&average);

        // Seeded above, so the tracker always has bounds here
        self.calibration
            .normalize(&average, NORMALIZED_MIN, NORMALIZED_MAX)
            .unwrap_or_default()
    }
}

fn decode<T: TryFrom<u8, Error = u8>, E>(code: u8) -> Result<T, Error<E>> {
    T::try_from(code).map_err(Error::InvalidEnumValue)
}

#[cfg(not(feature = "async"))]
impl<I> Qmc5883Driver<I>
where
    I: RegisterInterface<AddressType = u8>,
{
    /// Unlock, verify and configure the device
    ///
    /// Writes the identity unlock sequence and the CONTROL_1 bring-up value,
    /// then reads every identity register back. On success the default
    /// [`DeviceConfig`] is applied and calibration is reset to unseeded.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - An identity register reads back a different value than was written.
    ///   No configuration is applied in that case.
    pub fn initialize(&mut self) -> Result<(), Error<I::Error>> {
        for (register, value) in IDENTITY_SEQUENCE {
            self.write_byte(register, value)?;
        }
        self.write_byte(registers::CONTROL_1, CONTROL_1_BRING_UP)?;

        for (register, expected) in IDENTITY_SEQUENCE {
            let value = self.read_byte(register)?;
            if value != expected {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "QMC5883 identity mismatch at {=u8:#x}: read {=u8:#x}, expected {=u8:#x}",
                    register,
                    value,
                    expected
                );
                return Err(Error::InvalidIdentity { register, value });
            }
        }

        self.configure(DeviceConfig::default())?;
        self.calibration.reset();

        #[cfg(feature = "defmt")]
        defmt::debug!("QMC5883 initialized");

        Ok(())
    }

    /// Apply all four configuration fields
    ///
    /// Fields are written in the order range, mode, data rate, samples.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn configure(&mut self, config: DeviceConfig) -> Result<(), Error<I::Error>> {
        self.set_range(config.range)?;
        self.set_measurement_mode(config.mode)?;
        self.set_data_rate(config.data_rate)?;
        self.set_samples(config.samples)
    }

    /// Read all four configuration fields back from the device
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails or a field
    /// holds an undefined code.
    pub fn config(&mut self) -> Result<DeviceConfig, Error<I::Error>> {
        Ok(DeviceConfig {
            range: self.range()?,
            mode: self.measurement_mode()?,
            data_rate: self.data_rate()?,
            samples: self.samples()?,
        })
    }

    /// Set the full-scale range and the matching scale factor
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails. The cached
    /// scale factor is left untouched in that case.
    pub fn set_range(&mut self, range: Range) -> Result<(), Error<I::Error>> {
        self.device.control_2().modify(|w| {
            w.set_rng(range as u8);
        })?;
        self.range = range;
        Ok(())
    }

    /// Read the full-scale range
    ///
    /// The whole upper nibble of CONTROL_2 is decoded, so stray bits above
    /// the range field are reported rather than masked away.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails or the nibble
    /// holds an undefined code.
    pub fn range(&mut self) -> Result<Range, Error<I::Error>> {
        let reg = self.device.control_2().read()?;
        decode(reg.rng() | (reg.reserved_7_6() << 2))
    }

    /// Set the measurement mode
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_measurement_mode(&mut self, mode: Mode) -> Result<(), Error<I::Error>> {
        self.device.control_1().modify(|w| {
            w.set_mode(mode as u8);
        })?;
        Ok(())
    }

    /// Read the measurement mode
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails or the field
    /// holds an undefined code.
    pub fn measurement_mode(&mut self) -> Result<Mode, Error<I::Error>> {
        let reg = self.device.control_1().read()?;
        decode(reg.mode())
    }

    /// Set the output data rate
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_data_rate(&mut self, rate: DataRate) -> Result<(), Error<I::Error>> {
        self.device.control_1().modify(|w| {
            w.set_odr(rate as u8);
        })?;
        Ok(())
    }

    /// Read the output data rate
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn data_rate(&mut self) -> Result<DataRate, Error<I::Error>> {
        let reg = self.device.control_1().read()?;
        decode(reg.odr())
    }

    /// Set the oversampling ratio
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_samples(&mut self, samples: Samples) -> Result<(), Error<I::Error>> {
        self.device.control_1().modify(|w| {
            w.set_osr(samples as u8);
        })?;
        Ok(())
    }

    /// Read the oversampling ratio
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn samples(&mut self) -> Result<Samples, Error<I::Error>> {
        let reg = self.device.control_1().read()?;
        decode(reg.osr())
    }

    /// Read the STATUS register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_status(&mut self) -> Result<DataStatus, Error<I::Error>> {
        let reg = self.device.status().read()?;
        Ok(DataStatus {
            data_ready: reg.drdy(),
            overflow: reg.ovl(),
            data_skipped: reg.dor(),
        })
    }

    /// Read a burst-averaged sample in raw counts
    ///
    /// Every individual read widens the calibration bounds. The first call
    /// after initialization seeds the bounds from the averaged result.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails. A partial
    /// burst is discarded.
    pub fn read_raw(&mut self) -> Result<Vector3, Error<I::Error>> {
        let mut burst = Burst::default();
        for _ in 0..BURST_LEN {
            let sample = self.read_axes()?;
            self.calibration.expand(&sample);
            burst.add(&sample);
        }
        Ok(self.finish_raw(&burst))
    }

    /// Read a burst-averaged sample normalized to `[-360, 360]` per axis
    ///
    /// Reads are scaled by [`mg_per_digit`](Self::mg_per_digit) before
    /// averaging. The averaged vector widens the calibration bounds and is
    /// then mapped from the tracked bounds. An axis whose bounds have zero
    /// width normalizes to `0.0`.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_normalize(&mut self) -> Result<Vector3, Error<I::Error>> {
        let scale = self.mg_per_digit();
        let mut burst = Burst::default();
        for _ in 0..BURST_LEN {
            let sample = self.read_axes()?.scaled(scale);
            burst.add(&sample);
        }
        Ok(self.finish_normalized(&burst))
    }

    fn read_axes(&mut self) -> Result<Vector3, Error<I::Error>> {
        let x = self.read_axis(registers::OUT_X_M)?;
        let y = self.read_axis(registers::OUT_Y_M)?;
        let z = self.read_axis(registers::OUT_Z_M)?;
        Ok(Vector3::from_raw(x, y, z))
    }

    fn read_axis(&mut self, register: u8) -> Result<i16, Error<I::Error>> {
        let mut buffer = [0u8; 2];
        self.device
            .interface
            .read_register(register, 16, &mut buffer)?;
        Ok(i16::from_be_bytes(buffer))
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, Error<I::Error>> {
        let mut buffer = [0u8; 1];
        self.device
            .interface
            .read_register(register, 8, &mut buffer)?;
        Ok(buffer[0])
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Error<I::Error>> {
        self.device
            .interface
            .write_register(register, 8, &[value])?;
        Ok(())
    }
}

#[cfg(feature = "async")]
impl<I> Qmc5883Driver<I>
where
    I: AsyncRegisterInterface<AddressType = u8>,
{
    /// Unlock, verify and configure the device
    ///
    /// See the blocking variant for the full sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails or an identity
    /// register reads back a different value than was written.
    pub async fn initialize(&mut self) -> Result<(), Error<I::Error>> {
        for (register, value) in IDENTITY_SEQUENCE {
            self.write_byte(register, value).await?;
        }
        self.write_byte(registers::CONTROL_1, CONTROL_1_BRING_UP)
            .await?;

        for (register, expected) in IDENTITY_SEQUENCE {
            let value = self.read_byte(register).await?;
            if value != expected {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "QMC5883 identity mismatch at {=u8:#x}: read {=u8:#x}, expected {=u8:#x}",
                    register,
                    value,
                    expected
                );
                return Err(Error::InvalidIdentity { register, value });
            }
        }

        self.configure(DeviceConfig::default()).await?;
        self.calibration.reset();

        #[cfg(feature = "defmt")]
        defmt::debug!("QMC5883 initialized");

        Ok(())
    }

    /// Apply all four configuration fields
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn configure(&mut self, config: DeviceConfig) -> Result<(), Error<I::Error>> {
        self.set_range(config.range).await?;
        self.set_measurement_mode(config.mode).await?;
        self.set_data_rate(config.data_rate).await?;
        self.set_samples(config.samples).await
    }

    /// Read all four configuration fields back from the device
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails or a field
    /// holds an undefined code.
    pub async fn config(&mut self) -> Result<DeviceConfig, Error<I::Error>> {
        Ok(DeviceConfig {
            range: self.range().await?,
            mode: self.measurement_mode().await?,
            data_rate: self.data_rate().await?,
            samples: self.samples().await?,
        })
    }

    /// Set the full-scale range and the matching scale factor
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn set_range(&mut self, range: Range) -> Result<(), Error<I::Error>> {
        self.device
            .control_2()
            .modify_async(|w| {
                w.set_rng(range as u8);
            })
            .await?;
        self.range = range;
        Ok(())
    }

    /// Read the full-scale range
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails or the nibble
    /// holds an undefined code.
    pub async fn range(&mut self) -> Result<Range, Error<I::Error>> {
        let reg = self.device.control_2().read_async().await?;
        decode(reg.rng() | (reg.reserved_7_6() << 2))
    }

    /// Set the measurement mode
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn set_measurement_mode(&mut self, mode: Mode) -> Result<(), Error<I::Error>> {
        self.device
            .control_1()
            .modify_async(|w| {
                w.set_mode(mode as u8);
            })
            .await?;
        Ok(())
    }

    /// Read the measurement mode
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails or the field
    /// holds an undefined code.
    pub async fn measurement_mode(&mut self) -> Result<Mode, Error<I::Error>> {
        let reg = self.device.control_1().read_async().await?;
        decode(reg.mode())
    }

    /// Set the output data rate
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn set_data_rate(&mut self, rate: DataRate) -> Result<(), Error<I::Error>> {
        self.device
            .control_1()
            .modify_async(|w| {
                w.set_odr(rate as u8);
            })
            .await?;
        Ok(())
    }

    /// Read the output data rate
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn data_rate(&mut self) -> Result<DataRate, Error<I::Error>> {
        let reg = self.device.control_1().read_async().await?;
        decode(reg.odr())
    }

    /// Set the oversampling ratio
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn set_samples(&mut self, samples: Samples) -> Result<(), Error<I::Error>> {
        self.device
            .control_1()
            .modify_async(|w| {
                w.set_osr(samples as u8);
            })
            .await?;
        Ok(())
    }

    /// Read the oversampling ratio
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn samples(&mut self) -> Result<Samples, Error<I::Error>> {
        let reg = self.device.control_1().read_async().await?;
        decode(reg.osr())
    }

    /// Read the STATUS register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn read_status(&mut self) -> Result<DataStatus, Error<I::Error>> {
        let reg = self.device.status().read_async().await?;
        Ok(DataStatus {
            data_ready: reg.drdy(),
            overflow: reg.ovl(),
            data_skipped: reg.dor(),
        })
    }

    /// Read a burst-averaged sample in raw counts
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn read_raw(&mut self) -> Result<Vector3, Error<I::Error>> {
        let mut burst = Burst::default();
        for _ in 0..BURST_LEN {
            let sample = self.read_axes().await?;
            self.calibration.expand(&sample);
            burst.add(&sample);
        }
        Ok(self.finish_raw(&burst))
    }

    /// Read a burst-averaged sample normalized to `[-360, 360]` per axis
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn read_normalize(&mut self) -> Result<Vector3, Error<I::Error>> {
        let scale = self.mg_per_digit();
        let mut burst = Burst::default();
        for _ in 0..BURST_LEN {
            let sample = self.read_axes().await?.scaled(scale);
            burst.add(&sample);
        }
        Ok(self.finish_normalized(&burst))
    }

    async fn read_axes(&mut self) -> Result<Vector3, Error<I::Error>> {
        let x = self.read_axis(registers::OUT_X_M).await?;
        let y = self.read_axis(registers::OUT_Y_M).await?;
        let z = self.read_axis(registers::OUT_Z_M).await?;
        Ok(Vector3::from_raw(x, y, z))
    }

    async fn read_axis(&mut self, register: u8) -> Result<i16, Error<I::Error>> {
        let mut buffer = [0u8; 2];
        self.device
            .interface
            .read_register(register, 16, &mut buffer)
            .await?;
        Ok(i16::from_be_bytes(buffer))
    }

    async fn read_byte(&mut self, register: u8) -> Result<u8, Error<I::Error>> {
        let mut buffer = [0u8; 1];
        self.device
            .interface
            .read_register(register, 8, &mut buffer)
            .await?;
        Ok(buffer[0])
    }

    async fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Error<I::Error>> {
        self.device
            .interface
            .write_register(register, 8, &[value])
            .await?;
        Ok(())
    }
}
