// Copyright (c) 2017-2024 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! 1-Wire temperature sensor test.
//!
//! Reads a DS18B20 ten times, half a second apart, through the Linux `w1`
//! sysfs interface, and prints the temperature with one decimal.
//!
//! The `w1-gpio` kernel module bit-bangs the 1-Wire protocol on BCM GPIO 4
//! (physical pin 7) once `dtoverlay=w1-gpio` is added to `/boot/config.txt`.
//! Every detected device shows up as a directory under
//! `/sys/bus/w1/devices`, named after its 64-bit ROM code.

use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::result;

use embedded_hal::delay::DelayNs;
use log::debug;
use thiserror::Error;

use crate::config::Config;
use crate::hal::Delay;
use crate::signal::StopFlag;

mod sysfs;

pub use self::sysfs::{parse_slave, Reading};

/// Default DS18B20 device ID.
pub const DEFAULT_DEVICE: &str = "28-000000bf4fff";
/// Default sysfs directory containing the 1-Wire devices.
pub const DEFAULT_ROOT: &str = "/sys/bus/w1/devices";
/// Number of temperature reads.
pub const READS: u32 = 10;
/// Time between two temperature reads.
pub const READ_INTERVAL_MS: u32 = 500;

/// Errors that can occur when running the 1-Wire test.
#[derive(Debug, Error)]
pub enum Error {
    /// The device directory doesn't exist.
    #[error("Unable to open 1-WIRE device! {0} not found")]
    NotFound(PathBuf),
    /// The scratchpad failed the driver's CRC check.
    #[error("CRC check failed on 1-WIRE device {0}")]
    Crc(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type returned from methods that can have `onewire::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// A temperature sensor.
pub trait Thermometer {
    /// Returns the current temperature in tenths of a degree Celsius.
    fn read_tenths(&mut self) -> Result<i32>;
}

/// DS18B20 temperature sensor exposed by the `w1_therm` driver.
#[derive(Debug, Clone)]
pub struct Ds18b20 {
    device: PathBuf,
}

impl Ds18b20 {
    /// Opens the sensor in `device`, a directory such as
    /// `/sys/bus/w1/devices/28-000000bf4fff`.
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Ds18b20> {
        let device = device.as_ref().to_path_buf();
        if !sysfs::exists(&device) {
            return Err(Error::NotFound(device));
        }

        Ok(Ds18b20 { device })
    }
}

impl Thermometer for Ds18b20 {
    fn read_tenths(&mut self) -> Result<i32> {
        let reading = sysfs::read_slave(&self.device)?;
        debug!(
            "{}: crc_ok={} t={}",
            self.device.display(),
            reading.crc_ok,
            reading.millidegrees
        );

        if !reading.crc_ok {
            return Err(Error::Crc(self.device.clone()));
        }

        Ok(reading.millidegrees / 100)
    }
}

/// Formats a temperature in tenths of a degree with one decimal.
///
/// `231` becomes `23.1`, `5` becomes `0.5` and `-5` becomes `-0.5`.
pub fn format_tenths(tenths: i32) -> String {
    let sign = if tenths < 0 { "-" } else { "" };
    let magnitude = tenths.unsigned_abs();

    format!("{}{}.{}", sign, magnitude / 10, magnitude % 10)
}

/// Reads `sensor` `reads` times, `interval_ms` milliseconds apart, and
/// prints every temperature.
pub fn report_temperature<T, D>(
    sensor: &mut T,
    delay: &mut D,
    reads: u32,
    interval_ms: u32,
    out: &mut dyn Write,
    stop: &StopFlag,
) -> Result<()>
where
    T: Thermometer,
    D: DelayNs,
{
    for _ in 0..reads {
        if stop.is_raised() {
            break;
        }

        let tenths = sensor.read_tenths()?;
        writeln!(out, "TEMPERATURE: {}C", format_tenths(tenths))?;
        delay.delay_ms(interval_ms);
    }

    Ok(())
}

/// Runs the temperature test on the device from `config`.
pub fn run_temperature(config: &Config, out: &mut dyn Write, stop: &StopFlag) -> Result<()> {
    let mut sensor = Ds18b20::open(config.w1_device_path())?;

    report_temperature(
        &mut sensor,
        &mut Delay::new(),
        READS,
        READ_INTERVAL_MS,
        out,
        stop,
    )
}
