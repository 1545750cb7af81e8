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

//! I2C port expander test.
//!
//! Drives all eight ports of a PCF8574 (or PCF8574A) I/O expander high and
//! low ten times, half a second apart. Writing a single byte to the
//! expander sets the quasi-bidirectional ports to the byte's bit pattern, so
//! no register address is involved.
//!
//! ## I2C buses
//!
//! I2C1 is available on all Raspberry Pi models with a 40-pin header, and
//! is enabled through `sudo raspi-config` or by adding `dtparam=i2c_arm=on`
//! to `/boot/config.txt`. SDA is BCM GPIO 2 (physical pin 3), SCL is BCM
//! GPIO 3 (physical pin 5).
//!
//! The default address `0x38` matches a PCF8574A with A0-A2 tied low.

use std::fmt;
use std::io;
use std::io::Write;
use std::result;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c as I2cHal;
use rppal::i2c::I2c;
use thiserror::Error;

use crate::config::Config;
use crate::hal::Delay;
use crate::signal::StopFlag;

pub mod hal;

pub use self::hal::HalI2c;

/// Default I2C bus.
pub const DEFAULT_BUS: u8 = 1;
/// Number of high/low cycles.
pub const TOGGLE_CYCLES: u32 = 10;
/// Time the ports stay high, and low, during a cycle.
pub const TOGGLE_INTERVAL_MS: u32 = 500;

/// Errors that can occur when running the I2C test.
#[derive(Debug, Error)]
pub enum Error {
    /// The I2C bus couldn't be opened.
    #[error("Unable to open I2C device! {0}")]
    I2c(#[from] rppal::i2c::Error),
    /// The address doesn't fit in 7 bits.
    #[error("Unable to open I2C device! Invalid 7-bit address: {0:#04x}")]
    Address(u16),
    /// A write to the expander failed.
    #[error("Unable to write to I2C device! {0}")]
    Bus(String),
    /// I/O error while writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type returned from methods that can have `i2c::Error`s.
pub type Result<T> = result::Result<T, Error>;

fn bus_error<E: fmt::Debug>(err: E) -> Error {
    Error::Bus(format!("{:?}", err))
}

/// Converts `address` to a 7-bit I2C address.
pub fn seven_bit_address(address: u16) -> Result<u8> {
    match u8::try_from(address) {
        Ok(address) if address <= 0x7F => Ok(address),
        _ => Err(Error::Address(address)),
    }
}

/// Drives every port of the expander at `address` high and low `cycles`
/// times, `interval_ms` milliseconds apart.
pub fn toggle_ports<I, D>(
    i2c: &mut I,
    address: u8,
    delay: &mut D,
    cycles: u32,
    interval_ms: u32,
    out: &mut dyn Write,
    stop: &StopFlag,
) -> Result<()>
where
    I: I2cHal,
    D: DelayNs,
{
    for _ in 0..cycles {
        if stop.is_raised() {
            break;
        }

        i2c.write(address, &[0xFF]).map_err(bus_error)?;
        writeln!(out, "PORTS HIGH")?;
        delay.delay_ms(interval_ms);

        i2c.write(address, &[0x00]).map_err(bus_error)?;
        writeln!(out, "PORTS LOW")?;
        delay.delay_ms(interval_ms);
    }

    Ok(())
}

/// Runs the expander test on the I2C bus and address from `config`.
pub fn run_expander(config: &Config, out: &mut dyn Write, stop: &StopFlag) -> Result<()> {
    let address = seven_bit_address(config.i2c_address)?;
    let mut i2c = HalI2c::new(I2c::with_bus(config.i2c_bus)?);

    toggle_ports(
        &mut i2c,
        address,
        &mut Delay::new(),
        TOGGLE_CYCLES,
        TOGGLE_INTERVAL_MS,
        out,
        stop,
    )
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    use super::*;

    #[test]
    fn toggles_all_ports() {
        let expectations = [
            I2cTransaction::write(0x38, vec![0xFF]),
            I2cTransaction::write(0x38, vec![0x00]),
            I2cTransaction::write(0x38, vec![0xFF]),
            I2cTransaction::write(0x38, vec![0x00]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut out = Vec::new();

        toggle_ports(
            &mut i2c,
            0x38,
            &mut NoopDelay::new(),
            2,
            500,
            &mut out,
            &StopFlag::new(),
        )
        .unwrap();

        i2c.done();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "PORTS HIGH\nPORTS LOW\nPORTS HIGH\nPORTS LOW\n"
        );
    }

    #[test]
    fn address_range() {
        assert_eq!(seven_bit_address(0x38).unwrap(), 0x38);
        assert_eq!(seven_bit_address(0x7F).unwrap(), 0x7F);
        assert!(matches!(seven_bit_address(0x80), Err(Error::Address(0x80))));
        assert!(matches!(
            seven_bit_address(0x1234),
            Err(Error::Address(0x1234))
        ));
    }
}
