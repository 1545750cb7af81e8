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

//! Command-line configuration.
//!
//! Every option defaults to the wiring the diagnostics were written for, so
//! running `rpdiag` without any arguments reproduces the fixed test setup:
//! LED on BCM GPIO 12, button on BCM GPIO 7, a PCF8574 at `0x38`, a DS18B20
//! with ID `28-000000bf4fff`, SPI0/CE0 and `/dev/ttyS0` in loopback.

use std::path::PathBuf;
use std::result;
use std::time::Duration;

use clap::{ArgAction, Parser};
use rppal::pwm::Channel;
use rppal::spi::{Bus, SlaveSelect};
use thiserror::Error;

use crate::{i2c, onewire, pwm, spi, uart};

/// Longest read timeout termios supports (`VTIME` is in tenths of a second).
pub const MAX_SERIAL_TIMEOUT_MS: u64 = 25_500;
/// Shortest read timeout termios supports. Anything below rounds down to a
/// non-blocking read.
pub const MIN_SERIAL_TIMEOUT_MS: u64 = 100;

/// Errors that can occur when validating the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The SPI bus doesn't exist.
    #[error("Invalid SPI bus: {0}")]
    SpiBus(u8),
    /// The Slave Select pin doesn't exist.
    #[error("Invalid SPI slave select: {0}")]
    SpiSlaveSelect(u8),
    /// The PWM channel doesn't exist.
    #[error("Invalid PWM channel: {0}")]
    PwmChannel(u8),
    /// A payload size of zero.
    #[error("Payload size must be at least 1 byte")]
    EmptyPayload,
    /// An SPI ceiling below the 1 MHz starting point.
    #[error("SPI max speed must be at least 1 MHz")]
    SpiMaxSpeed,
    /// A serial timeout outside of 100..=25500 ms.
    #[error(
        "Serial timeout must be between {min} and {max} ms, got {0}",
        min = MIN_SERIAL_TIMEOUT_MS,
        max = MAX_SERIAL_TIMEOUT_MS
    )]
    SerialTimeout(u64),
}

/// Result type returned from methods that can have `config::Error`s.
pub type Result<T> = result::Result<T, Error>;

// Accept both decimal and 0x-prefixed hexadecimal addresses
fn parse_address(value: &str) -> result::Result<u16, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };

    parsed.map_err(|err| format!("invalid address {:?}: {}", value, err))
}

/// Interactive diagnostics for the Raspberry Pi's peripherals.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "rpdiag", version, about, long_about = None)]
pub struct Config {
    /// BCM GPIO pin of the LED
    #[arg(long, default_value_t = 12)]
    pub led_pin: u8,

    /// BCM GPIO pin of the push button
    #[arg(long, default_value_t = 7)]
    pub button_pin: u8,

    /// Hardware PWM channel (0 or 1)
    #[arg(long, default_value_t = 0)]
    pub pwm_channel: u8,

    /// PWM frequency in Hz
    #[arg(long, default_value_t = pwm::DEFAULT_FREQUENCY)]
    pub pwm_frequency: f64,

    /// SPI bus (0, 1 or 2)
    #[arg(long, default_value_t = 0)]
    pub spi_bus: u8,

    /// SPI Slave Select pin (0, 1 or 2)
    #[arg(long, default_value_t = 0)]
    pub spi_slave_select: u8,

    /// Highest SPI clock speed of the sweep, in MHz
    #[arg(long, default_value_t = spi::MAX_SPEED_MHZ)]
    pub spi_max_speed: u32,

    /// SPI payload size in bytes
    #[arg(long, default_value_t = spi::PAYLOAD_SIZE)]
    pub spi_payload_size: usize,

    /// I2C bus of the port expander
    #[arg(long, default_value_t = i2c::DEFAULT_BUS)]
    pub i2c_bus: u8,

    /// I2C address of the port expander
    #[arg(long, default_value = "0x38", value_parser = parse_address)]
    pub i2c_address: u16,

    /// 1-Wire device ID of the temperature sensor
    #[arg(long, default_value = onewire::DEFAULT_DEVICE)]
    pub w1_device: String,

    /// Root of the 1-Wire sysfs device tree
    #[arg(long, default_value = onewire::DEFAULT_ROOT)]
    pub w1_root: PathBuf,

    /// Serial device in loopback
    #[arg(long, default_value = uart::DEFAULT_PATH)]
    pub serial_path: PathBuf,

    /// Serial payload size in bytes
    #[arg(long, default_value_t = uart::PAYLOAD_SIZE)]
    pub serial_payload_size: usize,

    /// Time to wait for every echoed serial byte, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub serial_timeout_ms: u64,

    /// Seed of the pseudo-random loopback payloads
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Default for Config {
    fn default() -> Config {
        Config::parse_from(["rpdiag"])
    }
}

impl Config {
    /// Checks the options that clap can't check on its own.
    pub fn validate(&self) -> Result<()> {
        self.spi_bus()?;
        self.spi_slave_select()?;
        self.pwm_channel()?;

        if self.spi_payload_size == 0 || self.serial_payload_size == 0 {
            return Err(Error::EmptyPayload);
        }

        if self.spi_max_speed < spi::MIN_SPEED_MHZ {
            return Err(Error::SpiMaxSpeed);
        }

        if !(MIN_SERIAL_TIMEOUT_MS..=MAX_SERIAL_TIMEOUT_MS).contains(&self.serial_timeout_ms) {
            return Err(Error::SerialTimeout(self.serial_timeout_ms));
        }

        Ok(())
    }

    /// Returns the selected SPI bus.
    pub fn spi_bus(&self) -> Result<Bus> {
        match self.spi_bus {
            0 => Ok(Bus::Spi0),
            1 => Ok(Bus::Spi1),
            2 => Ok(Bus::Spi2),
            other => Err(Error::SpiBus(other)),
        }
    }

    /// Returns the selected Slave Select pin.
    pub fn spi_slave_select(&self) -> Result<SlaveSelect> {
        match self.spi_slave_select {
            0 => Ok(SlaveSelect::Ss0),
            1 => Ok(SlaveSelect::Ss1),
            2 => Ok(SlaveSelect::Ss2),
            other => Err(Error::SpiSlaveSelect(other)),
        }
    }

    /// Returns the selected PWM channel.
    pub fn pwm_channel(&self) -> Result<Channel> {
        match self.pwm_channel {
            0 => Ok(Channel::Pwm0),
            1 => Ok(Channel::Pwm1),
            other => Err(Error::PwmChannel(other)),
        }
    }

    /// Returns the serial read timeout.
    pub fn serial_timeout(&self) -> Duration {
        Duration::from_millis(self.serial_timeout_ms)
    }

    /// Returns the path of the temperature sensor's sysfs directory.
    pub fn w1_device_path(&self) -> PathBuf {
        self.w1_root.join(&self.w1_device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_test_setup() {
        let config = Config::default();

        assert_eq!(config.led_pin, 12);
        assert_eq!(config.button_pin, 7);
        assert_eq!(config.spi_max_speed, 512);
        assert_eq!(config.spi_payload_size, 512);
        assert_eq!(config.i2c_address, 0x38);
        assert_eq!(config.serial_path, PathBuf::from("/dev/ttyS0"));
        assert_eq!(config.serial_payload_size, 100);
        assert_eq!(config.seed, 1);
        assert_eq!(
            config.w1_device_path(),
            PathBuf::from("/sys/bus/w1/devices/28-000000bf4fff")
        );
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn hex_and_decimal_addresses() {
        let hex = Config::parse_from(["rpdiag", "--i2c-address", "0x20"]);
        let dec = Config::parse_from(["rpdiag", "--i2c-address", "32"]);

        assert_eq!(hex.i2c_address, 0x20);
        assert_eq!(dec.i2c_address, 0x20);
        assert!(Config::try_parse_from(["rpdiag", "--i2c-address", "0xZZ"]).is_err());
    }

    #[test]
    fn rejects_bad_values() {
        let config = Config::parse_from(["rpdiag", "--spi-bus", "7"]);
        assert_eq!(config.validate(), Err(Error::SpiBus(7)));

        let config = Config::parse_from(["rpdiag", "--serial-payload-size", "0"]);
        assert_eq!(config.validate(), Err(Error::EmptyPayload));

        let config = Config::parse_from(["rpdiag", "--serial-timeout-ms", "30000"]);
        assert_eq!(config.validate(), Err(Error::SerialTimeout(30_000)));

        let config = Config::parse_from(["rpdiag", "--serial-timeout-ms", "99"]);
        assert_eq!(config.validate(), Err(Error::SerialTimeout(99)));

        let config = Config::parse_from(["rpdiag", "--serial-timeout-ms", "100"]);
        assert_eq!(config.validate(), Ok(()));

        let config = Config::parse_from(["rpdiag", "--spi-max-speed", "0"]);
        assert_eq!(config.validate(), Err(Error::SpiMaxSpeed));

        let config = Config::parse_from(["rpdiag", "--pwm-channel", "2"]);
        assert_eq!(config.validate(), Err(Error::PwmChannel(2)));
    }

    #[test]
    fn verbosity_counts() {
        let config = Config::parse_from(["rpdiag", "-vv"]);

        assert_eq!(config.verbose, 2);
    }
}
