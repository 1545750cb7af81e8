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

//! SPI loopback speed sweep.
//!
//! The sweep opens `/dev/spidevB.S` at every clock speed from 1 MHz up to
//! the configured ceiling (512 MHz by default), doubling each step, and
//! transfers the whole payload in a single half-duplex transfer. The
//! received bytes overwrite the transmit buffer and are compared against the
//! payload.
//!
//! Connect MOSI to MISO before running the sweep. For SPI0 that's BCM GPIO
//! 10 (physical pin 19) to BCM GPIO 9 (physical pin 21).
//!
//! ## Buffer size limits
//!
//! By default, spidev can handle up to 4096 bytes in a single transfer, which
//! caps `--spi-payload-size`. The limit can be raised by adding
//! `spidev.bufsiz=65536` to `/boot/cmdline.txt`.

use std::io;
use std::io::Write;
use std::result;

use embedded_hal::spi::SpiBus;
use log::debug;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use thiserror::Error;

use crate::config::{self, Config};
use crate::payload::Payload;
use crate::report::BusKind;
use crate::signal::StopFlag;
use crate::sweep::{self, Connector, Echo, OpenError, TransferError};

pub mod hal;

pub use self::hal::HalSpi;

/// First clock speed of the sweep, in MHz.
pub const MIN_SPEED_MHZ: u32 = 1;
/// Default ceiling of the sweep, in MHz.
pub const MAX_SPEED_MHZ: u32 = 512;
/// Default payload size, in bytes.
pub const PAYLOAD_SIZE: usize = 512;

/// Errors that can occur when running the SPI sweep.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    /// I/O error while writing the report.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type returned from methods that can have `spi::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// Returns the clock speeds in MHz, starting at `start` and doubling while
/// the speed doesn't exceed `ceiling`.
///
/// A `start` of `0` would never grow, so it returns an empty list.
pub fn clock_speeds(start: u32, ceiling: u32) -> Vec<u32> {
    let mut speeds = Vec::new();
    if start == 0 {
        return speeds;
    }

    let mut speed = start;
    while speed <= ceiling {
        speeds.push(speed);
        speed = match speed.checked_mul(2) {
            Some(next) => next,
            None => break,
        };
    }

    speeds
}

/// An open SPI bus.
///
/// `Session` works with any `embedded-hal` [`SpiBus`]. The bus is closed
/// when the session goes out of scope.
#[derive(Debug)]
pub struct Session<B> {
    bus: B,
}

impl<B> Session<B> {
    /// Constructs a new `Session` on `bus`.
    pub fn new(bus: B) -> Session<B> {
        Session { bus }
    }
}

impl<B: SpiBus<u8>> Echo for Session<B> {
    fn echo(&mut self, payload: &[u8], received: &mut [u8]) -> sweep::Result<()> {
        // The response shares the request buffer
        received.copy_from_slice(payload);

        self.bus
            .transfer_in_place(received)
            .map_err(|err| TransferError::Bus {
                index: 0,
                message: format!("{:?}", err),
            })
    }
}

/// Opens `rppal` SPI buses at the requested clock speed.
#[derive(Debug, Copy, Clone)]
pub struct SpiConnector {
    bus: Bus,
    slave_select: SlaveSelect,
    mode: Mode,
}

impl SpiConnector {
    /// Constructs a new `SpiConnector` for `bus` and `slave_select`, using
    /// SPI mode 0.
    pub fn new(bus: Bus, slave_select: SlaveSelect) -> SpiConnector {
        SpiConnector {
            bus,
            slave_select,
            mode: Mode::Mode0,
        }
    }
}

impl Connector for SpiConnector {
    const BUS: BusKind = BusKind::Spi;
    type Session = Session<HalSpi>;

    fn open(&mut self, setting: u32) -> result::Result<Session<HalSpi>, OpenError> {
        let clock_speed = setting
            .checked_mul(1_000_000)
            .ok_or(OpenError::Unsupported(setting))?;

        debug!(
            "Opening {:?}/{:?} at {} Hz",
            self.bus, self.slave_select, clock_speed
        );

        let spi = Spi::new(self.bus, self.slave_select, clock_speed, self.mode)
            .map_err(|err| open_error(err, setting))?;

        Ok(Session::new(HalSpi::new(spi)))
    }
}

fn open_error(err: rppal::spi::Error, setting: u32) -> OpenError {
    match err {
        rppal::spi::Error::Io(err) => OpenError::Io(err),
        rppal::spi::Error::ClockSpeedNotSupported(_) => OpenError::Unsupported(setting),
        other => OpenError::Driver(other.to_string()),
    }
}

/// Runs the SPI echo speed sweep described by `config` and writes one
/// report line per clock speed to `out`.
///
/// Returns the number of clock speeds that were attempted.
pub fn run_echo_sweep(config: &Config, out: &mut dyn Write, stop: &StopFlag) -> Result<usize> {
    let mut connector = SpiConnector::new(config.spi_bus()?, config.spi_slave_select()?);
    let payload = Payload::seeded(config.seed, config.spi_payload_size);
    let speeds = clock_speeds(MIN_SPEED_MHZ, config.spi_max_speed);

    let attempted = sweep::run(&mut connector, &speeds, &payload, stop, |report| {
        writeln!(out, "{}", report)
    })?;

    Ok(attempted)
}
