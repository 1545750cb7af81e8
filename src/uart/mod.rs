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

//! Serial loopback baud rate sweep.
//!
//! The sweep opens the serial device at each of the 18 standard baud rates
//! in [`BAUD_RATES`], and echoes the payload one byte at a time: write a
//! byte, then wait for it to come back. Every byte is read, even after a
//! mismatch, so a failing report shows how many bytes were corrupted.
//!
//! Connect TX to RX before running the sweep. On the primary UART that's
//! BCM GPIO 14 (physical pin 8) to BCM GPIO 15 (physical pin 10). Make sure
//! the Linux serial console isn't using the device, either by deactivating
//! it through `sudo raspi-config`, or by removing `console=serial0,115200`
//! from `/boot/cmdline.txt`.
//!
//! `/dev/ttyS0` (the mini UART) derives its baud rate from the core clock.
//! Without `enable_uart=1` or a fixed `core_freq` in `/boot/config.txt`, the
//! higher rates in the table are likely to fail.
//!
//! Reads never block indefinitely. Each byte has to arrive within the
//! session timeout (`--serial-timeout-ms`), otherwise the setting fails with
//! [`TransferError::Timeout`].

use std::io;
use std::path::{Path, PathBuf};
use std::result;
use std::time::{Duration, Instant};

use embedded_hal_nb::nb;
use embedded_hal_nb::serial::{Read, Write};
use log::debug;
use thiserror::Error;

use crate::config::Config;
use crate::payload::Payload;
use crate::report::BusKind;
use crate::signal::StopFlag;
use crate::sweep::{self, Connector, Echo, OpenError, TransferError};

pub mod hal;

pub use self::hal::HalUart;

/// Baud rates visited by the sweep, in order.
pub const BAUD_RATES: [u32; 18] = [
    9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800, 500_000, 576_000, 921_600, 1_000_000,
    1_152_000, 1_500_000, 2_000_000, 2_500_000, 3_000_000, 3_500_000, 4_000_000,
];

/// Default serial device.
pub const DEFAULT_PATH: &str = "/dev/ttyS0";
/// Default payload size, in bytes.
pub const PAYLOAD_SIZE: usize = 100;
/// Default time to wait for a single byte.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Errors that can occur when running the serial sweep.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while writing the report.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type returned from methods that can have `uart::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// An open serial port.
///
/// `Session` works with any `embedded-hal-nb` serial port. A read or write
/// that keeps returning `WouldBlock` for longer than the timeout fails the
/// transfer. The port is closed when the session goes out of scope.
#[derive(Debug)]
pub struct Session<P> {
    port: P,
    timeout: Duration,
}

impl<P> Session<P> {
    /// Constructs a new `Session` on `port`.
    pub fn new(port: P, timeout: Duration) -> Session<P> {
        Session { port, timeout }
    }
}

impl<P: Read<u8> + Write<u8>> Session<P> {
    // Retry a non-blocking operation until it completes or the timeout elapses
    fn block<T, F>(&mut self, index: usize, mut op: F) -> sweep::Result<T>
    where
        F: FnMut(&mut P) -> nb::Result<T, P::Error>,
    {
        let deadline = Instant::now() + self.timeout;

        loop {
            match op(&mut self.port) {
                Ok(value) => return Ok(value),
                Err(nb::Error::Other(err)) => {
                    return Err(TransferError::Bus {
                        index,
                        message: format!("{:?}", err),
                    })
                }
                Err(nb::Error::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(TransferError::Timeout {
                            index,
                            timeout: self.timeout,
                        });
                    }
                }
            }
        }
    }
}

impl<P: Read<u8> + Write<u8>> Echo for Session<P> {
    fn echo(&mut self, payload: &[u8], received: &mut [u8]) -> sweep::Result<()> {
        for (index, &byte) in payload.iter().enumerate() {
            self.block(index, |port| port.write(byte))?;
            received[index] = self.block(index, |port| port.read())?;
        }

        Ok(())
    }
}

/// Opens an `rppal` serial device at the requested baud rate.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    path: PathBuf,
    timeout: Duration,
}

impl SerialConnector {
    /// Constructs a new `SerialConnector` for the device at `path`.
    ///
    /// `timeout` bounds the wait for every single byte.
    pub fn new<P: AsRef<Path>>(path: P, timeout: Duration) -> SerialConnector {
        SerialConnector {
            path: path.as_ref().to_path_buf(),
            timeout,
        }
    }
}

impl Connector for SerialConnector {
    const BUS: BusKind = BusKind::Serial;
    type Session = Session<HalUart>;

    fn open(&mut self, setting: u32) -> result::Result<Session<HalUart>, OpenError> {
        debug!("Opening {} at {} baud", self.path.display(), setting);

        let port = HalUart::open(&self.path, setting, self.timeout).map_err(|err| match err {
            rppal::uart::Error::Io(err) => OpenError::Io(err),
            rppal::uart::Error::InvalidValue => OpenError::Unsupported(setting),
            other => OpenError::Driver(other.to_string()),
        })?;

        Ok(Session::new(port, self.timeout))
    }
}

/// Runs the serial echo speed sweep described by `config` and writes one
/// report line per baud rate to `out`.
///
/// Returns the number of baud rates that were attempted.
pub fn run_echo_sweep(config: &Config, out: &mut dyn io::Write, stop: &StopFlag) -> Result<usize> {
    let mut connector = SerialConnector::new(&config.serial_path, config.serial_timeout());
    let payload = Payload::seeded(config.seed, config.serial_payload_size);

    let attempted = sweep::run(&mut connector, &BAUD_RATES, &payload, stop, |report| {
        writeln!(out, "{}", report)
    })?;

    Ok(attempted)
}
