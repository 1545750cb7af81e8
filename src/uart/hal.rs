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

use std::path::Path;
use std::time::Duration;

use embedded_hal_nb::nb;
use embedded_hal_nb::serial::{self, ErrorType, Read, Write};
use rppal::uart::{Parity, Uart};
use thiserror::Error;

/// Errors returned by [`HalUart`].
#[derive(Debug, Error)]
#[error("UART error: {0}")]
pub struct HalUartError(#[from] rppal::uart::Error);

impl serial::Error for HalUartError {
    fn kind(&self) -> serial::ErrorKind {
        serial::ErrorKind::Other
    }
}

/// `embedded-hal-nb` serial adapter for an `rppal` [`Uart`].
///
/// Reads wait up to the configured timeout for a byte, and return
/// `WouldBlock` if none arrived. Writes block until the byte is queued.
pub struct HalUart {
    uart: Uart,
}

impl HalUart {
    /// Opens the serial device at `path`, configured for `line_speed` bit/s,
    /// no parity bit, 8 data bits and 1 stop bit.
    ///
    /// `read_timeout` is rounded down to tenths of a second by the termios
    /// `VTIME` setting, and can't exceed 25.5 seconds.
    pub fn open<P: AsRef<Path>>(
        path: P,
        line_speed: u32,
        read_timeout: Duration,
    ) -> Result<HalUart, rppal::uart::Error> {
        let mut uart = Uart::with_path(path, line_speed, Parity::None, 8, 1)?;

        // Return as soon as a single byte is available, or when the
        // timeout elapses without receiving anything.
        uart.set_read_mode(0, read_timeout)?;
        uart.set_write_mode(true)?;

        Ok(HalUart { uart })
    }
}

impl ErrorType for HalUart {
    type Error = HalUartError;
}

impl Read<u8> for HalUart {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let mut buffer = [0u8; 1];
        if self.uart.read(&mut buffer).map_err(HalUartError::from)? == 0 {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(buffer[0])
        }
    }
}

impl Write<u8> for HalUart {
    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        if self.uart.write(&[word]).map_err(HalUartError::from)? == 0 {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.uart.drain().map_err(HalUartError::from)?;

        Ok(())
    }
}
