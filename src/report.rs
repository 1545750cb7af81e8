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

//! One-line sweep reports.

use std::fmt;

use crate::sweep::{OpenError, TransferError};

/// The bus a sweep runs on.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum BusKind {
    /// SPI. Settings are clock speeds in MHz.
    Spi,
    /// UART. Settings are baud rates.
    Serial,
}

impl fmt::Display for BusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BusKind::Spi => write!(f, "SPI"),
            BusKind::Serial => write!(f, "SERIAL"),
        }
    }
}

/// The result of a single setting.
#[derive(Debug)]
pub enum Outcome {
    /// Every received byte matched.
    Passed,
    /// At least one received byte differed from the sent byte.
    Mismatch { first: usize, count: usize },
    /// The session couldn't be opened, nothing was transferred.
    OpenFailed(OpenError),
    /// The session opened, but the transfer failed.
    TransferFailed(TransferError),
}

/// A sweep report for a single setting.
#[derive(Debug)]
pub struct Report {
    pub bus: BusKind,
    pub setting: u32,
    pub size: usize,
    pub outcome: Outcome,
}

impl Report {
    /// Returns `true` if every byte of the echo matched the payload.
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bus {
            BusKind::Spi => write!(f, "SPEED: {}MHz", self.setting)?,
            BusKind::Serial => write!(f, "BAUD: {}", self.setting)?,
        }

        write!(f, "\t SIZE: {} B\t ", self.size)?;

        match self.outcome {
            Outcome::Passed => write!(f, "PASSED"),
            Outcome::Mismatch { first, count } => write!(
                f,
                "FAILED (byte {} of {} differs, {} mismatched)",
                first, self.size, count
            ),
            Outcome::OpenFailed(ref err) => match err.code() {
                Some(code) => write!(
                    f,
                    "FAILED (Unable to open {} device! Error code: {})",
                    self.bus, code
                ),
                None => write!(f, "FAILED (Unable to open {} device! {})", self.bus, err),
            },
            Outcome::TransferFailed(ref err) => {
                write!(f, "FAILED (Unable to read/write {}! {})", self.bus, err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use super::*;

    fn report(bus: BusKind, setting: u32, outcome: Outcome) -> String {
        Report {
            bus,
            setting,
            size: 512,
            outcome,
        }
        .to_string()
    }

    #[test]
    fn passed_lines() {
        assert_eq!(
            report(BusKind::Spi, 1, Outcome::Passed),
            "SPEED: 1MHz\t SIZE: 512 B\t PASSED"
        );
        assert_eq!(
            report(BusKind::Serial, 9600, Outcome::Passed),
            "BAUD: 9600\t SIZE: 512 B\t PASSED"
        );
    }

    #[test]
    fn mismatch_line() {
        assert_eq!(
            report(
                BusKind::Serial,
                115_200,
                Outcome::Mismatch { first: 2, count: 1 }
            ),
            "BAUD: 115200\t SIZE: 512 B\t FAILED (byte 2 of 512 differs, 1 mismatched)"
        );
    }

    #[test]
    fn open_failure_line() {
        let err = OpenError::Io(io::Error::from_raw_os_error(13));
        assert_eq!(
            report(BusKind::Spi, 4, Outcome::OpenFailed(err)),
            "SPEED: 4MHz\t SIZE: 512 B\t FAILED (Unable to open SPI device! Error code: 13)"
        );

        let line = report(
            BusKind::Serial,
            4_000_000,
            Outcome::OpenFailed(OpenError::Unsupported(4_000_000)),
        );
        assert_eq!(
            line,
            "BAUD: 4000000\t SIZE: 512 B\t FAILED (Unable to open SERIAL device! Setting not supported: 4000000)"
        );
    }

    #[test]
    fn transfer_failure_line() {
        let err = TransferError::Timeout {
            index: 0,
            timeout: Duration::from_millis(100),
        };
        let line = report(BusKind::Serial, 9600, Outcome::TransferFailed(err));

        assert_eq!(
            line,
            "BAUD: 9600\t SIZE: 512 B\t FAILED (Unable to read/write SERIAL! Timed out after 100ms waiting for byte 0)"
        );
    }

    #[test]
    fn only_passed_passes() {
        let failed = Report {
            bus: BusKind::Spi,
            setting: 1,
            size: 4,
            outcome: Outcome::Mismatch { first: 0, count: 4 },
        };

        assert!(!failed.passed());
    }
}
