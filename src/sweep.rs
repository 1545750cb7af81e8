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

//! Loopback sweeps.
//!
//! A sweep iterates over an ordered list of bus settings (SPI clock speeds
//! or serial baud rates). For every setting it opens a new session through a
//! [`Connector`], echoes the payload through the session's [`Echo`]
//! implementation, closes the session and emits a [`Report`].
//!
//! A setting that fails to open is reported and skipped; the sweep always
//! continues with the next setting and never transfers on a session that
//! didn't open. The echo is always compared in full, so a failing report
//! carries both the first mismatching index and the number of mismatches.
//! No setting is retried.

use std::io;
use std::result;
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use crate::payload::Payload;
use crate::report::{BusKind, Outcome, Report};
use crate::signal::StopFlag;

/// Errors that can occur when opening a bus session.
#[derive(Debug, Error)]
pub enum OpenError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The driver rejected the requested setting.
    #[error("Setting not supported: {0}")]
    Unsupported(u32),
    /// Any other driver error.
    #[error("{0}")]
    Driver(String),
}

impl OpenError {
    /// Returns the underlying OS error code, if there is one.
    pub fn code(&self) -> Option<i32> {
        match self {
            OpenError::Io(err) => err.raw_os_error(),
            _ => None,
        }
    }
}

/// Errors that can occur on an open bus session.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The driver reported an error while transferring byte `index`.
    #[error("Bus error at byte {index}: {message}")]
    Bus { index: usize, message: String },
    /// No byte arrived within `timeout` while waiting for byte `index`.
    #[error("Timed out after {timeout:?} waiting for byte {index}")]
    Timeout { index: usize, timeout: Duration },
}

/// Result type returned from [`Echo::echo`].
pub type Result<T> = result::Result<T, TransferError>;

/// An open bus session that sends a payload and receives its echo.
///
/// The session is closed when it goes out of scope.
pub trait Echo {
    /// Sends `payload` and stores the received bytes in `received`.
    ///
    /// `received` is exactly as long as `payload`.
    fn echo(&mut self, payload: &[u8], received: &mut [u8]) -> Result<()>;
}

/// Opens bus sessions for a sweep.
pub trait Connector {
    /// The bus that's being swept, used to label reports.
    const BUS: BusKind;

    /// The session type returned by [`open`](Connector::open).
    type Session: Echo;

    /// Opens a new session configured for `setting`.
    fn open(&mut self, setting: u32) -> result::Result<Self::Session, OpenError>;
}

/// Compares `sent` and `received` byte-for-byte.
///
/// Missing or surplus bytes count as mismatches.
pub fn compare(sent: &[u8], received: &[u8]) -> Outcome {
    let mut first = None;
    let mut count = 0;

    for index in 0..sent.len().max(received.len()) {
        if sent.get(index) != received.get(index) {
            first.get_or_insert(index);
            count += 1;
        }
    }

    match first {
        Some(first) => Outcome::Mismatch { first, count },
        None => Outcome::Passed,
    }
}

/// Runs a loopback sweep over `settings`.
///
/// `emit` is called once for every attempted setting, in order. The sweep
/// returns early when `stop` is raised, or when `emit` returns an error.
///
/// Returns the number of settings that were attempted.
pub fn run<C, F, E>(
    connector: &mut C,
    settings: &[u32],
    payload: &Payload,
    stop: &StopFlag,
    mut emit: F,
) -> result::Result<usize, E>
where
    C: Connector,
    F: FnMut(Report) -> result::Result<(), E>,
{
    info!(
        "Starting {} sweep over {} settings with a {} byte payload",
        C::BUS,
        settings.len(),
        payload.len()
    );

    let mut attempted = 0;
    for &setting in settings {
        if stop.is_raised() {
            info!("{} sweep stopped after {} settings", C::BUS, attempted);
            break;
        }

        attempted += 1;
        let outcome = check_setting(connector, setting, payload);

        emit(Report {
            bus: C::BUS,
            setting,
            size: payload.len(),
            outcome,
        })?;
    }

    Ok(attempted)
}

// Open, echo, compare and close a single setting
fn check_setting<C: Connector>(connector: &mut C, setting: u32, payload: &Payload) -> Outcome {
    let mut session = match connector.open(setting) {
        Ok(session) => session,
        Err(err) => {
            warn!("Unable to open {} at {}: {}", C::BUS, setting, err);
            return Outcome::OpenFailed(err);
        }
    };

    let mut received = vec![0u8; payload.len()];
    let result = session.echo(payload, &mut received);

    // Close before reporting, whatever the transfer result
    drop(session);

    match result {
        Ok(()) => {
            let outcome = compare(payload, &received);
            debug!("{} at {}: {:?}", C::BUS, setting, outcome);
            outcome
        }
        Err(err) => {
            warn!("Transfer failed on {} at {}: {}", C::BUS, setting, err);
            Outcome::TransferFailed(err)
        }
    }
}
