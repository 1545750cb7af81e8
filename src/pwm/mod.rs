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

//! PWM fade test.
//!
//! Fades an LED in and out five times by stepping the duty cycle through
//! 1024 levels, 1 ms per level.
//!
//! The test drives the hardware PWM peripheral through the sysfs PWM
//! interface. PWM0 needs to be routed to BCM GPIO 12 (physical pin 32) by
//! adding `dtoverlay=pwm,pin=12,func=4` to `/boot/config.txt`. Use
//! `dtoverlay=pwm-2chan` instead if you'd like to use both channels.
//!
//! ## Using PWM without superuser privileges (`sudo`)
//!
//! Any user that's a member of the `gpio` group can configure PWM, provided
//! the udev rules for `/sys/class/pwm` are in place. Recent Raspberry Pi OS
//! releases ship with these rules.

use std::fmt;
use std::io;
use std::io::Write;
use std::result;

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::SetDutyCycle;
use rppal::pwm::{Polarity, Pwm};
use thiserror::Error;

use crate::config::{self, Config};
use crate::hal::Delay;
use crate::signal::StopFlag;

pub mod hal;

pub use self::hal::HalPwm;

/// Highest brightness level. A fade visits every level from 0 up to and
/// including this one.
pub const MAX_LEVEL: u16 = 1023;
/// Number of fade in/out cycles.
pub const FADE_CYCLES: u32 = 5;
/// Time spent on every brightness level.
pub const STEP_MS: u32 = 1;
/// Default PWM frequency in Hz.
pub const DEFAULT_FREQUENCY: f64 = 1000.0;

/// Errors that can occur when running the PWM test.
#[derive(Debug, Error)]
pub enum Error {
    /// The PWM channel couldn't be configured.
    #[error("Unable to open PWM channel! {0}")]
    Pwm(#[from] rppal::pwm::Error),
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    /// Changing the duty cycle failed.
    #[error("Duty cycle error: {0}")]
    Duty(String),
    /// I/O error while writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type returned from methods that can have `pwm::Error`s.
pub type Result<T> = result::Result<T, Error>;

fn duty_error<E: fmt::Debug>(err: E) -> Error {
    Error::Duty(format!("{:?}", err))
}

// Step through `levels`, returning false if a stop was requested
fn ramp<P, D, I>(
    pwm: &mut P,
    delay: &mut D,
    levels: I,
    step_ms: u32,
    stop: &StopFlag,
) -> Result<bool>
where
    P: SetDutyCycle,
    D: DelayNs,
    I: Iterator<Item = u16>,
{
    for level in levels {
        if stop.is_raised() {
            return Ok(false);
        }

        pwm.set_duty_cycle_fraction(level, MAX_LEVEL)
            .map_err(duty_error)?;
        delay.delay_ms(step_ms);
    }

    Ok(true)
}

/// Fades `pwm` in and out `cycles` times, spending `step_ms` milliseconds
/// on each of the [`MAX_LEVEL`] + 1 brightness levels.
pub fn fade<P, D>(
    pwm: &mut P,
    delay: &mut D,
    cycles: u32,
    step_ms: u32,
    out: &mut dyn Write,
    stop: &StopFlag,
) -> Result<()>
where
    P: SetDutyCycle,
    D: DelayNs,
{
    for _ in 0..cycles {
        if !ramp(pwm, delay, 0..=MAX_LEVEL, step_ms, stop)? {
            break;
        }
        writeln!(out, "LED FADE IN")?;

        if !ramp(pwm, delay, (0..=MAX_LEVEL).rev(), step_ms, stop)? {
            break;
        }
        writeln!(out, "LED FADE OUT")?;
    }

    Ok(())
}

/// Runs the fade test on the PWM channel from `config`.
pub fn run_fade(config: &Config, out: &mut dyn Write, stop: &StopFlag) -> Result<()> {
    let pwm = Pwm::with_frequency(
        config.pwm_channel()?,
        config.pwm_frequency,
        0.0,
        Polarity::Normal,
        true,
    )?;
    let mut pwm = HalPwm::new(pwm);

    fade(&mut pwm, &mut Delay::new(), FADE_CYCLES, STEP_MS, out, stop)
}
