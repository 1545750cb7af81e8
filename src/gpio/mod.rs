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

//! GPIO blink and button tests.
//!
//! The blink test toggles an LED ten times. The button test polls a push
//! button with an internal pull-down resistor for ten seconds, mirrors its
//! state on the LED and prints every press and release.
//!
//! Both tests use BCM GPIO pin numbers. By default the LED is connected to
//! BCM GPIO 12 (physical pin 32) and the button to BCM GPIO 7 (physical pin
//! 26), with the button's other leg tied to 3.3 V.
//!
//! The pins are reset to their original state when the test returns,
//! including when it's cut short by a caught `SIGINT` or `SIGTERM`.

use std::fmt;
use std::io;
use std::io::Write;
use std::result;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use rppal::gpio::Gpio;
use thiserror::Error;

use crate::config::Config;
use crate::hal::Delay;
use crate::signal::StopFlag;

pub mod hal;

pub use self::hal::{HalInputPin, HalOutputPin};

/// Number of on/off cycles of the blink test.
pub const BLINK_CYCLES: u32 = 10;
/// Time the LED stays on, and off, during a blink cycle.
pub const BLINK_INTERVAL_MS: u32 = 500;
/// Number of times the button is polled.
pub const BUTTON_POLLS: u32 = 100;
/// Time between two button polls.
pub const BUTTON_INTERVAL_MS: u32 = 100;

/// Errors that can occur when running the GPIO tests.
#[derive(Debug, Error)]
pub enum Error {
    /// The GPIO peripheral or pin couldn't be acquired.
    #[error("Unable to open GPIO pin! {0}")]
    Gpio(#[from] rppal::gpio::Error),
    /// A pin operation failed.
    #[error("Pin error: {0}")]
    Pin(String),
    /// I/O error while writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type returned from methods that can have `gpio::Error`s.
pub type Result<T> = result::Result<T, Error>;

fn pin_error<E: fmt::Debug>(err: E) -> Error {
    Error::Pin(format!("{:?}", err))
}

/// Blinks `led` for `cycles` cycles, keeping it on and off for
/// `interval_ms` milliseconds each.
pub fn blink<P, D>(
    led: &mut P,
    delay: &mut D,
    cycles: u32,
    interval_ms: u32,
    out: &mut dyn Write,
    stop: &StopFlag,
) -> Result<()>
where
    P: OutputPin,
    D: DelayNs,
{
    for _ in 0..cycles {
        if stop.is_raised() {
            break;
        }

        led.set_high().map_err(pin_error)?;
        writeln!(out, "LED ON")?;
        delay.delay_ms(interval_ms);

        led.set_low().map_err(pin_error)?;
        writeln!(out, "LED OFF")?;
        delay.delay_ms(interval_ms);
    }

    Ok(())
}

/// Polls `button` `polls` times, every `interval_ms` milliseconds, and
/// copies its state to `led`.
///
/// The button starts out as released. Every change is printed as
/// `BUTTON PRESSED` or `BUTTON RELEASED`.
pub fn mirror_button<B, P, D>(
    button: &mut B,
    led: &mut P,
    delay: &mut D,
    polls: u32,
    interval_ms: u32,
    out: &mut dyn Write,
    stop: &StopFlag,
) -> Result<()>
where
    B: InputPin,
    P: OutputPin,
    D: DelayNs,
{
    let mut pressed = false;

    for _ in 0..polls {
        if stop.is_raised() {
            break;
        }

        let current = button.is_high().map_err(pin_error)?;
        led.set_state(PinState::from(current)).map_err(pin_error)?;

        if current != pressed {
            writeln!(
                out,
                "{}",
                if current {
                    "BUTTON PRESSED"
                } else {
                    "BUTTON RELEASED"
                }
            )?;
            pressed = current;
        }

        delay.delay_ms(interval_ms);
    }

    Ok(())
}

/// Runs the blink test on the LED pin from `config`.
pub fn run_blink(config: &Config, out: &mut dyn Write, stop: &StopFlag) -> Result<()> {
    let gpio = Gpio::new()?;
    let mut led = HalOutputPin::new(gpio.get(config.led_pin)?.into_output_low());

    blink(
        &mut led,
        &mut Delay::new(),
        BLINK_CYCLES,
        BLINK_INTERVAL_MS,
        out,
        stop,
    )
}

/// Runs the button test on the button and LED pins from `config`.
pub fn run_button(config: &Config, out: &mut dyn Write, stop: &StopFlag) -> Result<()> {
    let gpio = Gpio::new()?;
    let mut led = HalOutputPin::new(gpio.get(config.led_pin)?.into_output_low());
    let mut button = HalInputPin::new(gpio.get(config.button_pin)?.into_input_pulldown());

    mirror_button(
        &mut button,
        &mut led,
        &mut Delay::new(),
        BUTTON_POLLS,
        BUTTON_INTERVAL_MS,
        out,
        stop,
    )
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    use super::*;

    #[test]
    fn blink_toggles_and_prints() {
        let expectations = [
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ];
        let mut led = PinMock::new(&expectations);
        let mut out = Vec::new();

        blink(
            &mut led,
            &mut NoopDelay::new(),
            2,
            500,
            &mut out,
            &StopFlag::new(),
        )
        .unwrap();

        led.done();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "LED ON\nLED OFF\nLED ON\nLED OFF\n"
        );
    }

    #[test]
    fn blink_stops_when_raised() {
        let mut led = PinMock::new(&[]);
        let stop = StopFlag::new();
        stop.raise();
        let mut out = Vec::new();

        blink(&mut led, &mut NoopDelay::new(), 10, 500, &mut out, &stop).unwrap();

        led.done();
        assert!(out.is_empty());
    }

    #[test]
    fn button_changes_are_reported() {
        let levels = [PinState::Low, PinState::High, PinState::High, PinState::Low];
        let button_expectations: Vec<_> = levels
            .iter()
            .map(|level| PinTransaction::get(level.clone()))
            .collect();
        let led_expectations: Vec<_> = levels
            .iter()
            .map(|level| PinTransaction::set(level.clone()))
            .collect();

        let mut button = PinMock::new(&button_expectations);
        let mut led = PinMock::new(&led_expectations);
        let mut out = Vec::new();

        mirror_button(
            &mut button,
            &mut led,
            &mut NoopDelay::new(),
            4,
            100,
            &mut out,
            &StopFlag::new(),
        )
        .unwrap();

        button.done();
        led.done();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "BUTTON PRESSED\nBUTTON RELEASED\n"
        );
    }
}
