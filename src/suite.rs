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

//! The hardware test suite behind the menu.

use std::io::Write;

use crate::config::Config;
use crate::gpio;
use crate::i2c;
use crate::menu::{CommandSet, Selection};
use crate::onewire;
use crate::pwm;
use crate::signal::StopFlag;
use crate::spi;
use crate::uart;

/// Returns a [`CommandSet`] that runs every test against the Raspberry Pi's
/// peripherals, configured by `config`.
///
/// Every command checks `stop` between steps and returns early once it's
/// raised.
pub fn hardware_commands<'a>(config: &'a Config, stop: &'a StopFlag) -> CommandSet<'a> {
    let mut commands = CommandSet::new();

    commands.insert(Selection::GpioBlink, move |out: &mut dyn Write| {
        Ok(gpio::run_blink(config, out, stop)?)
    });
    commands.insert(Selection::GpioButton, move |out: &mut dyn Write| {
        Ok(gpio::run_button(config, out, stop)?)
    });
    commands.insert(Selection::GpioPwm, move |out: &mut dyn Write| {
        Ok(pwm::run_fade(config, out, stop)?)
    });
    commands.insert(Selection::SpiEcho, move |out: &mut dyn Write| {
        spi::run_echo_sweep(config, out, stop)?;
        Ok(())
    });
    commands.insert(Selection::I2cExpander, move |out: &mut dyn Write| {
        Ok(i2c::run_expander(config, out, stop)?)
    });
    commands.insert(Selection::OneWireTemperature, move |out: &mut dyn Write| {
        Ok(onewire::run_temperature(config, out, stop)?)
    });
    commands.insert(Selection::SerialEcho, move |out: &mut dyn Write| {
        uart::run_echo_sweep(config, out, stop)?;
        Ok(())
    });

    commands
}
