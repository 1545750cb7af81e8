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

use embedded_hal::pwm::{self, ErrorType, SetDutyCycle};
use rppal::pwm::Pwm;
use thiserror::Error;

/// Errors returned by [`HalPwm`].
#[derive(Debug, Error)]
#[error("PWM error: {0}")]
pub struct HalPwmError(#[from] rppal::pwm::Error);

impl pwm::Error for HalPwmError {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

/// `embedded-hal` [`SetDutyCycle`] adapter for an `rppal` [`Pwm`] channel.
///
/// The full `u16` range maps onto a duty cycle of `0.0` to `1.0`.
pub struct HalPwm {
    pwm: Pwm,
}

impl HalPwm {
    /// Constructs a new `HalPwm` that takes ownership of `pwm`.
    pub fn new(pwm: Pwm) -> HalPwm {
        HalPwm { pwm }
    }
}

impl ErrorType for HalPwm {
    type Error = HalPwmError;
}

impl SetDutyCycle for HalPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.pwm
            .set_duty_cycle(f64::from(duty) / f64::from(u16::MAX))?;

        Ok(())
    }
}
