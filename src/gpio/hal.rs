use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use rppal::gpio;

/// `embedded-hal` output adapter for an `rppal` [`gpio::OutputPin`].
pub struct HalOutputPin {
    pin: gpio::OutputPin,
}

impl HalOutputPin {
    /// Constructs a new `HalOutputPin` that takes ownership of `pin`.
    pub fn new(pin: gpio::OutputPin) -> HalOutputPin {
        HalOutputPin { pin }
    }
}

impl ErrorType for HalOutputPin {
    type Error = Infallible;
}

impl OutputPin for HalOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low();

        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high();

        Ok(())
    }
}

/// `embedded-hal` input adapter for an `rppal` [`gpio::InputPin`].
pub struct HalInputPin {
    pin: gpio::InputPin,
}

impl HalInputPin {
    /// Constructs a new `HalInputPin` that takes ownership of `pin`.
    pub fn new(pin: gpio::InputPin) -> HalInputPin {
        HalInputPin { pin }
    }
}

impl ErrorType for HalInputPin {
    type Error = Infallible;
}

impl InputPin for HalInputPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_low())
    }
}
