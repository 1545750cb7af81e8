use embedded_hal::i2c::{self, ErrorType, I2c as I2cHal, Operation as I2cOperation};
use rppal::i2c::I2c;
use thiserror::Error;

/// Errors returned by [`HalI2c`].
#[derive(Debug, Error)]
#[error("I2C error: {0}")]
pub struct HalI2cError(#[from] rppal::i2c::Error);

impl i2c::Error for HalI2cError {
    fn kind(&self) -> i2c::ErrorKind {
        if let rppal::i2c::Error::Io(e) = &self.0 {
            use std::io::ErrorKind::*;

            match e.kind() {
                InvalidData => i2c::ErrorKind::Bus,
                WouldBlock => i2c::ErrorKind::ArbitrationLoss,
                _ => i2c::ErrorKind::Other,
            }
        } else {
            i2c::ErrorKind::Other
        }
    }
}

/// `embedded-hal` [`I2cHal`] adapter for an `rppal` [`I2c`] bus.
pub struct HalI2c {
    i2c: I2c,
}

impl HalI2c {
    /// Constructs a new `HalI2c` that takes ownership of `i2c`.
    pub fn new(i2c: I2c) -> HalI2c {
        HalI2c { i2c }
    }
}

impl ErrorType for HalI2c {
    type Error = HalI2cError;
}

impl I2cHal for HalI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [I2cOperation<'_>],
    ) -> Result<(), Self::Error> {
        self.i2c.set_slave_address(u16::from(address))?;
        for op in operations {
            match op {
                I2cOperation::Read(buff) => {
                    self.i2c.read(buff)?;
                }
                I2cOperation::Write(buff) => {
                    self.i2c.write(buff)?;
                }
            }
        }

        Ok(())
    }
}
