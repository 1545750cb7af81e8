use embedded_hal::spi::{self, ErrorType, SpiBus};
use rppal::spi::Spi;
use thiserror::Error;

/// Errors returned by [`HalSpi`].
#[derive(Debug, Error)]
pub enum HalSpiError {
    /// Error reported by the SPI driver.
    #[error("SPI error: {0}")]
    Spi(#[from] rppal::spi::Error),
    /// The driver transferred fewer bytes than requested.
    #[error("Short transfer: {transferred} of {expected} bytes")]
    Short { expected: usize, transferred: usize },
}

impl spi::Error for HalSpiError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

/// `embedded-hal` [`SpiBus`] adapter for an `rppal` [`Spi`].
pub struct HalSpi {
    spi: Spi,
}

impl HalSpi {
    /// Constructs a new `HalSpi` that takes ownership of `spi`.
    pub fn new(spi: Spi) -> HalSpi {
        HalSpi { spi }
    }
}

fn check_len(expected: usize, transferred: usize) -> Result<(), HalSpiError> {
    if transferred < expected {
        Err(HalSpiError::Short {
            expected,
            transferred,
        })
    } else {
        Ok(())
    }
}

impl ErrorType for HalSpi {
    type Error = HalSpiError;
}

impl SpiBus<u8> for HalSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let transferred = self.spi.read(words)?;
        check_len(words.len(), transferred)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let transferred = self.spi.write(words)?;
        check_len(words.len(), transferred)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let transferred = self.spi.transfer(read, write)?;
        check_len(read.len().min(write.len()), transferred)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let write_buffer = words.to_vec();
        self.transfer(words, &write_buffer)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
