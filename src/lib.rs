//! rpdiag is an interactive diagnostic menu for the Raspberry Pi's GPIO,
//! PWM, SPI, I2C, 1-Wire and UART interfaces.
//!
//! Each menu entry configures a pin or bus through [`rppal`], drives a fixed
//! stimulus/response sequence and prints pass/fail or sensor output. The
//! SPI and serial entries run a loopback sweep: a seeded payload is sent at
//! every clock speed or baud rate in a fixed table, and the echo is compared
//! byte-for-byte. Wire MOSI to MISO (SPI) or TX to RX (UART) before running
//! them.
//!
//! All tests are written against the `embedded-hal` 1.0 traits. The
//! `rppal` peripherals are wrapped by thin adapters in each module's `hal`
//! submodule, which lets the whole suite run against mocks without a
//! Raspberry Pi attached.
//!
//! [`rppal`]: https://docs.rs/rppal

pub mod config;
pub mod gpio;
pub mod hal;
pub mod i2c;
pub mod menu;
pub mod onewire;
pub mod payload;
pub mod pwm;
pub mod report;
pub mod signal;
pub mod spi;
pub mod suite;
pub mod sweep;
pub mod uart;
