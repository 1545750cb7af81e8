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

use std::fs;
use std::io;
use std::path::Path;
use std::result;

/// Result type returned from methods that can have `io::Error`s.
pub type Result<T> = result::Result<T, io::Error>;

/// Name of the attribute that triggers a conversion and returns the
/// scratchpad contents.
pub const SLAVE_ATTRIBUTE: &str = "w1_slave";

/// A parsed `w1_slave` reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    /// Whether the driver's CRC check on the scratchpad succeeded.
    pub crc_ok: bool,
    /// Temperature in thousandths of a degree Celsius.
    pub millidegrees: i32,
}

// Check if the device directory has been created by the w1 driver
pub fn exists(device: &Path) -> bool {
    device.join(SLAVE_ATTRIBUTE).is_file()
}

// Reading w1_slave takes ~750 ms while the sensor converts
pub fn read_slave(device: &Path) -> Result<Reading> {
    let contents = fs::read_to_string(device.join(SLAVE_ATTRIBUTE))?;

    match parse_slave(&contents) {
        Some(reading) => Ok(reading),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Malformed {} contents: {:?}", SLAVE_ATTRIBUTE, contents.trim()),
        )),
    }
}

/// Parses the two-line `w1_slave` format.
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
pub fn parse_slave(contents: &str) -> Option<Reading> {
    let mut lines = contents.lines();
    let crc_line = lines.next()?;
    let data_line = lines.next()?;

    let crc_ok = match crc_line.trim().rsplit(' ').next()? {
        "YES" => true,
        "NO" => false,
        _ => return None,
    };

    let (_, value) = data_line.trim().rsplit_once("t=")?;
    let millidegrees = value.trim().parse().ok()?;

    Some(Reading {
        crc_ok,
        millidegrees,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_reading() {
        let reading = parse_slave(
            "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=23125\n",
        )
        .unwrap();

        assert!(reading.crc_ok);
        assert_eq!(reading.millidegrees, 23125);
    }

    #[test]
    fn parses_negative_and_failed_crc() {
        let reading = parse_slave(
            "5e ff 4b 46 7f ff 02 10 d8 : crc=d8 NO\n5e ff 4b 46 7f ff 02 10 d8 t=-10125\n",
        )
        .unwrap();

        assert!(!reading.crc_ok);
        assert_eq!(reading.millidegrees, -10125);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_slave(""), None);
        assert_eq!(parse_slave("crc=57 YES\n"), None);
        assert_eq!(parse_slave("crc=57 MAYBE\nt=1000\n"), None);
        assert_eq!(parse_slave("crc=57 YES\nt=warm\n"), None);
    }
}
