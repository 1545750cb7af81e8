use std::collections::VecDeque;
use std::convert::Infallible;
use std::io;
use std::time::Duration;

use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
use embedded_hal_nb::nb;
use embedded_hal_nb::serial::{ErrorType, Read, Write};

use rpdiag::payload::Payload;
use rpdiag::report::{BusKind, Outcome, Report};
use rpdiag::signal::StopFlag;
use rpdiag::sweep::{self, Connector, OpenError};
use rpdiag::{spi, uart};

struct MockSpiConnector {
    bus: SpiMock<u8>,
    opened: Vec<u32>,
}

impl Connector for MockSpiConnector {
    const BUS: BusKind = BusKind::Spi;
    type Session = spi::Session<SpiMock<u8>>;

    fn open(&mut self, setting: u32) -> Result<Self::Session, OpenError> {
        self.opened.push(setting);
        Ok(spi::Session::new(self.bus.clone()))
    }
}

fn collect<C: Connector>(connector: &mut C, settings: &[u32], payload: &Payload) -> Vec<Report> {
    let mut reports = Vec::new();
    let attempted = sweep::run(connector, settings, payload, &StopFlag::new(), |report| {
        reports.push(report);
        Ok::<(), Infallible>(())
    })
    .unwrap();

    assert_eq!(attempted, reports.len());
    reports
}

#[test]
fn spi_sweep_over_two_speeds() {
    let data = vec![0x12, 0x34, 0x56, 0x78];
    let expectations = [
        SpiTransaction::transfer_in_place(data.clone(), data.clone()),
        SpiTransaction::transfer_in_place(data.clone(), data.clone()),
    ];
    let mut connector = MockSpiConnector {
        bus: SpiMock::new(&expectations),
        opened: Vec::new(),
    };

    let speeds = spi::clock_speeds(1, 2);
    let reports = collect(&mut connector, &speeds, &Payload::from(data));

    connector.bus.done();
    assert_eq!(connector.opened, vec![1, 2]);
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|report| report.passed() && report.size == 4));
    assert_eq!(reports[0].to_string(), "SPEED: 1MHz\t SIZE: 4 B\t PASSED");
    assert_eq!(reports[1].to_string(), "SPEED: 2MHz\t SIZE: 4 B\t PASSED");
}

#[test]
fn spi_sweep_reports_garbled_echo() {
    let data = vec![0x12, 0x34, 0x56, 0x78];
    let echo = vec![0x12, 0x34, 0x00, 0x00];
    let expectations = [SpiTransaction::transfer_in_place(data.clone(), echo)];
    let mut connector = MockSpiConnector {
        bus: SpiMock::new(&expectations),
        opened: Vec::new(),
    };

    let reports = collect(&mut connector, &[8], &Payload::from(data));

    connector.bus.done();
    assert_eq!(
        reports[0].to_string(),
        "SPEED: 8MHz\t SIZE: 4 B\t FAILED (byte 2 of 4 differs, 2 mismatched)"
    );
}

// Serial loopback that flips the byte at `corrupt_at`
struct FakePort {
    pending: VecDeque<u8>,
    written: usize,
    corrupt_at: Option<usize>,
}

impl ErrorType for FakePort {
    type Error = Infallible;
}

impl Read<u8> for FakePort {
    fn read(&mut self) -> nb::Result<u8, Infallible> {
        self.pending.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl Write<u8> for FakePort {
    fn write(&mut self, word: u8) -> nb::Result<(), Infallible> {
        let word = if self.corrupt_at == Some(self.written) {
            !word
        } else {
            word
        };

        self.written += 1;
        self.pending.push_back(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        Ok(())
    }
}

struct FakeSerialConnector {
    corrupt_baud: u32,
    busy_baud: Option<u32>,
    opened: Vec<u32>,
}

impl Connector for FakeSerialConnector {
    const BUS: BusKind = BusKind::Serial;
    type Session = uart::Session<FakePort>;

    fn open(&mut self, setting: u32) -> Result<Self::Session, OpenError> {
        self.opened.push(setting);

        if self.busy_baud == Some(setting) {
            return Err(OpenError::Io(io::Error::from_raw_os_error(16)));
        }

        let port = FakePort {
            pending: VecDeque::new(),
            written: 0,
            corrupt_at: (setting == self.corrupt_baud).then_some(2),
        };

        Ok(uart::Session::new(port, Duration::from_millis(100)))
    }
}

#[test]
fn serial_sweep_flags_only_the_corrupted_baud() {
    let mut connector = FakeSerialConnector {
        corrupt_baud: 9600,
        busy_baud: None,
        opened: Vec::new(),
    };
    let payload = Payload::seeded(1, uart::PAYLOAD_SIZE);

    let reports = collect(&mut connector, &uart::BAUD_RATES, &payload);

    assert_eq!(connector.opened, uart::BAUD_RATES.to_vec());
    assert_eq!(reports.len(), 18);
    assert_eq!(
        reports[0].to_string(),
        "BAUD: 9600\t SIZE: 100 B\t FAILED (byte 2 of 100 differs, 1 mismatched)"
    );
    assert!(reports[1..].iter().all(Report::passed));
    assert_eq!(reports[17].to_string(), "BAUD: 4000000\t SIZE: 100 B\t PASSED");
}

#[test]
fn serial_sweep_continues_after_open_failure() {
    let mut connector = FakeSerialConnector {
        corrupt_baud: 0,
        busy_baud: Some(115200),
        opened: Vec::new(),
    };
    let payload = Payload::seeded(1, uart::PAYLOAD_SIZE);

    let reports = collect(&mut connector, &uart::BAUD_RATES, &payload);

    assert_eq!(connector.opened, uart::BAUD_RATES.to_vec());

    let failed: Vec<_> = reports.iter().filter(|report| !report.passed()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].setting, 115200);
    assert!(matches!(failed[0].outcome, Outcome::OpenFailed(_)));
    assert_eq!(
        failed[0].to_string(),
        "BAUD: 115200\t SIZE: 100 B\t FAILED (Unable to open SERIAL device! Error code: 16)"
    );
}

#[test]
fn stop_before_first_setting() {
    let mut connector = FakeSerialConnector {
        corrupt_baud: 0,
        busy_baud: None,
        opened: Vec::new(),
    };
    let stop = StopFlag::new();
    stop.raise();

    let attempted = sweep::run(
        &mut connector,
        &uart::BAUD_RATES,
        &Payload::seeded(1, 10),
        &stop,
        |_| Ok::<(), Infallible>(()),
    )
    .unwrap();

    assert_eq!(attempted, 0);
    assert!(connector.opened.is_empty());
}
