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

//! Interactive test menu.
//!
//! [`Menu`] reads a test number from its input, looks it up in a
//! [`CommandSet`] and runs the matching command. The command set is a plain
//! table from [`Selection`] to closure, so the menu can be driven from
//! memory without touching any hardware.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::io::{BufRead, Write};
use std::result;

use log::{debug, info};
use thiserror::Error;

use crate::gpio;
use crate::i2c;
use crate::onewire;
use crate::pwm;
use crate::signal::StopFlag;
use crate::spi;
use crate::uart;

const RULE: &str = "---------------------------";
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

/// Errors that can occur when running a test from the menu.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Gpio(#[from] gpio::Error),
    #[error(transparent)]
    Pwm(#[from] pwm::Error),
    #[error(transparent)]
    Spi(#[from] spi::Error),
    #[error(transparent)]
    I2c(#[from] i2c::Error),
    #[error(transparent)]
    OneWire(#[from] onewire::Error),
    #[error(transparent)]
    Uart(#[from] uart::Error),
    /// No command has been registered for the selection.
    #[error("No test available for {0}")]
    Unassigned(Selection),
    /// I/O error on the menu's input or output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type returned from methods that can have `menu::Error`s.
pub type Result<T> = result::Result<T, Error>;

/// A menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    GpioBlink = 1,
    GpioButton = 2,
    GpioPwm = 3,
    SpiEcho = 4,
    I2cExpander = 5,
    OneWireTemperature = 6,
    SerialEcho = 7,
}

impl Selection {
    /// All entries in menu order.
    pub const ALL: [Selection; 7] = [
        Selection::GpioBlink,
        Selection::GpioButton,
        Selection::GpioPwm,
        Selection::SpiEcho,
        Selection::I2cExpander,
        Selection::OneWireTemperature,
        Selection::SerialEcho,
    ];

    /// Returns the entry for menu number `number`.
    pub fn from_number(number: u32) -> Option<Selection> {
        Selection::ALL
            .iter()
            .copied()
            .find(|selection| selection.number() == number)
    }

    /// Parses a line of user input. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Option<Selection> {
        input
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(Selection::from_number)
    }

    /// Returns the menu number.
    pub fn number(self) -> u32 {
        self as u32
    }

    /// Returns the text shown in the menu listing.
    pub fn label(self) -> &'static str {
        match self {
            Selection::GpioBlink => "GPIO   Blink Test",
            Selection::GpioButton => "GPIO   Button Test",
            Selection::GpioPwm => "GPIO   Pwm Test",
            Selection::SpiEcho => "SPI    Echo Speed Test",
            Selection::I2cExpander => "I2C    Expander Test",
            Selection::OneWireTemperature => "1-WIRE Temp Sensor Test",
            Selection::SerialEcho => "SERIAL Echo Test",
        }
    }

    /// Returns the title shown in the banner before the test runs.
    pub fn title(self) -> &'static str {
        match self {
            Selection::GpioBlink => "GPIO Blink Test",
            Selection::GpioButton => "GPIO Button Test",
            Selection::GpioPwm => "GPIO Pwm Test",
            Selection::SpiEcho => "SPI Echo Speed Test",
            Selection::I2cExpander => "I2C Expander Test",
            Selection::OneWireTemperature => "1-WIRE Temperature Sensor Test",
            Selection::SerialEcho => "SERIAL Echo Speed Test",
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.title())
    }
}

/// A test that writes its output to the provided writer.
pub type Command<'a> = Box<dyn FnMut(&mut dyn Write) -> Result<()> + 'a>;

/// Maps menu entries to the commands they run.
#[derive(Default)]
pub struct CommandSet<'a> {
    commands: HashMap<Selection, Command<'a>>,
}

impl<'a> CommandSet<'a> {
    /// Constructs an empty `CommandSet`.
    pub fn new() -> CommandSet<'a> {
        CommandSet {
            commands: HashMap::new(),
        }
    }

    /// Registers `command` for `selection`, replacing any earlier command.
    pub fn insert<F>(&mut self, selection: Selection, command: F)
    where
        F: FnMut(&mut dyn Write) -> Result<()> + 'a,
    {
        self.commands.insert(selection, Box::new(command));
    }

    /// Returns `true` if a command is registered for `selection`.
    pub fn contains(&self, selection: Selection) -> bool {
        self.commands.contains_key(&selection)
    }

    /// Runs the command registered for `selection`.
    pub fn dispatch(&mut self, selection: Selection, out: &mut dyn Write) -> Result<()> {
        match self.commands.get_mut(&selection) {
            Some(command) => command(out),
            None => Err(Error::Unassigned(selection)),
        }
    }
}

impl fmt::Debug for CommandSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut selections: Vec<_> = self.commands.keys().copied().collect();
        selections.sort_by_key(|selection| selection.number());

        f.debug_struct("CommandSet")
            .field("commands", &selections)
            .finish()
    }
}

/// The interactive menu loop.
#[derive(Debug)]
pub struct Menu<'a> {
    commands: CommandSet<'a>,
    stop: StopFlag,
    clear_screen: bool,
}

impl<'a> Menu<'a> {
    /// Constructs a new `Menu` that runs `commands` until the input ends or
    /// `stop` is raised.
    pub fn new(commands: CommandSet<'a>, stop: StopFlag) -> Menu<'a> {
        Menu {
            commands,
            stop,
            clear_screen: false,
        }
    }

    /// When enabled, the screen is cleared every time the menu is shown.
    pub fn set_clear_screen(&mut self, clear_screen: bool) {
        self.clear_screen = clear_screen;
    }

    fn show<W: Write>(&self, output: &mut W) -> io::Result<()> {
        if self.clear_screen {
            write!(output, "{}", CLEAR_SCREEN)?;
        }

        writeln!(output)?;
        writeln!(output, "{}", RULE)?;
        for selection in Selection::ALL {
            writeln!(output, "{}. {}", selection.number(), selection.label())?;
        }
        writeln!(output, "{}", RULE)?;
        writeln!(output, "Type test number (1-7) followed by ENTER")?;
        writeln!(output)?;

        output.flush()
    }

    // Returns false once the input is exhausted. A stop request while
    // waiting exits the process, nothing needs resetting at a prompt.
    fn read_line<R: BufRead>(&self, input: &mut R, line: &mut String) -> io::Result<bool> {
        line.clear();

        self.stop.set_idle(true);
        let read = input.read_line(line);
        self.stop.set_idle(false);

        Ok(read? > 0)
    }

    /// Shows the menu and runs the selected tests.
    ///
    /// Input that isn't a number between 1 and 7 redisplays the menu. A
    /// failing test prints its error and returns to the menu.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<()> {
        let mut line = String::new();

        while !self.stop.is_raised() {
            self.show(&mut output)?;

            if !self.read_line(&mut input, &mut line)? {
                break;
            }

            let selection = match Selection::parse(&line) {
                Some(selection) => selection,
                None => {
                    debug!("Ignoring menu input {:?}", line.trim());
                    continue;
                }
            };

            info!("Running {}", selection);
            writeln!(output)?;
            writeln!(output, "----==== {} ====----", selection.title())?;

            if let Err(e) = self.commands.dispatch(selection, &mut output) {
                writeln!(output, "{}", e)?;
            }

            if self.stop.is_raised() {
                output.flush()?;
                break;
            }

            writeln!(output)?;
            writeln!(output, "Test finished press ENTER for Menu")?;
            output.flush()?;

            if !self.read_line(&mut input, &mut line)? {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn parses_selections() {
        assert_eq!(Selection::parse("1\n"), Some(Selection::GpioBlink));
        assert_eq!(Selection::parse("  7 "), Some(Selection::SerialEcho));
        assert_eq!(Selection::parse("0"), None);
        assert_eq!(Selection::parse("8"), None);
        assert_eq!(Selection::parse("-1"), None);
        assert_eq!(Selection::parse("abc"), None);
        assert_eq!(Selection::parse(""), None);
    }

    #[test]
    fn numbers_are_contiguous() {
        for (i, selection) in Selection::ALL.iter().enumerate() {
            assert_eq!(selection.number() as usize, i + 1);
            assert_eq!(Selection::from_number(selection.number()), Some(*selection));
        }
    }

    #[test]
    fn runs_only_the_selected_command() {
        let ran = RefCell::new(Vec::new());
        let mut commands = CommandSet::new();
        for selection in Selection::ALL {
            let ran = &ran;
            commands.insert(selection, move |out: &mut dyn Write| {
                ran.borrow_mut().push(selection);
                writeln!(out, "ran {}", selection.number())?;
                Ok(())
            });
        }

        let mut menu = Menu::new(commands, StopFlag::new());
        let mut output = Vec::new();
        menu.run(&b"4\n\n"[..], &mut output).unwrap();

        assert_eq!(*ran.borrow(), vec![Selection::SpiEcho]);

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("----==== SPI Echo Speed Test ====----\nran 4\n"));
        assert!(output.contains("Test finished press ENTER for Menu"));
        assert_eq!(output.matches("Type test number (1-7)").count(), 2);
    }

    #[test]
    fn invalid_input_redisplays_menu() {
        let ran = RefCell::new(0);
        let mut commands = CommandSet::new();
        commands.insert(Selection::GpioBlink, |_: &mut dyn Write| {
            *ran.borrow_mut() += 1;
            Ok(())
        });

        let mut menu = Menu::new(commands, StopFlag::new());
        let mut output = Vec::new();
        menu.run(&b"abc\n0\n8\n"[..], &mut output).unwrap();

        assert_eq!(*ran.borrow(), 0);

        let output = String::from_utf8(output).unwrap();
        assert_eq!(output.matches("Type test number (1-7)").count(), 4);
        assert!(!output.contains("----===="));
        assert!(!output.contains("Test finished"));
    }

    #[test]
    fn errors_are_printed() {
        let mut menu = Menu::new(CommandSet::new(), StopFlag::new());
        let mut output = Vec::new();
        menu.run(&b"5\n"[..], &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("No test available for 5. I2C Expander Test\n"));
        assert!(output.contains("Test finished press ENTER for Menu"));
    }

    #[test]
    fn stop_flag_ends_loop() {
        let stop = StopFlag::new();
        stop.raise();
        let mut menu = Menu::new(CommandSet::new(), stop);
        let mut output = Vec::new();
        menu.run(&b"1\n"[..], &mut output).unwrap();

        assert!(output.is_empty());
    }

    #[test]
    fn stop_during_test_skips_prompt() {
        let stop = StopFlag::new();
        let ran = RefCell::new(0);
        let mut commands = CommandSet::new();
        commands.insert(Selection::GpioButton, |_: &mut dyn Write| {
            *ran.borrow_mut() += 1;
            stop.signal();
            Ok(())
        });

        let mut menu = Menu::new(commands, stop.clone());
        let mut output = Vec::new();
        menu.run(&b"2\n2\n2\n"[..], &mut output).unwrap();

        assert_eq!(*ran.borrow(), 1);
        assert!(!String::from_utf8(output).unwrap().contains("Test finished"));
    }

    // Records whether the stop flag was idle on every read
    struct Watched<'a> {
        stop: &'a StopFlag,
        data: &'a [u8],
        idle: Vec<bool>,
    }

    impl io::Read for Watched<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.idle.push(self.stop.is_idle());
            io::Read::read(&mut self.data, buf)
        }
    }

    #[test]
    fn idle_only_while_waiting_for_input() {
        let stop = StopFlag::new();
        let busy = RefCell::new(Vec::new());
        let mut commands = CommandSet::new();
        commands.insert(Selection::GpioBlink, |_: &mut dyn Write| {
            busy.borrow_mut().push(stop.is_idle());
            Ok(())
        });

        let mut input = io::BufReader::with_capacity(
            1,
            Watched {
                stop: &stop,
                data: b"1\n\n",
                idle: Vec::new(),
            },
        );
        let mut menu = Menu::new(commands, stop.clone());
        menu.run(&mut input, io::sink()).unwrap();

        assert_eq!(*busy.borrow(), vec![false]);
        let watched = input.into_inner();
        assert!(!watched.idle.is_empty());
        assert!(watched.idle.iter().all(|&idle| idle));
        assert!(!stop.is_idle());
    }

    #[test]
    fn clears_screen_when_enabled() {
        let mut menu = Menu::new(CommandSet::new(), StopFlag::new());
        menu.set_clear_screen(true);
        let mut output = Vec::new();
        menu.run(&b""[..], &mut output).unwrap();

        assert!(output.starts_with(CLEAR_SCREEN.as_bytes()));
    }
}
