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

//! Cooperative stop requests.
//!
//! `drop` methods aren't called when a process is abnormally terminated, for
//! instance when a user presses <kbd>Ctrl</kbd> + <kbd>C</kbd> and the
//! `SIGINT` signal isn't caught. That would leave LEDs lit, PWM running and
//! pins in their output state. [`StopFlag::install`] catches `SIGINT` and
//! `SIGTERM` instead, and every test loop checks the flag between steps so
//! it can return and let the peripherals reset themselves.
//!
//! Reads from stdin aren't interrupted by a caught signal. While the flag is
//! marked idle, which the menu does around every prompt, no peripheral is in
//! use and a signal exits the process right away. A second signal during a
//! test does the same.

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use simple_signal::{self, Signal};

/// A shared flag that's raised when the process is asked to stop.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    raised: Arc<AtomicBool>,
    idle: Arc<AtomicBool>,
}

impl StopFlag {
    /// Constructs a new, lowered `StopFlag`.
    pub fn new() -> StopFlag {
        StopFlag::default()
    }

    /// Raises the flag when a `SIGINT` or `SIGTERM` signal is caught, or
    /// exits the process if the flag is idle or already raised.
    pub fn install(&self) {
        let flag = self.clone();
        simple_signal::set_handler(&[Signal::Int, Signal::Term], move |signals| {
            log::debug!("Caught {:?}, stopping", signals);
            if flag.signal() {
                let terminated = signals.iter().any(|s| matches!(s, Signal::Term));
                process::exit(if terminated { 143 } else { 130 });
            }
        });
    }

    /// Handles a stop request. Returns `true` if the process should exit
    /// immediately, otherwise raises the flag and returns `false`.
    pub fn signal(&self) -> bool {
        self.is_idle() || self.raised.swap(true, Ordering::SeqCst)
    }

    /// Marks whether the process is waiting for input with no peripheral in
    /// use.
    pub fn set_idle(&self, idle: bool) {
        self.idle.store(idle, Ordering::SeqCst);
    }

    /// Returns `true` if the process is waiting for input.
    pub fn is_idle(&self) -> bool {
        self.idle.load(Ordering::SeqCst)
    }

    /// Raises the flag.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if a stop was requested.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = StopFlag::new();
        let other = flag.clone();

        assert!(!other.is_raised());
        flag.raise();
        assert!(other.is_raised());
    }

    #[test]
    fn signal_while_idle_exits() {
        let flag = StopFlag::new();
        flag.set_idle(true);

        assert!(flag.signal());
        assert!(!flag.is_raised());
    }

    #[test]
    fn signal_during_test_raises_then_exits() {
        let flag = StopFlag::new();

        assert!(!flag.signal());
        assert!(flag.is_raised());
        assert!(flag.signal());
    }
}
