//! Dialed number accumulation and publication.
//!
//! [`NumberAggregator`] is the only code that mutates the dialed number. It
//! appends one digit per decoded session and hands the finished number to a
//! [`NumberSink`], either straight away (no timeout configured) or when the
//! inter-digit timeout wakes the sampler.

use heapless::spsc::Producer;
use heapless::String;

use crate::clock::Ticks;
use crate::constants::MAX_NUMBER_DIGITS;
use crate::sync::TimeoutFlag;

use super::timer::OneShotTimer;

/// Fixed-capacity buffer holding the digits dialed so far.
pub type DialedNumber = String<MAX_NUMBER_DIGITS>;

/// Receiver of completed numbers.
///
/// `number` contains ASCII decimal digits only. It is empty only when a
/// timeout fires with no digits pending.
///
/// `publish` runs on the sampler task. It must return quickly: an edge that
/// arrives meanwhile is sampled on a grid that is already running, so a slow
/// sink garbles the next digit. Hand slow work to another context through
/// [`QueueSink`].
pub trait NumberSink {
    fn publish(&mut self, number: &str);
}

impl<F> NumberSink for F
where
    F: FnMut(&str),
{
    fn publish(&mut self, number: &str) {
        self(number)
    }
}

/// Queue hand-off: the sampler task produces, application code consumes
/// from the matching [`heapless::spsc::Consumer`].
///
/// When the queue is full the number is dropped.
pub struct QueueSink<'q, const N: usize> {
    producer: Producer<'q, DialedNumber, N>,
}

impl<'q, const N: usize> QueueSink<'q, N> {
    pub fn new(producer: Producer<'q, DialedNumber, N>) -> Self {
        QueueSink { producer }
    }

    /// Whether the consumer has fallen behind.
    pub fn is_full(&self) -> bool {
        !self.producer.ready()
    }
}

impl<const N: usize> NumberSink for QueueSink<'_, N> {
    fn publish(&mut self, number: &str) {
        let mut owned = DialedNumber::new();
        // Cannot fail: `number` came out of a `DialedNumber`.
        let _ = owned.push_str(number);
        if self.producer.enqueue(owned).is_err() {
            warn!("number queue full, dropping {}", number);
        }
    }
}

/// Owner of the dialed number.
///
/// `timer` is `None` when aggregation is disabled; every digit is then
/// published on its own.
pub struct NumberAggregator<'a, S, T> {
    number: DialedNumber,
    sink: S,
    timer: Option<T>,
    timeout: Ticks,
    flag: &'a TimeoutFlag,
}

impl<'a, S, T> NumberAggregator<'a, S, T>
where
    S: NumberSink,
    T: OneShotTimer,
{
    /// Create an aggregator with an empty number.
    ///
    /// `timeout` is the inter-digit timeout in ticks; it is ignored when
    /// `timer` is `None`.
    pub fn new(flag: &'a TimeoutFlag, sink: S, timer: Option<T>, timeout: Ticks) -> Self {
        NumberAggregator {
            number: DialedNumber::new(),
            sink,
            timer,
            timeout,
            flag,
        }
    }

    /// Append `digit` (0–9) to the number.
    ///
    /// With a timer, restarts it so the deadline measures idle time since
    /// this digit. A timeout that fired while this digit was being sampled is
    /// stale and gets cleared. Without a timer, the number is emitted at once.
    pub fn append_digit(&mut self, digit: u8, now: Ticks) {
        debug_assert!(digit <= 9, "digit out of range: {}", digit);

        let c = char::from(b'0' + digit % 10);
        if self.number.push(c).is_err() {
            warn!("dialed number full, dropping digit {}", digit);
        }

        match self.timer {
            Some(ref mut timer) => {
                // Restart before clearing: an expiry landing in between
                // would otherwise leave the flag raised.
                timer.restart(now, self.timeout);
                self.flag.clear();
            }
            None => self.emit(),
        }
    }

    /// Publish the current number, then clear it and the timeout flag.
    ///
    /// An empty number is published as the empty string.
    pub fn emit(&mut self) {
        info!("publishing dialed number {}", self.number.as_str());
        self.sink.publish(self.number.as_str());
        self.number.clear();
        self.flag.clear();
    }

    /// Digits accumulated since the last emission.
    pub fn number(&self) -> &str {
        self.number.as_str()
    }

    /// Whether digits are held back until a timeout.
    pub fn is_aggregating(&self) -> bool {
        self.timer.is_some()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
