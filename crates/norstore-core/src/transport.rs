//! SPI transport contract
//!
//! The driver talks to the flash through this trait only. A transport is a
//! synchronous full-duplex byte pipe with manual chip-select control, which
//! is what both bit-banged GPIO buses and HAL SPI peripherals reduce to.
//!
//! Transfers cannot fail at this level. A transport that can detect bus
//! faults has to deal with them itself (or panic); the flash driver reports
//! everything above this boundary through its own error type.
//!
//! The delay hook defaults to a no-op. Real targets either override
//! [`Transport::delay_ms`] or inject a delay at composition time:
//!
//! ```ignore
//! let bus = MySpi::new(pins).with_delay(|ms| timer.delay_ms(ms));
//! let driver = W25Qxx::new(bus);
//! ```

use crate::spi::opcodes::DUMMY;

/// Byte-level SPI transport with chip-select control
pub trait Transport {
    /// Prepare the bus for use
    ///
    /// Called once by the driver before identification.
    fn init(&mut self) {}

    /// Assert chip select (drive CS low)
    fn select(&mut self);

    /// Release chip select (drive CS high)
    ///
    /// NOR flash latches program and erase commands on the rising CS edge.
    fn deselect(&mut self);

    /// Clock one byte out and return the byte clocked in
    fn exchange(&mut self, byte: u8) -> u8;

    /// Clock out a buffer, discarding whatever comes back
    fn send(&mut self, data: &[u8]) {
        for &byte in data {
            self.exchange(byte);
        }
    }

    /// Fill a buffer with incoming bytes while clocking out filler
    fn receive(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = self.exchange(DUMMY);
        }
    }

    /// Block for the given number of milliseconds
    fn delay_ms(&mut self, _ms: u32) {}

    /// Wrap this transport so that `delay_ms` calls the given function
    fn with_delay<F>(self, delay: F) -> WithDelay<Self, F>
    where
        Self: Sized,
        F: FnMut(u32),
    {
        WithDelay { inner: self, delay }
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn init(&mut self) {
        (**self).init()
    }

    fn select(&mut self) {
        (**self).select()
    }

    fn deselect(&mut self) {
        (**self).deselect()
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        (**self).exchange(byte)
    }

    fn send(&mut self, data: &[u8]) {
        (**self).send(data)
    }

    fn receive(&mut self, buf: &mut [u8]) {
        (**self).receive(buf)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

/// A transport with an injected delay function
///
/// Created by [`Transport::with_delay`].
pub struct WithDelay<T, F> {
    inner: T,
    delay: F,
}

impl<T, F> WithDelay<T, F> {
    /// Get a reference to the wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Get a mutable reference to the wrapped transport
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwrap, dropping the delay function
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport, F: FnMut(u32)> Transport for WithDelay<T, F> {
    fn init(&mut self) {
        self.inner.init()
    }

    fn select(&mut self) {
        self.inner.select()
    }

    fn deselect(&mut self) {
        self.inner.deselect()
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        self.inner.exchange(byte)
    }

    fn send(&mut self, data: &[u8]) {
        self.inner.send(data)
    }

    fn receive(&mut self, buf: &mut [u8]) {
        self.inner.receive(buf)
    }

    fn delay_ms(&mut self, ms: u32) {
        (self.delay)(ms)
    }
}
