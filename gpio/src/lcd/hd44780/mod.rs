//! HD44780 LCD module.
//!
//! Covers the common 16x2 character panels. The driver is write-only: the
//! busy flag is never polled, commands are spaced by conservative delays
//! instead, so the RW pin may be tied low on the board.

pub mod driver;
