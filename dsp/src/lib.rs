//! Digital signal processing components that estimate heart rate from a
//! photoplethysmography sensor sampled through an ADC.
//!
//! Everything in here is pure computation over integer samples. It does not
//! touch hardware and it does not allocate, so the same detector may run in a
//! firmware interrupt or in a thread of a desktop application.

#![no_std]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

#[cfg(test)]
#[macro_use]
extern crate approx;

#[cfg(test)]
extern crate std;

pub mod detector;
pub mod history;
