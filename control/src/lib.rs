//! Sampling loop driving the pulse detector against a live sensor.
//!
//! The detector in `kardio-dsp` is pure computation. This crate wraps it
//! into a background thread pulling samples from a [`SampleSource`] on a
//! fixed cadence and publishing the latest BPM for anyone to read:
//!
//! ```text
//!                 [ Sampler ] -- start/stop --+
//!                                             |
//!                                             V
//!   [ Mcp3008 / Trace / ... ] --> [ sampling thread {Detector} ]
//!                                             |
//!                                             | (BPM)
//!                                             V
//!                                       {BpmReader} --> [ any thread ]
//! ```
//!
//! Only the BPM, the cancellation flag and the loop status cross the thread
//! boundary. Sensor reads that fail are reported as [`SourceError`] and
//! handled by the loop's [`FailurePolicy`], never passed to the detector.

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]

#[cfg(test)]
#[macro_use]
extern crate approx;

pub mod bpm;
pub mod clock;
mod log;
pub mod mcp3008;
pub mod sampler;
pub mod source;

pub use bpm::BpmReader;
pub use clock::{Clock, MonotonicClock, SteppedClock};
pub use sampler::{Config, Error, FailurePolicy, LoopStatus, Sampler};
pub use source::{SampleSource, SourceError, Trace};
