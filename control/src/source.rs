//! Capability of reading raw samples from a pulse sensor.

use embedded_hal::spi::ErrorKind;
use thiserror::Error;

/// Failure of a sample source, distinct from any in-range sample.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SourceError {
    #[error("sample source did not respond in time")]
    Timeout,
    #[error("sensor is disconnected")]
    Disconnected,
    #[error("bus transfer failed: {0}")]
    Bus(ErrorKind),
    /// A finite source, such as a recorded trace, has nothing more to give.
    #[error("sample source is exhausted")]
    Exhausted,
}

/// Anything that can be asked for the next sample.
///
/// Reads are expected to return well within the sampling cadence. Sources
/// talking to hardware should bound their transaction and report
/// [`SourceError::Timeout`] instead of blocking the loop.
pub trait SampleSource {
    /// # Errors
    ///
    /// Fails with [`SourceError`] when no sample could be obtained.
    fn read(&mut self) -> Result<u16, SourceError>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read(&mut self) -> Result<u16, SourceError> {
        (**self).read()
    }
}

/// Replays recorded samples, then reports [`SourceError::Exhausted`].
#[derive(Debug, Clone, Default)]
pub struct Trace {
    samples: Vec<u16>,
    position: usize,
}

impl From<Vec<u16>> for Trace {
    fn from(samples: Vec<u16>) -> Self {
        Self {
            samples,
            position: 0,
        }
    }
}

impl FromIterator<u16> for Trace {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl Trace {
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl SampleSource for Trace {
    fn read(&mut self) -> Result<u16, SourceError> {
        let sample = self
            .samples
            .get(self.position)
            .copied()
            .ok_or(SourceError::Exhausted)?;
        self.position += 1;
        Ok(sample)
    }
}

/// Source backed by a closure, see [`from_fn`].
#[derive(Debug, Clone)]
pub struct FromFn<F>(F);

/// Use a closure as a sample source. Handy for synthetic waveforms.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut() -> Result<u16, SourceError>,
{
    FromFn(f)
}

impl<F> SampleSource for FromFn<F>
where
    F: FnMut() -> Result<u16, SourceError>,
{
    fn read(&mut self) -> Result<u16, SourceError> {
        (self.0)()
    }
}
