//! Background loop feeding the detector from a sample source.
//!
//! The loop runs on its own thread, owning both the source and the detector.
//! The only things shared with the rest of the application are the published
//! BPM, the cancellation flag and the loop status.
//!
//! ```text
//!   [ SampleSource ] --(sample)--> [ Detector ] --(bpm)--> {BpmReader}
//!           A                                                  |
//!           +------------- every `cadence` ------------+    readers
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use kardio_dsp::detector::{BeatPhase, Config as DetectorConfig, Detector};
use thiserror::Error;

use crate::bpm::BpmReader;
use crate::clock::{Clock, MonotonicClock};
use crate::log::{debug, info, warning};
use crate::source::{SampleSource, SourceError};

const DEFAULT_CADENCE: Duration = Duration::from_millis(5);
const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

#[derive(Error, Debug)]
pub enum Error {
    #[error("sampling loop is already running")]
    AlreadyRunning,
    #[error("failed to spawn sampling thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// What to do when the source fails to deliver a sample.
///
/// Failed ticks never reach the detector, they are skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailurePolicy {
    /// Keep sampling unless more than the given number of reads in a row
    /// failed.
    Retry { max_consecutive_failures: u32 },
    /// Stop at the first failure.
    Abort,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::Retry {
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl FailurePolicy {
    fn gives_up(self, consecutive_failures: u32) -> bool {
        match self {
            Self::Retry {
                max_consecutive_failures,
            } => consecutive_failures > max_consecutive_failures,
            Self::Abort => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Pause between two samples.
    pub cadence: Duration,
    pub detector: DetectorConfig,
    pub failure_policy: FailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cadence: DEFAULT_CADENCE,
            detector: DetectorConfig::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// State of the sampling loop as seen from outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LoopStatus {
    Stopped = 0,
    Running = 1,
    /// The source ran out of samples. The last BPM stays published.
    Finished = 2,
    /// The failure policy gave up on the source. BPM was reset.
    Failed = 3,
}

impl From<u8> for LoopStatus {
    fn from(other: u8) -> Self {
        match other {
            1 => Self::Running,
            2 => Self::Finished,
            3 => Self::Failed,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct StatusCell(Arc<AtomicU8>);

impl StatusCell {
    fn get(&self) -> LoopStatus {
        LoopStatus::from(self.0.load(Ordering::Acquire))
    }

    fn set(&self, status: LoopStatus) {
        self.0.store(status as u8, Ordering::Release);
    }
}

/// Owner of the sampling loop lifecycle.
///
/// The loop goes `Stopped -> Running -> Stopped`. Starting a running loop is
/// rejected with [`Error::AlreadyRunning`], stopping a stopped one does
/// nothing. Dropping the sampler stops the loop.
///
/// Readers obtained through [`Sampler::reader`] stay valid across restarts.
#[derive(Debug)]
pub struct Sampler {
    config: Config,
    bpm: BpmReader,
    status: StatusCell,
    handle: Option<LoopHandle>,
}

/// Resources of one running loop, created on start and destroyed on stop.
#[derive(Debug)]
struct LoopHandle {
    cancel: Arc<AtomicBool>,
    bpm: BpmReader,
    status: StatusCell,
    thread: JoinHandle<()>,
}

impl LoopHandle {
    fn stop(self) {
        self.cancel.store(true, Ordering::Release);
        if self.thread.join().is_err() {
            warning!("sampling thread panicked");
        }
        self.bpm.reset();
        self.status.set(LoopStatus::Stopped);
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Sampler {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            bpm: BpmReader::default(),
            status: StatusCell::default(),
            handle: None,
        }
    }

    /// Start sampling on a background thread, timed by the wall clock.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyRunning`] if the loop is running, or with
    /// [`Error::Spawn`] if the thread could not be created.
    pub fn start<S>(&mut self, source: S) -> Result<(), Error>
    where
        S: SampleSource + Send + 'static,
    {
        self.start_with_clock(source, MonotonicClock::new())
    }

    /// Start sampling on a background thread, timed by the given clock.
    ///
    /// # Errors
    ///
    /// Same as [`Sampler::start`].
    pub fn start_with_clock<S, C>(&mut self, source: S, clock: C) -> Result<(), Error>
    where
        S: SampleSource + Send + 'static,
        C: Clock + Send + 'static,
    {
        if self.is_running() {
            return Err(Error::AlreadyRunning);
        }
        // Reap a loop that finished or failed on its own.
        self.stop();

        let cancel = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            source,
            clock,
            detector: Detector::new(self.config.detector),
            config: self.config,
            cancel: Arc::clone(&cancel),
            bpm: self.bpm.clone(),
            status: self.status.clone(),
        };

        self.status.set(LoopStatus::Running);
        let thread = match thread::Builder::new()
            .name("kardio-sampler".into())
            .spawn(move || worker.run())
        {
            Ok(thread) => thread,
            Err(error) => {
                self.status.set(LoopStatus::Stopped);
                return Err(error.into());
            }
        };

        info!(
            "sampling started, cadence {} ms",
            self.config.cadence.as_millis() as u64
        );

        self.handle = Some(LoopHandle {
            cancel,
            bpm: self.bpm.clone(),
            status: self.status.clone(),
            thread,
        });

        Ok(())
    }

    /// Stop the loop and reset the published BPM to 0.
    ///
    /// Blocks for up to about one cadence tick plus one source read.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
            info!("sampling stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status() == LoopStatus::Running
    }

    #[must_use]
    pub fn status(&self) -> LoopStatus {
        self.status.get()
    }

    /// The latest published BPM, 0 when no beat stream is detected.
    #[must_use]
    pub fn bpm(&self) -> f32 {
        self.bpm.bpm()
    }

    /// A handle to read BPM from other threads.
    #[must_use]
    pub fn reader(&self) -> BpmReader {
        self.bpm.clone()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<S, C> {
    source: S,
    clock: C,
    detector: Detector,
    config: Config,
    cancel: Arc<AtomicBool>,
    bpm: BpmReader,
    status: StatusCell,
}

impl<S: SampleSource, C: Clock> Worker<S, C> {
    fn run(mut self) {
        let mut consecutive_failures = 0;

        while !self.cancel.load(Ordering::Acquire) {
            match self.source.read() {
                Ok(sample) => {
                    consecutive_failures = 0;
                    self.process(sample);
                }
                Err(SourceError::Exhausted) => {
                    info!("sample source exhausted");
                    self.status.set(LoopStatus::Finished);
                    return;
                }
                Err(error) => {
                    consecutive_failures += 1;
                    warning!("failed to read sample: {}", error);
                    if self.config.failure_policy.gives_up(consecutive_failures) {
                        warning!("giving up after {} failed reads", consecutive_failures);
                        self.bpm.reset();
                        self.status.set(LoopStatus::Failed);
                        return;
                    }
                }
            }

            thread::sleep(self.config.cadence);
        }

        self.bpm.reset();
    }

    fn process(&mut self, sample: u16) {
        if sample > self.config.detector.max_scale {
            warning!("sample {} is out of range, clamping", sample);
        }

        let now = self.clock.now_millis();
        let previous_phase = self.detector.phase();

        if let Some(beat) = self.detector.process(sample, now) {
            debug!("beat at {} ms, {} ms since the previous", beat.at, beat.ibi);
        }

        let phase = self.detector.phase();
        if phase != previous_phase {
            match phase {
                BeatPhase::Steady => {
                    info!("pulse detected, {} BPM", self.detector.rounded_bpm());
                }
                BeatPhase::AwaitingFirstBeat => {
                    info!("pulse signal lost");
                }
                BeatPhase::AwaitingSecondBeat => (),
            }
        }

        self.bpm.publish(self.detector.bpm());
    }
}
