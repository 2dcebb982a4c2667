//! Adaptive-threshold detection of heart beats in a pulse waveform.
//!
//! The detector follows the envelope of the signal within each beat cycle
//! and places the detection threshold half way between the observed peak and
//! trough. A beat onset is declared when the signal rises above the threshold,
//! and the beat is closed once it falls back below it. The time between two
//! onsets (IBI) is averaged over the last ten beats to produce BPM.
//!
//! ```text
//!          peak
//!          .--.              .--.
//!         /    \            /    \
//!  ------+------\----------+------\------ threshold
//!       /  onset \__/\     /       \__/\
//!  ____/  closure  notch\_/  trough      \__
//! ```
//!
//! Two windows reject false beats:
//!
//! * Nothing counts as an onset within the refractory period of 250 ms after
//!   the previous one, filtering high frequency noise.
//! * Troughs and onsets are ignored until 3/5 of the last IBI passed. This
//!   skips the dichrotic notch, a secondary dip following the true peak.
//!
//! If no beat is confirmed for 2.5 seconds, the signal is considered lost and
//! the detector starts over.

use crate::history::IntervalHistory;

/// Number of inter-beat intervals averaged into BPM.
pub const HISTORY_LENGTH: usize = 10;

const REFRACTORY_PERIOD: u64 = 250;
const SIGNAL_LOSS_TIMEOUT: u64 = 2500;
const MILLIS_PER_MINUTE: f32 = 60_000.0;

/// Scale of the converter feeding the detector and seeds of its state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// The highest value the converter may return.
    pub max_scale: u16,
    /// Value the envelope returns to after the signal is lost.
    pub mid_scale: u16,
    /// Threshold used before the first beat closes.
    pub initial_threshold: u16,
    /// Interval assumed before the first beat, in milliseconds.
    pub initial_ibi: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_resolution(10)
    }
}

impl Config {
    /// Configuration for a converter of the given bit depth.
    ///
    /// # Panics
    ///
    /// Resolution must be between 2 and 16 bits.
    #[must_use]
    pub fn with_resolution(bits: u32) -> Self {
        assert!((2..=16).contains(&bits));
        let max_scale = (1_u32 << bits) - 1;
        let mid_scale = 1_u32 << (bits - 1);
        // Seeded slightly above the middle, 525 for a 10-bit converter.
        let initial_threshold = mid_scale + mid_scale * 13 / 512;
        Self {
            max_scale: max_scale as u16,
            mid_scale: mid_scale as u16,
            initial_threshold: initial_threshold as u16,
            initial_ibi: 600,
        }
    }
}

/// Progress of seeding the interval history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BeatPhase {
    /// No beat was seen since start or since the signal was lost.
    AwaitingFirstBeat,
    /// One onset was seen, the next one gives the first real interval.
    AwaitingSecondBeat,
    /// History is populated and BPM is being reported.
    Steady,
}

/// Confirmed beat onset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Beat {
    /// Time since the previous onset, or since start for the first beat.
    pub ibi: u64,
    /// Sample counter at the moment of the onset.
    pub at: u64,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Detector {
    config: Config,
    peak: u16,
    trough: u16,
    threshold: u16,
    amplitude: u16,
    pulse: bool,
    last_time: u64,
    sample_counter: u64,
    last_beat_time: u64,
    last_ibi: u64,
    history: IntervalHistory<HISTORY_LENGTH>,
    phase: BeatPhase,
    bpm: f32,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Detector {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            peak: config.mid_scale,
            trough: config.mid_scale,
            threshold: config.initial_threshold,
            amplitude: 0,
            pulse: false,
            last_time: 0,
            sample_counter: 0,
            last_beat_time: 0,
            last_ibi: config.initial_ibi,
            history: IntervalHistory::new(),
            phase: BeatPhase::AwaitingFirstBeat,
            bpm: 0.0,
        }
    }

    /// Feed the next sample taken at `now_millis` since start.
    ///
    /// Samples above `max_scale` are clamped. Time is expected to be
    /// monotonic, a timestamp older than the previous one counts as no time
    /// passed.
    ///
    /// Returns the beat if this sample confirmed an onset.
    pub fn process(&mut self, signal: u16, now_millis: u64) -> Option<Beat> {
        let signal = signal.min(self.config.max_scale);

        self.sample_counter = self
            .sample_counter
            .saturating_add(now_millis.saturating_sub(self.last_time));
        self.last_time = self.last_time.max(now_millis);

        let since_beat = self.sample_counter - self.last_beat_time;
        let past_notch = self.is_past_dichrotic_notch(since_beat);

        if signal < self.threshold && past_notch {
            self.trough = self.trough.min(signal);
        }
        if signal > self.threshold && signal > self.peak {
            self.peak = signal;
        }

        let mut beat = None;
        if since_beat > REFRACTORY_PERIOD && signal > self.threshold && !self.pulse && past_notch
        {
            let onset = Beat {
                ibi: since_beat,
                at: self.sample_counter,
            };
            self.pulse = true;
            self.last_ibi = onset.ibi;
            self.last_beat_time = onset.at;

            match self.phase {
                BeatPhase::AwaitingFirstBeat => {
                    // There is no interval to average yet.
                    self.phase = BeatPhase::AwaitingSecondBeat;
                    return Some(onset);
                }
                BeatPhase::AwaitingSecondBeat => {
                    self.history.seed(onset.ibi);
                    self.phase = BeatPhase::Steady;
                }
                BeatPhase::Steady => {
                    self.history.write(onset.ibi);
                }
            }
            self.bpm = self
                .history
                .average()
                .map_or(0.0, |ibi| MILLIS_PER_MINUTE / ibi);
            beat = Some(onset);
        }

        if signal < self.threshold && self.pulse {
            self.close_beat();
        }

        if since_beat > SIGNAL_LOSS_TIMEOUT {
            self.reset_lost_signal();
        }

        beat
    }

    fn is_past_dichrotic_notch(&self, since_beat: u64) -> bool {
        since_beat.saturating_mul(5) > self.last_ibi.saturating_mul(3)
    }

    fn close_beat(&mut self) {
        self.pulse = false;
        self.amplitude = self.peak.saturating_sub(self.trough);
        self.threshold = self.trough + self.amplitude / 2;
        self.peak = self.threshold;
        self.trough = self.threshold;
    }

    fn reset_lost_signal(&mut self) {
        self.threshold = self.config.mid_scale;
        self.peak = self.config.mid_scale;
        self.trough = self.config.mid_scale;
        self.history.reset();
        self.last_beat_time = self.sample_counter;
        self.phase = BeatPhase::AwaitingFirstBeat;
        self.bpm = 0.0;
    }

    /// Current estimate, 0 while there is no valid beat stream.
    #[must_use]
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Current estimate rounded to whole beats, for reporting.
    #[must_use]
    pub fn rounded_bpm(&self) -> u16 {
        libm::roundf(self.bpm) as u16
    }

    #[must_use]
    pub fn phase(&self) -> BeatPhase {
        self.phase
    }

    #[must_use]
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    #[must_use]
    pub fn peak(&self) -> u16 {
        self.peak
    }

    #[must_use]
    pub fn trough(&self) -> u16 {
        self.trough
    }

    /// True between a beat onset and its closure.
    #[must_use]
    pub fn pulse(&self) -> bool {
        self.pulse
    }

    /// Peak to trough distance of the last closed beat.
    #[must_use]
    pub fn amplitude(&self) -> u16 {
        self.amplitude
    }

    #[must_use]
    pub fn last_ibi(&self) -> u64 {
        self.last_ibi
    }

    /// Milliseconds elapsed since start.
    #[must_use]
    pub fn sample_counter(&self) -> u64 {
        self.sample_counter
    }

    #[must_use]
    pub fn history(&self) -> &IntervalHistory<HISTORY_LENGTH> {
        &self.history
    }
}
