//! Synthetic rhythm driving the glitch pulses.
//!
//! There is no audio input: the beat is a fixed tempo derived from the time
//! uniform. Every beat produces one pulse that rises within the first 5% of
//! the beat and decays through the rest of it.

use crate::kernel::{fract, smoothstep};

/// Beats per second of the internal clock.
pub const BEAT_SPEED: f32 = 0.3;

const ATTACK_END: f32 = 0.05;
const RELEASE_START: f32 = 0.4;
const RELEASE_END: f32 = 1.2;
const RELEASE_CEILING: f32 = 0.9;

/// Position of a timestamp within the beat grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatClock {
    /// Whole beats elapsed, kept as `f32` because it seeds the shader hashes.
    pub index: f32,
    /// Phase within the current beat in `[0, 1)`.
    pub fraction: f32,
    /// Pulse intensity for this phase, see [`envelope`].
    pub activation: f32,
}

impl BeatClock {
    /// Samples the clock at the built-in tempo.
    pub fn at(seconds: f32) -> Self {
        Self::with_speed(seconds, BEAT_SPEED)
    }

    pub fn with_speed(seconds: f32, beat_speed: f32) -> Self {
        let phase = seconds * beat_speed;
        let fraction = fract(phase);
        Self {
            index: phase.floor(),
            fraction,
            activation: envelope(fraction),
        }
    }

    /// Timestamp (seconds) at which the current beat started.
    pub fn start_time(&self, beat_speed: f32) -> f32 {
        self.index / beat_speed
    }
}

/// Attack/release pulse for a phase within one beat.
///
/// Zero at the downbeat, 0.9 on the plateau between 5% and 40% of the beat,
/// then decaying towards the next downbeat.
pub fn envelope(fraction: f32) -> f32 {
    let attack = smoothstep(0.0, ATTACK_END, fraction);
    let release = RELEASE_CEILING - smoothstep(RELEASE_START, RELEASE_END, fraction);
    attack * release
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_is_silent_on_the_downbeat() {
        for beat in 0..8 {
            let clock = BeatClock::with_speed(beat as f32, 1.0);
            assert_eq!(clock.index, beat as f32);
            assert!(clock.activation.abs() < 1e-6, "beat {beat}: {clock:?}");
        }
    }

    #[test]
    fn envelope_rises_to_plateau_then_decays() {
        let mut last = 0.0;
        for step in 0..=50 {
            let fraction = step as f32 / 1000.0;
            let value = envelope(fraction);
            assert!(value >= last - f32::EPSILON, "rise broken at {fraction}");
            last = value;
        }
        assert!((envelope(ATTACK_END) - RELEASE_CEILING).abs() < 1e-6);

        let mut last = envelope(ATTACK_END);
        for step in 50..1000 {
            let fraction = step as f32 / 1000.0;
            let value = envelope(fraction);
            assert!(value <= last + f32::EPSILON, "decay broken at {fraction}");
            last = value;
        }
        assert!(envelope(0.999) < 0.1);
    }

    #[test]
    fn scenario_samples_match_the_tempo() {
        let at_zero = BeatClock::at(0.0);
        assert_eq!(at_zero.index, 0.0);
        assert!(at_zero.activation.abs() < 1e-6);

        // 0.05 of a beat at 0.3 beats/s.
        let attack_peak = BeatClock::at(0.05 / BEAT_SPEED);
        assert!(attack_peak.activation > 0.89);

        let plateau = BeatClock::at(1.0);
        assert!((plateau.fraction - 0.3).abs() < 1e-5);
        assert!((plateau.activation - 0.9).abs() < 1e-5);

        let tail = BeatClock::at(3.3);
        assert_eq!(tail.index, 0.0);
        assert!(tail.fraction > 0.98);
        assert!(tail.activation < 0.1);
        assert!(tail.activation < plateau.activation);
    }

    #[test]
    fn start_time_inverts_the_tempo() {
        let clock = BeatClock::at(11.0);
        assert_eq!(clock.index, 3.0);
        assert!((clock.start_time(BEAT_SPEED) - 10.0).abs() < 1e-4);
    }
}
