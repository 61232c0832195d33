// Copyright 2026 the Edgewise Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded-history velocity estimation for release/fling classification.
//!
//! The tracker keeps a small fixed ring of `(time, position)` samples and
//! estimates release velocity with an impulse integration over the recent
//! window. Velocities are reported in position units per 1000 ms so fling
//! thresholds can be expressed on one fixed normalization regardless of the
//! sampling rate.
//!
//! Exact numeric parity with any particular platform's least-squares fit is
//! not a goal; the estimate is sign-correct and of comparable magnitude,
//! which is all fling classification needs.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Ring capacity. Gestures rarely produce more than this many samples
/// inside the horizon.
const HISTORY: usize = 20;

/// Samples older than this are ignored when estimating.
const HORIZON_MS: u64 = 100;

/// A gap longer than this between consecutive samples means the pointer
/// stopped; older samples are discarded from the estimate.
const ASSUME_STOPPED_MS: u64 = 40;

#[derive(Copy, Clone, Debug, Default)]
struct TimedSample {
    time_ms: u64,
    position: f64,
}

/// One-dimensional velocity tracker over a fixed ring buffer.
///
/// Feed it the axis component of each move sample; ask for the velocity at
/// release time. Reset it on every new down.
#[derive(Clone, Debug)]
pub struct VelocityTracker {
    ring: [Option<TimedSample>; HISTORY],
    head: usize,
}

impl Default for VelocityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl VelocityTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            ring: [None; HISTORY],
            head: 0,
        }
    }

    /// Record the axis position at `time_ms`.
    pub fn add(&mut self, time_ms: u64, position: f64) {
        self.head = (self.head + 1) % HISTORY;
        self.ring[self.head] = Some(TimedSample { time_ms, position });
    }

    /// Drop all recorded samples.
    pub fn reset(&mut self) {
        self.ring = [None; HISTORY];
        self.head = 0;
    }

    /// Estimated velocity in position units per 1000 ms.
    ///
    /// Returns `0.0` with fewer than two usable samples, or when the most
    /// recent samples show the pointer had already stopped.
    pub fn velocity(&self) -> f64 {
        let mut positions = [0.0_f64; HISTORY];
        let mut ages = [0.0_f64; HISTORY];
        let mut count = 0;

        let Some(newest) = self.ring[self.head] else {
            return 0.0;
        };

        // Walk backwards from the newest sample, stopping at the horizon or
        // at a gap long enough to mean the pointer stopped.
        let mut idx = self.head;
        let mut newer_time = newest.time_ms;
        while let Some(sample) = self.ring[idx] {
            let age = newest.time_ms.saturating_sub(sample.time_ms);
            let gap = newer_time.saturating_sub(sample.time_ms);
            if age > HORIZON_MS || gap > ASSUME_STOPPED_MS {
                break;
            }
            newer_time = sample.time_ms;

            positions[count] = sample.position;
            ages[count] = -(age as f64);
            count += 1;
            if count >= HISTORY {
                break;
            }
            idx = if idx == 0 { HISTORY - 1 } else { idx - 1 };
        }

        if count < 2 {
            return 0.0;
        }

        impulse_velocity(&positions[..count], &ages[..count]) * 1000.0
    }

    /// Estimated velocity clamped to `[-max, max]`.
    pub fn velocity_clamped(&self, max: f64) -> f64 {
        if !max.is_finite() || max <= 0.0 {
            return 0.0;
        }
        let v = self.velocity();
        if v.is_nan() { 0.0 } else { v.clamp(-max, max) }
    }
}

/// Impulse integration: accumulate the kinetic energy the samples impart
/// and convert back to a signed velocity. Entry 0 is the newest sample;
/// `times` are non-positive ages in milliseconds.
fn impulse_velocity(positions: &[f64], times: &[f64]) -> f64 {
    debug_assert!(
        positions.len() == times.len() && positions.len() >= 2,
        "impulse estimate needs matched samples"
    );
    let mut work = 0.0_f64;
    let oldest = positions.len() - 1;
    let mut next_time = times[oldest];

    for i in (1..=oldest).rev() {
        let current_time = next_time;
        next_time = times[i - 1];
        if current_time == next_time {
            continue;
        }
        let delta = positions[i - 1] - positions[i];
        let v_curr = delta / (next_time - current_time);
        let v_prev = energy_to_velocity(work);
        work += (v_curr - v_prev) * v_curr.abs();
        if i == oldest {
            work *= 0.5;
        }
    }
    energy_to_velocity(work)
}

/// `E = v^2 / 2` with unit mass, inverted and sign-preserving.
#[inline]
fn energy_to_velocity(energy: f64) -> f64 {
    energy.signum() * (2.0 * energy.abs()).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_reports_zero() {
        assert_eq!(VelocityTracker::new().velocity(), 0.0);
    }

    #[test]
    fn single_sample_reports_zero() {
        let mut t = VelocityTracker::new();
        t.add(0, 100.0);
        assert_eq!(t.velocity(), 0.0);
    }

    #[test]
    fn constant_motion_estimates_rate() {
        let mut t = VelocityTracker::new();
        // 100 units per 10 ms = 10_000 units per second.
        for i in 0..4 {
            t.add(i * 10, (i as f64) * 100.0);
        }
        let v = t.velocity();
        assert!((v - 10_000.0).abs() < 1_000.0, "expected ~10000, got {v}");
    }

    #[test]
    fn reversed_motion_is_negative() {
        let mut t = VelocityTracker::new();
        t.add(0, 300.0);
        t.add(10, 200.0);
        t.add(20, 100.0);
        assert!(t.velocity() < 0.0);
    }

    #[test]
    fn reset_discards_history() {
        let mut t = VelocityTracker::new();
        t.add(0, 0.0);
        t.add(10, 100.0);
        t.reset();
        assert_eq!(t.velocity(), 0.0);
    }

    #[test]
    fn clamp_bounds_the_estimate() {
        let mut t = VelocityTracker::new();
        t.add(0, 0.0);
        t.add(1, 10_000.0);
        assert_eq!(t.velocity_clamped(8_000.0), 8_000.0);

        t.reset();
        t.add(0, 10_000.0);
        t.add(1, 0.0);
        assert_eq!(t.velocity_clamped(8_000.0), -8_000.0);
    }

    #[test]
    fn samples_outside_horizon_are_ignored() {
        let mut t = VelocityTracker::new();
        t.add(0, 0.0);
        // A burst well past the horizon relative to the first sample.
        t.add(150, 100.0);
        t.add(160, 200.0);
        t.add(170, 300.0);
        assert!(t.velocity().abs() > 0.0);
    }

    #[test]
    fn long_gap_means_stopped() {
        let mut t = VelocityTracker::new();
        t.add(0, 0.0);
        t.add(ASSUME_STOPPED_MS + 1, 100.0);
        assert_eq!(t.velocity(), 0.0);
    }
}
