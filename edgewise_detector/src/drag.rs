// Copyright 2026 the Edgewise Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drag-axis state machine: `Idle → Dragging → Settling → Idle`.
//!
//! [`DragDetector`] converts a raw pointer-event stream into
//! drag-start / drag / drag-end callbacks along one configured axis.
//! See the crate docs for the full lifecycle and the recatch rules.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use edgewise_event::{Action, PointerId, PointerSample};
use kurbo::Point;
use log::trace;

use crate::velocity::VelocityTracker;

/// Lifecycle state of a drag detector.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DragState {
    /// No drag recognized; accumulating displacement against slop.
    Idle,
    /// Slop passed; displacement deltas are being delivered.
    Dragging,
    /// The pointer released mid-drag and a settle animation owns the
    /// motion. A new down may recatch it (see
    /// [`DragConfig::ignore_slop_when_settling`]).
    Settling,
}

/// Axis a detector measures displacement along.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Axis {
    /// Displacement along x; y is the orthogonal component.
    Horizontal,
    /// Displacement along y, positive pointing *up* the screen (negated
    /// device y), which is how navigation swipes are measured.
    Vertical,
}

impl Axis {
    /// Axis component of a point, with vertical flipped so upward motion
    /// is positive.
    fn component(self, p: Point) -> f64 {
        match self {
            Self::Horizontal => p.x,
            Self::Vertical => -p.y,
        }
    }

    /// The orthogonal component.
    fn orthogonal(self, p: Point) -> f64 {
        match self {
            Self::Horizontal => -p.y,
            Self::Vertical => p.x,
        }
    }
}

bitflags::bitflags! {
    /// Which displacement signs are allowed to start a drag.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DirectionMask: u8 {
        /// Drags toward positive displacement.
        const POSITIVE = 0b01;
        /// Drags toward negative displacement.
        const NEGATIVE = 0b10;
        /// Either direction.
        const BOTH = 0b11;
    }
}

/// Configuration for a [`DragDetector`].
#[derive(Clone, Copy, Debug)]
pub struct DragConfig {
    /// Measured axis.
    pub axis: Axis,
    /// Directions that may start a drag.
    pub directions: DirectionMask,
    /// Minimum displacement before a drag is recognized as intentional.
    pub touch_slop: f64,
    /// Release speed (units per 1000 ms) above which a release counts as
    /// a fling.
    pub release_velocity: f64,
    /// Upper bound applied to reported release velocity.
    pub max_velocity: f64,
    /// Mirror horizontal displacement for right-to-left layouts.
    pub rtl: bool,
    /// Transition `Settling → Dragging` directly on the next down, without
    /// re-imposing slop. Used when an in-flight settle animation may be
    /// grabbed again mid-flight.
    pub ignore_slop_when_settling: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            axis: Axis::Vertical,
            directions: DirectionMask::BOTH,
            touch_slop: 10.0,
            release_velocity: 500.0,
            max_velocity: 30_000.0,
            rtl: false,
            ignore_slop_when_settling: false,
        }
    }
}

/// Receiver for drag lifecycle callbacks.
///
/// All methods are called on the input thread, strictly in sample order.
pub trait DragListener {
    /// A drag began. `initial` is true when it started from `Idle` by
    /// passing slop, false when it recaught a settling animation.
    fn on_drag_start(&mut self, initial: bool);

    /// A displacement update. Slop has already been subtracted, so the
    /// first delivered value reads near zero.
    ///
    /// The return value is a consumption hint for wrapping consumers; the
    /// detector itself keeps delivering regardless.
    fn on_drag(&mut self, displacement: f64, sample: &PointerSample) -> bool;

    /// The pointer released while dragging. `velocity` is in units per
    /// 1000 ms with the same axis mirroring as displacement.
    fn on_drag_end(&mut self, velocity: f64);
}

/// One-dimensional swipe/drag detector.
///
/// Feed it every sample of a gesture session; it runs the
/// `Idle → Dragging → Settling → Idle` state machine and reports through a
/// [`DragListener`]. One detector instance serves one session at a time;
/// call [`DragDetector::finished_scrolling`] once any settle animation
/// completes to return it to `Idle`.
#[derive(Clone, Debug)]
pub struct DragDetector {
    config: DragConfig,
    state: DragState,
    tracked: Option<PointerId>,
    /// Reference position displacement is measured from. `None` until the
    /// first down (or first move, for a detector resumed mid-drag).
    reference: Option<Point>,
    last: Point,
    /// Axis displacement of the last delivered drag, slop-subtracted.
    displacement: f64,
    /// Slop amount removed from delivered displacement; zero when slop was
    /// pre-passed (recatch or forced start).
    subtracted_slop: f64,
    velocity: VelocityTracker,
}

impl DragDetector {
    /// Create an idle detector.
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            state: DragState::Idle,
            tracked: None,
            reference: None,
            last: Point::ZERO,
            displacement: 0.0,
            subtracted_slop: 0.0,
            velocity: VelocityTracker::new(),
        }
    }

    /// The configuration this detector was built with.
    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DragState {
        self.state
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.state == DragState::Dragging
    }

    /// Last delivered (slop-subtracted) displacement.
    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    /// Whether a release velocity classifies as a fling.
    pub fn is_fling(&self, velocity: f64) -> bool {
        velocity.abs() > self.config.release_velocity
    }

    /// Force the detector into `Dragging` with slop pre-passed.
    ///
    /// Used when a session is initialized already mid-drag (a second
    /// gesture starting before the first one's animation settles must not
    /// re-impose slop). The reference position is adopted from the next
    /// sample that carries pointer data.
    pub fn force_drag_start(&mut self) {
        self.state = DragState::Dragging;
        self.subtracted_slop = 0.0;
        trace!("drag detector force-started");
    }

    /// Force `Settling → Idle`. Callers invoke this once any settle
    /// animation completes.
    pub fn finished_scrolling(&mut self) {
        if self.state == DragState::Settling {
            self.state = DragState::Idle;
            trace!("drag detector settled to idle");
        }
    }

    /// Release per-gesture resources without changing configuration.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
        self.tracked = None;
        self.reference = None;
        self.displacement = 0.0;
        self.subtracted_slop = 0.0;
        self.velocity.reset();
    }

    /// Push one raw sample through the state machine.
    pub fn feed<L: DragListener>(&mut self, sample: &PointerSample, listener: &mut L) {
        match sample.action {
            Action::Down => self.on_down(sample, listener),
            Action::PointerAdded => {}
            Action::PointerRemoved => self.on_pointer_removed(sample),
            Action::Move => self.on_move(sample, listener),
            Action::Up => self.on_up(sample, listener),
            Action::Cancel => self.on_cancel(),
            Action::Hover | Action::Key => {}
        }
    }

    fn on_down<L: DragListener>(&mut self, sample: &PointerSample, listener: &mut L) {
        let Some((id, pos)) = sample.first_pointer() else {
            return;
        };
        self.tracked = Some(id);
        self.reference = Some(pos);
        self.last = pos;
        self.velocity.reset();
        self.velocity
            .add(sample.timestamp, self.mirrored(self.config.axis.component(pos)));

        if self.state == DragState::Settling && self.config.ignore_slop_when_settling {
            // Recatch: grab the in-flight animation without re-imposing slop.
            self.subtracted_slop = 0.0;
            self.displacement = 0.0;
            self.state = DragState::Dragging;
            trace!("recatch: settling -> dragging");
            listener.on_drag_start(false);
        }
    }

    fn on_pointer_removed(&mut self, sample: &PointerSample) {
        let Some((removed, _)) = sample.first_pointer() else {
            return;
        };
        if Some(removed) != self.tracked {
            return;
        }
        let Some((other, other_pos)) = sample.other_pointer(removed) else {
            return;
        };
        // Re-anchor so displacement stays continuous: the new reference is
        // shifted by however far the lifted pointer had traveled.
        if let Some(reference) = self.reference {
            let carried = self.last - reference;
            self.reference = Some(other_pos - carried);
        } else {
            self.reference = Some(other_pos);
        }
        self.tracked = Some(other);
        self.last = other_pos;
        // The velocity history belongs to the lifted pointer; restart it
        // from the new anchor so the switch does not read as a spike.
        self.velocity.reset();
        self.velocity.add(
            sample.timestamp,
            self.mirrored(self.config.axis.component(other_pos)),
        );
    }

    fn on_move<L: DragListener>(&mut self, sample: &PointerSample, listener: &mut L) {
        let pos = match self.tracked {
            Some(id) => match sample.position_of(id) {
                Some(p) => p,
                // Malformed: the tracked pointer is not in the sample.
                None => return,
            },
            // Resumed mid-drag: adopt the first observed pointer.
            None => match sample.first_pointer() {
                Some((id, p)) => {
                    self.tracked = Some(id);
                    p
                }
                None => return,
            },
        };
        let reference = *self.reference.get_or_insert(pos);
        self.last = pos;

        let delta = pos - reference;
        let raw = self.mirrored(self.config.axis.component(delta.to_point()));
        let orthogonal = self.config.axis.orthogonal(delta.to_point());
        self.velocity
            .add(sample.timestamp, self.mirrored(self.config.axis.component(pos)));

        if self.state != DragState::Dragging {
            if !self.should_start(raw, orthogonal) {
                return;
            }
            let initial = self.state == DragState::Idle;
            self.subtracted_slop = if raw > 0.0 {
                self.config.touch_slop
            } else {
                -self.config.touch_slop
            };
            self.state = DragState::Dragging;
            trace!("drag start (initial: {initial})");
            listener.on_drag_start(initial);
        }

        self.displacement = raw - self.subtracted_slop;
        let _ = listener.on_drag(self.displacement, sample);
    }

    fn on_up<L: DragListener>(&mut self, sample: &PointerSample, listener: &mut L) {
        if let Some(id) = self.tracked
            && let Some(pos) = sample.position_of(id)
        {
            self.velocity
                .add(sample.timestamp, self.mirrored(self.config.axis.component(pos)));
        }
        if self.state == DragState::Dragging {
            self.state = DragState::Settling;
            let velocity = self.velocity.velocity_clamped(self.config.max_velocity);
            trace!("drag end, velocity {velocity}");
            listener.on_drag_end(velocity);
        }
        self.tracked = None;
    }

    /// A cancel aborts the gesture: no `on_drag_end`, straight to `Idle`.
    fn on_cancel(&mut self) {
        if self.state != DragState::Idle {
            trace!("drag canceled");
        }
        self.reset();
    }

    /// The two-part start gate: displacement must exceed both slop and the
    /// orthogonal component, and its sign must be one the owner cares
    /// about.
    fn should_start(&self, displacement: f64, orthogonal: f64) -> bool {
        let magnitude = displacement.abs();
        if magnitude <= self.config.touch_slop.max(orthogonal.abs()) {
            return false;
        }
        let direction = if displacement > 0.0 {
            DirectionMask::POSITIVE
        } else {
            DirectionMask::NEGATIVE
        };
        self.config.directions.contains(direction)
    }

    fn mirrored(&self, value: f64) -> f64 {
        if self.config.rtl && self.config.axis == Axis::Horizontal {
            -value
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use edgewise_event::PointerSample;

    /// Records every callback in order.
    #[derive(Default)]
    struct Recorder {
        starts: Vec<bool>,
        drags: Vec<f64>,
        ends: Vec<f64>,
    }

    impl DragListener for Recorder {
        fn on_drag_start(&mut self, initial: bool) {
            self.starts.push(initial);
        }
        fn on_drag(&mut self, displacement: f64, _sample: &PointerSample) -> bool {
            self.drags.push(displacement);
            true
        }
        fn on_drag_end(&mut self, velocity: f64) {
            self.ends.push(velocity);
        }
    }

    fn vertical(slop: f64) -> DragDetector {
        DragDetector::new(DragConfig {
            axis: Axis::Vertical,
            touch_slop: slop,
            ..DragConfig::default()
        })
    }

    fn pid(n: u64) -> PointerId {
        PointerId::new(n).unwrap()
    }

    #[test]
    fn below_slop_never_starts() {
        let mut d = vertical(10.0);
        let mut r = Recorder::default();
        d.feed(&PointerSample::down(Point::new(0.0, 100.0), 0), &mut r);
        // 9 units upward: strictly under slop.
        d.feed(&PointerSample::moved(Point::new(0.0, 91.0), 10), &mut r);
        // Exactly slop: still not started (the gate is strict).
        d.feed(&PointerSample::moved(Point::new(0.0, 90.0), 20), &mut r);
        assert_eq!(d.state(), DragState::Idle);
        assert!(r.starts.is_empty());
        assert!(r.drags.is_empty());
    }

    #[test]
    fn first_drag_reads_near_zero_after_slop() {
        let mut d = vertical(10.0);
        let mut r = Recorder::default();
        d.feed(&PointerSample::down(Point::new(0.0, 100.0), 0), &mut r);
        d.feed(&PointerSample::moved(Point::new(0.0, 88.0), 10), &mut r);
        assert_eq!(d.state(), DragState::Dragging);
        assert_eq!(r.starts, [true]);
        // 12 up, slop 10 subtracted.
        assert_eq!(r.drags, [2.0]);
    }

    #[test]
    fn orthogonal_dominant_motion_does_not_start() {
        let mut d = vertical(10.0);
        let mut r = Recorder::default();
        d.feed(&PointerSample::down(Point::new(0.0, 100.0), 0), &mut r);
        // 20 up but 30 sideways: orthogonal wins the gate.
        d.feed(&PointerSample::moved(Point::new(30.0, 80.0), 10), &mut r);
        assert_eq!(d.state(), DragState::Idle);
    }

    #[test]
    fn direction_mask_rejects_wrong_sign() {
        let mut d = DragDetector::new(DragConfig {
            axis: Axis::Vertical,
            directions: DirectionMask::POSITIVE,
            touch_slop: 10.0,
            ..DragConfig::default()
        });
        let mut r = Recorder::default();
        d.feed(&PointerSample::down(Point::new(0.0, 100.0), 0), &mut r);
        // Downward (negative) swipe of 40.
        d.feed(&PointerSample::moved(Point::new(0.0, 140.0), 10), &mut r);
        assert_eq!(d.state(), DragState::Idle);
        // Upward passes.
        d.feed(&PointerSample::moved(Point::new(0.0, 60.0), 20), &mut r);
        assert_eq!(d.state(), DragState::Dragging);
    }

    #[test]
    fn up_mid_drag_settles_and_reports_velocity() {
        let mut d = vertical(10.0);
        let mut r = Recorder::default();
        d.feed(&PointerSample::down(Point::new(0.0, 500.0), 0), &mut r);
        d.feed(&PointerSample::moved(Point::new(0.0, 460.0), 10), &mut r);
        d.feed(&PointerSample::moved(Point::new(0.0, 420.0), 20), &mut r);
        d.feed(&PointerSample::up(Point::new(0.0, 380.0), 30), &mut r);
        assert_eq!(d.state(), DragState::Settling);
        assert_eq!(r.ends.len(), 1);
        // Upward motion is positive on the vertical axis.
        assert!(r.ends[0] > 0.0);
        assert!(d.is_fling(r.ends[0]));
    }

    #[test]
    fn cancel_mid_drag_never_reports_drag_end() {
        let mut d = vertical(10.0);
        let mut r = Recorder::default();
        d.feed(&PointerSample::down(Point::new(0.0, 500.0), 0), &mut r);
        d.feed(&PointerSample::moved(Point::new(0.0, 400.0), 10), &mut r);
        assert_eq!(d.state(), DragState::Dragging);
        d.feed(&PointerSample::cancel(20), &mut r);
        assert_eq!(d.state(), DragState::Idle);
        assert!(r.ends.is_empty());
    }

    #[test]
    fn recatch_skips_slop_while_settling() {
        let mut d = DragDetector::new(DragConfig {
            axis: Axis::Vertical,
            touch_slop: 10.0,
            ignore_slop_when_settling: true,
            ..DragConfig::default()
        });
        let mut r = Recorder::default();
        // First gesture: down, move(+40), up.
        d.feed(&PointerSample::down(Point::new(0.0, 500.0), 0), &mut r);
        d.feed(&PointerSample::moved(Point::new(0.0, 460.0), 10), &mut r);
        d.feed(&PointerSample::up(Point::new(0.0, 460.0), 20), &mut r);
        assert_eq!(d.state(), DragState::Settling);

        // Second down recatches immediately: dragging, not initial.
        d.feed(&PointerSample::down(Point::new(0.0, 450.0), 30), &mut r);
        assert_eq!(d.state(), DragState::Dragging);
        assert_eq!(r.starts, [true, false]);

        // The first move delivers without any slop subtraction.
        d.feed(&PointerSample::moved(Point::new(0.0, 447.0), 40), &mut r);
        assert_eq!(*r.drags.last().unwrap(), 3.0);
    }

    #[test]
    fn settling_without_recatch_requires_slop_again() {
        let mut d = vertical(10.0);
        let mut r = Recorder::default();
        d.feed(&PointerSample::down(Point::new(0.0, 500.0), 0), &mut r);
        d.feed(&PointerSample::moved(Point::new(0.0, 460.0), 10), &mut r);
        d.feed(&PointerSample::up(Point::new(0.0, 460.0), 20), &mut r);
        assert_eq!(d.state(), DragState::Settling);

        d.feed(&PointerSample::down(Point::new(0.0, 450.0), 30), &mut r);
        assert_eq!(d.state(), DragState::Settling);
        // A sub-slop move does not restart the drag.
        d.feed(&PointerSample::moved(Point::new(0.0, 445.0), 40), &mut r);
        assert_eq!(d.state(), DragState::Settling);
        // Passing slop does, even from settling.
        d.feed(&PointerSample::moved(Point::new(0.0, 430.0), 50), &mut r);
        assert_eq!(d.state(), DragState::Dragging);
    }

    #[test]
    fn finished_scrolling_returns_to_idle() {
        let mut d = vertical(10.0);
        let mut r = Recorder::default();
        d.feed(&PointerSample::down(Point::new(0.0, 500.0), 0), &mut r);
        d.feed(&PointerSample::moved(Point::new(0.0, 400.0), 10), &mut r);
        d.feed(&PointerSample::up(Point::new(0.0, 400.0), 20), &mut r);
        assert_eq!(d.state(), DragState::Settling);
        d.finished_scrolling();
        assert_eq!(d.state(), DragState::Idle);
    }

    #[test]
    fn pointer_removal_keeps_displacement_continuous() {
        let mut d = vertical(10.0);
        let mut r = Recorder::default();
        // Pointer 1 drags up 40 (delivered 30 after slop).
        d.feed(
            &PointerSample::new(Action::Down, [(pid(1), Point::new(0.0, 500.0))], 0),
            &mut r,
        );
        d.feed(
            &PointerSample::new(Action::Move, [(pid(1), Point::new(0.0, 460.0))], 10),
            &mut r,
        );
        assert_eq!(*r.drags.last().unwrap(), 30.0);

        // Pointer 2 is down elsewhere; pointer 1 lifts.
        d.feed(
            &PointerSample::pointer_removed(
                pid(1),
                Point::new(0.0, 460.0),
                [(pid(2), Point::new(100.0, 300.0))],
                20,
            ),
            &mut r,
        );

        // A zero-length move of pointer 2 reports the same displacement.
        d.feed(
            &PointerSample::new(Action::Move, [(pid(2), Point::new(100.0, 300.0))], 30),
            &mut r,
        );
        assert_eq!(*r.drags.last().unwrap(), 30.0);

        // Further motion of pointer 2 accumulates on top.
        d.feed(
            &PointerSample::new(Action::Move, [(pid(2), Point::new(100.0, 290.0))], 40),
            &mut r,
        );
        assert_eq!(*r.drags.last().unwrap(), 40.0);
    }

    #[test]
    fn rtl_mirrors_horizontal_displacement() {
        let mut d = DragDetector::new(DragConfig {
            axis: Axis::Horizontal,
            touch_slop: 10.0,
            rtl: true,
            ..DragConfig::default()
        });
        let mut r = Recorder::default();
        d.feed(&PointerSample::down(Point::new(100.0, 0.0), 0), &mut r);
        // Leftward motion reads positive under RTL.
        d.feed(&PointerSample::moved(Point::new(60.0, 0.0), 10), &mut r);
        assert_eq!(d.state(), DragState::Dragging);
        assert_eq!(r.drags, [30.0]);
    }

    #[test]
    fn forced_start_delivers_without_slop() {
        let mut d = vertical(10.0);
        let mut r = Recorder::default();
        d.force_drag_start();
        assert!(d.is_dragging());
        // No down was ever seen; the first move anchors the reference.
        d.feed(&PointerSample::moved(Point::new(0.0, 400.0), 0), &mut r);
        d.feed(&PointerSample::moved(Point::new(0.0, 395.0), 10), &mut r);
        assert_eq!(*r.drags.last().unwrap(), 5.0);
    }

    #[test]
    fn malformed_move_is_dropped() {
        let mut d = vertical(10.0);
        let mut r = Recorder::default();
        d.feed(
            &PointerSample::new(Action::Down, [(pid(1), Point::new(0.0, 500.0))], 0),
            &mut r,
        );
        // Move referencing a pointer the detector does not track.
        d.feed(
            &PointerSample::new(Action::Move, [(pid(7), Point::new(0.0, 100.0))], 10),
            &mut r,
        );
        assert_eq!(d.state(), DragState::Idle);
        assert!(r.drags.is_empty());
    }
}
