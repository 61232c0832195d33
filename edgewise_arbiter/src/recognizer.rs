// Copyright 2026 the Edgewise Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gesture recognizers: one parameterized node plus a closed set of
//! classification policies.
//!
//! Every recognizer shares the same three-state skeleton (watch samples,
//! claim or delegate, then either exclusively own the gesture or forward
//! everything); what varies is the *decision policy* — the geometric and
//! temporal gates that decide whether a gesture instance belongs to this
//! recognizer. Policies are a closed enum ([`GesturePolicy`]) so the
//! skeleton lives in one place and match arms stay exhaustive.
//!
//! ## Geometric gates
//!
//! - Slop is tested in squared-distance space; no square root on the hot
//!   path.
//! - The angle cone compares the signed drag angle, in degrees with upward
//!   motion positive, against an inclusive `[min°, max°]` window (a hair of
//!   tolerance absorbs float rounding at the edges). The cone is
//!   direction-sensitive: an upward cone never accepts the opposing pull.
//! - When the tracked pointer lifts while others remain, the recognizer
//!   re-anchors with the same continuity rule as the drag detector.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use edgewise_detector::{DragConfig, DragDetector, DragListener, VelocityTracker};
use edgewise_event::{Action, GestureClass, PointerId, PointerSample};
use kurbo::{Point, Rect};
use log::debug;
use smallvec::smallvec;

use crate::chain::{ClaimRecord, EventBuf, ExclusivityState, FeedCtx, GestureEvent, Node};
use crate::engine::DevicePolicy;

/// Tolerance, in degrees, applied at the cone edges so a drag constructed
/// exactly on a threshold angle is inside the cone despite float rounding.
const ANGLE_EPSILON: f64 = 1e-6;

/// Angle-cone policy: claim once slop and a minimum drag distance are
/// passed with the drag direction inside an angular window.
///
/// Angles are signed and measured from screen-right with upward motion
/// positive, in `(-180°, 180°]`: a rightward drag is 0°, straight up is
/// 90°, straight down is -90°. Both cone edges are inclusive. A drag that
/// passes slop *outside* the cone rejects the recognizer for the rest of
/// the session — the direction is established.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AngleCone {
    /// Lower cone edge in degrees, inclusive.
    pub min_degrees: f64,
    /// Upper cone edge in degrees, inclusive.
    pub max_degrees: f64,
    /// Minimum total drag distance before claiming.
    pub min_drag_distance: f64,
}

impl Default for AngleCone {
    fn default() -> Self {
        Self {
            min_degrees: 30.0,
            max_degrees: 90.0,
            min_drag_distance: 100.0,
        }
    }
}

/// Long-press policy: claim once the touch has been held inside a spatial
/// hot zone for a minimum duration without drifting.
///
/// The hold check is event-timestamp driven: the claim fires on the first
/// sample whose timestamp puts the hold past `hold_ms`. There are no
/// timers in the pipeline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LongPress {
    /// Hold duration in milliseconds.
    pub hold_ms: u64,
    /// Hot zone the touch must stay inside.
    pub zone: Rect,
    /// Maximum drift from the down position before rejecting.
    pub move_slop: f64,
}

impl Default for LongPress {
    fn default() -> Self {
        Self {
            hold_ms: 400,
            zone: Rect::new(0.0, 0.0, 1080.0, 2400.0),
            move_slop: 24.0,
        }
    }
}

/// Fling-only policy: classifies itself only at release, using the release
/// velocity and the total travelled distance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FlingOnly {
    /// Minimum release speed, in units per 1000 ms.
    pub min_velocity: f64,
    /// Minimum total drag distance at release.
    pub min_distance: f64,
}

impl Default for FlingOnly {
    fn default() -> Self {
        Self {
            min_velocity: 1_000.0,
            min_distance: 50.0,
        }
    }
}

/// Hover policy: claim when a hover sample enters the hot zone. A contact
/// (down) rejects — the gesture is someone else's.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HoverZone {
    /// Zone hover samples must enter.
    pub zone: Rect,
}

/// The closed set of classification policies.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GesturePolicy {
    /// See [`AngleCone`].
    AngleCone(AngleCone),
    /// See [`LongPress`].
    LongPress(LongPress),
    /// See [`FlingOnly`].
    FlingOnly(FlingOnly),
    /// See [`HoverZone`].
    Hover(HoverZone),
}

/// Per-sample decision of a policy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Verdict {
    /// The gesture is this recognizer's; claim it now.
    Claim,
    /// The gesture is definitively not this recognizer's.
    Reject,
    /// Keep watching.
    Undecided,
}

/// What a policy sees of the gesture so far.
struct Observation<'a> {
    sample: &'a PointerSample,
    down: Option<Point>,
    down_time: u64,
    pos: Point,
    dist_sq: f64,
    slop_passed: bool,
    /// Release velocity estimate; only meaningful on `Up`.
    velocity: f64,
}

impl GesturePolicy {
    fn evaluate(&self, obs: &Observation<'_>) -> Verdict {
        match self {
            Self::AngleCone(cone) => cone.evaluate(obs),
            Self::LongPress(press) => press.evaluate(obs),
            Self::FlingOnly(fling) => fling.evaluate(obs),
            Self::Hover(hover) => hover.evaluate(obs),
        }
    }
}

impl AngleCone {
    fn evaluate(&self, obs: &Observation<'_>) -> Verdict {
        match obs.sample.action {
            Action::Up => Verdict::Reject,
            Action::Move | Action::PointerRemoved => {
                let Some(down) = obs.down else {
                    return Verdict::Undecided;
                };
                if !obs.slop_passed {
                    return Verdict::Undecided;
                }
                let delta = obs.pos - down;
                // Screen y grows downward; flip it so the angle frame has
                // upward positive, matching the vertical drag axis.
                let angle = (-delta.y).atan2(delta.x).to_degrees();
                if angle + ANGLE_EPSILON < self.min_degrees
                    || angle - ANGLE_EPSILON > self.max_degrees
                {
                    return Verdict::Reject;
                }
                if obs.dist_sq >= self.min_drag_distance * self.min_drag_distance {
                    Verdict::Claim
                } else {
                    Verdict::Undecided
                }
            }
            _ => Verdict::Undecided,
        }
    }
}

impl LongPress {
    fn evaluate(&self, obs: &Observation<'_>) -> Verdict {
        match obs.sample.action {
            Action::Down => {
                if self.zone.contains(obs.pos) {
                    Verdict::Undecided
                } else {
                    Verdict::Reject
                }
            }
            Action::Up => Verdict::Reject,
            Action::Hover => Verdict::Undecided,
            _ => {
                if obs.down.is_none() {
                    return Verdict::Undecided;
                }
                if !self.zone.contains(obs.pos) {
                    return Verdict::Reject;
                }
                if obs.dist_sq > self.move_slop * self.move_slop {
                    return Verdict::Reject;
                }
                if obs.sample.timestamp.saturating_sub(obs.down_time) >= self.hold_ms {
                    Verdict::Claim
                } else {
                    Verdict::Undecided
                }
            }
        }
    }
}

impl FlingOnly {
    fn evaluate(&self, obs: &Observation<'_>) -> Verdict {
        match obs.sample.action {
            Action::Up => {
                if obs.velocity.abs() > self.min_velocity
                    && obs.dist_sq >= self.min_distance * self.min_distance
                {
                    Verdict::Claim
                } else {
                    Verdict::Reject
                }
            }
            _ => Verdict::Undecided,
        }
    }
}

impl HoverZone {
    fn evaluate(&self, obs: &Observation<'_>) -> Verdict {
        match obs.sample.action {
            Action::Hover => {
                if self.zone.contains(obs.pos) {
                    Verdict::Claim
                } else {
                    Verdict::Undecided
                }
            }
            Action::Down => Verdict::Reject,
            _ => Verdict::Undecided,
        }
    }
}

/// Thresholds shared by every recognizer, independent of policy.
#[derive(Copy, Clone, Debug)]
pub struct RecognizerConfig {
    /// Classification tags this recognizer reports when it owns a gesture.
    pub class: GestureClass,
    /// Slop for finger-touch sources.
    pub slop: f64,
    /// Slop for precise sources (trackpad/mouse); falls back to `slop`
    /// when `None`.
    pub precise_slop: Option<f64>,
    /// Drag detector configuration used once the recognizer is active.
    pub drag: DragConfig,
}

impl RecognizerConfig {
    /// A config with default thresholds for `class`.
    pub fn new(class: GestureClass) -> Self {
        Self {
            class,
            slop: 10.0,
            precise_slop: Some(5.0),
            drag: DragConfig::default(),
        }
    }

    /// Builder-style slop override.
    pub fn with_slop(mut self, slop: f64) -> Self {
        self.slop = slop;
        self
    }

    /// Builder-style drag config override.
    pub fn with_drag(mut self, drag: DragConfig) -> Self {
        self.drag = drag;
        self
    }
}

/// Maps detector callbacks onto chain events during the active phase.
struct Collector {
    events: EventBuf,
    fling_threshold: f64,
}

impl DragListener for Collector {
    fn on_drag_start(&mut self, _initial: bool) {}

    fn on_drag(&mut self, displacement: f64, _sample: &PointerSample) -> bool {
        self.events.push(GestureEvent::Progress { displacement });
        true
    }

    fn on_drag_end(&mut self, velocity: f64) {
        self.events.push(GestureEvent::Committed {
            velocity,
            fling: velocity.abs() > self.fling_threshold,
        });
    }
}

/// One recognizer in the consumer chain, wrapping the rest of the chain.
///
/// Shares the uniform three-state lifecycle (see
/// [`ExclusivityState`]); the decision policy is injected as a
/// [`GesturePolicy`]. Once active, displacement and velocity
/// interpretation is delegated to an owned [`DragDetector`] with slop
/// pre-passed.
#[derive(Debug)]
pub struct RecognizerNode {
    class: GestureClass,
    policy: GesturePolicy,
    state: ExclusivityState,
    slop: f64,
    precise_slop: Option<f64>,
    effective_slop: f64,
    tracked: Option<PointerId>,
    down: Option<Point>,
    down_time: u64,
    last: Point,
    slop_passed: bool,
    velocity: VelocityTracker,
    detector: DragDetector,
    claim: Option<ClaimRecord>,
    cancels_seen: u32,
    /// The claimed gesture has committed or been abandoned; further
    /// samples are ignored.
    resolved: bool,
    inner: Node,
}

impl RecognizerNode {
    /// Create a recognizer wrapping `inner`.
    pub fn new(config: RecognizerConfig, policy: GesturePolicy, inner: Node) -> Self {
        Self {
            class: config.class,
            policy,
            state: ExclusivityState::Inactive,
            slop: config.slop,
            precise_slop: config.precise_slop,
            effective_slop: config.slop,
            tracked: None,
            down: None,
            down_time: 0,
            last: Point::ZERO,
            slop_passed: false,
            velocity: VelocityTracker::new(),
            detector: DragDetector::new(config.drag),
            claim: None,
            cancels_seen: 0,
            resolved: false,
            inner,
        }
    }

    /// Current exclusivity state.
    pub fn state(&self) -> ExclusivityState {
        self.state
    }

    /// Classification tags of this recognizer.
    pub fn class(&self) -> GestureClass {
        self.class
    }

    /// The consumer this recognizer wraps.
    pub fn inner(&self) -> &Node {
        &self.inner
    }

    pub(crate) fn inner_mut(&mut self) -> &mut Node {
        &mut self.inner
    }

    /// Diagnostic record of this node's claim, if it claimed.
    pub fn claim_record(&self) -> Option<ClaimRecord> {
        self.claim
    }

    /// Cancels this node has received (synthesized or real).
    pub fn cancels_seen(&self) -> u32 {
        self.cancels_seen
    }

    /// Release per-gesture resources without touching the state machine.
    pub(crate) fn release_trackers(&mut self) {
        self.velocity.reset();
        self.detector.reset();
        self.tracked = None;
        self.down = None;
        self.slop_passed = false;
    }

    pub(crate) fn feed(&mut self, sample: &PointerSample, ctx: FeedCtx<'_>) -> EventBuf {
        if sample.action == Action::Cancel {
            return self.on_cancel(sample, ctx);
        }
        match self.state {
            ExclusivityState::Active => self.feed_active(sample),
            ExclusivityState::DelegateActive => self.inner.feed(sample, ctx),
            ExclusivityState::Inactive => self.feed_inactive(sample, ctx),
        }
    }

    /// Cancels are deliverable at any time and idempotent for every state.
    fn on_cancel(&mut self, sample: &PointerSample, ctx: FeedCtx<'_>) -> EventBuf {
        self.cancels_seen += 1;
        let mut events = EventBuf::new();
        if self.state == ExclusivityState::Active {
            if !self.resolved {
                self.resolved = true;
                self.detector.reset();
                events.push(GestureEvent::Abandoned);
            }
        } else {
            self.release_trackers();
        }
        events.extend(self.inner.feed(sample, ctx));
        events
    }

    /// Policy gates that reject a class outright, independent of geometry.
    /// Accessibility shortcuts only exist while a service is consuming
    /// them, and the one-handed activation gesture is inert while the mode
    /// is already engaged.
    fn blocked_by(&self, device: &DevicePolicy) -> bool {
        device.disabled.intersects(self.class)
            || (self.class.contains(GestureClass::ACCESSIBILITY) && !device.accessibility_active)
            || (self.class.contains(GestureClass::ONE_HANDED) && device.one_handed_active)
    }

    fn feed_inactive(&mut self, sample: &PointerSample, ctx: FeedCtx<'_>) -> EventBuf {
        self.observe(sample);
        let verdict = if self.blocked_by(ctx.device) {
            Verdict::Reject
        } else {
            let obs = Observation {
                sample,
                down: self.down,
                down_time: self.down_time,
                pos: self.last,
                dist_sq: self
                    .down
                    .map_or(0.0, |down| (self.last - down).hypot2()),
                slop_passed: self.slop_passed,
                velocity: if sample.action == Action::Up {
                    self.velocity
                        .velocity_clamped(self.detector.config().max_velocity)
                } else {
                    0.0
                },
            };
            self.policy.evaluate(&obs)
        };

        match verdict {
            Verdict::Claim => {
                if !ctx.pilfer.get() && self.inner.allow_intercept_by_parent() {
                    let mut events = self.claim(sample, ctx);
                    if sample.action == Action::Up {
                        // Decided at release: commit in the same feed so the
                        // claim always resolves.
                        let velocity = self
                            .velocity
                            .velocity_clamped(self.detector.config().max_velocity);
                        events.push(GestureEvent::Committed {
                            velocity,
                            fling: velocity.abs() > self.detector.config().release_velocity,
                        });
                        self.resolved = true;
                    } else {
                        self.detector.force_drag_start();
                        events.extend(self.feed_active(sample));
                    }
                    events
                } else {
                    // Lost the race; the gesture already belongs elsewhere.
                    self.state = ExclusivityState::DelegateActive;
                    self.release_trackers();
                    self.inner.feed(sample, ctx)
                }
            }
            Verdict::Reject => {
                self.state = ExclusivityState::DelegateActive;
                self.release_trackers();
                self.inner.feed(sample, ctx)
            }
            Verdict::Undecided => {
                let events = self.inner.feed(sample, ctx);
                if events
                    .iter()
                    .any(|e| matches!(e, GestureEvent::Claimed { .. }))
                {
                    self.state = ExclusivityState::DelegateActive;
                    self.release_trackers();
                }
                events
            }
        }
    }

    fn feed_active(&mut self, sample: &PointerSample) -> EventBuf {
        if self.resolved {
            return EventBuf::new();
        }
        let mut collector = Collector {
            events: EventBuf::new(),
            fling_threshold: self.detector.config().release_velocity,
        };
        self.detector.feed(sample, &mut collector);
        let mut events = collector.events;
        if sample.action == Action::Up {
            if !events
                .iter()
                .any(|e| matches!(e, GestureEvent::Committed { .. }))
            {
                // The claim resolved without a drag (a press-like gesture);
                // commit neutrally rather than leaving the claim dangling.
                events.push(GestureEvent::Committed {
                    velocity: 0.0,
                    fling: false,
                });
            }
            self.resolved = true;
        }
        events
    }

    /// Take exclusive ownership. Claiming twice, or claiming after another
    /// node already holds the pilfer token, is a programming error: loud in
    /// debug builds, a silent no-op in release.
    fn claim(&mut self, sample: &PointerSample, ctx: FeedCtx<'_>) -> EventBuf {
        debug_assert_eq!(
            self.state,
            ExclusivityState::Inactive,
            "claim on a non-inactive node"
        );
        debug_assert!(!ctx.pilfer.get(), "claim after the pilfer token was taken");
        if self.state != ExclusivityState::Inactive || ctx.pilfer.get() {
            return EventBuf::new();
        }
        self.state = ExclusivityState::Active;
        ctx.pilfer.set(true);
        // The wrapped consumer unwinds whatever it had begun building —
        // exactly once, before any exclusive handling.
        let cancel = sample.synthesize_cancel();
        let _ = self.inner.feed(&cancel, ctx);
        self.claim = Some(ClaimRecord {
            class: self.class,
            timestamp: sample.timestamp,
        });
        debug!("gesture claimed: {:?} at {} ms", self.class, sample.timestamp);
        smallvec![GestureEvent::Claimed { class: self.class }]
    }

    /// Pre-claim for a session initialized mid-drag: slop is treated as
    /// already passed and no cancel is synthesized (nothing downstream has
    /// built state yet).
    pub(crate) fn force_resume(&mut self, ctx: FeedCtx<'_>, timestamp: u64) -> bool {
        debug_assert_eq!(
            self.state,
            ExclusivityState::Inactive,
            "resume on a non-inactive node"
        );
        if self.state != ExclusivityState::Inactive || ctx.pilfer.get() {
            return false;
        }
        self.state = ExclusivityState::Active;
        ctx.pilfer.set(true);
        self.claim = Some(ClaimRecord {
            class: self.class,
            timestamp,
        });
        self.detector.force_drag_start();
        debug!("gesture resumed mid-drag: {:?}", self.class);
        true
    }

    /// Track the gesture while inactive: down anchor, re-anchoring on
    /// pointer lifts, slop accounting, and velocity history.
    fn observe(&mut self, sample: &PointerSample) {
        match sample.action {
            Action::Down => {
                let Some((id, pos)) = sample.first_pointer() else {
                    return;
                };
                self.tracked = Some(id);
                self.down = Some(pos);
                self.down_time = sample.timestamp;
                self.last = pos;
                self.slop_passed = false;
                self.effective_slop = if sample.source.is_precise() {
                    self.precise_slop.unwrap_or(self.slop)
                } else {
                    self.slop
                };
                self.velocity.reset();
                self.velocity.add(sample.timestamp, self.axis_component(pos));
            }
            Action::PointerRemoved => {
                let Some((removed, _)) = sample.first_pointer() else {
                    return;
                };
                if Some(removed) != self.tracked {
                    return;
                }
                let Some((other, other_pos)) = sample.other_pointer(removed) else {
                    return;
                };
                // Same continuity rule as the drag detector: shift the
                // anchor by the displacement already travelled.
                if let Some(down) = self.down {
                    let carried = self.last - down;
                    self.down = Some(other_pos - carried);
                }
                self.tracked = Some(other);
                self.last = other_pos;
                self.velocity.reset();
                self.velocity
                    .add(sample.timestamp, self.axis_component(other_pos));
            }
            Action::Move | Action::Up => {
                let Some(id) = self.tracked else {
                    return;
                };
                let Some(pos) = sample.position_of(id) else {
                    // Malformed: tracked pointer absent. Absorb.
                    return;
                };
                self.last = pos;
                self.velocity.add(sample.timestamp, self.axis_component(pos));
                if !self.slop_passed
                    && let Some(down) = self.down
                {
                    let dist_sq = (pos - down).hypot2();
                    self.slop_passed = dist_sq > self.effective_slop * self.effective_slop;
                }
            }
            Action::Hover => {
                if let Some((_, pos)) = sample.first_pointer() {
                    self.last = pos;
                }
            }
            Action::PointerAdded | Action::Key | Action::Cancel => {}
        }
    }

    /// Axis component used for the pre-claim velocity history, matching
    /// the post-claim detector's axis.
    fn axis_component(&self, pos: Point) -> f64 {
        match self.detector.config().axis {
            edgewise_detector::Axis::Horizontal => pos.x,
            edgewise_detector::Axis::Vertical => -pos.y,
        }
    }
}
