// Copyright 2026 the Edgewise Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! External collaborator interfaces: the transition engine that animates a
//! claimed gesture, the platform pointer source, and the read-only device
//! policy consulted during a session.
//!
//! These traits describe the seams only; the engines behind them live
//! outside this workspace.

use edgewise_event::{EdgeFlags, GestureClass, SourceKind};
use kurbo::{Point, Rect};

/// Margin, in input units, within which a contact counts as starting at a
/// screen edge.
const EDGE_MARGIN: f64 = 20.0;

/// The navigation edge uses a taller grab zone than its visual bar.
const NAV_EDGE_MARGIN: f64 = 32.0;

/// Opaque handle for an in-flight transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TransitionHandle(pub u64);

/// Why a transition engine refused to start.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EngineError {
    /// The transition target no longer exists (window closed, task gone).
    TargetGone,
    /// The engine is already running an exclusive transition.
    Busy,
}

/// What a claimed gesture asks the transition engine to do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransitionIntent {
    /// Classification of the claiming consumer.
    pub class: GestureClass,
    /// Edges the gesture originated from.
    pub edges: EdgeFlags,
    /// Device class that produced the gesture.
    pub source: SourceKind,
}

/// The animation/transition engine that moves windows once a gesture is
/// claimed.
///
/// A [`GestureSession`](crate::session::GestureSession) calls these after a
/// claim. `update_progress` is never called before the engine's readiness
/// callback has been relayed via
/// [`GestureSession::transition_ready`](crate::session::GestureSession::transition_ready);
/// the session buffers progress until then.
pub trait TransitionEngine {
    /// Begin a transition. Returns a handle, or an error when the target
    /// cannot be animated; errors are recovered locally by the session.
    fn start_transition(&mut self, intent: TransitionIntent)
    -> Result<TransitionHandle, EngineError>;

    /// Drive the transition. `value` is the current drag displacement.
    fn update_progress(&mut self, handle: TransitionHandle, value: f64);

    /// Commit the transition. `to_target` selects the far snap target
    /// (set for flings, independent of final displacement).
    fn finish(&mut self, handle: TransitionHandle, to_target: bool);

    /// Abort the transition and unwind.
    fn cancel(&mut self, handle: TransitionHandle);
}

/// The platform source of raw pointer samples.
pub trait PointerSource {
    /// The global exclusivity primitive: suppress delivery of further raw
    /// samples to every consumer outside the claiming chain.
    fn pilfer(&mut self);

    /// Throughput hint; not correctness-relevant. Claimed gestures disable
    /// batching so progress tracks the finger without added latency.
    fn set_batching_enabled(&mut self, enabled: bool);
}

/// A pointer source for hosts (and tests) without a platform primitive.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullSource;

impl PointerSource for NullSource {
    fn pilfer(&mut self) {}
    fn set_batching_enabled(&mut self, _enabled: bool) {}
}

/// Device and policy state, read-only for the duration of a session.
#[derive(Clone, Debug)]
pub struct DevicePolicy {
    /// Screen geometry in input coordinates.
    pub screen: Rect,
    /// Where the navigation bar sits.
    pub nav_edge: EdgeFlags,
    /// Gesture classes disabled by user preference or policy; recognizers
    /// carrying a disabled class never claim.
    pub disabled: GestureClass,
    /// Whether one-handed mode is currently engaged.
    pub one_handed_active: bool,
    /// Whether an accessibility service is consuming shortcuts.
    pub accessibility_active: bool,
}

impl DevicePolicy {
    /// Edge-origin flags for a contact at `pos`.
    ///
    /// Platform pipelines usually stamp edge flags at the source; sessions
    /// fall back to this for hosts that deliver bare positions. The
    /// navigation edge gets a taller grab zone than the other edges.
    pub fn edges_at(&self, pos: Point) -> EdgeFlags {
        let margin = |edge: EdgeFlags| {
            if self.nav_edge.contains(edge) {
                NAV_EDGE_MARGIN
            } else {
                EDGE_MARGIN
            }
        };
        let mut edges = EdgeFlags::empty();
        if pos.x - self.screen.x0 <= margin(EdgeFlags::LEFT) {
            edges |= EdgeFlags::LEFT;
        }
        if self.screen.x1 - pos.x <= margin(EdgeFlags::RIGHT) {
            edges |= EdgeFlags::RIGHT;
        }
        if pos.y - self.screen.y0 <= margin(EdgeFlags::TOP) {
            edges |= EdgeFlags::TOP;
        }
        if self.screen.y1 - pos.y <= margin(EdgeFlags::BOTTOM) {
            edges |= EdgeFlags::BOTTOM;
        }
        edges
    }
}

impl Default for DevicePolicy {
    fn default() -> Self {
        Self {
            screen: Rect::new(0.0, 0.0, 1080.0, 2400.0),
            nav_edge: EdgeFlags::BOTTOM,
            disabled: GestureClass::empty(),
            one_handed_active: false,
            accessibility_active: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_contact_touches_no_edge() {
        let device = DevicePolicy::default();
        assert_eq!(device.edges_at(Point::new(540.0, 1200.0)), EdgeFlags::empty());
    }

    #[test]
    fn corner_contact_reports_both_edges() {
        let device = DevicePolicy::default();
        assert_eq!(
            device.edges_at(Point::new(5.0, 5.0)),
            EdgeFlags::LEFT | EdgeFlags::TOP
        );
    }

    #[test]
    fn nav_edge_has_a_taller_grab_zone() {
        let device = DevicePolicy::default();
        // 30 units from the bottom: inside the nav grab zone, outside the
        // ordinary edge margin.
        assert_eq!(device.edges_at(Point::new(540.0, 2370.0)), EdgeFlags::BOTTOM);
        assert_eq!(device.edges_at(Point::new(540.0, 30.0)), EdgeFlags::empty());
    }
}
