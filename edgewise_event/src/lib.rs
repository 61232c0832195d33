// Copyright 2026 the Edgewise Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edgewise Event: the raw pointer sample model shared by the Edgewise crates.
//!
//! ## Overview
//!
//! Everything in the Edgewise arbitration pipeline consumes one data type:
//! [`PointerSample`], a single immutable pointer event carrying an action
//! kind, a set of `(pointer id, position)` pairs, a millisecond timestamp,
//! a source kind, and the screen edges the gesture originated from.
//!
//! Samples are passed by reference through the pipeline and never stored
//! beyond the current callback; they are cheap to clone when a consumer
//! needs to synthesize a derived event (see
//! [`PointerSample::synthesize_cancel`]).
//!
//! ## Classification
//!
//! [`GestureClass`] is a small capability-flag set that identifies what
//! *kind* of consumer owns a gesture (assistant, one-handed mode, status
//! bar, …) without naming concrete types. Wrapping consumers use it to
//! query the active consumer in a chain generically.
//!
//! ## Minimal example
//!
//! ```
//! use edgewise_event::{Action, PointerSample, SourceKind};
//! use kurbo::Point;
//!
//! let down = PointerSample::down(Point::new(10.0, 500.0), 1_000);
//! assert_eq!(down.action, Action::Down);
//! assert_eq!(down.pointer_count(), 1);
//!
//! // Every down/up/cancel pair brackets one gesture session.
//! let up = PointerSample::up(Point::new(10.0, 300.0), 1_250);
//! assert!(up.action.is_terminal());
//! assert_eq!(up.source, SourceKind::Touch);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

use core::num::NonZeroU64;

use kurbo::Point;
use smallvec::SmallVec;

/// Pointer identifier, stable for the lifetime of one physical contact.
pub type PointerId = NonZeroU64;

/// The pointer id assigned to the first contact of a gesture.
pub const PRIMARY_POINTER: PointerId = PointerId::MIN;

/// Action kind of a raw pointer sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Action {
    /// First contact went down; starts a gesture session.
    Down,
    /// One or more tracked pointers moved.
    Move,
    /// An additional pointer went down while others are held.
    PointerAdded,
    /// A non-final pointer lifted while others remain down.
    ///
    /// By convention the *first* entry in the sample's pointer list is the
    /// pointer being removed; the remaining entries are still down.
    PointerRemoved,
    /// The final pointer lifted; terminal for the session.
    Up,
    /// The gesture was aborted by the platform or a claiming consumer;
    /// terminal for the session.
    Cancel,
    /// Hover motion without contact (mouse or low-hover touch).
    Hover,
    /// A key event routed through the gesture pipeline (e.g. a navigation
    /// shortcut pressed mid-gesture).
    Key,
}

impl Action {
    /// Whether this action ends the gesture session.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Up | Self::Cancel)
    }
}

/// Input device class that produced a sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SourceKind {
    /// Direct finger contact on a touchscreen.
    Touch,
    /// Multi-finger trackpad.
    Trackpad,
    /// Mouse (including hover-capable pens reported as mice).
    Mouse,
}

impl SourceKind {
    /// Whether the source positions pointers precisely.
    ///
    /// Precise sources get a reduced slop: a trackpad or mouse drag is
    /// deliberate in a way a fat-finger touch is not.
    pub fn is_precise(self) -> bool {
        matches!(self, Self::Trackpad | Self::Mouse)
    }
}

bitflags::bitflags! {
    /// Screen edges a gesture originated from.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EdgeFlags: u8 {
        /// Left screen edge.
        const LEFT   = 0b0001;
        /// Right screen edge.
        const RIGHT  = 0b0010;
        /// Bottom screen edge (navigation bar region).
        const BOTTOM = 0b0100;
        /// Top screen edge (status bar region).
        const TOP    = 0b1000;
    }
}

bitflags::bitflags! {
    /// Capability tags describing what kind of consumer owns a gesture.
    ///
    /// A set rather than an enum: a single consumer may legitimately carry
    /// more than one tag (an accessibility overlay that also handles
    /// overscroll, for example), and policy code often wants to disable a
    /// whole group at once.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct GestureClass: u8 {
        /// Assistant invocation (diagonal corner swipe or fling).
        const ASSISTANT     = 0b0000_0001;
        /// One-handed-mode toggle.
        const ONE_HANDED    = 0b0000_0010;
        /// Status-bar pull-down.
        const STATUS_BAR    = 0b0000_0100;
        /// Task-switcher navigation.
        const TASK_SWITCH   = 0b0000_1000;
        /// Accessibility shortcut.
        const ACCESSIBILITY = 0b0001_0000;
        /// Overscroll plugin.
        const OVERSCROLL    = 0b0010_0000;
    }
}

/// One raw multi-touch pointer event.
///
/// Immutable per delivery. Ownership is transient: samples are passed by
/// reference through the consumer chain and must not be stored beyond the
/// current callback.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerSample {
    /// What happened.
    pub action: Action,
    /// The pointers involved, as `(id, position)` pairs.
    ///
    /// For [`Action::PointerRemoved`] the first entry is the lifting
    /// pointer and the rest are the pointers that remain down.
    pub pointers: SmallVec<[(PointerId, Point); 4]>,
    /// Event time in milliseconds on the input clock.
    pub timestamp: u64,
    /// Device class that produced the sample.
    pub source: SourceKind,
    /// Edges the gesture originated from (set on the initial down and
    /// carried on subsequent samples of the same gesture).
    pub edges: EdgeFlags,
}

impl PointerSample {
    /// Create a sample with an explicit pointer list.
    pub fn new(
        action: Action,
        pointers: impl IntoIterator<Item = (PointerId, Point)>,
        timestamp: u64,
    ) -> Self {
        Self {
            action,
            pointers: pointers.into_iter().collect(),
            timestamp,
            source: SourceKind::Touch,
            edges: EdgeFlags::empty(),
        }
    }

    /// A single-pointer down using [`PRIMARY_POINTER`].
    pub fn down(position: Point, timestamp: u64) -> Self {
        Self::new(Action::Down, [(PRIMARY_POINTER, position)], timestamp)
    }

    /// A single-pointer move using [`PRIMARY_POINTER`].
    pub fn moved(position: Point, timestamp: u64) -> Self {
        Self::new(Action::Move, [(PRIMARY_POINTER, position)], timestamp)
    }

    /// A single-pointer up using [`PRIMARY_POINTER`].
    pub fn up(position: Point, timestamp: u64) -> Self {
        Self::new(Action::Up, [(PRIMARY_POINTER, position)], timestamp)
    }

    /// A session-wide cancel. Carries no pointer data.
    pub fn cancel(timestamp: u64) -> Self {
        Self::new(Action::Cancel, [], timestamp)
    }

    /// A hover sample using [`PRIMARY_POINTER`].
    pub fn hover(position: Point, timestamp: u64) -> Self {
        Self::new(Action::Hover, [(PRIMARY_POINTER, position)], timestamp)
    }

    /// An additional pointer going down at `position`.
    pub fn pointer_added(id: PointerId, position: Point, timestamp: u64) -> Self {
        Self::new(Action::PointerAdded, [(id, position)], timestamp)
    }

    /// Pointer `removed` lifting at `removed_position` while `remaining`
    /// pointers stay down.
    pub fn pointer_removed(
        removed: PointerId,
        removed_position: Point,
        remaining: impl IntoIterator<Item = (PointerId, Point)>,
        timestamp: u64,
    ) -> Self {
        let mut pointers: SmallVec<[(PointerId, Point); 4]> =
            SmallVec::from_iter([(removed, removed_position)]);
        pointers.extend(remaining);
        Self {
            action: Action::PointerRemoved,
            pointers,
            timestamp,
            source: SourceKind::Touch,
            edges: EdgeFlags::empty(),
        }
    }

    /// Builder-style source override.
    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    /// Builder-style edge-origin override.
    pub fn with_edges(mut self, edges: EdgeFlags) -> Self {
        self.edges = edges;
        self
    }

    /// Number of pointers carried by this sample.
    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// Position of a specific pointer, if present in this sample.
    pub fn position_of(&self, id: PointerId) -> Option<Point> {
        self.pointers
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| *p)
    }

    /// The first pointer in the sample, if any.
    pub fn first_pointer(&self) -> Option<(PointerId, Point)> {
        self.pointers.first().copied()
    }

    /// The first pointer whose id differs from `id`, if any.
    pub fn other_pointer(&self, id: PointerId) -> Option<(PointerId, Point)> {
        self.pointers.iter().find(|(pid, _)| *pid != id).copied()
    }

    /// Synthesize the CANCEL a claiming consumer delivers to whatever it
    /// wraps, so the wrapped consumer unwinds any partial state.
    ///
    /// The cancel carries the same pointer set, timestamp, source, and
    /// edge flags as the sample that triggered the claim.
    pub fn synthesize_cancel(&self) -> Self {
        Self {
            action: Action::Cancel,
            pointers: self.pointers.clone(),
            timestamp: self.timestamp,
            source: self.source,
            edges: self.edges,
        }
    }
}
