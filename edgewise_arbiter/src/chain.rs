// Copyright 2026 the Edgewise Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The consumer chain: a linked list of recognizer nodes sharing one
//! exclusivity/claim protocol.
//!
//! ## Priority
//!
//! Chain order is an explicit priority list. The outermost node sees every
//! sample first, so when two recognizers would claim on the same sample the
//! outermost one wins; build chains with the highest-priority recognizer
//! first (see [`ChainBuilder`]).
//!
//! ## Exclusivity
//!
//! Each node carries an [`ExclusivityState`] that is monotonic for the
//! session: `Inactive` may become `Active` (this node claimed) or
//! `DelegateActive` (it decided the gesture is not its own, or something it
//! wraps claimed), and neither of those ever transitions again. At most one
//! node in a chain reaches `Active` per session; the session-owned pilfer
//! token enforces this across the whole chain.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cell::Cell;

use edgewise_event::{Action, GestureClass, PointerSample};
use smallvec::SmallVec;

use crate::engine::DevicePolicy;
use crate::recognizer::RecognizerNode;

/// Per-node lifecycle in the claim protocol. Monotonic for the session:
/// once a node leaves `Inactive` it never changes state again.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ExclusivityState {
    /// Still watching samples; may claim or delegate.
    Inactive,
    /// This node claimed the gesture. Terminal for the session.
    Active,
    /// The gesture belongs elsewhere (a wrapped consumer claimed, or this
    /// node's policy rejected). Terminal for the session.
    DelegateActive,
}

/// Diagnostic record of a claim: which classification claimed, and when.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClaimRecord {
    /// Classification tags of the claiming node.
    pub class: GestureClass,
    /// Timestamp of the sample that triggered the claim.
    pub timestamp: u64,
}

/// Outcome of feeding one sample through a chain, in emission order.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GestureEvent {
    /// A node took exclusive ownership of the gesture.
    Claimed {
        /// Classification of the claiming node.
        class: GestureClass,
    },
    /// Displacement update from the claimed gesture.
    Progress {
        /// Slop-subtracted displacement along the claiming node's axis.
        displacement: f64,
    },
    /// The claimed gesture released.
    Committed {
        /// Release velocity in units per 1000 ms.
        velocity: f64,
        /// Whether the release classifies as a fling.
        fling: bool,
    },
    /// The claimed gesture was canceled before committing.
    Abandoned,
}

/// Buffer of events produced by one feed. Rarely holds more than two.
pub type EventBuf = SmallVec<[GestureEvent; 2]>;

/// Per-feed context threaded through the chain.
///
/// The pilfer token is the only cross-node mutable shared state: exactly
/// one exists per raw input stream, owned by the session and passed by
/// reference, never as ambient global state.
#[derive(Copy, Clone, Debug)]
pub struct FeedCtx<'a> {
    /// The session-owned exclusivity token. Set exactly once, by the first
    /// (and only) claimant.
    pub pilfer: &'a Cell<bool>,
    /// Read-only device/policy state for the session.
    pub device: &'a DevicePolicy,
}

/// The end of a chain: absorbs forwarded samples and counts what it saw,
/// which is how the claim protocol's cancel delivery is observed in tests
/// and diagnostics.
#[derive(Clone, Debug, Default)]
pub struct TerminalSink {
    /// Samples of any kind delivered to the terminal.
    pub samples_seen: u32,
    /// Cancels delivered to the terminal (synthesized or real).
    pub cancels_seen: u32,
}

/// A node in the consumer chain.
///
/// An explicit tagged variant rather than open-ended trait objects, so
/// exhaustiveness checking catches missing state handling.
#[derive(Debug)]
pub enum Node {
    /// A recognizer wrapping the rest of the chain.
    Recognizer(Box<RecognizerNode>),
    /// The end of the chain.
    Terminal(TerminalSink),
}

impl Node {
    /// A bare terminal node.
    pub fn terminal() -> Self {
        Self::Terminal(TerminalSink::default())
    }

    /// Wrap `node` as a chain node.
    pub fn recognizer(node: RecognizerNode) -> Self {
        Self::Recognizer(Box::new(node))
    }

    /// Push one raw sample through the chain, returning the events it
    /// produced. Samples are borrowed for the duration of the call only.
    pub fn feed(&mut self, sample: &PointerSample, ctx: FeedCtx<'_>) -> EventBuf {
        match self {
            Self::Recognizer(node) => node.feed(sample, ctx),
            Self::Terminal(sink) => {
                sink.samples_seen += 1;
                if sample.action == Action::Cancel {
                    sink.cancels_seen += 1;
                }
                EventBuf::new()
            }
        }
    }

    /// Whether an enclosing node may still claim instead of this chain.
    ///
    /// True only when no node in this chain is `Active`; the check recurses
    /// all the way down the wrapping chain.
    pub fn allow_intercept_by_parent(&self) -> bool {
        match self {
            Self::Recognizer(node) => {
                node.state() != ExclusivityState::Active
                    && node.inner().allow_intercept_by_parent()
            }
            Self::Terminal(_) => true,
        }
    }

    /// Classification of the consumer that currently owns the gesture, if
    /// any node in this chain is `Active`.
    pub fn active_class(&self) -> Option<GestureClass> {
        match self {
            Self::Recognizer(node) => {
                if node.state() == ExclusivityState::Active {
                    Some(node.class())
                } else {
                    node.inner().active_class()
                }
            }
            Self::Terminal(_) => None,
        }
    }

    /// The chain is about to be replaced by an external scheduler. Release
    /// claim-held resources; the state machine itself does not un-claim.
    pub fn on_consumer_about_to_be_switched(&mut self) {
        if let Self::Recognizer(node) = self {
            node.release_trackers();
            node.inner_mut().on_consumer_about_to_be_switched();
        }
    }

    /// Diagnostic record of the claim, if one occurred in this chain.
    pub fn claim_record(&self) -> Option<ClaimRecord> {
        match self {
            Self::Recognizer(node) => node.claim_record().or_else(|| node.inner().claim_record()),
            Self::Terminal(_) => None,
        }
    }

    /// Pre-claim the node carrying `class`, with slop treated as already
    /// passed. Used by sessions initialized mid-drag. Returns false when no
    /// node carries the class.
    pub(crate) fn force_resume(&mut self, class: GestureClass, ctx: FeedCtx<'_>, timestamp: u64) -> bool {
        match self {
            Self::Recognizer(node) => {
                if node.class() == class {
                    node.force_resume(ctx, timestamp)
                } else {
                    node.inner_mut().force_resume(class, ctx, timestamp)
                }
            }
            Self::Terminal(_) => false,
        }
    }
}

/// Builds a chain from outermost (highest priority) to innermost.
///
/// ```
/// use edgewise_arbiter::chain::ChainBuilder;
/// use edgewise_arbiter::recognizer::{AngleCone, GesturePolicy, RecognizerConfig};
/// use edgewise_event::GestureClass;
///
/// let chain = ChainBuilder::new()
///     .recognizer(
///         RecognizerConfig::new(GestureClass::ASSISTANT),
///         GesturePolicy::AngleCone(AngleCone::default()),
///     )
///     .build();
/// assert!(chain.allow_intercept_by_parent());
/// ```
#[derive(Debug, Default)]
pub struct ChainBuilder {
    stages: Vec<(crate::recognizer::RecognizerConfig, crate::recognizer::GesturePolicy)>,
}

impl ChainBuilder {
    /// An empty builder. `build` on it yields a bare terminal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a recognizer. Earlier calls wrap later ones, so the first
    /// recognizer added has the highest claim priority.
    pub fn recognizer(
        mut self,
        config: crate::recognizer::RecognizerConfig,
        policy: crate::recognizer::GesturePolicy,
    ) -> Self {
        self.stages.push((config, policy));
        self
    }

    /// Assemble the chain around a terminal sink.
    pub fn build(self) -> Node {
        let mut node = Node::terminal();
        for (config, policy) in self.stages.into_iter().rev() {
            node = Node::recognizer(RecognizerNode::new(config, policy, node));
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::{AngleCone, GesturePolicy, LongPress, RecognizerConfig};
    use kurbo::{Point, Rect};

    fn ctx<'a>(pilfer: &'a Cell<bool>, device: &'a DevicePolicy) -> FeedCtx<'a> {
        FeedCtx { pilfer, device }
    }

    fn swipe_chain() -> Node {
        ChainBuilder::new()
            .recognizer(
                RecognizerConfig::new(GestureClass::ASSISTANT),
                GesturePolicy::AngleCone(AngleCone {
                    min_degrees: 30.0,
                    max_degrees: 90.0,
                    min_drag_distance: 100.0,
                }),
            )
            .build()
    }

    /// Vertical swipe far enough to claim the default angle-cone config.
    fn feed_claiming_swipe(chain: &mut Node, pilfer: &Cell<bool>, device: &DevicePolicy) -> EventBuf {
        let mut all = EventBuf::new();
        all.extend(chain.feed(&PointerSample::down(Point::new(0.0, 500.0), 0), ctx(pilfer, device)));
        all.extend(chain.feed(&PointerSample::moved(Point::new(0.0, 495.0), 10), ctx(pilfer, device)));
        all.extend(chain.feed(&PointerSample::moved(Point::new(0.0, 350.0), 20), ctx(pilfer, device)));
        all
    }

    #[test]
    fn claim_sets_pilfer_and_reports_class() {
        let pilfer = Cell::new(false);
        let device = DevicePolicy::default();
        let mut chain = swipe_chain();

        let events = feed_claiming_swipe(&mut chain, &pilfer, &device);
        assert!(pilfer.get());
        assert_eq!(chain.active_class(), Some(GestureClass::ASSISTANT));
        assert!(matches!(
            events[0],
            GestureEvent::Claimed { class } if class == GestureClass::ASSISTANT
        ));
        let record = chain.claim_record().unwrap();
        assert_eq!(record.class, GestureClass::ASSISTANT);
        assert_eq!(record.timestamp, 20);
    }

    #[test]
    fn claim_delivers_exactly_one_cancel_to_wrapped_consumer() {
        let pilfer = Cell::new(false);
        let device = DevicePolicy::default();
        let mut chain = swipe_chain();

        feed_claiming_swipe(&mut chain, &pilfer, &device);

        // Keep feeding after the claim; the terminal must see no more
        // samples and exactly the one synthesized cancel.
        chain.feed(&PointerSample::moved(Point::new(0.0, 300.0), 30), ctx(&pilfer, &device));
        chain.feed(&PointerSample::up(Point::new(0.0, 300.0), 40), ctx(&pilfer, &device));

        let Node::Recognizer(node) = &chain else {
            panic!("expected recognizer root");
        };
        let Node::Terminal(sink) = node.inner() else {
            panic!("expected terminal inner");
        };
        assert_eq!(sink.cancels_seen, 1);
        // Down + sub-slop move forwarded while undecided, then the cancel.
        assert_eq!(sink.samples_seen, 3);
    }

    #[test]
    fn at_most_one_node_ever_claims() {
        let pilfer = Cell::new(false);
        let device = DevicePolicy::default();
        // Two recognizers that would both love this swipe; the outer one
        // must win and the inner one must end up delegating.
        let mut chain = ChainBuilder::new()
            .recognizer(
                RecognizerConfig::new(GestureClass::STATUS_BAR),
                GesturePolicy::AngleCone(AngleCone {
                    min_degrees: 30.0,
                    max_degrees: 90.0,
                    min_drag_distance: 100.0,
                }),
            )
            .recognizer(
                RecognizerConfig::new(GestureClass::ASSISTANT),
                GesturePolicy::AngleCone(AngleCone {
                    min_degrees: 30.0,
                    max_degrees: 90.0,
                    min_drag_distance: 100.0,
                }),
            )
            .build();

        feed_claiming_swipe(&mut chain, &pilfer, &device);
        assert_eq!(chain.active_class(), Some(GestureClass::STATUS_BAR));

        let Node::Recognizer(outer) = &chain else {
            panic!("expected recognizer root");
        };
        assert_eq!(outer.state(), ExclusivityState::Active);
        let Node::Recognizer(inner) = outer.inner() else {
            panic!("expected nested recognizer");
        };
        // The inner node received the synthesized cancel while still
        // undecided; it released and can never become active.
        assert_ne!(inner.state(), ExclusivityState::Active);
    }

    #[test]
    fn delegate_becomes_delegate_active_when_inner_claims() {
        let pilfer = Cell::new(false);
        let device = DevicePolicy::default();
        // Outer long-press stays undecided while the inner angle-cone
        // recognizer claims the swipe.
        let mut chain = ChainBuilder::new()
            .recognizer(
                RecognizerConfig::new(GestureClass::ONE_HANDED),
                GesturePolicy::LongPress(LongPress {
                    hold_ms: 10_000,
                    zone: Rect::new(-1_000.0, -1_000.0, 1_000.0, 1_000.0),
                    // A long-press tolerates the whole swipe without
                    // rejecting on movement.
                    move_slop: 1_000.0,
                }),
            )
            .recognizer(
                RecognizerConfig::new(GestureClass::ASSISTANT),
                GesturePolicy::AngleCone(AngleCone {
                    min_degrees: 30.0,
                    max_degrees: 90.0,
                    min_drag_distance: 100.0,
                }),
            )
            .build();

        feed_claiming_swipe(&mut chain, &pilfer, &device);
        assert_eq!(chain.active_class(), Some(GestureClass::ASSISTANT));

        let Node::Recognizer(outer) = &chain else {
            panic!("expected recognizer root");
        };
        assert_eq!(outer.state(), ExclusivityState::DelegateActive);

        // Monotonic: even once the hold duration elapses, the outer node
        // never claims.
        chain.feed(&PointerSample::moved(Point::new(0.0, 350.0), 20_000), ctx(&pilfer, &device));
        let Node::Recognizer(outer) = &chain else {
            panic!("expected recognizer root");
        };
        assert_eq!(outer.state(), ExclusivityState::DelegateActive);
        assert_eq!(chain.active_class(), Some(GestureClass::ASSISTANT));
    }

    #[test]
    fn allow_intercept_recurses_to_active_node() {
        let pilfer = Cell::new(false);
        let device = DevicePolicy::default();
        let mut chain = swipe_chain();
        assert!(chain.allow_intercept_by_parent());

        feed_claiming_swipe(&mut chain, &pilfer, &device);
        assert!(!chain.allow_intercept_by_parent());
    }

    #[test]
    fn disabled_class_never_claims() {
        let pilfer = Cell::new(false);
        let device = DevicePolicy {
            disabled: GestureClass::ASSISTANT,
            ..DevicePolicy::default()
        };
        let mut chain = swipe_chain();

        let events = feed_claiming_swipe(&mut chain, &pilfer, &device);
        assert!(events.is_empty());
        assert!(!pilfer.get());
        assert_eq!(chain.active_class(), None);
    }

    #[test]
    fn cancel_is_idempotent_for_unclaimed_nodes() {
        let pilfer = Cell::new(false);
        let device = DevicePolicy::default();
        let mut chain = swipe_chain();

        chain.feed(&PointerSample::down(Point::new(0.0, 500.0), 0), ctx(&pilfer, &device));
        chain.feed(&PointerSample::cancel(10), ctx(&pilfer, &device));
        // A second cancel must be harmless.
        chain.feed(&PointerSample::cancel(20), ctx(&pilfer, &device));

        assert!(!pilfer.get());
        assert_eq!(chain.active_class(), None);
        let Node::Recognizer(node) = &chain else {
            panic!("expected recognizer root");
        };
        let Node::Terminal(sink) = node.inner() else {
            panic!("expected terminal inner");
        };
        assert_eq!(sink.cancels_seen, 2);
    }

    #[test]
    fn about_to_be_switched_releases_without_unclaiming() {
        let pilfer = Cell::new(false);
        let device = DevicePolicy::default();
        let mut chain = swipe_chain();
        feed_claiming_swipe(&mut chain, &pilfer, &device);

        chain.on_consumer_about_to_be_switched();
        // The claim state survives; only resources were released.
        assert_eq!(chain.active_class(), Some(GestureClass::ASSISTANT));
    }
}
