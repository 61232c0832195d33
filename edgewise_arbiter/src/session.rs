// Copyright 2026 the Edgewise Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The gesture session: one raw input stream from down to terminal.
//!
//! A [`GestureSession`] owns the consumer chain, the pilfer token, and the
//! bookkeeping that bridges chain events to a [`TransitionEngine`]. It is
//! driven entirely from the input thread: raw samples go in through
//! [`GestureSession::feed`], the engine's readiness callback re-enters
//! through [`GestureSession::transition_ready`], and nothing inside holds a
//! lock or a timer.
//!
//! ## Progress ordering
//!
//! `update_progress` is never called before the engine has signaled
//! readiness for the transition. Until [`GestureSession::transition_ready`]
//! is relayed, progress values are buffered in order and flushed as one
//! batch.
//!
//! ## Engine refusal
//!
//! A failed `start_transition` is recovered locally: the pilfer token is
//! released, the rest of the gesture runs as a no-op, and the session still
//! terminates cleanly on up or cancel. Nothing propagates to the caller.

use alloc::vec::Vec;
use core::cell::Cell;

use edgewise_event::{Action, EdgeFlags, GestureClass, PointerId, PointerSample, SourceKind};
use hashbrown::HashMap;
use kurbo::Point;
use log::{debug, warn};

use crate::chain::{ClaimRecord, FeedCtx, GestureEvent, Node};
use crate::engine::{DevicePolicy, PointerSource, TransitionEngine, TransitionHandle, TransitionIntent};

/// Hard cap on simultaneously tracked pointers. Exceeding it is treated as
/// resource exhaustion: the whole chain is canceled and the session ends.
pub const MAX_POINTERS: usize = 16;

/// Where a session currently stands, as seen by the caller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionStatus {
    /// No consumer has claimed; samples are still being arbitrated.
    Pending,
    /// A consumer claimed the gesture and owns it exclusively.
    Claimed,
    /// The session reached a terminal sample (or exhausted resources) and
    /// accepts no further input.
    Finished,
}

/// One gesture session: a chain, a pilfer token, and the engine bridge.
#[derive(Debug)]
pub struct GestureSession {
    chain: Node,
    pilfer: Cell<bool>,
    device: DevicePolicy,
    pointers: HashMap<PointerId, Point>,
    /// Source/edge metadata of the initiating down, carried into the
    /// transition intent.
    source: SourceKind,
    edges: EdgeFlags,
    handle: Option<TransitionHandle>,
    /// Progress values waiting for the engine's readiness callback.
    buffered: Vec<f64>,
    ready: bool,
    claimed: bool,
    /// The engine refused the transition; the claim runs as a no-op.
    engine_failed: bool,
    finished: bool,
}

impl GestureSession {
    /// Start a session over `chain` with the device state frozen for its
    /// duration.
    pub fn new(chain: Node, device: DevicePolicy) -> Self {
        Self {
            chain,
            pilfer: Cell::new(false),
            device,
            pointers: HashMap::new(),
            source: SourceKind::Touch,
            edges: EdgeFlags::empty(),
            handle: None,
            buffered: Vec::new(),
            ready: false,
            claimed: false,
            engine_failed: false,
            finished: false,
        }
    }

    /// Initialize mid-drag: pre-claim the node carrying `class` with slop
    /// treated as already passed, and adopt the transition `handle` that is
    /// already running in the engine.
    ///
    /// Used when a new gesture grabs an animation a previous session left
    /// settling. Returns false (leaving the session pending) when no node
    /// in the chain carries `class`.
    pub fn resume<S: PointerSource>(
        &mut self,
        class: GestureClass,
        handle: TransitionHandle,
        timestamp: u64,
        source: &mut S,
    ) -> bool {
        let ctx = FeedCtx {
            pilfer: &self.pilfer,
            device: &self.device,
        };
        if !self.chain.force_resume(class, ctx, timestamp) {
            return false;
        }
        self.handle = Some(handle);
        // The engine already reported ready for this transition.
        self.ready = true;
        self.claimed = true;
        source.pilfer();
        source.set_batching_enabled(false);
        debug!("session resumed mid-drag as {class:?}");
        true
    }

    /// Where the session stands.
    pub fn status(&self) -> SessionStatus {
        if self.finished {
            SessionStatus::Finished
        } else if self.claimed {
            SessionStatus::Claimed
        } else {
            SessionStatus::Pending
        }
    }

    /// Classification of the consumer that owns the gesture, if any.
    pub fn active_class(&self) -> Option<GestureClass> {
        self.chain.active_class()
    }

    /// Diagnostic record of the claim, if one occurred.
    pub fn claim_record(&self) -> Option<ClaimRecord> {
        self.chain.claim_record()
    }

    /// Whether the session-owned exclusivity token is held.
    pub fn pilfer_taken(&self) -> bool {
        self.pilfer.get()
    }

    /// The chain is about to be handed to a different session scheduler.
    pub fn on_consumer_about_to_be_switched(&mut self) {
        self.chain.on_consumer_about_to_be_switched();
    }

    /// The engine signaled that the transition started by this session is
    /// ready to receive progress. Re-enters on the input thread; buffered
    /// progress flushes here, in arrival order.
    pub fn transition_ready<E: TransitionEngine>(&mut self, engine: &mut E) {
        self.ready = true;
        if let Some(handle) = self.handle {
            for value in self.buffered.drain(..) {
                engine.update_progress(handle, value);
            }
        } else {
            self.buffered.clear();
        }
    }

    /// Push one raw sample through the session.
    pub fn feed<E: TransitionEngine, S: PointerSource>(
        &mut self,
        sample: &PointerSample,
        engine: &mut E,
        source: &mut S,
    ) -> SessionStatus {
        if self.finished {
            return SessionStatus::Finished;
        }
        if !self.admit(sample) {
            // Malformed: references a pointer this session never saw.
            // Absorbed here; nothing downstream observes it.
            warn!("dropping malformed sample: {:?}", sample.action);
            return self.status();
        }
        if self.pointers.len() > MAX_POINTERS {
            // Resource exhaustion: unwind the whole chain and end.
            warn!("pointer limit exceeded, canceling session");
            let cancel = sample.synthesize_cancel();
            let ctx = FeedCtx {
                pilfer: &self.pilfer,
                device: &self.device,
            };
            let events = self.chain.feed(&cancel, ctx);
            self.dispatch(events, engine, source);
            self.finished = true;
            return SessionStatus::Finished;
        }

        let ctx = FeedCtx {
            pilfer: &self.pilfer,
            device: &self.device,
        };
        let events = self.chain.feed(sample, ctx);
        self.dispatch(events, engine, source);

        if sample.action.is_terminal() {
            self.finished = true;
        }
        self.status()
    }

    /// Map chain events onto engine calls, in emission order.
    fn dispatch<E: TransitionEngine, S: PointerSource>(
        &mut self,
        events: impl IntoIterator<Item = GestureEvent>,
        engine: &mut E,
        source: &mut S,
    ) {
        for event in events {
            match event {
                GestureEvent::Claimed { class } => {
                    self.claimed = true;
                    source.pilfer();
                    source.set_batching_enabled(false);
                    let intent = TransitionIntent {
                        class,
                        edges: self.edges,
                        source: self.source,
                    };
                    match engine.start_transition(intent) {
                        Ok(handle) => self.handle = Some(handle),
                        Err(err) => {
                            warn!("transition refused for {class:?}: {err:?}");
                            // Recover locally: the gesture stays claimed in
                            // the chain but drives nothing, and the platform
                            // token is handed back.
                            self.pilfer.set(false);
                            self.engine_failed = true;
                            source.set_batching_enabled(true);
                        }
                    }
                }
                GestureEvent::Progress { displacement } => {
                    if self.engine_failed {
                        continue;
                    }
                    match (self.ready, self.handle) {
                        (true, Some(handle)) => engine.update_progress(handle, displacement),
                        _ => self.buffered.push(displacement),
                    }
                }
                GestureEvent::Committed { velocity, fling } => {
                    if let Some(handle) = self.handle.take() {
                        debug!("gesture committed, velocity {velocity}, fling {fling}");
                        engine.finish(handle, fling);
                    }
                    source.set_batching_enabled(true);
                }
                GestureEvent::Abandoned => {
                    if let Some(handle) = self.handle.take() {
                        engine.cancel(handle);
                    }
                    source.set_batching_enabled(true);
                }
            }
        }
    }

    /// Update pointer bookkeeping; false means the sample is malformed and
    /// must be dropped before it reaches the chain.
    fn admit(&mut self, sample: &PointerSample) -> bool {
        match sample.action {
            Action::Down => {
                let Some((id, pos)) = sample.first_pointer() else {
                    return false;
                };
                self.pointers.insert(id, pos);
                self.source = sample.source;
                // Hosts that deliver bare positions get edge flags derived
                // from screen geometry.
                self.edges = if sample.edges.is_empty() {
                    self.device.edges_at(pos)
                } else {
                    sample.edges
                };
                true
            }
            Action::PointerAdded => {
                for &(id, pos) in &sample.pointers {
                    self.pointers.insert(id, pos);
                }
                true
            }
            Action::PointerRemoved => {
                let Some((id, _)) = sample.first_pointer() else {
                    return false;
                };
                if self.pointers.remove(&id).is_none() {
                    return false;
                }
                for &(id, pos) in sample.pointers.iter().skip(1) {
                    self.pointers.insert(id, pos);
                }
                true
            }
            Action::Move => {
                // A resumed session may see its first sample as a move;
                // adopt the pointers it carries.
                if !self.pointers.is_empty()
                    && sample
                        .pointers
                        .iter()
                        .any(|(id, _)| !self.pointers.contains_key(id))
                {
                    return false;
                }
                for &(id, pos) in &sample.pointers {
                    self.pointers.insert(id, pos);
                }
                true
            }
            Action::Up => {
                let Some((id, _)) = sample.first_pointer() else {
                    return false;
                };
                if self.pointers.remove(&id).is_none() {
                    return false;
                }
                true
            }
            Action::Cancel | Action::Hover | Action::Key => true,
        }
    }
}
