// Copyright 2026 the Edgewise Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edgewise Arbiter: the input-consumer arbitration chain.
//!
//! ## Overview
//!
//! Several gesture consumers can plausibly own the same raw pointer stream
//! (an assistant swipe, a status-bar pull, a one-handed-mode press, ...).
//! This crate arbitrates between them with a *consumer chain*: recognizers
//! wrap one another in explicit priority order, every raw sample flows from
//! the outermost node inward, and the first recognizer whose policy decides
//! the gesture is its own **claims** it.
//!
//! A claim does three things, exactly once and in order: the node turns
//! `Active` and takes the session's pilfer token (so no other node can ever
//! claim), the wrapped consumer receives a synthesized cancel to unwind any
//! partial state, and a [`chain::GestureEvent::Claimed`] is emitted. From
//! then on the claiming node owns the stream exclusively, interpreting it
//! with a [`edgewise_detector::DragDetector`] and emitting
//! `Progress`/`Committed`/`Abandoned` events.
//!
//! [`session::GestureSession`] wraps one chain for the lifetime of one
//! gesture and bridges its events to a [`engine::TransitionEngine`],
//! buffering progress until the engine reports ready and recovering locally
//! when it refuses to start.
//!
//! ## Minimal example
//!
//! ```
//! use core::cell::Cell;
//! use edgewise_arbiter::chain::{ChainBuilder, FeedCtx, GestureEvent};
//! use edgewise_arbiter::engine::DevicePolicy;
//! use edgewise_arbiter::recognizer::{AngleCone, GesturePolicy, RecognizerConfig};
//! use edgewise_event::{GestureClass, PointerSample};
//! use kurbo::Point;
//!
//! let mut chain = ChainBuilder::new()
//!     .recognizer(
//!         RecognizerConfig::new(GestureClass::ASSISTANT),
//!         GesturePolicy::AngleCone(AngleCone::default()),
//!     )
//!     .build();
//!
//! let pilfer = Cell::new(false);
//! let device = DevicePolicy::default();
//! let ctx = FeedCtx { pilfer: &pilfer, device: &device };
//!
//! // A decisive upward swipe: down, then one long vertical move.
//! chain.feed(&PointerSample::down(Point::new(0.0, 500.0), 0), ctx);
//! let events = chain.feed(&PointerSample::moved(Point::new(0.0, 350.0), 16), ctx);
//!
//! assert!(matches!(
//!     events[0],
//!     GestureEvent::Claimed { class } if class == GestureClass::ASSISTANT
//! ));
//! assert!(pilfer.get());
//! ```
//!
//! ## What stays outside
//!
//! Which recognizers to instantiate for a given touch-down is policy, and
//! policy lives with the caller: this crate exposes
//! [`chain::ChainBuilder`], not a gesture registry. The transition engine
//! and the platform pointer source are traits ([`engine::TransitionEngine`],
//! [`engine::PointerSource`]) implemented by the host.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod chain;
pub mod engine;
pub mod recognizer;
pub mod session;

pub use chain::{ChainBuilder, ClaimRecord, ExclusivityState, FeedCtx, GestureEvent, Node};
pub use engine::{
    DevicePolicy, EngineError, NullSource, PointerSource, TransitionEngine, TransitionHandle,
    TransitionIntent,
};
pub use recognizer::{
    AngleCone, FlingOnly, GesturePolicy, HoverZone, LongPress, RecognizerConfig, RecognizerNode,
};
pub use session::{GestureSession, SessionStatus, MAX_POINTERS};
