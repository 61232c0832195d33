// Copyright 2026 the Edgewise Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edgewise Detector: the drag-axis state machine and velocity tracking.
//!
//! ## Overview
//!
//! A [`DragDetector`] converts a raw pointer-event stream into a
//! one-dimensional drag lifecycle — `Idle → Dragging → Settling → Idle` —
//! reporting through a [`DragListener`]:
//!
//! - `on_drag_start(initial)` once displacement passes the slop/direction
//!   gate (or immediately, when recatching a settling animation),
//! - `on_drag(displacement, sample)` for every subsequent move, with slop
//!   already subtracted so the first delivered value reads near zero,
//! - `on_drag_end(velocity)` on release, with the velocity estimated over
//!   the recent sample history and normalized to units per 1000 ms.
//!
//! A cancel mid-drag aborts without `on_drag_end` and returns the detector
//! straight to `Idle`.
//!
//! ## Minimal example
//!
//! ```
//! use edgewise_detector::{Axis, DragConfig, DragDetector, DragListener, DragState};
//! use edgewise_event::PointerSample;
//! use kurbo::Point;
//!
//! #[derive(Default)]
//! struct Log {
//!     drags: Vec<f64>,
//! }
//!
//! impl DragListener for Log {
//!     fn on_drag_start(&mut self, _initial: bool) {}
//!     fn on_drag(&mut self, displacement: f64, _sample: &PointerSample) -> bool {
//!         self.drags.push(displacement);
//!         true
//!     }
//!     fn on_drag_end(&mut self, _velocity: f64) {}
//! }
//!
//! let mut detector = DragDetector::new(DragConfig {
//!     axis: Axis::Vertical,
//!     touch_slop: 10.0,
//!     ..DragConfig::default()
//! });
//! let mut log = Log::default();
//!
//! detector.feed(&PointerSample::down(Point::new(0.0, 100.0), 0), &mut log);
//! detector.feed(&PointerSample::moved(Point::new(0.0, 75.0), 16), &mut log);
//!
//! assert_eq!(detector.state(), DragState::Dragging);
//! // 25 units of upward travel, 10 of slop subtracted.
//! assert_eq!(log.drags, [15.0]);
//! ```
//!
//! ## Multi-pointer continuity
//!
//! When the tracked pointer lifts while others remain down, the detector
//! re-anchors its reference to the next remaining pointer so accumulated
//! displacement carries over with no jump. The same rule is applied by the
//! recognizers in `edgewise_arbiter`.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod drag;
pub mod velocity;

pub use drag::{Axis, DirectionMask, DragConfig, DragDetector, DragListener, DragState};
pub use velocity::VelocityTracker;
