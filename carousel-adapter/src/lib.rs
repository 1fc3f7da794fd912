//! Adapter utilities for the `carousel` crate.
//!
//! The `carousel` crate is UI-agnostic and owns the model, pooling and loading state. This
//! crate provides small, framework-neutral helpers commonly needed to drive it from a UI loop:
//!
//! - A frame driver that turns wall-clock ticks into elapsed frame time
//! - Tween-based scroll-to-selection
//! - Scroll anchoring by item identity across re-filtering
//!
//! This crate is intentionally framework-agnostic (no egui/iced bindings).
#![forbid(unsafe_code)]

mod anchor;
mod controller;
mod tween;


pub use anchor::{ScrollAnchor, apply_anchor, capture_first_visible_anchor};
pub use controller::{Controller, DEFAULT_SCROLL_DURATION_MS};
pub use tween::{Easing, Tween};
