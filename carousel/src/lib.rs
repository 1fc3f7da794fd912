//! A pooled, virtualized carousel engine for large grouped collections.
//!
//! For frame driving, scroll tweens and anchoring across re-filtering, see the
//! `carousel-adapter` crate.
//!
//! Thousands of groups (each with nested children) exist only as cheap logical entries in an
//! [`ItemModel`]. Only the groups inside the viewport window, plus the selected group's children,
//! are bound to [`Panel`]s drawn from a grow-only [`PanelPool`]. Expensive content is built
//! asynchronously by a [`Materializer`] once a panel has dwelled long enough near the viewport
//! center, and is discarded if the panel was recycled in the meantime.
//!
//! It is UI-agnostic. A presentation layer is expected to provide:
//! - the backing collection ([`GroupSource`]) and filter output ([`Visibility`])
//! - viewport geometry and scroll offset
//! - a per-frame `tick` with the elapsed time
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod actions;
mod carousel;
mod enrichment;
mod error;
mod filter;
mod loader;
mod materialize;
mod model;
mod options;
mod pool;
mod reconciler;
mod settings;
mod solver;
mod types;
mod worker;

#[cfg(test)]
mod tests;

pub use actions::{ContextAction, context_actions};
pub use carousel::Carousel;
pub use enrichment::{
    DetailArea, DetailSource, DetailState, EnrichmentClient, EnrichmentKind, EnrichmentRequest,
};
pub use error::{CarouselError, EnrichmentError, MaterializeError};
pub use filter::{FilterEngine, Visibility};
pub use loader::load_threshold;
pub use materialize::{MaterializeRequest, Materializer};
pub use model::{ChildSource, GroupSource, GroupSpan, ItemModel};
pub use options::{CarouselOptions, LoaderOptions};
pub use pool::{Panel, PanelId, PanelPool, PendingLoad};
pub use reconciler::{ChildPanelCollection, SelectionReconciler};
pub use settings::{
    DetailTab, SettingEntry, SettingKey, SettingValue, Settings, SettingsTable, settings_table,
};
pub use solver::PositionSolver;
pub use types::{Align, DrawItem, ItemId, ItemKind, ItemState, SelectionPhase, Viewport, VisibleEntry};
pub use worker::{Executor, ManualExecutor, Ticket, TokioExecutor};

pub use futures::future::BoxFuture;
pub use tokio_util::sync::CancellationToken;
