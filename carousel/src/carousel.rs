use core::fmt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::actions::{ContextAction, context_actions};
use crate::loader::DebouncedLoader;
use crate::{
    Align, CarouselError, CarouselOptions, DrawItem, Executor, FilterEngine, GroupSource, ItemId,
    ItemKind, ItemModel, ItemState, Materializer, PanelId, PanelPool, PositionSolver,
    SelectionReconciler, Viewport, Visibility,
};

/// A virtualized, pooled carousel.
///
/// The carousel is driven by a single frame thread:
/// - Feed it the backing collection (`set_groups`) and filter output (`apply_filter`).
/// - Keep the viewport in sync (`set_viewport` / `set_scroll_offset`).
/// - Call `tick` once per frame with the elapsed time, then draw `draw_items`.
///
/// Content is materialized on the executor's worker context; results are only observed during
/// `tick`.
pub struct Carousel<M: Materializer> {
    options: CarouselOptions,
    model: ItemModel,
    pool: PanelPool<M::Content>,
    solver: PositionSolver,
    loader: DebouncedLoader<M>,
    reconciler: SelectionReconciler<M>,
    viewport: Viewport,
    visibility: Visibility,
    window: HashMap<ItemId, PanelId>,
}

impl<M: Materializer> Carousel<M> {
    pub fn new(options: CarouselOptions, materializer: Arc<M>, executor: Arc<dyn Executor>) -> Self {
        Self {
            options,
            model: ItemModel::new(),
            pool: PanelPool::new(),
            solver: PositionSolver::new(options.decay_per_ms, options.snap_epsilon),
            loader: DebouncedLoader::new(options.loader, Arc::clone(&materializer), Arc::clone(&executor)),
            reconciler: SelectionReconciler::new(materializer, executor),
            viewport: Viewport::default(),
            visibility: Visibility::all(),
            window: HashMap::new(),
        }
    }

    pub fn options(&self) -> &CarouselOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: CarouselOptions) {
        self.options = options;
        self.solver = PositionSolver::new(options.decay_per_ms, options.snap_epsilon);
        self.loader.set_options(options.loader);
    }

    /// Replaces the backing collection and re-applies the last filter output.
    ///
    /// A selected group that survives stays selected; one that was removed (or is now hidden)
    /// collapses.
    pub fn set_groups(&mut self, groups: Vec<GroupSource>) {
        self.model.set_groups(groups);
        self.restore_visibility();
    }

    pub fn insert_group(&mut self, index: usize, group: GroupSource) {
        self.model.insert_group(index, group);
        self.restore_visibility();
    }

    /// Removes a group and its children. Returns `false` if `id` is not a known group.
    pub fn remove_group(&mut self, id: ItemId) -> bool {
        if !self.model.remove_group(id) {
            return false;
        }
        self.restore_visibility();
        true
    }

    fn restore_visibility(&mut self) {
        self.model.apply_visibility(&self.visibility);
        self.after_visibility_change();
    }

    /// Runs the filter engine over the backing collection and applies its output.
    pub fn apply_filter(&mut self, engine: &impl FilterEngine) {
        let visibility = engine.evaluate(self.model.sources());
        self.apply_visibility(visibility);
    }

    pub fn apply_visibility(&mut self, visibility: Visibility) {
        self.model.apply_visibility(&visibility);
        self.visibility = visibility;
        self.after_visibility_change();
    }

    fn after_visibility_change(&mut self) {
        let Some(group) = self.reconciler.selected() else {
            return;
        };
        if self.model.is_visible(group) {
            self.reconciler.reconcile(&self.model, &mut self.pool);
        } else {
            cdebug!(group = group.0, "Carousel: selected group filtered out");
            self.reconciler.collapse(&mut self.model, &mut self.pool);
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_scroll_offset(&mut self, offset: f32) {
        self.viewport.scroll_offset = offset;
    }

    /// Selects a group, or a child together with its group.
    pub fn select(&mut self, id: ItemId) -> Result<(), CarouselError> {
        let kind = self.model.kind(id).ok_or(CarouselError::UnknownItem(id))?;
        if !self.model.is_visible(id) {
            return Err(CarouselError::Hidden(id));
        }
        let (group, child) = match kind {
            ItemKind::Group => (id, None),
            ItemKind::Child { group } => (group, Some(id)),
        };
        cdebug!(item = id.0, group = group.0, "Carousel::select");
        self.reconciler
            .select(group, child, &mut self.model, &mut self.pool);
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.reconciler.collapse(&mut self.model, &mut self.pool);
    }

    pub fn selected(&self) -> Option<ItemId> {
        self.reconciler.selected()
    }

    pub fn request_context_actions(&self, id: ItemId) -> Result<Vec<ContextAction>, CarouselError> {
        context_actions(&self.model, &self.options, id)
    }

    /// The child the detail area should describe: the selected group's next-to-select child.
    pub fn detail_target(&self) -> Option<ItemId> {
        self.reconciler
            .selected()
            .and_then(|group| self.model.next_to_select(group))
    }

    /// Runs a layout pass now if one is pending. `tick` does this as well.
    pub fn refresh_layout(&mut self) -> bool {
        self.model.recompute_if_dirty()
    }

    /// Advances one frame.
    pub fn tick(&mut self, elapsed_ms: f32) {
        let elapsed_ms = elapsed_ms.max(0.0);
        self.model.recompute_if_dirty();

        self.loader.drain(&mut self.pool);
        self.reconciler.drain(&self.model, &mut self.pool);

        self.sync_window();
        self.solve(elapsed_ms);
        for panel in self.pool.bound_mut() {
            panel.fade_in(elapsed_ms, self.options.content_fade_ms);
        }

        self.loader
            .tick(&mut self.pool, &self.model, &self.viewport, elapsed_ms);
    }

    /// Binds panels to groups entering the window and releases those that left it.
    fn sync_window(&mut self) {
        let overscan = self.options.overscan_px.max(0.0);
        let start = self.viewport.scroll_offset - overscan;
        let end = self.viewport.end() + overscan;
        let spans = self.model.groups_in_range(start, end);
        let wanted: HashSet<ItemId> = spans.iter().map(|s| s.id).collect();

        self.window.retain(|id, panel| {
            let keep = wanted.contains(id);
            if !keep {
                self.pool.release(*panel);
            }
            keep
        });

        for span in spans {
            if !self.window.contains_key(&span.id) {
                let panel = self.pool.acquire(span.id, span.y);
                self.window.insert(span.id, panel);
            }
        }
    }

    fn solve(&mut self, elapsed_ms: f32) {
        for panel in self.pool.bound_mut() {
            let Some(item) = panel.bound_item() else {
                continue;
            };
            if !self.model.is_visible(item) {
                ctrace!(item = item.0, "Carousel: skipping panel bound to hidden item");
                continue;
            }
            let Some(target) = self.model.absolute_y(item) else {
                continue;
            };
            let y = self.solver.step(panel.displayed_y(), target, elapsed_ms);
            panel.set_displayed_y(y);
        }
    }

    /// Visits every drawable panel for this frame.
    pub fn for_each_draw_item(&self, mut f: impl FnMut(DrawItem)) {
        for panel in self.pool.bound() {
            let Some(id) = panel.bound_item() else {
                continue;
            };
            if !self.model.is_visible(id) {
                continue;
            }
            let (Some(kind), Some(target_y), Some(height)) = (
                self.model.kind(id),
                self.model.absolute_y(id),
                self.model.height(id),
            ) else {
                continue;
            };
            f(DrawItem {
                id,
                kind,
                panel: panel.id(),
                displayed_y: panel.displayed_y(),
                target_y,
                height,
                state: self.model.state(id).unwrap_or(ItemState::NotSelected),
                content_alpha: panel.content_alpha(),
            });
        }
    }

    /// Drawable panels ordered by target offset.
    pub fn draw_items(&self) -> Vec<DrawItem> {
        let mut out = Vec::with_capacity(self.pool.bound_count());
        self.for_each_draw_item(|item| out.push(item));
        out.sort_by(|a, b| a.target_y.total_cmp(&b.target_y));
        out
    }

    /// The panel bound to a group in the window, or to a child of the selected group.
    pub fn panel_for(&self, id: ItemId) -> Option<PanelId> {
        self.window.get(&id).copied().or_else(|| {
            self.reconciler
                .collection()
                .and_then(|c| c.panel_for(id))
        })
    }

    /// The scroll offset that brings `id` into view with `align`, as of the last layout pass.
    ///
    /// Returns `None` for unknown or hidden items.
    pub fn scroll_offset_for(&self, id: ItemId, align: Align) -> Option<f32> {
        if !self.model.is_visible(id) {
            return None;
        }
        let start = self.model.absolute_y(id)?;
        let size = self.model.height(id)?;
        let end = start + size;
        let view = self.viewport.height;

        let target = match align {
            Align::Start => start,
            Align::End => end - view,
            Align::Center => start + size / 2.0 - view / 2.0,
            Align::Auto => {
                let cur = self.viewport.scroll_offset;
                if start >= cur && end <= cur + view {
                    cur
                } else if start < cur {
                    start
                } else {
                    end - view
                }
            }
        };

        let max = (self.model.content_height() - view).max(0.0);
        Some(target.clamp(0.0, max))
    }

    pub fn model(&self) -> &ItemModel {
        &self.model
    }

    pub fn pool(&self) -> &PanelPool<M::Content> {
        &self.pool
    }

    pub fn reconciler(&self) -> &SelectionReconciler<M> {
        &self.reconciler
    }

    pub fn content_height(&self) -> f32 {
        self.model.content_height()
    }

    /// Number of content loads issued so far.
    pub fn loads_issued(&self) -> u64 {
        self.loader.issued()
    }
}

impl<M: Materializer> fmt::Debug for Carousel<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Carousel")
            .field("options", &self.options)
            .field("viewport", &self.viewport)
            .field("groups", &self.model.group_count())
            .field("bound_panels", &self.pool.bound_count())
            .field("selected", &self.reconciler.selected())
            .finish()
    }
}
