use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::worker::CompletionQueue;
use crate::{
    Executor, ItemId, ItemModel, ItemState, MaterializeError, Materializer, PanelId, PanelPool,
    SelectionPhase, Ticket,
};

/// The materialized children of the selected group.
///
/// Collections are never pooled: they are built for one group and discarded (their panels
/// released) when the selection moves away.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildPanelCollection {
    group: ItemId,
    children: Vec<ItemId>,
    panels: Vec<PanelId>,
    offsets: Vec<f32>,
}

impl ChildPanelCollection {
    pub fn group(&self) -> ItemId {
        self.group
    }

    pub fn items(&self) -> &[ItemId] {
        &self.children
    }

    pub fn panels(&self) -> &[PanelId] {
        &self.panels
    }

    /// Offsets of each child within the group's child area.
    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn panel_for(&self, child: ItemId) -> Option<PanelId> {
        let index = self.children.iter().position(|c| *c == child)?;
        self.panels.get(index).copied()
    }

    /// Recomputes child offsets from the model's current heights.
    fn relayout(&mut self, model: &ItemModel) {
        self.offsets.clear();
        let mut y = 0.0f32;
        for &child in &self.children {
            self.offsets.push(y);
            y += model.height(child).unwrap_or(0.0);
        }
    }

    /// Releases the panels of children that are no longer visible. Returns `true` if any were
    /// dropped.
    fn prune_hidden<C>(&mut self, model: &ItemModel, pool: &mut PanelPool<C>) -> bool {
        let before = self.children.len();
        let mut kept = 0;
        for i in 0..before {
            let (child, panel) = (self.children[i], self.panels[i]);
            if model.is_visible(child) {
                self.children[kept] = child;
                self.panels[kept] = panel;
                kept += 1;
            } else {
                pool.release(panel);
            }
        }
        self.children.truncate(kept);
        self.panels.truncate(kept);
        kept != before
    }
}

pub(crate) struct ChildrenCompletion<C> {
    ticket: Ticket,
    group: ItemId,
    children: Vec<ItemId>,
    result: Result<Vec<C>, MaterializeError>,
}

struct PendingBuild {
    ticket: Ticket,
    group: ItemId,
    children: Vec<ItemId>,
    token: CancellationToken,
}

/// Owns the current selection and the selected group's child collection.
///
/// Per group the phases run `Collapsed -> Expanding -> Expanded -> Collapsing -> Collapsed`.
/// Selecting a group while another is expanded (or still expanding) collapses the previous one
/// synchronously first, so at most one group is ever outside `Collapsed`.
pub struct SelectionReconciler<M: Materializer> {
    materializer: Arc<M>,
    queue: CompletionQueue<ChildrenCompletion<M::Content>>,
    selected: Option<ItemId>,
    phase: SelectionPhase,
    collection: Option<ChildPanelCollection>,
    pending: Option<PendingBuild>,
    collections_built: u64,
}

impl<M: Materializer> SelectionReconciler<M> {
    pub(crate) fn new(materializer: Arc<M>, executor: Arc<dyn Executor>) -> Self {
        Self {
            materializer,
            queue: CompletionQueue::new(executor),
            selected: None,
            phase: SelectionPhase::Collapsed,
            collection: None,
            pending: None,
            collections_built: 0,
        }
    }

    /// The selected group, if any.
    pub fn selected(&self) -> Option<ItemId> {
        self.selected
    }

    pub fn phase(&self, group: ItemId) -> SelectionPhase {
        if self.selected == Some(group) {
            self.phase
        } else {
            SelectionPhase::Collapsed
        }
    }

    pub fn collection(&self) -> Option<&ChildPanelCollection> {
        self.collection.as_ref()
    }

    /// Number of child collections constructed so far.
    pub fn collections_built(&self) -> u64 {
        self.collections_built
    }

    /// Whether a child collection build is in flight.
    pub fn is_building(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn select(
        &mut self,
        group: ItemId,
        child: Option<ItemId>,
        model: &mut ItemModel,
        pool: &mut PanelPool<M::Content>,
    ) {
        if let Some(previous) = self.selected {
            if previous != group {
                if self.phase == SelectionPhase::Expanding {
                    cdebug!(
                        previous = previous.0,
                        next = group.0,
                        "SelectionReconciler: reentrant selection"
                    );
                }
                self.collapse(model, pool);
            }
        }

        if let Some(child) = child {
            model.clear_child_selection(group);
            model.set_state(child, ItemState::Selected);
        }

        model.set_state(group, ItemState::Selected);
        if self.selected != Some(group) {
            cdebug!(group = group.0, "SelectionReconciler: expanding");
            self.selected = Some(group);
            self.phase = SelectionPhase::Expanding;
        }
        self.reconcile(model, pool);
    }

    /// Compares the selected group's visible children with the materialized collection and
    /// rebuilds only when they differ.
    ///
    /// Panels of children that were filtered out go back to the pool right away; the rebuild
    /// only has to produce the new collection.
    pub(crate) fn reconcile(&mut self, model: &ItemModel, pool: &mut PanelPool<M::Content>) {
        let Some(group) = self.selected else {
            return;
        };
        let children = model.visible_children(group);

        let mut unchanged = false;
        if let Some(collection) = self.collection.as_mut().filter(|c| c.group == group) {
            let pruned = collection.prune_hidden(model, pool);
            if pruned {
                ctrace!(group = group.0, "SelectionReconciler: released hidden children");
            }
            collection.relayout(model);
            unchanged = !pruned && collection.children == children;
        }

        let in_flight = self
            .pending
            .as_ref()
            .is_some_and(|p| p.group == group && p.children == children);
        if in_flight {
            return;
        }

        if unchanged {
            if let Some(pending) = self.pending.take() {
                pending.token.cancel();
            }
            ctrace!(group = group.0, "SelectionReconciler: children unchanged");
            self.phase = SelectionPhase::Expanded;
            return;
        }

        self.issue_build(group, children);
    }

    fn issue_build(&mut self, group: ItemId, children: Vec<ItemId>) {
        if let Some(pending) = self.pending.take() {
            pending.token.cancel();
        }

        let ticket = self.queue.next_ticket();
        let token = CancellationToken::new();
        let work = self
            .materializer
            .materialize_children(group, &children, token.clone());
        let requested = children.clone();
        cdebug!(
            group = group.0,
            children = children.len(),
            ticket = ticket.0,
            "SelectionReconciler: building child collection"
        );
        self.queue.spawn(token.clone(), async move {
            ChildrenCompletion {
                ticket,
                group,
                children: requested,
                result: work.await,
            }
        });
        self.pending = Some(PendingBuild {
            ticket,
            group,
            children,
            token,
        });
        self.phase = SelectionPhase::Expanding;
    }

    /// Swaps in finished builds that are still the latest request for the selected group.
    pub(crate) fn drain(&mut self, model: &ItemModel, pool: &mut PanelPool<M::Content>) {
        for done in self.queue.drain() {
            let latest = self
                .pending
                .as_ref()
                .is_some_and(|p| p.ticket == done.ticket && p.group == done.group);
            if !latest || self.selected != Some(done.group) {
                ctrace!(
                    group = done.group.0,
                    ticket = done.ticket.0,
                    "SelectionReconciler: discarded superseded build"
                );
                continue;
            }
            self.pending = None;

            let contents = match done.result {
                Ok(contents) => contents,
                Err(err) => {
                    cwarn!(
                        group = done.group.0,
                        error = %err,
                        "SelectionReconciler: child build failed, children will load individually"
                    );
                    Vec::new()
                }
            };
            self.swap_in(done.group, done.children, contents, model, pool);
        }
    }

    fn swap_in(
        &mut self,
        group: ItemId,
        children: Vec<ItemId>,
        contents: Vec<M::Content>,
        model: &ItemModel,
        pool: &mut PanelPool<M::Content>,
    ) {
        let origin = model.absolute_y(group).unwrap_or(0.0) + model.height(group).unwrap_or(0.0);
        let mut contents = contents.into_iter();
        let mut panels = Vec::with_capacity(children.len());
        let mut offsets = Vec::with_capacity(children.len());
        let mut y = 0.0f32;
        for &child in &children {
            offsets.push(y);
            let id = pool.acquire(child, origin);
            if let (Some(content), Some(panel)) = (contents.next(), pool.get_mut(id)) {
                panel.attach(content);
            }
            panels.push(id);
            y += model.height(child).unwrap_or(0.0);
        }

        let next = ChildPanelCollection {
            group,
            children,
            panels,
            offsets,
        };
        if let Some(previous) = self.collection.replace(next) {
            release_all(&previous, pool);
        }
        self.collections_built += 1;
        self.phase = SelectionPhase::Expanded;
        cdebug!(
            group = group.0,
            built = self.collections_built,
            "SelectionReconciler: expanded"
        );
    }

    /// Runs the selected group through `Collapsing` back to `Collapsed`.
    pub(crate) fn collapse(&mut self, model: &mut ItemModel, pool: &mut PanelPool<M::Content>) {
        let Some(group) = self.selected else {
            return;
        };
        self.phase = SelectionPhase::Collapsing;
        if let Some(pending) = self.pending.take() {
            pending.token.cancel();
        }
        if let Some(collection) = self.collection.take() {
            release_all(&collection, pool);
        }
        model.set_state(group, ItemState::NotSelected);
        self.selected = None;
        self.phase = SelectionPhase::Collapsed;
        cdebug!(group = group.0, "SelectionReconciler: collapsed");
    }
}

fn release_all<C>(collection: &ChildPanelCollection, pool: &mut PanelPool<C>) {
    for &panel in &collection.panels {
        pool.release(panel);
    }
}
