use crate::{ItemId, Ticket};
use tokio_util::sync::CancellationToken;

/// A handle to a panel slot inside a [`PanelPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub(crate) usize);

impl PanelId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The cancellation handle of an in-flight materialization.
#[derive(Clone, Debug)]
pub struct PendingLoad {
    pub(crate) ticket: Ticket,
    pub(crate) token: CancellationToken,
}

impl PendingLoad {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) enum LoadState {
    #[default]
    Idle,
    Pending(PendingLoad),
    Ready,
    Failed,
}

/// A reusable visual binding to at most one item.
///
/// A panel refers to its item by identity only and never owns it. Everything a panel holds is
/// reset on release, so a rebound panel is indistinguishable from a fresh one.
#[derive(Clone, Debug)]
pub struct Panel<C> {
    id: PanelId,
    bound: Option<ItemId>,
    binding: u64,
    dwell_ms: f32,
    displayed_y: f32,
    load: LoadState,
    content: Option<C>,
    content_alpha: f32,
}

impl<C> Panel<C> {
    fn new(id: PanelId) -> Self {
        Self {
            id,
            bound: None,
            binding: 0,
            dwell_ms: 0.0,
            displayed_y: 0.0,
            load: LoadState::Idle,
            content: None,
            content_alpha: 0.0,
        }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn bound_item(&self) -> Option<ItemId> {
        self.bound
    }

    /// A number unique to the current binding; it changes on every acquire.
    pub fn binding(&self) -> u64 {
        self.binding
    }

    pub fn dwell_ms(&self) -> f32 {
        self.dwell_ms
    }

    pub fn displayed_y(&self) -> f32 {
        self.displayed_y
    }

    pub fn pending_load(&self) -> Option<&PendingLoad> {
        match &self.load {
            LoadState::Pending(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn content(&self) -> Option<&C> {
        self.content.as_ref()
    }

    pub fn content_alpha(&self) -> f32 {
        self.content_alpha
    }

    pub fn has_load_failed(&self) -> bool {
        matches!(self.load, LoadState::Failed)
    }

    /// Whether the debounced loader should still consider this panel.
    pub(crate) fn awaits_load(&self) -> bool {
        self.bound.is_some() && matches!(self.load, LoadState::Idle)
    }

    pub(crate) fn set_displayed_y(&mut self, y: f32) {
        self.displayed_y = y;
    }

    pub(crate) fn add_dwell(&mut self, elapsed_ms: f32) -> f32 {
        self.dwell_ms += elapsed_ms;
        self.dwell_ms
    }

    pub(crate) fn begin_load(&mut self, pending: PendingLoad) {
        debug_assert!(matches!(self.load, LoadState::Idle));
        self.load = LoadState::Pending(pending);
    }

    pub(crate) fn attach(&mut self, content: C) {
        self.load = LoadState::Ready;
        self.content = Some(content);
        self.content_alpha = 0.0;
    }

    pub(crate) fn fail_load(&mut self) {
        self.load = LoadState::Failed;
    }

    pub(crate) fn fade_in(&mut self, elapsed_ms: f32, duration_ms: f32) {
        if self.content.is_none() {
            return;
        }
        if duration_ms <= 0.0 {
            self.content_alpha = 1.0;
            return;
        }
        self.content_alpha = (self.content_alpha + elapsed_ms / duration_ms).min(1.0);
    }

    fn bind(&mut self, item: ItemId, binding: u64, displayed_y: f32) {
        self.reset();
        self.bound = Some(item);
        self.binding = binding;
        self.displayed_y = displayed_y;
    }

    fn reset(&mut self) {
        if let LoadState::Pending(pending) = &self.load {
            pending.cancel();
        }
        self.bound = None;
        self.dwell_ms = 0.0;
        self.displayed_y = 0.0;
        self.load = LoadState::Idle;
        self.content = None;
        self.content_alpha = 0.0;
    }
}

/// A grow-only pool of panels.
///
/// The pool grows to the high-water mark of simultaneously bound panels and never destroys a
/// panel, so `acquire` cannot fail. Idle panels are reused LIFO.
#[derive(Clone, Debug)]
pub struct PanelPool<C> {
    panels: Vec<Panel<C>>,
    idle: Vec<PanelId>,
    bound: usize,
    high_water: usize,
    next_binding: u64,
}

impl<C> Default for PanelPool<C> {
    fn default() -> Self {
        Self {
            panels: Vec::new(),
            idle: Vec::new(),
            bound: 0,
            high_water: 0,
            next_binding: 1,
        }
    }
}

impl<C> PanelPool<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an idle panel (or a newly constructed one) to `item`.
    pub fn acquire(&mut self, item: ItemId, displayed_y: f32) -> PanelId {
        let id = match self.idle.pop() {
            Some(id) => id,
            None => {
                let id = PanelId(self.panels.len());
                self.panels.push(Panel::new(id));
                cdebug!(constructed = self.panels.len(), "PanelPool: constructed panel");
                id
            }
        };

        let binding = self.next_binding;
        self.next_binding = self.next_binding.wrapping_add(1);
        self.panels[id.0].bind(item, binding, displayed_y);

        self.bound += 1;
        self.high_water = self.high_water.max(self.bound);
        ctrace!(panel = id.0, item = item.0, binding, "PanelPool::acquire");
        id
    }

    /// Unbinds a panel, cancelling any pending load, and returns it to the idle set.
    ///
    /// Returns `false` if the panel was not bound.
    pub fn release(&mut self, id: PanelId) -> bool {
        let Some(panel) = self.panels.get_mut(id.0) else {
            return false;
        };
        if panel.bound.is_none() {
            cwarn!(panel = id.0, "PanelPool: release of an unbound panel");
            return false;
        }
        ctrace!(panel = id.0, "PanelPool::release");
        panel.reset();
        self.idle.push(id);
        self.bound -= 1;
        true
    }

    pub fn get(&self, id: PanelId) -> Option<&Panel<C>> {
        self.panels.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: PanelId) -> Option<&mut Panel<C>> {
        self.panels.get_mut(id.0)
    }

    pub fn bound(&self) -> impl Iterator<Item = &Panel<C>> {
        self.panels.iter().filter(|p| p.bound.is_some())
    }

    pub(crate) fn bound_mut(&mut self) -> impl Iterator<Item = &mut Panel<C>> {
        self.panels.iter_mut().filter(|p| p.bound.is_some())
    }

    /// Number of panel instances ever constructed.
    pub fn constructed(&self) -> usize {
        self.panels.len()
    }

    pub fn bound_count(&self) -> usize {
        self.bound
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// The historical maximum of simultaneously bound panels.
    pub fn high_water(&self) -> usize {
        self.high_water
    }
}
