use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::pool::{Panel, PendingLoad};
use crate::worker::CompletionQueue;
use crate::{
    CarouselError, Executor, ItemId, ItemModel, LoaderOptions, MaterializeError,
    MaterializeRequest, Materializer, PanelId, PanelPool, Ticket, Viewport,
};

/// The dwell time a panel at `displayed_y` needs before its content is materialized.
///
/// Panels near the viewport center get the lowest threshold and load first.
pub fn load_threshold(options: &LoaderOptions, viewport: &Viewport, displayed_y: f32) -> f32 {
    let height = viewport.height.max(1.0);
    let distance = (viewport.center() - displayed_y).abs() / height;
    options.base_delay_ms + options.distance_factor_ms * distance
}

pub(crate) struct ContentCompletion<C> {
    ticket: Ticket,
    panel: PanelId,
    binding: u64,
    item: ItemId,
    result: Result<C, MaterializeError>,
}

/// Debounces content materialization for bound panels.
///
/// A panel only loads after it has stayed bound past its threshold, so panels that flash by
/// during a fast scroll never issue work. Panels bound to hidden items neither dwell nor load. At most one load is in flight per panel, and a
/// binding that failed to load is not retried.
pub(crate) struct DebouncedLoader<M: Materializer> {
    options: LoaderOptions,
    materializer: Arc<M>,
    queue: CompletionQueue<ContentCompletion<M::Content>>,
}

impl<M: Materializer> DebouncedLoader<M> {
    pub(crate) fn new(
        options: LoaderOptions,
        materializer: Arc<M>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            options,
            materializer,
            queue: CompletionQueue::new(executor),
        }
    }

    pub(crate) fn set_options(&mut self, options: LoaderOptions) {
        self.options = options;
    }

    pub(crate) fn issued(&self) -> u64 {
        self.queue.issued()
    }

    pub(crate) fn tick(
        &mut self,
        pool: &mut PanelPool<M::Content>,
        model: &ItemModel,
        viewport: &Viewport,
        elapsed_ms: f32,
    ) {
        for panel in pool.bound_mut() {
            if !panel.awaits_load() {
                continue;
            }
            let Some(item) = panel.bound_item() else {
                continue;
            };
            if !model.is_visible(item) {
                continue;
            }

            let dwell = panel.add_dwell(elapsed_ms);
            let threshold = load_threshold(&self.options, viewport, panel.displayed_y());
            if dwell <= threshold {
                continue;
            }

            let Some(kind) = model.kind(item) else {
                continue;
            };
            let request = MaterializeRequest {
                item,
                kind,
                background: if kind.is_group() {
                    model.background_source(item)
                } else {
                    None
                },
            };

            let ticket = self.queue.next_ticket();
            let token = CancellationToken::new();
            let work = self.materializer.materialize(request, token.clone());
            let (panel_id, binding) = (panel.id(), panel.binding());
            ctrace!(
                panel = panel_id.index(),
                item = item.0,
                dwell,
                threshold,
                "DebouncedLoader: issuing load"
            );
            self.queue.spawn(token.clone(), async move {
                ContentCompletion {
                    ticket,
                    panel: panel_id,
                    binding,
                    item,
                    result: work.await,
                }
            });
            panel.begin_load(PendingLoad { ticket, token });
        }
    }

    /// Attaches finished loads on the frame thread. Returns the number attached.
    pub(crate) fn drain(&mut self, pool: &mut PanelPool<M::Content>) -> usize {
        let mut attached = 0;
        for done in self.queue.drain() {
            let panel = match current_panel(pool, &done) {
                Ok(panel) => panel,
                Err(err) => {
                    ctrace!(error = %err, ticket = done.ticket.0, "DebouncedLoader: discarded");
                    continue;
                }
            };
            match done.result {
                Ok(content) => {
                    panel.attach(content);
                    attached += 1;
                }
                Err(err) => {
                    cwarn!(item = done.item.0, error = %err, "DebouncedLoader: load failed");
                    panel.fail_load();
                }
            }
        }
        attached
    }
}

/// The panel a completion targets, provided it is still bound to the same item, by the same
/// binding, with the same load pending.
fn current_panel<'a, C>(
    pool: &'a mut PanelPool<C>,
    done: &ContentCompletion<C>,
) -> Result<&'a mut Panel<C>, CarouselError> {
    let stale = CarouselError::StaleResult(done.item);
    let panel = pool.get_mut(done.panel).ok_or_else(|| stale.clone())?;
    let pending_matches = panel
        .pending_load()
        .is_some_and(|p| p.ticket() == done.ticket && !p.is_cancelled());
    if panel.binding() != done.binding || panel.bound_item() != Some(done.item) || !pending_matches
    {
        return Err(stale);
    }
    Ok(panel)
}
