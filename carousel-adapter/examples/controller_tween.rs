use std::sync::Arc;

use carousel::{
    BoxFuture, CancellationToken, Carousel, CarouselOptions, ChildSource, DetailArea, DetailTab,
    EnrichmentClient, EnrichmentError, EnrichmentRequest, Executor, GroupSource, ItemId,
    ManualExecutor, MaterializeError, MaterializeRequest, Materializer, Viewport, Visibility,
};
use carousel_adapter::Controller;

struct Noop;

impl Materializer for Noop {
    type Content = ();

    fn materialize(
        &self,
        _request: MaterializeRequest,
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), MaterializeError>> {
        Box::pin(async { Ok(()) })
    }

    fn materialize_children(
        &self,
        _group: ItemId,
        children: &[ItemId],
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<()>, MaterializeError>> {
        let n = children.len();
        Box::pin(async move { Ok(vec![(); n]) })
    }
}

struct Scores;

impl EnrichmentClient for Scores {
    type Payload = Vec<u32>;

    fn request(
        &self,
        request: EnrichmentRequest,
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<u32>, EnrichmentError>> {
        Box::pin(async move { Ok(vec![request.online_id as u32 * 1000, 950, 900]) })
    }
}

fn main() {
    // Example: a frame loop driving selection tweens and the detail area without any UI objects.
    //
    // An adapter would:
    // - forward user scroll/selection events
    // - call tick(now_ms) in a frame loop / timer
    // - apply the returned offset to the real scroll container (if any)
    // - render `carousel().draw_items()` and `detail().state()`
    let groups: Vec<GroupSource> = (1..=2_000u64)
        .map(|g| {
            GroupSource::new(ItemId(g * 10), 80.0)
                .with_child(ChildSource::new(ItemId(g * 10 + 1), 40.0).with_online_id(g))
        })
        .collect();

    let executor = Arc::new(ManualExecutor::new());
    let dyn_executor: Arc<dyn Executor> = executor.clone();
    let mut carousel = Carousel::new(
        CarouselOptions::default(),
        Arc::new(Noop),
        Arc::clone(&dyn_executor),
    );
    carousel.set_groups(groups);
    carousel.set_viewport(Viewport::new(0.0, 720.0));
    let detail = DetailArea::new(Arc::new(Scores), dyn_executor, DetailTab::Remote);
    let mut c = Controller::new(carousel, detail);

    c.select(ItemId(12_340), 0).ok();
    let mut now_ms = 0u64;
    loop {
        now_ms += 16;
        executor.run_pending();
        match c.tick(now_ms) {
            Some(off) if now_ms % 80 == 0 => println!("t={now_ms} off={off}"),
            Some(_) => {}
            None => break,
        }
    }
    println!(
        "done: off={} detail={:?}",
        c.carousel().viewport().scroll_offset,
        c.detail().state()
    );

    // Re-filtering keeps the first visible group in place.
    let anchored = c.apply_filter(&|groups: &[GroupSource]| {
        Visibility::all().hidden(groups.iter().step_by(2).map(|g| g.id))
    });
    println!(
        "anchored={anchored} off={}",
        c.carousel().viewport().scroll_offset
    );
}
