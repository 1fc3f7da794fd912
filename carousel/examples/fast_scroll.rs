// Example: a fast fling through 10k groups only loads what the viewport settles on.
use std::sync::Arc;

use carousel::{
    BoxFuture, CancellationToken, Carousel, CarouselOptions, ChildSource, Executor, GroupSource,
    ItemId, ManualExecutor, MaterializeError, MaterializeRequest, Materializer, Viewport,
};

struct Thumbnails;

impl Materializer for Thumbnails {
    type Content = String;

    fn materialize(
        &self,
        request: MaterializeRequest,
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<String, MaterializeError>> {
        Box::pin(async move {
            Ok(match request.background {
                Some(bg) => format!("thumb({}) bg={}", request.item, bg),
                None => format!("thumb({})", request.item),
            })
        })
    }

    fn materialize_children(
        &self,
        _group: ItemId,
        children: &[ItemId],
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<String>, MaterializeError>> {
        let rows: Vec<String> = children.iter().map(|c| format!("row({c})")).collect();
        Box::pin(async move { Ok(rows) })
    }
}

fn main() {
    let groups: Vec<GroupSource> = (0..10_000u64)
        .map(|g| {
            let mut group = GroupSource::new(ItemId(g * 10), 80.0);
            for c in 1..=4 {
                group = group.with_child(ChildSource::new(ItemId(g * 10 + c), 40.0).with_online_id(c));
            }
            group
        })
        .collect();

    let executor = Arc::new(ManualExecutor::new());
    let dyn_executor: Arc<dyn Executor> = executor.clone();
    let mut c = Carousel::new(CarouselOptions::default(), Arc::new(Thumbnails), dyn_executor);
    c.set_groups(groups);
    c.set_viewport(Viewport::new(0.0, 720.0));

    // Fling: 4000px per frame for one second.
    let mut offset = 0.0;
    for _ in 0..60 {
        offset += 4000.0;
        c.set_scroll_offset(offset);
        c.tick(16.0);
        executor.run_pending();
    }
    println!("after fling: loads_issued={}", c.loads_issued());

    // Settle.
    for _ in 0..30 {
        c.tick(16.0);
        executor.run_pending();
    }
    println!(
        "after settle: loads_issued={} panels={} high_water={}",
        c.loads_issued(),
        c.pool().constructed(),
        c.pool().high_water()
    );

    for item in c.draw_items().iter().take(3) {
        println!("{:?} y={} alpha={}", item.id, item.displayed_y, item.content_alpha);
    }
}
