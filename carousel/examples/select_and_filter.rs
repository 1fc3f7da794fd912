// Example: selection expands a group, and re-filtering reuses unchanged children.
use std::sync::Arc;

use carousel::{
    BoxFuture, CancellationToken, Carousel, CarouselOptions, ChildSource, Executor, GroupSource,
    ItemId, ManualExecutor, MaterializeError, MaterializeRequest, Materializer, Viewport,
    Visibility,
};

struct Labels;

impl Materializer for Labels {
    type Content = String;

    fn materialize(
        &self,
        request: MaterializeRequest,
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<String, MaterializeError>> {
        Box::pin(async move { Ok(request.item.to_string()) })
    }

    fn materialize_children(
        &self,
        _group: ItemId,
        children: &[ItemId],
        _cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<String>, MaterializeError>> {
        let labels: Vec<String> = children.iter().map(ItemId::to_string).collect();
        Box::pin(async move { Ok(labels) })
    }
}

fn main() {
    let groups: Vec<GroupSource> = (1..=5u64)
        .map(|g| {
            GroupSource::new(ItemId(g * 100), 60.0)
                .with_child(ChildSource::new(ItemId(g * 100 + 1), 30.0))
                .with_child(ChildSource::new(ItemId(g * 100 + 2), 45.0))
                .with_child(ChildSource::new(ItemId(g * 100 + 3), 30.0))
        })
        .collect();

    let executor = Arc::new(ManualExecutor::new());
    let dyn_executor: Arc<dyn Executor> = executor.clone();
    let mut c = Carousel::new(CarouselOptions::default(), Arc::new(Labels), dyn_executor);
    c.set_groups(groups);
    c.set_viewport(Viewport::new(0.0, 600.0));

    c.select(ItemId(300)).ok();
    executor.run_pending();
    c.tick(16.0);
    if let Some(children) = c.reconciler().collection() {
        println!("expanded {:?}: offsets={:?}", children.items(), children.offsets());
    }

    // Hiding a child of another group leaves the selected group's children alone.
    c.apply_visibility(Visibility::all().hidden([ItemId(102)]));
    executor.run_pending();
    c.tick(16.0);
    println!("collections_built={}", c.reconciler().collections_built());

    // Hiding one of the selected group's children rebuilds.
    c.apply_visibility(Visibility::all().hidden([ItemId(302)]));
    executor.run_pending();
    c.tick(16.0);
    if let Some(children) = c.reconciler().collection() {
        println!("rebuilt {:?}: offsets={:?}", children.items(), children.offsets());
    }
    println!("collections_built={}", c.reconciler().collections_built());

    match c.request_context_actions(ItemId(100)) {
        Ok(actions) => {
            let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
            println!("actions for #100: {labels:?}");
        }
        Err(err) => println!("no actions: {err}"),
    }
}
