use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::{ItemId, ItemKind, MaterializeError};

/// What a panel asks the materializer to build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterializeRequest {
    pub item: ItemId,
    pub kind: ItemKind,
    /// For groups: the child whose imagery backs the panel.
    pub background: Option<ItemId>,
}

/// Builds expensive per-item content off the frame thread.
///
/// Implementations should observe `cancel` where they can. Results that arrive after
/// cancellation, or for a panel that has since been rebound, are discarded by the carousel.
pub trait Materializer: Send + Sync + 'static {
    type Content: Send + 'static;

    fn materialize(
        &self,
        request: MaterializeRequest,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Self::Content, MaterializeError>>;

    /// Builds the content of a group's child collection, one entry per child, in order.
    fn materialize_children(
        &self,
        group: ItemId,
        children: &[ItemId],
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<Self::Content>, MaterializeError>>;
}
