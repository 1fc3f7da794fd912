use carousel::{Carousel, ItemId, Materializer};

/// Keeps the viewport pinned to an item identity across re-filtering.
///
/// Filtering moves groups around; without an anchor the viewport stays at the same offset and
/// the content under it jumps.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollAnchor {
    pub item: ItemId,
    /// The distance from the anchor item's start to the viewport's scroll offset. Negative when
    /// the item starts below the scroll offset.
    pub offset_in_viewport: f32,
}

/// Captures an anchor for the first visible group intersecting the viewport.
///
/// Returns `None` when no group intersects the viewport.
pub fn capture_first_visible_anchor<M: Materializer>(c: &Carousel<M>) -> Option<ScrollAnchor> {
    let viewport = c.viewport();
    let span = c
        .model()
        .groups_in_range(viewport.scroll_offset, viewport.end())
        .first()?;
    Some(ScrollAnchor {
        item: span.id,
        offset_in_viewport: viewport.scroll_offset - span.y,
    })
}

/// Re-applies a previously captured anchor against the current layout.
///
/// The layout must be current (see `Carousel::refresh_layout`). Returns `true` when the anchor
/// item is still visible and the scroll offset was adjusted.
pub fn apply_anchor<M: Materializer>(c: &mut Carousel<M>, anchor: &ScrollAnchor) -> bool {
    let model = c.model();
    if !model.is_visible(anchor.item) {
        return false;
    }
    let Some(start) = model.absolute_y(anchor.item) else {
        return false;
    };
    let max = (model.content_height() - c.viewport().height).max(0.0);
    let target = (start + anchor.offset_in_viewport).clamp(0.0, max);
    c.set_scroll_offset(target);
    true
}
