use core::fmt;

use carousel::{
    Align, Carousel, CarouselError, DetailArea, EnrichmentClient, FilterEngine, GroupSource,
    ItemId, Materializer, Settings, Viewport,
};

use crate::{Easing, ScrollAnchor, Tween, apply_anchor, capture_first_visible_anchor};

/// Duration of the scroll-to-selection tween.
pub const DEFAULT_SCROLL_DURATION_MS: u64 = 300;

/// A framework-neutral frame driver that owns a [`Carousel`] and its [`DetailArea`].
///
/// This type does not hold any UI objects. Adapters drive it by calling:
/// - `on_viewport` / `on_scroll` when UI events occur
/// - `tick(now_ms)` each frame with a monotonic clock
///
/// For UI scroll containers, use the offset returned from `tick()` to set the real scroll
/// position while a selection tween is running.
pub struct Controller<M: Materializer, E: EnrichmentClient> {
    carousel: Carousel<M>,
    detail: DetailArea<E>,
    tween: Option<Tween>,
    /// The group the active tween keeps centered.
    follow: Option<ItemId>,
    last_tick_ms: Option<u64>,
    scroll_duration_ms: u64,
    easing: Easing,
}

impl<M: Materializer, E: EnrichmentClient> Controller<M, E> {
    pub fn new(carousel: Carousel<M>, detail: DetailArea<E>) -> Self {
        Self {
            carousel,
            detail,
            tween: None,
            follow: None,
            last_tick_ms: None,
            scroll_duration_ms: DEFAULT_SCROLL_DURATION_MS,
            easing: Easing::default(),
        }
    }

    pub fn carousel(&self) -> &Carousel<M> {
        &self.carousel
    }

    pub fn carousel_mut(&mut self) -> &mut Carousel<M> {
        &mut self.carousel
    }

    pub fn detail(&self) -> &DetailArea<E> {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut DetailArea<E> {
        &mut self.detail
    }

    pub fn into_parts(self) -> (Carousel<M>, DetailArea<E>) {
        (self.carousel, self.detail)
    }

    pub fn set_scroll_animation(&mut self, duration_ms: u64, easing: Easing) {
        self.scroll_duration_ms = duration_ms;
        self.easing = easing;
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    pub fn cancel_animation(&mut self) {
        self.tween = None;
        self.follow = None;
    }

    pub fn on_viewport(&mut self, viewport: Viewport) {
        self.carousel.set_viewport(viewport);
    }

    /// Call this when the UI reports a scroll offset change (e.g. user wheel/drag).
    ///
    /// This cancels any active tween.
    pub fn on_scroll(&mut self, scroll_offset: f32) {
        self.cancel_animation();
        self.carousel.set_scroll_offset(scroll_offset);
    }

    /// Advances one frame.
    ///
    /// Elapsed time is measured from the previous `tick` (the first tick advances by zero).
    /// Returns the scroll offset set by an active tween, if any.
    pub fn tick(&mut self, now_ms: u64) -> Option<f32> {
        let elapsed_ms = self
            .last_tick_ms
            .map_or(0, |last| now_ms.saturating_sub(last));
        self.last_tick_ms = Some(now_ms);

        self.follow_selection(now_ms);
        let mut scrolled = None;
        if let Some(tween) = self.tween {
            let offset = tween.sample(now_ms);
            self.carousel.set_scroll_offset(offset);
            if tween.is_done(now_ms) {
                self.cancel_animation();
            }
            scrolled = Some(offset);
        }

        self.carousel.tick(elapsed_ms as f32);
        self.sync_detail();
        self.detail.poll();
        scrolled
    }

    /// Selects an item and starts a tween that centers its group.
    pub fn select(&mut self, id: ItemId, now_ms: u64) -> Result<(), CarouselError> {
        self.carousel.select(id)?;
        self.sync_detail();
        self.carousel.refresh_layout();

        let group = self.carousel.model().group_of(id).unwrap_or(id);
        if let Some(to) = self.carousel.scroll_offset_for(group, Align::Center) {
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "carousel", group = group.0, to, "Controller: scroll to selection");
            self.start_tween_to_offset(to, now_ms);
            self.follow = Some(group);
        }
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.carousel.deselect();
        self.sync_detail();
    }

    /// Applies a scroll offset immediately (no animation).
    pub fn scroll_to_item(&mut self, id: ItemId, align: Align) -> Option<f32> {
        self.carousel.refresh_layout();
        let offset = self.carousel.scroll_offset_for(id, align)?;
        self.on_scroll(offset);
        Some(offset)
    }

    /// Starts a tween from the current scroll offset. Returns the target.
    pub fn start_tween_to_offset(&mut self, offset: f32, now_ms: u64) -> f32 {
        self.follow = None;
        let from = self.carousel.viewport().scroll_offset;
        let tween = match self.tween {
            Some(mut tween) => {
                tween.retarget(now_ms, offset, self.scroll_duration_ms);
                tween
            }
            None => Tween::new(from, offset, now_ms, self.scroll_duration_ms, self.easing),
        };
        self.tween = Some(tween);
        offset
    }

    /// Runs a filter pass while keeping the first visible group where it was on screen.
    pub fn apply_filter(&mut self, engine: &impl FilterEngine) -> bool {
        let anchor = self.capture_anchor();
        self.carousel.apply_filter(engine);
        self.finish_layout_change(anchor)
    }

    /// Replaces the backing collection while keeping the first visible group where it was.
    pub fn set_groups(&mut self, groups: Vec<GroupSource>) -> bool {
        let anchor = self.capture_anchor();
        self.carousel.set_groups(groups);
        self.finish_layout_change(anchor)
    }

    /// Pushes user settings into the carousel options and the detail area.
    pub fn apply_settings(&mut self, settings: &Settings) {
        let mut options = *self.carousel.options();
        settings.apply_to(&mut options);
        self.carousel.set_options(options);
        self.detail.set_tab(settings.detail_tab);
        self.detail.set_filter_mods(settings.detail_mods_filter);
    }

    /// Bends an active scroll-to-selection tween toward the selected group's current position.
    fn follow_selection(&mut self, now_ms: u64) {
        let (Some(tween), Some(group)) = (self.tween.as_mut(), self.follow) else {
            return;
        };
        self.carousel.refresh_layout();
        let Some(to) = self.carousel.scroll_offset_for(group, Align::Center) else {
            return;
        };
        if (to - tween.to).abs() > 0.5 {
            tween.follow(now_ms, to);
        }
    }

    fn capture_anchor(&mut self) -> Option<ScrollAnchor> {
        self.carousel.refresh_layout();
        capture_first_visible_anchor(&self.carousel)
    }

    /// Returns `true` if the anchor was re-applied.
    fn finish_layout_change(&mut self, anchor: Option<ScrollAnchor>) -> bool {
        self.carousel.refresh_layout();
        self.sync_detail();
        let Some(anchor) = anchor else {
            return false;
        };
        if !apply_anchor(&mut self.carousel, &anchor) {
            return false;
        }
        self.cancel_animation();
        true
    }

    fn sync_detail(&mut self) {
        let target = self.carousel.detail_target();
        let online_id = target.and_then(|id| self.carousel.model().online_id(id));
        self.detail.show(target, online_id);
    }
}

impl<M: Materializer, E: EnrichmentClient> fmt::Debug for Controller<M, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("carousel", &self.carousel)
            .field("detail", &self.detail.displayed())
            .field("tween", &self.tween)
            .field("follow", &self.follow)
            .field("last_tick_ms", &self.last_tick_ms)
            .finish()
    }
}
