/// Debounce parameters for content materialization.
///
/// A bound panel starts loading once its dwell time exceeds
/// `base_delay_ms + distance_factor_ms * |viewport_center - displayed_y| / viewport_height`.
///
/// The defaults were tuned by eye for a 60Hz target and are not derived from any formula; treat
/// them as starting points.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoaderOptions {
    pub base_delay_ms: f32,
    pub distance_factor_ms: f32,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            base_delay_ms: 50.0,
            distance_factor_ms: 100.0,
        }
    }
}

/// Configuration for [`crate::Carousel`].
///
/// All fields are plain values; update them and call `Carousel::set_options` to apply.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CarouselOptions {
    pub loader: LoaderOptions,

    /// Exponential decay constant for displayed offsets, in reciprocal milliseconds.
    pub decay_per_ms: f32,

    /// Displayed offsets within this distance of their target snap exactly.
    pub snap_epsilon: f32,

    /// Extra distance above and below the viewport in which group panels stay bound.
    pub overscan_px: f32,

    /// Duration of the content fade-in after a load attaches.
    pub content_fade_ms: f32,

    /// Whether context actions include forward navigation (`Play`, `Edit`).
    pub forward_actions: bool,
}

impl Default for CarouselOptions {
    fn default() -> Self {
        Self {
            loader: LoaderOptions::default(),
            decay_per_ms: 0.01,
            snap_epsilon: 1e-3,
            overscan_px: 0.0,
            content_fade_ms: 150.0,
            forward_actions: true,
        }
    }
}
