/// A scroll tween sampled against wall-clock milliseconds.
///
/// The target may move while the tween runs (the selected group shifts when layout changes
/// above it); [`Tween::follow`] moves it without a visible jump or a longer animation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tween {
    pub from: f32,
    pub to: f32,
    pub start_ms: u64,
    pub end_ms: u64,
    pub easing: Easing,
}

impl Tween {
    pub fn new(from: f32, to: f32, start_ms: u64, duration_ms: u64, easing: Easing) -> Self {
        Self {
            from,
            to,
            start_ms,
            end_ms: start_ms.saturating_add(duration_ms.max(1)),
            easing,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms).max(1)
    }

    pub fn is_done(&self, now_ms: u64) -> bool {
        now_ms >= self.end_ms
    }

    /// Eased progress in `[0, 1]`.
    pub fn progress(&self, now_ms: u64) -> f32 {
        let elapsed = now_ms.saturating_sub(self.start_ms);
        let t = (elapsed as f32 / self.duration_ms() as f32).clamp(0.0, 1.0);
        self.easing.sample(t)
    }

    pub fn sample(&self, now_ms: u64) -> f32 {
        let eased = self.progress(now_ms);
        if eased >= 1.0 {
            return self.to.max(0.0);
        }
        let v = self.from + (self.to - self.from) * eased;
        v.max(0.0)
    }

    /// Restarts from the current sample toward `new_to`, keeping the easing.
    pub fn retarget(&mut self, now_ms: u64, new_to: f32, duration_ms: u64) {
        let cur = self.sample(now_ms);
        *self = Self::new(cur, new_to, now_ms, duration_ms, self.easing);
    }

    /// Moves the target without restarting: the sample at `now_ms` and the end time stay put,
    /// the rest of the curve bends toward `new_to`.
    pub fn follow(&mut self, now_ms: u64, new_to: f32) {
        let eased = self.progress(now_ms);
        let remaining = 1.0 - eased;
        if remaining <= f32::EPSILON {
            self.from = new_to;
        } else {
            let cur = self.from + (self.to - self.from) * eased;
            self.from = (cur - new_to * eased) / remaining;
        }
        self.to = new_to;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Easing {
    Linear,
    SmoothStep,
    EaseInOutCubic,
    /// Fast start, long settle. Used for scroll-to-selection.
    #[default]
    EaseOutExpo,
}

impl Easing {
    pub fn sample(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - (u * u * u) / 2.0
                }
            }
            Self::EaseOutExpo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t)
                }
            }
        }
    }
}
