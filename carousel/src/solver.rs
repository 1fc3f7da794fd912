/// Frame-rate independent smoothing of displayed offsets toward layout targets.
///
/// Each step computes `lerp(target, displayed, exp(-decay_per_ms * elapsed_ms))`, so the same
/// wall-clock time produces the same approach regardless of how it is split into frames. Values
/// within `snap_epsilon` of the target snap exactly, which keeps panels from drifting by
/// sub-pixel amounts forever.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionSolver {
    pub decay_per_ms: f32,
    pub snap_epsilon: f32,
}

impl Default for PositionSolver {
    fn default() -> Self {
        Self {
            decay_per_ms: 0.01,
            snap_epsilon: 1e-3,
        }
    }
}

impl PositionSolver {
    pub fn new(decay_per_ms: f32, snap_epsilon: f32) -> Self {
        Self {
            decay_per_ms,
            snap_epsilon,
        }
    }

    pub fn step(&self, displayed: f32, target: f32, elapsed_ms: f32) -> f32 {
        if (target - displayed).abs() <= self.snap_epsilon {
            return target;
        }
        let weight = (-(self.decay_per_ms as f64) * elapsed_ms.max(0.0) as f64).exp();
        lerp(target, displayed, weight as f32)
    }
}

/// `a + (b - a) * t`.
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
