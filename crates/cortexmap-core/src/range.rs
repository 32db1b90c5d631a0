use serde::{Deserialize, Serialize};

/// A closed 1-D value interval `[min, max]`.
///
/// Degenerate ranges (`min == max`) are legal: every normalization through
/// them falls back to identity instead of dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Range spanned by the finite entries of `values`.
    pub fn from_values(values: &[f32]) -> Option<Self> {
        Self::spanning(values.iter().copied())
    }

    pub fn spanning(values: impl IntoIterator<Item = f32>) -> Option<Self> {
        let mut range: Option<Self> = None;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            range = Some(match range {
                None => Self::new(v, v),
                Some(r) => Self::new(r.min.min(v), r.max.max(v)),
            });
        }
        range
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        self.span() == 0.0
    }

    /// Map `value` from this range into `target`.
    ///
    /// A degenerate source range returns `value` unchanged.
    pub fn rescale(&self, value: f32, target: &ValueRange) -> f32 {
        if self.is_degenerate() {
            return value;
        }
        target.span() * (value - self.min) / self.span() + target.min
    }

    /// Map `value` into `[0, 1]` (identity on a degenerate range).
    pub fn normalize(&self, value: f32) -> f32 {
        self.rescale(value, &ValueRange::UNIT)
    }

    /// `n` evenly spaced samples from `min` to `max`, both included.
    pub fn linspace(&self, n: usize) -> Vec<f32> {
        match n {
            0 => Vec::new(),
            1 => vec![self.min],
            _ => {
                let step = self.span() / (n - 1) as f32;
                (0..n)
                    .map(|i| {
                        if i == n - 1 {
                            self.max
                        } else {
                            self.min + step * i as f32
                        }
                    })
                    .collect()
            }
        }
    }

    pub const UNIT: ValueRange = ValueRange { min: 0.0, max: 1.0 };
}
