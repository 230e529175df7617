use std::ops::ControlFlow;

use crate::dataset::PointRecord;
use crate::error::ParseError;
use crate::options::{yield_to, Checkpoint, Stage};

/// Axis-aligned box. Starts inverted and only ever grows to cover points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn include(&mut self, p: [f32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn merge(mut self, other: &Bounds) -> Self {
        for i in 0..3 {
            self.min[i] = self.min[i].min(other.min[i]);
            self.max[i] = self.max[i].max(other.max[i]);
        }
        self
    }

    pub fn contains(&self, p: [f32; 3]) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }
}

/// Folds the bounds of `points` in batches, offering a checkpoint after each.
pub fn fold_bounds<F>(points: &[PointRecord], batch: usize, on_checkpoint: &mut F) -> Result<Bounds, ParseError>
where
    F: FnMut(&Checkpoint) -> ControlFlow<()>,
{
    let mut bounds = Bounds::empty();
    let mut processed = 0;
    for chunk in points.chunks(batch.max(1)) {
        let partial = chunk.iter().fold(Bounds::empty(), |mut b, p| {
            b.include(p.position);
            b
        });
        bounds = bounds.merge(&partial);
        processed += chunk.len();
        yield_to(
            on_checkpoint,
            Checkpoint {
                stage: Stage::Bounds,
                processed,
                total: points.len(),
            },
        )?;
    }
    Ok(bounds)
}
