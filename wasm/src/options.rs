use std::ops::ControlFlow;

use crate::error::ParseError;

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_BOUNDS_BATCH: usize = 10_000;
pub const DEFAULT_HEADER_SCAN_LIMIT: usize = 64 * 1024;

/// Tuning knobs for a parse. None of them change the decoded output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// Upper bound, in bytes, on the window a decoder works on at once.
    pub chunk_size: usize,
    /// Points folded into the bounds between two checkpoints.
    pub bounds_batch: usize,
    /// How far into the buffer to look for `end_header`.
    pub header_scan_limit: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            bounds_batch: DEFAULT_BOUNDS_BATCH,
            header_scan_limit: DEFAULT_HEADER_SCAN_LIMIT,
        }
    }
}

impl ParseOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_bounds_batch(mut self, bounds_batch: usize) -> Self {
        self.bounds_batch = bounds_batch.max(1);
        self
    }

    pub fn with_header_scan_limit(mut self, limit: usize) -> Self {
        self.header_scan_limit = limit;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Bounds,
}

/// Reported between chunks. `processed`/`total` are bytes while decoding and
/// points while folding bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub stage: Stage,
    pub processed: usize,
    pub total: usize,
}

/// Hands a checkpoint to the caller and turns `Break` into a cancellation.
pub(crate) fn yield_to<F>(on_checkpoint: &mut F, checkpoint: Checkpoint) -> Result<(), ParseError>
where
    F: FnMut(&Checkpoint) -> ControlFlow<()>,
{
    match on_checkpoint(&checkpoint) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(ParseError::Cancelled {
            processed: checkpoint.processed,
        }),
    }
}

/// Checkpoint callback that never interrupts.
pub fn keep_going(_: &Checkpoint) -> ControlFlow<()> {
    ControlFlow::Continue(())
}
