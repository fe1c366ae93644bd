//! Planner to scheduler block handoff.

use heapless::spsc::{Consumer, Producer, Queue};
use heapless::Deque;

use crate::error::{BlockError, Error, Result};

use super::block::MotionBlock;

/// Consumer side of the planner queue, as seen by the step scheduler.
///
/// The head block stays in the queue while it executes: `fetch` copies it out and
/// `release` frees the slot once the block is done or discarded.
pub trait BlockSource {
    /// Copy of the head block, if any.
    fn fetch(&mut self) -> Option<MotionBlock>;

    /// Drop the head block.
    fn release(&mut self);

    /// Blocks in the queue, including one being executed.
    fn depth(&self) -> usize;

    /// Drop every queued block.
    fn clear(&mut self) {
        while self.depth() > 0 {
            self.release();
        }
    }
}

/// Fixed-capacity single-producer single-consumer block queue.
///
/// Holds up to `N - 1` blocks.
pub struct BlockQueue<const N: usize> {
    inner: Queue<MotionBlock, N>,
}

impl<const N: usize> Default for BlockQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BlockQueue<N> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            inner: Queue::new(),
        }
    }

    /// Split into the planner and scheduler halves.
    pub fn split(&mut self) -> (BlockProducer<'_, N>, BlockConsumer<'_, N>) {
        let (producer, consumer) = self.inner.split();
        (BlockProducer { inner: producer }, BlockConsumer { inner: consumer })
    }
}

/// Planner half of a [`BlockQueue`].
pub struct BlockProducer<'a, const N: usize> {
    inner: Producer<'a, MotionBlock, N>,
}

impl<'a, const N: usize> BlockProducer<'a, N> {
    /// Validate and enqueue a block.
    ///
    /// # Errors
    ///
    /// Returns the block's validation error, or `BlockError::QueueFull`.
    pub fn push(&mut self, block: MotionBlock) -> Result<()> {
        block.validate()?;
        self.inner
            .enqueue(block)
            .map_err(|_| Error::Block(BlockError::QueueFull))
    }

    /// Blocks waiting or executing.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when the scheduler has drained the queue.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when another block fits.
    pub fn ready(&self) -> bool {
        self.inner.ready()
    }

    /// Wait until every queued block has been executed or discarded.
    ///
    /// `idle` runs between polls; background housekeeping belongs there.
    pub fn synchronize<F: FnMut()>(&self, mut idle: F) {
        while !self.is_empty() {
            idle();
        }
    }
}

/// Scheduler half of a [`BlockQueue`].
pub struct BlockConsumer<'a, const N: usize> {
    inner: Consumer<'a, MotionBlock, N>,
}

impl<'a, const N: usize> BlockSource for BlockConsumer<'a, N> {
    fn fetch(&mut self) -> Option<MotionBlock> {
        self.inner.peek().copied()
    }

    fn release(&mut self) {
        let _ = self.inner.dequeue();
    }

    fn depth(&self) -> usize {
        self.inner.len()
    }
}

impl<const N: usize> BlockSource for Deque<MotionBlock, N> {
    fn fetch(&mut self) -> Option<MotionBlock> {
        self.front().copied()
    }

    fn release(&mut self) {
        let _ = self.pop_front();
    }

    fn depth(&self) -> usize {
        self.len()
    }
}
