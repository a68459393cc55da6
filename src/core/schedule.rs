/// Cancellable scheduled tasks on a virtual millisecond clock.
///
/// Nothing here sleeps: the owner advances the clock explicitly and gets
/// back whatever came due, in due order. Ties fire in scheduling order.
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Handle returned by [`Scheduler::schedule`], used to cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_id: u64,
    /// (due, handle): min-heap through `Reverse`
    queue: BinaryHeap<Reverse<(u64, TaskHandle)>>,
    /// handle -> (due, payload)
    pending: FxHashMap<TaskHandle, (u64, T)>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            queue: BinaryHeap::new(),
            pending: FxHashMap::default(),
        }
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Schedule `payload` to fire `delay_ms` from now.
    pub fn schedule(&mut self, delay_ms: u64, payload: T) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        let due = self.now_ms.saturating_add(delay_ms);
        self.queue.push(Reverse((due, handle)));
        self.pending.insert(handle, (due, payload));
        handle
    }

    /// Cancel a pending task. Returns its payload if it had not fired yet.
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        let (_, payload) = self.pending.remove(&handle)?;
        self.prune();
        Some(payload)
    }

    /// Pop cancelled entries off the top of the heap. Deeper ones are
    /// skipped when they surface.
    fn prune(&mut self) {
        while let Some(Reverse((_, handle))) = self.queue.peek().copied() {
            if self.pending.contains_key(&handle) {
                break;
            }
            self.queue.pop();
        }
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    /// Milliseconds until `handle` fires, if still pending.
    pub fn remaining(&self, handle: TaskHandle) -> Option<u64> {
        self.pending
            .get(&handle)
            .map(|(due, _)| due.saturating_sub(self.now_ms))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Move the clock forward and return every payload that came due.
    pub fn advance(&mut self, elapsed_ms: u64) -> Vec<T> {
        self.now_ms = self.now_ms.saturating_add(elapsed_ms);
        let mut fired = Vec::new();
        while let Some(Reverse((due, handle))) = self.queue.peek().copied() {
            if due > self.now_ms {
                break;
            }
            self.queue.pop();
            if let Some((_, payload)) = self.pending.remove(&handle) {
                fired.push(payload);
            }
        }
        fired
    }

    /// Drop every pending task without firing it.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_when_due() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1000, "expire");
        assert!(scheduler.advance(999).is_empty());
        assert_eq!(scheduler.advance(1), vec!["expire"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn fires_in_due_order_with_ties_in_schedule_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(300, "c");
        scheduler.schedule(100, "a");
        scheduler.schedule(100, "b");
        assert_eq!(scheduler.advance(500), vec!["a", "b", "c"]);
    }

    #[test]
    fn cancelled_task_never_fires() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(50, 7);
        assert_eq!(scheduler.cancel(handle), Some(7));
        assert_eq!(scheduler.cancel(handle), None);
        assert!(scheduler.advance(100).is_empty());
    }

    #[test]
    fn cancel_drops_queued_entry() {
        let mut scheduler = Scheduler::new();
        let keep = scheduler.schedule(500, "keep");
        for _ in 0..10 {
            let handle = scheduler.schedule(100, "drop");
            scheduler.cancel(handle);
        }
        assert_eq!(scheduler.queue.len(), 1);
        assert_eq!(scheduler.remaining(keep), Some(500));
        assert_eq!(scheduler.advance(500), vec!["keep"]);
    }

    #[test]
    fn remaining_counts_down() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(5000, ());
        scheduler.advance(2000);
        assert_eq!(scheduler.remaining(handle), Some(3000));
        scheduler.advance(3000);
        assert_eq!(scheduler.remaining(handle), None);
    }

    #[test]
    fn fired_task_fires_once() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(10, "once");
        assert_eq!(scheduler.advance(10).len(), 1);
        assert!(scheduler.advance(1000).is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(10, 1);
        scheduler.schedule(20, 2);
        scheduler.clear();
        assert!(scheduler.advance(100).is_empty());
        assert_eq!(scheduler.now(), 100);
    }
}
