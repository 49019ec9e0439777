use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct Inner<T> {
    /// Pending items, head is the next to be popped
    items: VecDeque<T>,

    /// Number of consumers currently parked in `pop`
    waiting: usize,
}

/// An unbounded FIFO queue shared between any number of producers and (usually) one consumer.
/// `push` never blocks; `pop` parks the calling thread until an item is available.
///
/// The item list and the waiting-consumer counter live behind a single mutex; the condition
/// variable only carries wake-ups.
pub struct BlockingQueue<T> {
    inner: Mutex<Inner<T>>,
    ready: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        BlockingQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                waiting: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append `item` at the tail and wake one parked consumer, if any.
    pub fn push(&self, item: T) {
        let mut inner = self.inner.lock();
        inner.items.push_back(item);

        self.ready.notify_one();
    }

    /// Remove and return the head item, parking the calling thread while the queue is empty.
    pub fn pop(&self) -> T {
        let mut inner = self.inner.lock();

        inner.waiting += 1;
        let item = loop {
            // a wake-up is only a hint: another consumer may have raced us to the item
            if let Some(item) = inner.items.pop_front() {
                break item;
            }

            self.ready.wait(&mut inner);
        };
        inner.waiting -= 1;

        item
    }

    /// Remove and return the head item if there is one, without parking.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().items.pop_front()
    }

    /// Tear the queue down. Taking `self` by value means no consumer can still be parked in `pop`
    /// and no producer can push afterwards. Returns how many leftover items were discarded.
    pub fn drain_and_destroy(self) -> usize {
        let inner = self.inner.into_inner();
        let leftover = inner.items.len();

        drop(inner.items);
        leftover
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        BlockingQueue::new()
    }
}

pub trait QueueState {
    /// Items pushed but not yet popped.
    fn len(&self) -> usize;

    /// Consumers currently parked in `pop`.
    fn waiting(&self) -> usize;

    /// Backlog as seen by monitoring: the pending items minus the consumers already parked
    /// waiting for one, floored at zero. Purely observational, never use it for flow control.
    fn reported_len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> QueueState for BlockingQueue<T> {
    fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    fn waiting(&self) -> usize {
        self.inner.lock().waiting
    }

    fn reported_len(&self) -> usize {
        // both counters are read under the same lock as push/pop
        let inner = self.inner.lock();
        inner.items.len().saturating_sub(inner.waiting)
    }
}

#[cfg(test)]
mod queue_tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_for_parked<T>(queue: &BlockingQueue<T>, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);

        while queue.waiting() < count {
            assert!(Instant::now() < deadline, "consumer never parked");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn single_thread_fifo() {
        let queue = BlockingQueue::new();

        for i in 0..16 {
            queue.push(i);
        }

        for i in 0..16 {
            assert_eq!(queue.pop(), i);
        }

        assert!(queue.is_empty());
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn per_producer_order_is_kept() {
        const PRODUCERS: usize = 4;
        const COUNT: usize = 500;

        let queue = Arc::new(BlockingQueue::new());

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|id| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for seq in 0..COUNT {
                        queue.push((id, seq));
                    }
                })
            })
            .collect();

        let mut next = [0usize; PRODUCERS];
        for _ in 0..PRODUCERS * COUNT {
            let (id, seq) = queue.pop();
            assert_eq!(seq, next[id], "producer {} delivered out of order", id);
            next[id] += 1;
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(next.iter().all(|&n| n == COUNT));
        assert!(queue.is_empty());
    }

    #[test]
    fn pop_blocks_until_push() {
        let queue = Arc::new(BlockingQueue::new());

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let item = queue.pop();
                (item, Instant::now())
            })
        };

        wait_for_parked(&queue, 1);
        thread::sleep(Duration::from_millis(20));
        assert!(!consumer.is_finished());

        let pushed_at = Instant::now();
        queue.push(42u32);

        let (item, popped_at) = consumer.join().unwrap();
        assert_eq!(item, 42);
        assert!(popped_at >= pushed_at);
        assert!(popped_at - pushed_at < Duration::from_secs(1));
    }

    #[test]
    fn reported_len_counts_backlog() {
        let queue = BlockingQueue::new();

        for i in 0..5 {
            queue.push(i);
        }

        assert_eq!(queue.len(), 5);
        assert_eq!(queue.waiting(), 0);
        assert_eq!(queue.reported_len(), 5);
    }

    #[test]
    fn reported_len_discounts_parked_consumers() {
        let queue = Arc::new(BlockingQueue::<u8>::new());

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        wait_for_parked(&queue, 1);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.reported_len(), 0);

        queue.push(9);
        assert_eq!(consumer.join().unwrap(), 9);
        assert_eq!(queue.waiting(), 0);
        assert_eq!(queue.reported_len(), 0);
    }

    #[test]
    fn reported_len_discounts_claimed_items() {
        // the moment between a push and the parked consumers waking up
        let queue = BlockingQueue::<u8>::new();
        {
            let mut inner = queue.inner.lock();
            inner.waiting = 2;
            inner.items.push_back(1);
            inner.items.push_back(2);
            inner.items.push_back(3);
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.reported_len(), 1);
    }

    #[test]
    fn several_consumers_share_the_work() {
        let queue = Arc::new(BlockingQueue::new());

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut got = Vec::new();
                    loop {
                        match queue.pop() {
                            None => break got,
                            Some(v) => got.push(v),
                        }
                    }
                })
            })
            .collect();

        for i in 0..300 {
            queue.push(Some(i));
        }
        for _ in 0..3 {
            queue.push(None);
        }

        let mut all: Vec<i32> = consumers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();

        assert_eq!(all, (0..300).collect::<Vec<_>>());
    }

    #[test]
    fn drain_reports_leftovers() {
        let queue = BlockingQueue::new();
        queue.push("a");
        queue.push("b");
        assert_eq!(queue.pop(), "a");

        assert_eq!(queue.drain_and_destroy(), 1);
    }
}
