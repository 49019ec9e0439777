//! [`BlockingQueue`]
//! An unbounded, thread-safe FIFO queue for handing work to a dedicated consumer thread.
//!
//! ## What this crate is for
//! Producers push items without ever blocking; the consumer calls `pop` and sleeps on a condition
//! variable while there is nothing to do. Items come out strictly in the order they went in, so a
//! control item (e.g. a "stop" sentinel) pushed after a batch of work is only seen once that
//! whole batch has been popped.
//!
//! ## What this crate is NOT for
//! This is not a thread pool, nor a priority queue, and it offers no back-pressure: the queue is
//! unbounded, and the producer is trusted not to outrun the consumer forever.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use task_queue::prelude::*;
//!
//! enum Job {
//!     Work(u32),
//!     Stop,
//! }
//!
//! let queue = Arc::new(BlockingQueue::new());
//!
//! let consumer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || {
//!         let mut sum = 0;
//!         loop {
//!             match queue.pop() {
//!                 Job::Work(n) => sum += n,
//!                 Job::Stop => break sum,
//!             }
//!         }
//!     })
//! };
//!
//! for n in 1..=10 {
//!     queue.push(Job::Work(n));
//! }
//! queue.push(Job::Stop);
//!
//! assert_eq!(consumer.join().unwrap(), 55);
//! ```

mod queue;

pub use crate::queue::{BlockingQueue, QueueState};

pub mod prelude {
    pub use crate::{BlockingQueue, QueueState};
}
