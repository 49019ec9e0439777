extern crate task_queue;

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use task_queue::prelude::*;

/// Number of producers that runs in this example
const PRODUCERS: usize = 4;

/// Items pushed by each producer
const COUNT: usize = 32;

enum Message {
    Item { producer: usize, seq: usize },
    Close,
}

fn main() {
    let queue = Arc::new(BlockingQueue::new());

    // the single consumer: runs until it sees the close sentinel
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut received = 0;

            loop {
                match queue.pop() {
                    Message::Item { producer, seq } => {
                        println!("Receiving item {} from producer {}", seq, producer);
                        received += 1;
                    }
                    Message::Close => break received,
                }
            }
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for seq in 0..COUNT {
                    queue.push(Message::Item { producer, seq });
                    thread::sleep(Duration::from_micros(50));
                }
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap_or_default();
    }

    println!("Backlog before close: {}", queue.reported_len());

    // everything pushed so far is drained before the consumer sees this
    queue.push(Message::Close);

    let received = consumer.join().unwrap_or_default();
    assert_eq!(received, PRODUCERS * COUNT);

    println!("All done...");
}
