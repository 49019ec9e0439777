extern crate codec_worker;

use codec_worker::prelude::*;
use codec_worker::{init_logging, ContextConfig};
use crossbeam_channel::unbounded;
use std::thread;

const PRODUCERS: usize = 4;
const PER_PRODUCER: usize = 8;

fn main() {
    init_logging();

    let config = ContextConfig::from_env().thread_name("demo-codec");
    let ctx: Context<(usize, usize)> = Context::new(config).expect("failed to create context");
    let (tx, rx) = unbounded();

    // several threads share one context, each tagging its tasks with (producer, sequence)
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let ctx = ctx.clone();
            let tx = tx.clone();

            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    let line = format!("producer {} line {} ", id, seq).repeat(32);
                    ctx.compress(line.into_bytes(), tx.clone(), (id, seq)).unwrap();
                }
            })
        })
        .collect();

    for handle in producers {
        handle.join().unwrap();
    }
    drop(tx);

    let mut total_in = 0;
    let mut total_out = 0;
    for envelope in rx.iter().take(PRODUCERS * PER_PRODUCER) {
        let (token, result) = envelope.into_result();
        let compressed = result.unwrap();

        let restored = ctx.decompress_sync(compressed.clone(), token).unwrap();
        total_in += restored.len();
        total_out += compressed.len();
    }

    println!("Compressed {} bytes into {} bytes", total_in, total_out);

    // a corrupt frame fails without disturbing the worker
    match ctx.decompress_sync(vec![0x00], (0, 0)) {
        Err(err) => println!("Decompressing garbage failed as expected: {}", err),
        Ok(bytes) => println!("Unexpected success: {:?}", bytes),
    }

    println!("Worker state before release: {:?}", ctx.state());
    assert!(release_context(ctx));
}
