extern crate sink_buffer;

use sink_buffer::prelude::*;
use std::io::{self, Read};

fn main() {
    let mut sink = GrowableSink::with_chunk_size(3);

    // fill a reserved region straight from a reader, then publish it
    let region = sink.reserve_write_region(3).unwrap();
    io::repeat(0b101).read_exact(&mut region[..3]).unwrap();
    sink.commit(3);

    println!("Sink content: {:?}, capacity: {}", sink.as_slice(), sink.capacity());
    assert_eq!(sink.finalize(), vec![0b101, 0b101, 0b101]);
}
