//! The codec capability the worker drives, and its default DEFLATE implementation.
//!
//! Frame layout of [`DeflateCodec`]:
//!
//! ```text
//! +---------------------------+---------------------------+
//! | uncompressed length       | raw DEFLATE stream        |
//! | unsigned LEB128, 1..=10 B | at least 1 byte           |
//! +---------------------------+---------------------------+
//! ```
//!
//! The length prefix lets the decompressor size its output buffer exactly before decoding.
//!
//! Other formats plug in through [`Codec`]; a Snappy backend, for one, would implement the trait
//! and be passed to `create_context_with`.

use crate::config::DEFAULT_LEVEL;
use crate::error::CodecError;
use flate2::read::DeflateDecoder;
use flate2::{Compress, Compression, FlushCompress, Status};
use sink_buffer::{GrowableSink, SinkOp};
use std::io::Read;

/// Longest LEB128 encoding of a 64-bit length.
const MAX_VARINT_LEN: usize = 10;

/// Best case DEFLATE expansion: one 258-byte match costs a little under 2 bits.
const MAX_EXPANSION: usize = 1032;

/// Minimum spare room handed to the compressor on each step.
const OUTPUT_STEP: usize = 256;

/// A synchronous, CPU-bound compressor/decompressor pair. Implementations must be deterministic
/// and report malformed input through `CodecError` rather than panicking, although the dispatcher
/// contains panics too.
pub trait Codec: Send + Sync + 'static {
    /// Compress `input` into `sink`, appending one complete frame.
    fn compress(&self, input: &[u8], sink: &mut GrowableSink) -> Result<(), CodecError>;

    /// Read the uncompressed length from the frame header. `CodecError::NotFramed` when the input
    /// does not look like a frame at all.
    fn uncompressed_length(&self, input: &[u8]) -> Result<usize, CodecError>;

    /// Decode the frame into `output`, which is exactly `uncompressed_length` bytes long.
    fn raw_decompress(&self, input: &[u8], output: &mut [u8]) -> Result<(), CodecError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateCodec {
    level: u32,
}

impl DeflateCodec {
    pub fn new(level: u32) -> Self {
        DeflateCodec {
            level: level.min(9),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for DeflateCodec {
    fn default() -> Self {
        DeflateCodec::new(DEFAULT_LEVEL)
    }
}

impl Codec for DeflateCodec {
    fn compress(&self, input: &[u8], sink: &mut GrowableSink) -> Result<(), CodecError> {
        let mut header = [0u8; MAX_VARINT_LEN];
        let header_len = encode_varint(input.len() as u64, &mut header);
        sink.append(&header[..header_len])?;

        let mut deflater = Compress::new(Compression::new(self.level), false);

        loop {
            let consumed = deflater.total_in() as usize;
            let produced = deflater.total_out();

            // the compressor writes straight into the sink's spare region
            let region = sink.reserve_write_region(OUTPUT_STEP)?;
            let status = deflater
                .compress(&input[consumed..], region, FlushCompress::Finish)
                .map_err(|err| CodecError::Compress(err.to_string()))?;

            let written = (deflater.total_out() - produced) as usize;
            sink.commit(written);

            match status {
                Status::StreamEnd => return Ok(()),
                Status::Ok | Status::BufError => {
                    if written == 0 && deflater.total_in() as usize == consumed {
                        return Err(CodecError::Compress("compressor made no progress".into()));
                    }
                }
            }
        }
    }

    fn uncompressed_length(&self, input: &[u8]) -> Result<usize, CodecError> {
        let (len, header_len) = decode_varint(input).ok_or(CodecError::NotFramed)?;
        let body = &input[header_len..];

        if body.is_empty() || len > body.len().saturating_mul(MAX_EXPANSION) {
            return Err(CodecError::NotFramed);
        }

        Ok(len)
    }

    fn raw_decompress(&self, input: &[u8], output: &mut [u8]) -> Result<(), CodecError> {
        let (_, header_len) = decode_varint(input).ok_or(CodecError::NotFramed)?;
        let mut decoder = DeflateDecoder::new(&input[header_len..]);

        decoder
            .read_exact(output)
            .map_err(|err| CodecError::Corrupt(err.to_string()))?;

        // the stream has to end exactly at the announced length
        let mut probe = [0u8; 1];
        match decoder.read(&mut probe) {
            Ok(0) => Ok(()),
            Ok(_) => Err(CodecError::Corrupt(
                "stream is longer than the announced length".into(),
            )),
            Err(err) => Err(CodecError::Corrupt(err.to_string())),
        }
    }
}

/// Write `value` as unsigned LEB128 into `out`, returning the number of bytes used.
fn encode_varint(mut value: u64, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut pos = 0;

    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;

        if value == 0 {
            out[pos] = byte;
            return pos + 1;
        }

        out[pos] = byte | 0x80;
        pos += 1;
    }
}

/// Decode an unsigned LEB128 prefix. `None` when it is truncated, too long, or does not fit
/// in `usize`.
fn decode_varint(input: &[u8]) -> Option<(usize, usize)> {
    let mut value: u64 = 0;

    for (pos, &byte) in input.iter().take(MAX_VARINT_LEN).enumerate() {
        let bits = u64::from(byte & 0x7f);
        let shift = 7 * pos as u32;

        // the tenth byte may only carry the single remaining bit
        if pos == MAX_VARINT_LEN - 1 && bits > 1 {
            return None;
        }

        value |= bits << shift;

        if byte & 0x80 == 0 {
            return usize::try_from(value).ok().map(|len| (len, pos + 1));
        }
    }

    None
}

#[cfg(test)]
mod codec_tests {
    use super::*;
    use proptest::prelude::*;

    fn compress(codec: &DeflateCodec, input: &[u8]) -> Vec<u8> {
        let mut sink = GrowableSink::with_chunk_size(64);
        codec.compress(input, &mut sink).unwrap();
        sink.finalize()
    }

    fn decompress(codec: &DeflateCodec, frame: &[u8]) -> Result<Vec<u8>, CodecError> {
        let len = codec.uncompressed_length(frame)?;
        let mut out = vec![0u8; len];
        codec.raw_decompress(frame, &mut out)?;
        Ok(out)
    }

    #[test]
    fn varint_round_trip() {
        for value in [0u64, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64] {
            let mut buf = [0u8; MAX_VARINT_LEN];
            let len = encode_varint(value, &mut buf);
            assert_eq!(decode_varint(&buf[..len]), Some((value as usize, len)));
        }
    }

    #[test]
    fn varint_rejects_truncated_and_overlong() {
        assert_eq!(decode_varint(&[]), None);
        assert_eq!(decode_varint(&[0x80]), None);
        assert_eq!(decode_varint(&[0xff; 11]), None);
        let mut overflow = [0xff; MAX_VARINT_LEN];
        overflow[MAX_VARINT_LEN - 1] = 0x02;
        assert_eq!(decode_varint(&overflow), None);
    }

    #[test]
    fn empty_input_makes_a_valid_frame() {
        let codec = DeflateCodec::default();
        let frame = compress(&codec, b"");

        assert_eq!(frame[0], 0);
        assert!(frame.len() > 1);
        assert_eq!(decompress(&codec, &frame).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn repetitive_input_shrinks() {
        let codec = DeflateCodec::default();
        let frame = compress(&codec, b"aaaaaaaaaa");

        assert!(frame.len() <= 10, "frame is {} bytes", frame.len());
        assert_eq!(decompress(&codec, &frame).unwrap(), b"aaaaaaaaaa".to_vec());
    }

    #[test]
    fn output_larger_than_many_chunks() {
        let codec = DeflateCodec::new(0);
        let input: Vec<u8> = (0..100_000u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        let frame = compress(&codec, &input);

        assert!(frame.len() > 64 * 10);
        assert_eq!(decompress(&codec, &frame).unwrap(), input);
    }

    #[test]
    fn lone_zero_byte_is_not_framed() {
        let codec = DeflateCodec::default();

        assert!(matches!(codec.uncompressed_length(&[0x00]), Err(CodecError::NotFramed)));
        assert!(matches!(codec.uncompressed_length(&[]), Err(CodecError::NotFramed)));
    }

    #[test]
    fn impossible_length_is_not_framed() {
        let codec = DeflateCodec::default();

        // claims 2^32 bytes out of a 1-byte body
        let frame = [0x80, 0x80, 0x80, 0x80, 0x10, 0x03];
        assert!(matches!(codec.uncompressed_length(&frame), Err(CodecError::NotFramed)));
    }

    #[test]
    fn corrupt_body_is_reported() {
        let codec = DeflateCodec::default();

        // block type 0b11 is reserved
        let frame = [0x05, 0x07, 0x00, 0x00];
        assert!(matches!(decompress(&codec, &frame), Err(CodecError::Corrupt(_))));
    }

    #[test]
    fn wrong_announced_length_is_reported() {
        let codec = DeflateCodec::default();
        let mut frame = compress(&codec, b"hello world");

        frame[0] = 5;
        assert!(matches!(decompress(&codec, &frame), Err(CodecError::Corrupt(_))));

        frame[0] = 20;
        assert!(matches!(decompress(&codec, &frame), Err(CodecError::Corrupt(_))));
    }

    proptest! {
        #[test]
        fn round_trip(
            input in proptest::collection::vec(any::<u8>(), 0..4096),
            level in 0u32..=9
        ) {
            let codec = DeflateCodec::new(level);
            let frame = compress(&codec, &input);

            prop_assert_eq!(decompress(&codec, &frame).unwrap(), input);
        }
    }
}
