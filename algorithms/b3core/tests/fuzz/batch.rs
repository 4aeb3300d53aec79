#![allow(clippy::cast_possible_truncation)]

use bolero::check;

use b3core::kernels::portable;
use b3core::{hash_many, BLOCK_LEN, CHUNK_END, CHUNK_START, OUT_LEN};

#[test]
fn fuzz_hash_many_matches_portable() {
    check!()
        .with_type::<([u32; 8], Vec<u8>, u64, bool, u8)>()
        .for_each(|(key, data, counter, increment_counter, flags)| {
            // Shape the raw bytes into a batch: up to 2 blocks per input,
            // up to 40 inputs so every backend sees full and partial
            // groups.
            let blocks = 1 + data.len() % 2;
            let input_len = blocks * BLOCK_LEN;
            let num_inputs = (data.len() / 7) % 40;

            let mut padded = data.clone();
            padded.resize(num_inputs * input_len, 0x5C);
            let inputs: Vec<&[u8]> = padded.chunks_exact(input_len).collect();

            let mut expected = vec![0u8; num_inputs * OUT_LEN];
            portable::hash_many(
                &inputs,
                blocks,
                key,
                *counter,
                *increment_counter,
                *flags,
                CHUNK_START,
                CHUNK_END,
                &mut expected,
            );

            let mut actual = vec![0u8; num_inputs * OUT_LEN];
            hash_many(
                &inputs,
                blocks,
                key,
                *counter,
                *increment_counter,
                *flags,
                CHUNK_START,
                CHUNK_END,
                &mut actual,
            );

            assert_eq!(actual, expected, "batched hashing mismatch");
        });
}
