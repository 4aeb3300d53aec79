#![allow(clippy::cast_possible_truncation)]

use bolero::check;

use b3core::kernels::portable;
use b3core::{compress_in_place, compress_xof, BLOCK_LEN, OUT_LEN};

#[test]
fn fuzz_compress_matches_portable() {
    check!()
        .with_type::<([u32; 8], Vec<u8>, u64, u8, u8)>()
        .for_each(|(cv, data, counter, block_len, flags)| {
            let mut block = [0u8; BLOCK_LEN];
            let take = data.len().min(BLOCK_LEN);
            block[..take].copy_from_slice(&data[..take]);
            let block_len = block_len % (BLOCK_LEN as u8 + 1);

            // =============================================================================
            // BASELINE (PORTABLE)
            // =============================================================================
            let mut expected = *cv;
            portable::compress_in_place(&mut expected, &block, block_len, *counter, *flags);

            // =============================================================================
            // DISPATCHED VARIATIONS
            // =============================================================================
            let mut actual = *cv;
            compress_in_place(&mut actual, &block, block_len, *counter, *flags);
            assert_eq!(actual, expected, "dispatched compression mismatch");

            let mut xof = [0u8; 2 * OUT_LEN];
            compress_xof(cv, &block, block_len, *counter, *flags, &mut xof);
            for (i, word) in expected.iter().enumerate() {
                assert_eq!(
                    xof[4 * i..4 * i + 4],
                    word.to_le_bytes(),
                    "extended output prefix mismatch"
                );
            }
        });
}

#[test]
fn fuzz_compress_depends_on_every_argument() {
    check!()
        .with_type::<(Vec<u8>, u64, u8)>()
        .for_each(|(data, counter, flags)| {
            let mut block = [0u8; BLOCK_LEN];
            let take = data.len().min(BLOCK_LEN);
            block[..take].copy_from_slice(&data[..take]);

            let mut base = b3core::IV;
            compress_in_place(&mut base, &block, BLOCK_LEN as u8, *counter, *flags);

            // Flipping the counter must change the output.
            let mut bumped = b3core::IV;
            compress_in_place(&mut bumped, &block, BLOCK_LEN as u8, counter.wrapping_add(1), *flags);
            assert_ne!(base, bumped, "counter not mixed into output");

            // Flipping a flag bit must change the output.
            let mut flipped = b3core::IV;
            compress_in_place(&mut flipped, &block, BLOCK_LEN as u8, *counter, *flags ^ 1);
            assert_ne!(base, flipped, "flags not mixed into output");
        });
}
