use std::io::Cursor;
use std::time::Duration;

use proptest::prelude::*;

use crate::{
    install_dump, plan_blocks, write_dump, CreateOptions, InstallOptions, RecordHeader, Stump,
    Stumps, DUMP_MAGIC, HEADER_LEN,
};

const MAX_SOURCE: usize = 64 * 1024;

fn source_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=MAX_SOURCE)
}

fn block_len_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![Just(1u64), Just(7u64), Just(512u64), 1u64..=16 * 1024]
}

fn chunk_len_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![Just(1usize), Just(3usize), Just(4096usize), 1usize..=8192]
}

fn create(src: &[u8], block_len: u64, chunk_len: usize, stumps: &Stumps) -> Vec<u8> {
    let opts = CreateOptions {
        block_len,
        chunk_len,
        ..CreateOptions::default()
    };
    let mut out = Vec::new();
    write_dump(
        &mut Cursor::new(src),
        src.len() as u64,
        &mut out,
        stumps,
        &opts,
        &mut (),
    )
    .unwrap();
    out
}

fn install(dump: &[u8], dest_len: usize, chunk_len: usize, stumps: &Stumps) -> Vec<u8> {
    let opts = InstallOptions {
        chunk_len,
        reboot: false,
        reboot_delay: Duration::ZERO,
    };
    let mut dest = Cursor::new(vec![0xeeu8; dest_len]);
    install_dump(&mut &dump[..], &mut dest, stumps, &opts, &mut ()).unwrap();
    dest.into_inner()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn install_of_create_reproduces_source(
        src in source_strategy(),
        block_len in block_len_strategy(),
        write_chunk in chunk_len_strategy(),
        read_chunk in chunk_len_strategy(),
    ) {
        let dump = create(&src, block_len, write_chunk, &Stumps::new());

        let blocks = plan_blocks(src.len() as u64, block_len).block_count();
        prop_assert_eq!(
            dump.len() as u64,
            8 + blocks * HEADER_LEN as u64 + src.len() as u64 + HEADER_LEN as u64
        );
        prop_assert_eq!(&dump[..8], &DUMP_MAGIC.to_be_bytes()[..]);

        let restored = install(&dump, 0, read_chunk, &Stumps::new());
        prop_assert_eq!(restored, src);
    }

    #[test]
    fn block_headers_descend(size in 1u64..=1 << 40, block_len in 1u64 << 20..=1 << 28) {
        let mut last: Option<u64> = None;
        let mut covered = 0u64;
        for block in plan_blocks(size, block_len).take(64) {
            if let Some(prev) = last {
                prop_assert_eq!(block.offset + block.length, prev);
            } else {
                prop_assert_eq!(block.offset + block.length, size);
            }
            prop_assert!(block.length >= 1 && block.length <= block_len);
            last = Some(block.offset);
            covered += block.length;
        }
        prop_assert!(covered <= size);
    }

    #[test]
    fn record_order_does_not_matter(
        src in prop::collection::vec(any::<u8>(), 1..=4096),
        block_len in 1u64..=512,
        seed in any::<u64>(),
    ) {
        let mut records: Vec<(u64, Vec<u8>)> = plan_blocks(src.len() as u64, block_len)
            .map(|b| {
                let start = b.offset as usize;
                (b.offset, src[start..start + b.length as usize].to_vec())
            })
            .collect();
        // Cheap deterministic shuffle.
        let n = records.len();
        let mut state = seed | 1;
        for i in (1..n).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            records.swap(i, (state % (i as u64 + 1)) as usize);
        }

        let mut dump = DUMP_MAGIC.to_be_bytes().to_vec();
        for (offset, payload) in &records {
            dump.extend_from_slice(&RecordHeader::new(*offset, payload.len() as u64).encode());
            dump.extend_from_slice(payload);
        }
        dump.extend_from_slice(&RecordHeader::TERMINATOR.encode());

        prop_assert_eq!(install(&dump, 0, 64, &Stumps::new()), src);
    }

    #[test]
    fn later_stumps_in_list_win(
        a_len in 1usize..16,
        b_len in 1usize..16,
    ) {
        // Specified A then B: the list is [B, A], so A is written last.
        let a = Stump::new(0, vec![b'A'; a_len]).unwrap();
        let b = Stump::new(0, vec![b'B'; b_len]).unwrap();
        let stumps: Stumps = [a, b].into_iter().collect();

        let dump = create(&[0u8; 32], 8, 8, &Stumps::new());
        let out = install(&dump, 32, 8, &stumps);

        let mut expected = vec![0u8; 32];
        expected[..b_len].fill(b'B');
        expected[b_len] = 0;
        expected[..a_len].fill(b'A');
        expected[a_len] = 0;
        prop_assert_eq!(out, expected);
    }
}
