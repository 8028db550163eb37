//! Decimation and reversal-append tests.

use gifmaker::sequence::{append_reversed, decimate, decimation_victims, mirror_plan};
use gifmaker::{DecimationFactor, FrameKind, FrameStore, GifmakerError};
use tempfile::TempDir;

fn store_with(count: u64) -> (TempDir, FrameStore) {
    let dir = TempDir::new().unwrap();
    let store = FrameStore::open(dir.path()).unwrap();
    for index in 1..=count {
        store.write(FrameKind::Still, index, index.to_string().as_bytes()).unwrap();
    }
    (dir, store)
}

/// Contents of the stills in enumeration order.
fn contents(store: &FrameStore) -> Vec<u64> {
    store
        .enumerate(FrameKind::Still)
        .unwrap()
        .into_iter()
        .map(|index| {
            String::from_utf8(store.read(FrameKind::Still, index).unwrap())
                .unwrap()
                .parse()
                .unwrap()
        })
        .collect()
}

// ── Decimation ─────────────────────────────────────────────────────

#[test]
fn decimation_factor_bounds() {
    assert!(matches!(DecimationFactor::new(0), Err(GifmakerError::InvalidDecimation(0))));
    assert!(matches!(DecimationFactor::new(1), Err(GifmakerError::InvalidDecimation(1))));
    assert_eq!(DecimationFactor::new(2).unwrap().get(), 2);
    assert!(DecimationFactor::optional(0).unwrap().is_none());
    assert!(DecimationFactor::optional(1).is_err());
}

#[test]
fn victims_follow_ordinal_rule() {
    let factor = DecimationFactor::new(3).unwrap();
    let sequence: Vec<u64> = (1..=10).collect();
    assert_eq!(decimation_victims(&sequence, factor), vec![1, 4, 7, 10]);

    let gappy = [2, 3, 5, 6, 8, 9];
    assert_eq!(decimation_victims(&gappy, factor), vec![2, 6]);
}

#[test]
fn surviving_length() {
    for length in 0..40_u64 {
        for n in 2..7_u32 {
            let sequence: Vec<u64> = (1..=length).collect();
            let victims = decimation_victims(&sequence, DecimationFactor::new(n).unwrap());
            let expected = length - length.div_ceil(n as u64);
            assert_eq!(length - victims.len() as u64, expected, "L={length} n={n}");
        }
    }
}

#[test]
fn decimate_store() {
    let (_dir, store) = store_with(10);
    let remaining = decimate(&store, DecimationFactor::new(3).unwrap()).unwrap();
    assert_eq!(remaining, vec![2, 3, 5, 6, 8, 9]);
    assert_eq!(contents(&store), vec![2, 3, 5, 6, 8, 9]);
}

#[test]
fn decimate_by_two_keeps_odd_ordinals() {
    let (_dir, store) = store_with(6);
    let remaining = decimate(&store, DecimationFactor::new(2).unwrap()).unwrap();
    assert_eq!(remaining, vec![2, 4, 6]);
}

// ── Reversal-append ────────────────────────────────────────────────

#[test]
fn mirror_plan_five_frames() {
    assert_eq!(mirror_plan(&[1, 2, 3, 4, 5]), vec![(2, 10), (3, 9), (4, 8)]);
}

#[test]
fn mirror_plan_short_sequences_are_noops() {
    assert!(mirror_plan(&[]).is_empty());
    assert!(mirror_plan(&[1]).is_empty());
    assert!(mirror_plan(&[1, 2]).is_empty());
    assert_eq!(mirror_plan(&[1, 2, 3]), vec![(2, 6)]);
}

#[test]
fn mirror_plan_after_gaps_stays_above_maximum() {
    let plan = mirror_plan(&[2, 3, 5, 6, 8, 9]);
    assert_eq!(plan, vec![(3, 13), (5, 12), (6, 11), (8, 10)]);
    assert!(plan.iter().all(|&(_, destination)| destination > 9));
}

#[test]
fn append_reversed_five_frames() {
    let (_dir, store) = store_with(5);
    let sequence = append_reversed(&store).unwrap();
    assert_eq!(sequence, vec![1, 2, 3, 4, 5, 8, 9, 10]);
    assert_eq!(contents(&store), vec![1, 2, 3, 4, 5, 4, 3, 2]);
}

#[test]
fn append_reversed_length() {
    for count in 3..12 {
        let (_dir, store) = store_with(count);
        let sequence = append_reversed(&store).unwrap();
        assert_eq!(sequence.len() as u64, 2 * count - 2);
    }
}

#[test]
fn append_reversed_two_frames_unchanged() {
    let (_dir, store) = store_with(2);
    assert_eq!(append_reversed(&store).unwrap(), vec![1, 2]);
}

#[test]
fn decimate_then_reverse() {
    let (_dir, store) = store_with(10);
    decimate(&store, DecimationFactor::new(3).unwrap()).unwrap();
    let sequence = append_reversed(&store).unwrap();

    assert_eq!(sequence, vec![2, 3, 5, 6, 8, 9, 10, 11, 12, 13]);
    assert_eq!(contents(&store), vec![2, 3, 5, 6, 8, 9, 8, 6, 5, 3]);
}
