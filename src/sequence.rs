//! Frame-count-changing transforms over the still sequence.
//!
//! Two transforms exist and, when both are requested, run in this order:
//!
//! 1. **Decimation** drops every frame whose 0-based position in the
//!    enumeration is a multiple of the factor.
//! 2. **Reversal-append** copies the interior of the sequence (everything
//!    but the first and last frame) to fresh indices above the current
//!    maximum, in descending slot order, so that ascending enumeration plays
//!    the copy back from the last interior frame to the first.
//!
//! Decimating after mirroring would cut frames out of the loop seam, so the
//! driver never does it.
//!
//! The planners ([`decimation_victims`], [`mirror_plan`]) are pure index
//! math; [`decimate`] and [`append_reversed`] apply them to a
//! [`FrameStore`] and return the freshly enumerated sequence.

use crate::configuration::DecimationFactor;
use crate::error::GifmakerError;
use crate::frame_store::{FrameKind, FrameStore};

/// Indices removed by decimating `sequence` with `factor`.
///
/// ```
/// use gifmaker::{DecimationFactor, sequence::decimation_victims};
///
/// let factor = DecimationFactor::new(3)?;
/// assert_eq!(decimation_victims(&[1, 2, 3, 4, 5, 6, 7], factor), vec![1, 4, 7]);
/// # Ok::<(), gifmaker::GifmakerError>(())
/// ```
pub fn decimation_victims(sequence: &[u64], factor: DecimationFactor) -> Vec<u64> {
    let step = factor.get() as usize;
    sequence.iter().copied().step_by(step).collect()
}

/// Copy operations `(source, destination)` that mirror `sequence`.
///
/// Sources are the interior frames in forward order; destinations descend
/// from `max(2 * count, last + interior)`. With contiguous indices starting
/// at 1 that base is `2 * count`. After decimation has left gaps the larger
/// base keeps every destination above the current maximum index.
///
/// ```
/// use gifmaker::sequence::mirror_plan;
///
/// assert_eq!(mirror_plan(&[1, 2, 3, 4, 5]), vec![(2, 10), (3, 9), (4, 8)]);
/// assert!(mirror_plan(&[1, 2]).is_empty());
/// ```
pub fn mirror_plan(sequence: &[u64]) -> Vec<(u64, u64)> {
    let count = sequence.len();
    if count < 3 {
        return Vec::new();
    }

    let interior = &sequence[1..count - 1];
    let last = sequence[count - 1];
    let base = (2 * count as u64).max(last + interior.len() as u64);

    interior
        .iter()
        .enumerate()
        .map(|(offset, &source)| (source, base - offset as u64))
        .collect()
}

/// Delete every `factor`-th still (by enumeration position, starting with the
/// first) and return the remaining sequence.
pub fn decimate(store: &FrameStore, factor: DecimationFactor) -> Result<Vec<u64>, GifmakerError> {
    let sequence = store.enumerate(FrameKind::Still)?;
    let victims = decimation_victims(&sequence, factor);

    log::info!(
        "Deleting 1 in every {} frames ({} of {})...",
        factor.get(),
        victims.len(),
        sequence.len()
    );
    for index in victims {
        store.delete(FrameKind::Still, index)?;
    }

    store.enumerate(FrameKind::Still)
}

/// Append the mirrored interior of the still sequence and return the new
/// sequence.
pub fn append_reversed(store: &FrameStore) -> Result<Vec<u64>, GifmakerError> {
    let sequence = store.enumerate(FrameKind::Still)?;
    let plan = mirror_plan(&sequence);

    log::info!("Append reversed sequence ({} frames)...", plan.len());
    for (source, destination) in plan {
        log::debug!("Mirroring still {source} -> {destination}");
        store.copy(FrameKind::Still, source, destination)?;
    }

    store.enumerate(FrameKind::Still)
}
