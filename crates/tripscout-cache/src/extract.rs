//! Batch feature extraction over a bounded worker pool.
//!
//! Workers pull place ids from an explicit queue and report per-item
//! success or failure through a channel; there is no shared mutable
//! accumulator. One failing encode never aborts the batch, and a
//! cooperative abort flag is checked between items.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use ndarray::Array1;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::cache::FeatureCache;
use tripscout_core::Result;
use tripscout_store::Place;

/// Outcome of one extraction batch.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Vectors newly written to the cache.
    pub updated: usize,
    /// Places that already had a current-version vector.
    pub skipped: usize,
    /// Place ids whose encoder call (or cache write) failed.
    pub failed: Vec<String>,
}

/// Extract a vector for every place missing one (or every place when
/// `force`), with up to `workers` encoder calls in flight at once.
///
/// Encoder inference is a blocking call; callers in async contexts wrap
/// this in `spawn_blocking`.
pub fn extract_missing<F>(
    cache: &FeatureCache,
    places: &[Place],
    force: bool,
    workers: usize,
    abort: &AtomicBool,
    encode: F,
) -> ExtractionReport
where
    F: Fn(&Place) -> Result<Array1<f32>> + Sync,
{
    let pending: Vec<&Place> = places
        .iter()
        .filter(|p| force || !cache.contains(&p.id))
        .collect();
    let skipped = places.len() - pending.len();

    if pending.is_empty() {
        cache.record_failures(&[]);
        return ExtractionReport {
            updated: 0,
            skipped,
            failed: Vec::new(),
        };
    }

    info!(
        "Extracting {} features: {} pending, {} cached ({} workers)",
        cache.modality(),
        pending.len(),
        skipped,
        workers
    );

    let queue: Mutex<VecDeque<&Place>> = Mutex::new(pending.iter().copied().collect());
    let (tx, rx) = mpsc::channel::<(String, Result<Array1<f32>>)>();

    let worker_count = workers.max(1).min(pending.len());
    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let tx = tx.clone();
            let queue = &queue;
            let encode = &encode;
            scope.spawn(move || loop {
                if abort.load(Ordering::Relaxed) {
                    break;
                }
                let place = match queue.lock().pop_front() {
                    Some(p) => p,
                    None => break,
                };
                let result = encode(place);
                if tx.send((place.id.clone(), result)).is_err() {
                    break;
                }
            });
        }
    });
    drop(tx);

    let mut updated = 0;
    let mut failed = Vec::new();
    for (id, result) in rx.iter() {
        match result {
            Ok(vector) => match cache.put(&id, &vector) {
                Ok(()) => updated += 1,
                Err(e) => {
                    warn!("Cache write failed for {}: {}", id, e);
                    failed.push(id);
                }
            },
            Err(e) => {
                warn!("Encoding failed for {}: {}", id, e);
                failed.push(id);
            }
        }
    }
    failed.sort();

    if abort.load(Ordering::Relaxed) {
        info!("Extraction aborted after {} updates", updated);
    }

    cache.record_failures(&failed);
    ExtractionReport {
        updated,
        skipped,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Modality;
    use ndarray::array;
    use std::sync::atomic::AtomicUsize;

    fn place(id: &str) -> Place {
        Place {
            id: id.into(),
            name: format!("place {}", id),
            location: "here".into(),
            description: "a spot".into(),
            tags: vec![],
            photo: None,
            pending_features: false,
        }
    }

    fn places(n: usize) -> Vec<Place> {
        (0..n).map(|i| place(&format!("10000{}", i))).collect()
    }

    fn cache() -> (FeatureCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = FeatureCache::open(
            dir.path().join("text_features.json"),
            Modality::Text,
            3,
            "v1",
        );
        (cache, dir)
    }

    #[test]
    fn test_extracts_all_missing() {
        let (cache, _dir) = cache();
        let catalog = places(5);
        let calls = AtomicUsize::new(0);

        let report = extract_missing(&cache, &catalog, false, 2, &AtomicBool::new(false), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(array![1.0, 0.0, 0.0])
        });

        assert_eq!(report.updated, 5);
        assert_eq!(report.skipped, 0);
        assert!(report.failed.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(cache.coverage(), 5);
    }

    #[test]
    fn test_second_run_makes_zero_encoder_calls() {
        let (cache, _dir) = cache();
        let catalog = places(4);
        let abort = AtomicBool::new(false);

        let first = extract_missing(&cache, &catalog, false, 2, &abort, |_| {
            Ok(array![1.0, 0.0, 0.0])
        });
        assert_eq!(first.updated, 4);

        let calls = AtomicUsize::new(0);
        let second = extract_missing(&cache, &catalog, false, 2, &abort, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(array![1.0, 0.0, 0.0])
        });
        assert_eq!(second.updated, 0);
        assert_eq!(second.skipped, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_one_failure_does_not_abort_the_batch() {
        let (cache, _dir) = cache();
        let catalog = places(10);
        let bad_id = catalog[3].id.clone();

        let report = extract_missing(&cache, &catalog, false, 3, &AtomicBool::new(false), |p| {
            if p.id == bad_id {
                Err(tripscout_core::Error::Encoding("broken image".into()))
            } else {
                Ok(array![0.5, 0.5, 0.0])
            }
        });

        assert_eq!(report.updated, 9);
        assert_eq!(report.failed, vec![bad_id.clone()]);
        assert_eq!(cache.failed_ids(), vec![bad_id.clone()]);
        assert!(!cache.contains(&bad_id));
    }

    #[test]
    fn test_force_re_extracts_everything() {
        let (cache, _dir) = cache();
        let catalog = places(3);
        let abort = AtomicBool::new(false);

        extract_missing(&cache, &catalog, false, 2, &abort, |_| {
            Ok(array![1.0, 0.0, 0.0])
        });

        let report = extract_missing(&cache, &catalog, true, 2, &abort, |_| {
            Ok(array![0.0, 1.0, 0.0])
        });
        assert_eq!(report.updated, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(cache.get(&catalog[0].id).unwrap(), array![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_abort_checked_between_items() {
        let (cache, _dir) = cache();
        let catalog = places(8);
        let abort = AtomicBool::new(true);
        let calls = AtomicUsize::new(0);

        let report = extract_missing(&cache, &catalog, false, 2, &abort, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(array![1.0, 0.0, 0.0])
        });

        assert_eq!(report.updated, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_single_worker_is_valid() {
        let (cache, _dir) = cache();
        let catalog = places(3);
        let report = extract_missing(&cache, &catalog, false, 1, &AtomicBool::new(false), |_| {
            Ok(array![1.0, 0.0, 0.0])
        });
        assert_eq!(report.updated, 3);
    }
}
