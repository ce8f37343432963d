//! Checkpoint-driven paged enumeration.
//!
//! `resume_listing` wraps any offset/limit page fetcher in a durable cursor:
//! every fetched page is appended to the checkpoint and persisted before the
//! next fetch, so an interrupted scan restarts at page granularity.

use std::future::Future;

use tracing::{debug, info, warn};

use super::{Checkpoint, CheckpointKey, CheckpointStore, FailedPage};
use crate::error::Result;

/// How to treat a checkpoint whose scan already ran to completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResumePolicy {
    /// A finished checkpoint is discarded and the listing runs again.
    #[default]
    RescanFinished,
    /// A finished checkpoint's item list is returned without touching the
    /// source.
    ReuseFinished,
}

/// Consecutive same-offset retries after a dropped connection before the
/// listing gives up. The checkpoint survives, so a later run picks up at the
/// same offset.
const MAX_RECONNECT_RETRIES: u32 = 3;

/// Runs a paged listing to completion under a durable cursor.
///
/// `fetch_page(offset, limit)` returns one page of item names. A short page
/// ends the scan. A connection drop retries the same offset a bounded number
/// of times; any other fetch error is recorded on the checkpoint and
/// propagated.
pub async fn resume_listing<S, F, Fut>(
    store: &S,
    key: &CheckpointKey,
    page_size: u64,
    policy: ResumePolicy,
    mut fetch_page: F,
) -> Result<Vec<String>>
where
    S: CheckpointStore + ?Sized,
    F: FnMut(u64, u64) -> Fut,
    Fut: Future<Output = Result<Vec<String>>>,
{
    let mut checkpoint = match store.load(key).await? {
        Some(existing) if existing.in_progress => {
            info!(
                key = %key,
                offset = existing.last_offset,
                "resuming interrupted listing"
            );
            existing
        }
        Some(existing) => match policy {
            ResumePolicy::ReuseFinished => {
                debug!(key = %key, items = existing.processed_items.len(), "reusing finished listing");
                return Ok(existing.processed_items);
            }
            ResumePolicy::RescanFinished => {
                let mut fresh = Checkpoint::new();
                fresh.in_progress = true;
                fresh
            }
        },
        None => {
            let mut fresh = Checkpoint::new();
            fresh.in_progress = true;
            fresh
        }
    };

    let mut reconnect_retries = 0u32;
    loop {
        let offset = checkpoint.last_offset;
        let page = match fetch_page(offset, page_size).await {
            Ok(page) => {
                reconnect_retries = 0;
                page
            }
            Err(err) if err.is_connection_drop() && reconnect_retries < MAX_RECONNECT_RETRIES => {
                reconnect_retries += 1;
                warn!(
                    key = %key,
                    offset,
                    attempt = reconnect_retries,
                    error = %err,
                    "connection dropped mid-listing, retrying same offset"
                );
                continue;
            }
            Err(err) => {
                checkpoint.failed_items.push(FailedPage {
                    offset,
                    error: err.to_string(),
                });
                store.save(key, &checkpoint).await?;
                return Err(err);
            }
        };

        let fetched = page.len() as u64;
        checkpoint.processed_items.extend(page);
        checkpoint.last_offset += fetched;

        if fetched < page_size {
            checkpoint.in_progress = false;
            store.save(key, &checkpoint).await?;
            info!(key = %key, items = checkpoint.processed_items.len(), "listing complete");
            return Ok(checkpoint.processed_items);
        }

        store.save(key, &checkpoint).await?;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::error::{ConnectErrorKind, ImportError};

    fn names(range: std::ops::Range<u32>) -> Vec<String> {
        range.map(|n| format!("table_{n:03}")).collect()
    }

    fn page_of(all: &[String], offset: u64, limit: u64) -> Vec<String> {
        all.iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }

    #[tokio::test]
    async fn lists_across_pages_and_finalizes() {
        let store = MemoryCheckpointStore::new();
        let key = CheckpointKey::new("public", "sales");
        let all = names(0..25);

        let result = resume_listing(&store, &key, 10, ResumePolicy::RescanFinished, |offset, limit| {
            let all = all.clone();
            async move { Ok(page_of(&all, offset, limit)) }
        })
        .await
        .unwrap();

        assert_eq!(result, all);
        let saved = store.load(&key).await.unwrap().unwrap();
        assert!(!saved.in_progress);
        assert_eq!(saved.last_offset, 25);
        assert!(saved.is_consistent());
    }

    #[tokio::test]
    async fn exact_page_boundary_requires_one_empty_page() {
        let store = MemoryCheckpointStore::new();
        let key = CheckpointKey::new("public", "sales");
        let all = names(0..20);
        let calls = Arc::new(AtomicU32::new(0));

        let result = {
            let calls = calls.clone();
            resume_listing(&store, &key, 10, ResumePolicy::RescanFinished, |offset, limit| {
                calls.fetch_add(1, Ordering::SeqCst);
                let all = all.clone();
                async move { Ok(page_of(&all, offset, limit)) }
            })
            .await
            .unwrap()
        };

        assert_eq!(result.len(), 20);
        // Two full pages plus the empty page that ends the scan.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn repeated_runs_over_an_unchanged_source_agree() {
        let store = MemoryCheckpointStore::new();
        let key = CheckpointKey::new("public", "sales");
        let all = names(0..25);

        let mut results = Vec::new();
        for _ in 0..2 {
            let listed = resume_listing(
                &store,
                &key,
                10,
                ResumePolicy::RescanFinished,
                |offset, limit| {
                    let all = all.clone();
                    async move { Ok(page_of(&all, offset, limit)) }
                },
            )
            .await
            .unwrap();
            results.push(listed);
        }

        assert_eq!(results[0], all);
        assert_eq!(results[0], results[1]);
        let saved = store.load(&key).await.unwrap().unwrap();
        assert!(saved.is_consistent());
    }

    #[tokio::test]
    async fn resumes_from_interrupted_checkpoint_without_duplicates() {
        let store = MemoryCheckpointStore::new();
        let key = CheckpointKey::new("public", "sales");
        let all = names(0..25);

        store
            .save(
                &key,
                &Checkpoint {
                    last_offset: 10,
                    processed_items: page_of(&all, 0, 10),
                    failed_items: Vec::new(),
                    in_progress: true,
                },
            )
            .await
            .unwrap();

        let first_offset = Arc::new(AtomicU32::new(u32::MAX));
        let result = {
            let first_offset = first_offset.clone();
            resume_listing(&store, &key, 10, ResumePolicy::RescanFinished, |offset, limit| {
                first_offset.fetch_min(offset as u32, Ordering::SeqCst);
                let all = all.clone();
                async move { Ok(page_of(&all, offset, limit)) }
            })
            .await
            .unwrap()
        };

        assert_eq!(first_offset.load(Ordering::SeqCst), 10);
        assert_eq!(result, all);
    }

    #[tokio::test]
    async fn connection_drop_retries_same_offset() {
        let store = MemoryCheckpointStore::new();
        let key = CheckpointKey::new("public", "sales");
        let all = names(0..15);
        let drops_left = Arc::new(AtomicU32::new(2));

        let result = {
            let drops_left = drops_left.clone();
            resume_listing(&store, &key, 10, ResumePolicy::RescanFinished, |offset, limit| {
                let all = all.clone();
                let drops_left = drops_left.clone();
                async move {
                    if offset == 10 && drops_left.fetch_update(
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                        |n| n.checked_sub(1),
                    )
                    .is_ok()
                    {
                        return Err(ImportError::connect(
                            ConnectErrorKind::HostUnreachable,
                            "connection reset by peer",
                        ));
                    }
                    Ok(page_of(&all, offset, limit))
                }
            })
            .await
            .unwrap()
        };

        // Both dropped attempts were retried at the same offset; nothing was
        // skipped and nothing appears twice.
        assert_eq!(result, all);
    }

    #[tokio::test]
    async fn persistent_drop_gives_up_but_keeps_the_cursor() {
        let store = MemoryCheckpointStore::new();
        let key = CheckpointKey::new("public", "sales");
        let all = names(0..15);

        let err = resume_listing(&store, &key, 10, ResumePolicy::RescanFinished, |offset, limit| {
            let all = all.clone();
            async move {
                if offset == 10 {
                    return Err(ImportError::connect(
                        ConnectErrorKind::HostUnreachable,
                        "no route to host",
                    ));
                }
                Ok(page_of(&all, offset, limit))
            }
        })
        .await
        .unwrap_err();
        assert!(err.is_connection_drop());

        let saved = store.load(&key).await.unwrap().unwrap();
        assert!(saved.in_progress);
        assert_eq!(saved.last_offset, 10);

        // The source comes back; the scan resumes at the saved offset.
        let result = resume_listing(&store, &key, 10, ResumePolicy::RescanFinished, |offset, limit| {
            let all = all.clone();
            async move { Ok(page_of(&all, offset, limit)) }
        })
        .await
        .unwrap();
        assert_eq!(result, all);
    }

    #[tokio::test]
    async fn non_drop_error_is_recorded_and_propagated() {
        let store = MemoryCheckpointStore::new();
        let key = CheckpointKey::new("public", "sales");

        let err = resume_listing(&store, &key, 10, ResumePolicy::RescanFinished, |offset, _limit| async move {
            if offset == 0 {
                Ok(names(0..10))
            } else {
                Err(ImportError::Internal("permission denied".into()))
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ImportError::Internal(_)));

        let saved = store.load(&key).await.unwrap().unwrap();
        assert!(saved.in_progress);
        assert_eq!(saved.failed_items.len(), 1);
        assert_eq!(saved.failed_items[0].offset, 10);
    }

    #[tokio::test]
    async fn reuse_finished_skips_the_source() {
        let store = MemoryCheckpointStore::new();
        let key = CheckpointKey::new("public", "sales");
        let all = names(0..5);

        store
            .save(
                &key,
                &Checkpoint {
                    last_offset: 5,
                    processed_items: all.clone(),
                    failed_items: Vec::new(),
                    in_progress: false,
                },
            )
            .await
            .unwrap();

        let result = resume_listing(&store, &key, 10, ResumePolicy::ReuseFinished, |_, _| async {
            panic!("finished listing must not refetch")
        })
        .await
        .unwrap();
        assert_eq!(result, all);
    }

    #[tokio::test]
    async fn rescan_finished_refetches() {
        let store = MemoryCheckpointStore::new();
        let key = CheckpointKey::new("public", "sales");

        store
            .save(
                &key,
                &Checkpoint {
                    last_offset: 1,
                    processed_items: vec!["stale".into()],
                    failed_items: Vec::new(),
                    in_progress: false,
                },
            )
            .await
            .unwrap();

        let result = resume_listing(&store, &key, 10, ResumePolicy::RescanFinished, |_, _| async {
            Ok(vec!["fresh".to_string()])
        })
        .await
        .unwrap();
        assert_eq!(result, vec!["fresh".to_string()]);
    }
}
