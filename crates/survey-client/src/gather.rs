//! Concurrent fan-out over keyed lookups

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Run `lookup` for every key with at most `limit` in flight (0 = all at
/// once) and return each result paired with its key, in input order.
///
/// `lookup` is expected to absorb its own failures; one slow or failing key
/// never prevents the others from completing.
pub async fn gather<K, T, F, Fut>(keys: Vec<K>, limit: usize, lookup: F) -> Vec<(K, T)>
where
    K: Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = T>,
{
    let width = if limit == 0 { keys.len() } else { limit }.max(1);

    stream::iter(keys.into_iter().map(|key| {
        let pending = lookup(key.clone());
        async move { (key, pending.await) }
    }))
    .buffered(width)
    .collect()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let results = gather(vec![3u64, 1, 2], 0, |k| async move {
            tokio::time::sleep(Duration::from_millis(k * 5)).await;
            k * 10
        })
        .await;

        assert_eq!(results, vec![(3, 30), (1, 10), (2, 20)]);
    }

    #[tokio::test]
    async fn test_limit_bounds_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = gather((0..10).collect::<Vec<u32>>(), 3, |k| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                k
            }
        })
        .await;

        assert_eq!(results.len(), 10);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results: Vec<(u32, u32)> = gather(Vec::new(), 0, |k| async move { k }).await;
        assert!(results.is_empty());
    }
}
