//! Simulated progress feed for `/transcribe/progress/:id`
//!
//! The percentages are synthetic: they advance on a timer and are not tied to
//! any running pipeline.

use futures::stream::{self, Stream};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub id: String,
    pub progress: u8,
}

/// Emit 0 immediately, then `step` more every `tick`, ending with exactly 100
pub fn simulated_progress(id: String, tick: Duration, step: u8) -> impl Stream<Item = ProgressUpdate> {
    let step = step.clamp(1, 100);

    stream::unfold(Some(0u8), move |state| {
        let id = id.clone();
        async move {
            let progress = state?;
            if progress > 0 {
                tokio::time::sleep(tick).await;
            }
            let next = (progress < 100).then(|| progress.saturating_add(step).min(100));
            Some((ProgressUpdate { id, progress }, next))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn collect(step: u8) -> Vec<u8> {
        tokio_test::block_on(async {
            simulated_progress("job".to_string(), Duration::from_millis(1), step)
                .map(|update| update.progress)
                .collect::<Vec<_>>()
                .await
        })
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_100() {
        assert_eq!(collect(10), vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[test]
    fn test_uneven_step_is_capped() {
        assert_eq!(collect(30), vec![0, 30, 60, 90, 100]);
        assert_eq!(collect(100), vec![0, 100]);
    }

    #[test]
    fn test_zero_step_still_terminates() {
        assert_eq!(collect(0).len(), 101);
    }

    #[tokio::test]
    async fn test_updates_carry_the_id() {
        let mut updates = Box::pin(simulated_progress("abc".to_string(), Duration::from_millis(1), 50));
        let first = updates.next().await.unwrap();
        assert_eq!(first, ProgressUpdate { id: "abc".to_string(), progress: 0 });
    }
}
