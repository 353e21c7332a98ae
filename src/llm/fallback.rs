//! Ordered model fallback with a shared attempt limit

use std::future::Future;
use tracing::{info, warn};

use crate::error::GenerationError;

/// Models tried in order until one attempt succeeds or the attempt limit is hit
#[derive(Debug, Clone)]
pub struct ModelChain {
    models: Vec<String>,
    max_attempts: usize,
}

impl ModelChain {
    pub fn new(models: Vec<String>, max_attempts: usize) -> Self {
        Self { models, max_attempts }
    }

    /// Number of attempts this chain will make at most
    pub fn attempt_budget(&self) -> usize {
        self.models.len().min(self.max_attempts)
    }

    /// Run `attempt` against each model in turn; returns the winning model and its value
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<(String, T), GenerationError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let mut last_error = None;
        let budget = self.attempt_budget();

        for (index, model) in self.models.iter().take(budget).enumerate() {
            match attempt(model.clone()).await {
                Ok(value) => {
                    if index > 0 {
                        info!("🔁 Fallback model {} succeeded (attempt {}/{})", model, index + 1, budget);
                    }
                    return Ok((model.clone(), value));
                }
                Err(e) => {
                    warn!("Model {} failed (attempt {}/{}): {}", model, index + 1, budget, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(GenerationError::Exhausted {
                attempts: budget,
                last: Box::new(last),
            }),
            None => Err(GenerationError::NoModels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn chain(models: &[&str], max_attempts: usize) -> ModelChain {
        ModelChain::new(models.iter().map(|m| m.to_string()).collect(), max_attempts)
    }

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&calls);

        let (model, value) = chain(&["primary", "fallback"], 2)
            .run(|model| {
                let recorded = Arc::clone(&recorded);
                async move {
                    recorded.lock().unwrap().push(model);
                    Ok::<_, GenerationError>(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(model, "primary");
        assert_eq!(value, 7);
        assert_eq!(*calls.lock().unwrap(), vec!["primary".to_string()]);
    }

    #[tokio::test]
    async fn test_falls_back_in_order() {
        let (model, _) = chain(&["primary", "fallback"], 2)
            .run(|model| async move {
                if model == "primary" {
                    Err(GenerationError::NoJsonArray)
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(model, "fallback");
    }

    #[tokio::test]
    async fn test_attempt_limit_caps_the_chain() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&calls);

        let err = chain(&["a", "b", "c"], 2)
            .run(|_| {
                let counter = Arc::clone(&counter);
                async move {
                    *counter.lock().unwrap() += 1;
                    Err::<(), _>(GenerationError::NoJsonArray)
                }
            })
            .await
            .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), 2);
        assert!(matches!(err, GenerationError::Exhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let err = chain(&[], 2)
            .run(|_| async { Ok::<_, GenerationError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NoModels));
    }
}
