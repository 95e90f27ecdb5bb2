//! Declarative (region × model × attempt) fallback policy.

use crate::config::{auto_detect_order, GenAiModels};
use crate::error::{Result, SzinkronError};
use crate::jobs::CancelToken;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How one generative call failed, from the driver's point of view.
#[derive(Debug)]
pub enum CallFailure {
    /// Model unknown or deprecated: advance to the next model.
    ModelNotFound(String),
    /// Region down or not serving: advance to the next region.
    RegionUnavailable(String),
    /// Worth retrying on the same (region, model) pair.
    Transient(SzinkronError),
    /// Stop the whole fallback immediately.
    Fatal(SzinkronError),
}

/// The (model, region) pair that produced the accepted output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinningPair {
    pub model: String,
    pub region: String,
}

impl WinningPair {
    /// Artifact-header form.
    pub fn tag(&self) -> String {
        format!("{}@{}", self.model, self.region)
    }
}

/// Ordered candidates plus the per-pair retry budget.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    pub models: Vec<String>,
    pub regions: Vec<String>,
    pub attempts: u32,
}

impl FallbackPolicy {
    /// Build a policy from the desired model (or `auto`) and region list.
    ///
    /// An explicitly chosen model is tried first, with the auto-detect order
    /// behind it as degradation candidates.
    pub fn resolve(desired_model: &str, regions: &[String], attempts: u32) -> Self {
        let mut models = Vec::new();
        if desired_model != GenAiModels::AUTO && !desired_model.is_empty() {
            models.push(desired_model.to_string());
        }
        for candidate in auto_detect_order() {
            if !models.contains(&candidate) {
                models.push(candidate);
            }
        }

        Self {
            models,
            regions: regions.to_vec(),
            attempts: attempts.max(1),
        }
    }

    /// Drive `call` over the Cartesian product region-major until a call
    /// succeeds, recording the winning pair.
    pub async fn run<T, F, Fut>(&self, cancel: &CancelToken, mut call: F) -> Result<(T, WinningPair)>
    where
        F: FnMut(String, String) -> Fut,
        Fut: Future<Output = std::result::Result<T, CallFailure>>,
    {
        let mut last_error: Option<SzinkronError> = None;

        for region in &self.regions {
            'models: for model in &self.models {
                for attempt in 0..self.attempts {
                    if cancel.is_cancelled() {
                        return Err(SzinkronError::Cancelled);
                    }

                    debug!(%model, %region, attempt, "Generative call");
                    match call(model.clone(), region.clone()).await {
                        Ok(value) => {
                            let pair = WinningPair {
                                model: model.clone(),
                                region: region.clone(),
                            };
                            info!("Generative call succeeded with {}", pair.tag());
                            return Ok((value, pair));
                        }
                        Err(CallFailure::ModelNotFound(detail)) => {
                            debug!(%model, %region, "Model not available: {}", detail);
                            last_error = Some(SzinkronError::TransientRemote(detail));
                            continue 'models;
                        }
                        Err(CallFailure::RegionUnavailable(detail)) => {
                            warn!(%region, "Region unavailable: {}", detail);
                            last_error = Some(SzinkronError::TransientRemote(detail));
                            break 'models;
                        }
                        Err(CallFailure::Transient(err)) => {
                            warn!(%model, %region, attempt, "Transient failure: {}", err);
                            last_error = Some(err);
                            if attempt + 1 < self.attempts {
                                backoff(attempt).await;
                            }
                        }
                        Err(CallFailure::Fatal(err)) => return Err(err),
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SzinkronError::TransientRemote("No generative model candidates available".into())
        }))
    }
}

/// Jittered exponential backoff between same-pair attempts.
async fn backoff(attempt: u32) {
    let base = 0.5 * 2f64.powi(attempt as i32);
    let jitter = rand::rng().random_range(0.5..1.5);
    tokio::time::sleep(Duration::from_secs_f64(base * jitter)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn policy() -> FallbackPolicy {
        FallbackPolicy {
            models: vec!["m1".into(), "m2".into()],
            regions: vec!["r1".into(), "r2".into()],
            attempts: 1,
        }
    }

    #[test]
    fn test_resolve_auto_expands_candidates() {
        let regions = vec!["us-central1".to_string()];
        let p = FallbackPolicy::resolve("auto", &regions, 2);
        assert_eq!(p.models[0], "gemini-2.0-flash");
        assert!(p.models.len() >= 4);
    }

    #[test]
    fn test_resolve_explicit_model_goes_first() {
        let regions = vec!["us-central1".to_string()];
        let p = FallbackPolicy::resolve("gemini-2.5-pro", &regions, 1);
        assert_eq!(p.models[0], "gemini-2.5-pro");
        // degradation candidates follow, without duplicates
        assert_eq!(
            p.models.iter().filter(|m| *m == "gemini-2.5-pro").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_model_not_found_advances_model() {
        let cancel = CancelToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();

        let (value, pair) = policy()
            .run(&cancel, move |model, region| {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if model == "m1" {
                        Err(CallFailure::ModelNotFound("gone".into()))
                    } else {
                        Ok(format!("{}@{}", model, region))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "m2@r1");
        assert_eq!(pair.tag(), "m2@r1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_region_unavailable_advances_region() {
        let cancel = CancelToken::new();

        let (_, pair) = policy()
            .run(&cancel, |_, region| async move {
                if region == "r1" {
                    Err(CallFailure::RegionUnavailable("down".into()))
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(pair.region, "r2");
        assert_eq!(pair.model, "m1");
    }

    #[tokio::test]
    async fn test_fatal_stops_immediately() {
        let cancel = CancelToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();

        let result: Result<((), WinningPair)> = policy()
            .run(&cancel, move |_, _| {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(CallFailure::Fatal(SzinkronError::UnsupportedLanguage(
                        "xx".into(),
                    )))
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(SzinkronError::UnsupportedLanguage(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let cancel = CancelToken::new();
        let result: Result<((), WinningPair)> = policy()
            .run(&cancel, |_, _| async {
                Err(CallFailure::ModelNotFound("nope".into()))
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancellation_respected() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result: Result<((), WinningPair)> =
            policy().run(&cancel, |_, _| async { Ok(()) }).await;
        assert!(matches!(result, Err(SzinkronError::Cancelled)));
    }

    #[tokio::test]
    async fn test_third_pair_wins_and_is_recorded() {
        // first two (region, model) pairs report the model missing, the
        // third succeeds; the winner is exposed for the artifact header
        let cancel = CancelToken::new();
        let mut p = policy();
        p.models = vec!["m1".into(), "m2".into(), "m3".into()];

        let (_, pair) = p
            .run(&cancel, |model, _| async move {
                if model == "m1" || model == "m2" {
                    Err(CallFailure::ModelNotFound("not found".into()))
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(pair.tag(), "m3@r1");
    }
}
