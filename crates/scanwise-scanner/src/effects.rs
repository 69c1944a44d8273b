//! Dependent operations fired by a successful analysis.
//!
//! History persistence and the alternatives lookup run as independent
//! background tasks: neither awaits the other and neither can clear or alter
//! the displayed result. Each fires at most once per [`SubmissionId`].
//! Favorites are only added on explicit request.
//!
//! Progress is published through a `watch` channel as a [`SideEffectState`].
//! Completions whose submission is no longer current are dropped.

use crate::error::{Result, ScanError};
use scanwise_auth::AuthSession;
use scanwise_client::AnalysisService;
use scanwise_core::{
    Alternative, AnalysisResult, FavoriteStatus, SubmissionId, MODERATE_RISK_THRESHOLD,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Tri-state of one side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SideEffectOutcome {
    /// Scheduled, not finished
    Pending,
    /// Finished successfully
    Succeeded,
    /// Finished with an error; logged, never surfaced as a result error
    Failed(String),
}

/// Side effects of the current submission.
///
/// `None` means the effect was not scheduled for this submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SideEffectState {
    /// Submission the effects belong to
    pub submission: Option<SubmissionId>,
    /// History persistence
    pub history: Option<SideEffectOutcome>,
    /// Alternatives lookup
    pub alternatives: Option<SideEffectOutcome>,
    /// Last favorite request
    pub favorite: Option<SideEffectOutcome>,
    /// Alternatives found, best first
    pub alternative_products: Vec<Alternative>,
    /// Outcome of the last successful favorite request
    pub favorite_status: Option<FavoriteStatus>,
}

/// Whether alternatives should be looked up for a result.
///
/// Strictly above the moderate threshold, and only with a non-blank category.
#[must_use]
pub fn should_fetch_alternatives(score: f64, category: Option<&str>) -> bool {
    score > MODERATE_RISK_THRESHOLD && category.is_some_and(|c| !c.trim().is_empty())
}

/// Join handles of the tasks scheduled for one submission.
#[derive(Debug, Default)]
pub struct SideEffectHandles {
    history: Option<JoinHandle<()>>,
    alternatives: Option<JoinHandle<()>>,
}

impl SideEffectHandles {
    /// Whether nothing was scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_none() && self.alternatives.is_none()
    }

    /// Wait for every scheduled task to finish.
    pub async fn settle(self) {
        for handle in [self.history, self.alternatives].into_iter().flatten() {
            if let Err(e) = handle.await {
                tracing::warn!("Side-effect task ended abnormally: {}", e);
            }
        }
    }
}

/// Schedules history, alternatives and favorites for analysis results.
pub struct SideEffectCoordinator {
    service: Arc<dyn AnalysisService>,
    auth: AuthSession,
    state: Arc<watch::Sender<SideEffectState>>,
    last_fired: Mutex<Option<SubmissionId>>,
}

impl std::fmt::Debug for SideEffectCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideEffectCoordinator")
            .field("auth", &self.auth)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Apply `update` if `submission` is still the one the state belongs to.
fn update_if_current(
    state: &watch::Sender<SideEffectState>,
    submission: SubmissionId,
    update: impl FnOnce(&mut SideEffectState),
) -> bool {
    state.send_if_modified(|current| {
        if current.submission == Some(submission) {
            update(current);
            true
        } else {
            false
        }
    })
}

impl SideEffectCoordinator {
    /// Create a coordinator with an empty state.
    #[must_use]
    pub fn new(service: Arc<dyn AnalysisService>, auth: AuthSession) -> Self {
        let (state, _) = watch::channel(SideEffectState::default());
        Self {
            service,
            auth,
            state: Arc::new(state),
            last_fired: Mutex::new(None),
        }
    }

    /// Observe the side-effect state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SideEffectState> {
        self.state.subscribe()
    }

    /// Current side-effect state.
    #[must_use]
    pub fn state(&self) -> SideEffectState {
        self.state.borrow().clone()
    }

    /// Forget the current submission's effects. Late completions are dropped.
    pub fn reset(&self) {
        self.state.send_replace(SideEffectState::default());
    }

    /// Fire the automatic side effects of a new successful result.
    ///
    /// Does nothing when `submission` already fired. `request_category` is
    /// used when the result carries no category of its own.
    pub fn on_analysis_succeeded(
        &self,
        submission: SubmissionId,
        result: &AnalysisResult,
        request_category: Option<&str>,
    ) -> SideEffectHandles {
        {
            let mut last = self
                .last_fired
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *last == Some(submission) {
                tracing::debug!("Side effects for {} already fired", submission);
                return SideEffectHandles::default();
            }
            *last = Some(submission);
        }

        let record_history = self.auth.is_signed_in();
        let category = result
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or(request_category)
            .map(str::to_string);
        let fetch_alternatives = should_fetch_alternatives(result.toxicity_score, category.as_deref());

        self.state.send_replace(SideEffectState {
            submission: Some(submission),
            history: record_history.then_some(SideEffectOutcome::Pending),
            alternatives: fetch_alternatives.then_some(SideEffectOutcome::Pending),
            ..SideEffectState::default()
        });

        let history = record_history.then(|| self.spawn_history(submission, result.clone()));
        let alternatives = category
            .filter(|_| fetch_alternatives)
            .map(|category| self.spawn_alternatives(submission, category, result.toxicity_score));

        SideEffectHandles {
            history,
            alternatives,
        }
    }

    fn spawn_history(&self, submission: SubmissionId, result: AnalysisResult) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let outcome = match service.record_history(&result).await {
                Ok(()) => {
                    tracing::debug!("History saved for {}", submission);
                    SideEffectOutcome::Succeeded
                }
                Err(e) => {
                    tracing::warn!("Failed to save history: {}", e);
                    SideEffectOutcome::Failed(e.to_string())
                }
            };
            update_if_current(&state, submission, |s| s.history = Some(outcome));
        })
    }

    fn spawn_alternatives(
        &self,
        submission: SubmissionId,
        category: String,
        score: f64,
    ) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            match service.recommend_alternatives(&category, score).await {
                Ok(products) => {
                    tracing::debug!("{} alternatives for '{}'", products.len(), category);
                    update_if_current(&state, submission, |s| {
                        s.alternatives = Some(SideEffectOutcome::Succeeded);
                        s.alternative_products = products;
                    });
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch alternatives: {}", e);
                    update_if_current(&state, submission, |s| {
                        s.alternatives = Some(SideEffectOutcome::Failed(e.to_string()));
                    });
                }
            }
        })
    }

    /// Add the product of `result` to the user's favorites.
    ///
    /// A duplicate is reported as [`FavoriteStatus::AlreadyExists`], not as an
    /// error.
    ///
    /// # Errors
    /// Returns [`ScanError::NotAuthenticated`] when nobody is signed in, or the
    /// service error. Either way the displayed result is untouched.
    pub async fn add_favorite(
        &self,
        submission: SubmissionId,
        result: &AnalysisResult,
    ) -> Result<FavoriteStatus> {
        if !self.auth.is_signed_in() {
            return Err(ScanError::NotAuthenticated);
        }

        update_if_current(&self.state, submission, |s| {
            s.favorite = Some(SideEffectOutcome::Pending);
        });

        match self.service.add_favorite(result.product_name_or_unknown()).await {
            Ok(status) => {
                tracing::info!("Favorite '{}': {:?}", result.product_name_or_unknown(), status);
                update_if_current(&self.state, submission, |s| {
                    s.favorite = Some(SideEffectOutcome::Succeeded);
                    s.favorite_status = Some(status);
                });
                Ok(status)
            }
            Err(e) => {
                tracing::warn!("Failed to add favorite: {}", e);
                update_if_current(&self.state, submission, |s| {
                    s.favorite = Some(SideEffectOutcome::Failed(e.to_string()));
                });
                Err(e.into())
            }
        }
    }
}
