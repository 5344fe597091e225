use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::db::DbHandle;
use crate::errors::EngineError;
use crate::models::{NewPullRequest, PullRequest, PullRequestSummary};

use super::selector::Selector;

/// Orchestrates initial reviewer assignment for new requests, plus the
/// request lifecycle operations (merge, lookups) the HTTP layer exposes.
pub struct AssignmentEngine {
    db: DbHandle,
    selector: Arc<Selector>,
    max_reviewers: usize,
}

impl AssignmentEngine {
    pub fn new(db: DbHandle, selector: Arc<Selector>, max_reviewers: usize) -> Self {
        Self {
            db,
            selector,
            max_reviewers,
        }
    }

    /// Create a request and assign up to `max_reviewers` reviewers from the
    /// author's team, atomically: if any assignment write fails after the
    /// request row exists, the request is deleted again before the failure
    /// surfaces.
    pub async fn create_and_assign(&self, new: NewPullRequest) -> Result<PullRequest, EngineError> {
        let request_id = new.pull_request_id.clone();
        info!(
            pr_id = %request_id,
            author_id = %new.author_id,
            "creating pull request"
        );

        let exists = self
            .db
            .call({
                let id = request_id.clone();
                move |db| db.request_exists(&id)
            })
            .await?;
        if exists {
            warn!(pr_id = %request_id, "pull request already exists");
            return Err(EngineError::RequestExists { id: request_id });
        }

        let author = self
            .db
            .call({
                let id = new.author_id.clone();
                move |db| db.user_by_id(&id)
            })
            .await?
            .ok_or_else(|| {
                warn!(author_id = %new.author_id, "author not found");
                EngineError::AuthorNotFound {
                    id: new.author_id.clone(),
                }
            })?;

        self.db
            .call({
                let new = new.clone();
                move |db| db.create_request(&new)
            })
            .await?;

        let reviewers = match self
            .assign_reviewers(&request_id, &author.team_name, &new.author_id)
            .await
        {
            Ok(reviewers) => reviewers,
            Err(cause) => {
                error!(
                    pr_id = %request_id,
                    error = %cause,
                    "reviewer assignment failed, rolling back request creation"
                );
                return Err(self.rollback_request(&request_id, cause).await);
            }
        };

        info!(
            pr_id = %request_id,
            reviewers = ?reviewers,
            "pull request created"
        );

        self.request_by_id(&request_id).await
    }

    /// Candidate pool is the author's active teammates. An empty pool is a
    /// valid degenerate outcome (single-person teams), not an error.
    async fn assign_reviewers(
        &self,
        request_id: &str,
        team_name: &str,
        author_id: &str,
    ) -> Result<Vec<String>, EngineError> {
        let candidates = self
            .db
            .call({
                let team = team_name.to_string();
                let author = author_id.to_string();
                move |db| db.active_team_members(&team, &author)
            })
            .await?;

        debug!(
            team_name,
            candidate_count = candidates.len(),
            "computed candidate pool"
        );

        if candidates.is_empty() {
            warn!(team_name, author_id, "no candidate reviewers available");
            return Ok(Vec::new());
        }

        let selected = self.selector.pick(&candidates, self.max_reviewers);
        let mut reviewer_ids = Vec::with_capacity(selected.len());
        for user in selected {
            self.db
                .call({
                    let request = request_id.to_string();
                    let reviewer = user.user_id.clone();
                    move |db| db.set_reviewer_active(&request, &reviewer)
                })
                .await?;
            reviewer_ids.push(user.user_id);
        }
        Ok(reviewer_ids)
    }

    /// Compensating rollback for a failed assignment. When the delete itself
    /// fails the original cause and the rollback failure are reported
    /// together so an operator can reconcile manually.
    async fn rollback_request(&self, request_id: &str, cause: EngineError) -> EngineError {
        let deleted = self
            .db
            .call({
                let id = request_id.to_string();
                move |db| db.delete_request(&id)
            })
            .await;
        match deleted {
            Ok(_) => cause,
            Err(rollback) => {
                error!(
                    pr_id = %request_id,
                    error = %rollback,
                    "rollback delete failed after assignment failure"
                );
                EngineError::RollbackFailed {
                    request_id: request_id.to_string(),
                    cause: cause.to_string(),
                    rollback: rollback.to_string(),
                }
            }
        }
    }

    /// Mark a request MERGED, freezing its reviewer set. Merging an already
    /// merged request is idempotent.
    pub async fn merge(&self, request_id: &str) -> Result<PullRequest, EngineError> {
        info!(pr_id = %request_id, "merging pull request");

        let pr = self.request_by_id(request_id).await?;
        if pr.status == crate::models::RequestStatus::Merged {
            info!(pr_id = %request_id, "pull request already merged");
            return Ok(pr);
        }

        self.db
            .call({
                let id = request_id.to_string();
                move |db| db.merge_request(&id)
            })
            .await?;

        self.request_by_id(request_id).await
    }

    pub async fn request_by_id(&self, request_id: &str) -> Result<PullRequest, EngineError> {
        self.db
            .call({
                let id = request_id.to_string();
                move |db| db.request_by_id(&id)
            })
            .await?
            .ok_or_else(|| EngineError::RequestNotFound {
                id: request_id.to_string(),
            })
    }

    /// Open requests the user actively reviews. Verifies the user exists so
    /// an unknown id is a 404, not an empty list.
    pub async fn assigned_requests(
        &self,
        user_id: &str,
    ) -> Result<Vec<PullRequestSummary>, EngineError> {
        let user = self
            .db
            .call({
                let id = user_id.to_string();
                move |db| db.user_by_id(&id)
            })
            .await?;
        if user.is_none() {
            return Err(EngineError::UserNotFound {
                id: user_id.to_string(),
            });
        }

        Ok(self
            .db
            .call({
                let id = user_id.to_string();
                move |db| db.assigned_open_requests(&id)
            })
            .await?)
    }
}
