use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::db::DbHandle;
use crate::errors::EngineError;
use crate::models::RequestStatus;

use super::selector::Selector;

/// Swaps one active reviewer for another on one request.
///
/// Every call re-reads current state before deciding; nothing is cached
/// across calls. The final swap is a single store transaction whose
/// affected-row check turns a lost race into `NotAssigned` instead of a
/// double replacement.
pub struct ReplacementEngine {
    db: DbHandle,
    selector: Arc<Selector>,
}

impl ReplacementEngine {
    pub fn new(db: DbHandle, selector: Arc<Selector>) -> Self {
        Self { db, selector }
    }

    /// Replace `current_reviewer_id` on `request_id` with a uniformly-random
    /// active teammate not already on the request. Returns the incoming
    /// reviewer's id.
    pub async fn replace(
        &self,
        request_id: &str,
        current_reviewer_id: &str,
    ) -> Result<String, EngineError> {
        info!(
            pr_id = %request_id,
            old_reviewer_id = %current_reviewer_id,
            "replacing reviewer"
        );

        let pr = self
            .db
            .call({
                let id = request_id.to_string();
                move |db| db.request_by_id(&id)
            })
            .await?
            .ok_or_else(|| EngineError::RequestNotFound {
                id: request_id.to_string(),
            })?;

        if pr.status == RequestStatus::Merged {
            warn!(pr_id = %request_id, "replacement attempted on merged pull request");
            return Err(EngineError::AlreadyMerged {
                id: request_id.to_string(),
            });
        }

        if !pr
            .assigned_reviewers
            .iter()
            .any(|r| r == current_reviewer_id)
        {
            warn!(
                pr_id = %request_id,
                reviewer_id = %current_reviewer_id,
                "reviewer not assigned to pull request"
            );
            return Err(EngineError::NotAssigned {
                request_id: request_id.to_string(),
                reviewer_id: current_reviewer_id.to_string(),
            });
        }

        let outgoing = self
            .db
            .call({
                let id = current_reviewer_id.to_string();
                move |db| db.user_by_id(&id)
            })
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                id: current_reviewer_id.to_string(),
            })?;

        let teammates = self
            .db
            .call({
                let team = outgoing.team_name.clone();
                let exclude = current_reviewer_id.to_string();
                move |db| db.active_team_members(&team, &exclude)
            })
            .await?;

        // Exclude everyone already reviewing the request and the author:
        // replacement must never double-assign or introduce self-review.
        let candidates: Vec<_> = teammates
            .into_iter()
            .filter(|u| {
                u.user_id != pr.author_id && !pr.assigned_reviewers.contains(&u.user_id)
            })
            .collect();

        debug!(
            pr_id = %request_id,
            team_name = %outgoing.team_name,
            candidate_count = candidates.len(),
            current_reviewers = ?pr.assigned_reviewers,
            "computed replacement candidate pool"
        );

        if candidates.is_empty() {
            warn!(
                pr_id = %request_id,
                old_reviewer_id = %current_reviewer_id,
                "no suitable replacement candidate"
            );
            return Err(EngineError::NoCandidate);
        }

        let incoming = self.selector.pick_one(&candidates)?;

        let swapped = self
            .db
            .call({
                let request = request_id.to_string();
                let old = current_reviewer_id.to_string();
                let new = incoming.user_id.clone();
                move |db| db.replace_reviewer(&request, &old, &new)
            })
            .await?;
        if !swapped {
            // Another caller replaced the same reviewer between our read and
            // the transaction; exactly one of us wins.
            warn!(
                pr_id = %request_id,
                reviewer_id = %current_reviewer_id,
                "replacement lost race, reviewer no longer assigned"
            );
            return Err(EngineError::NotAssigned {
                request_id: request_id.to_string(),
                reviewer_id: current_reviewer_id.to_string(),
            });
        }

        info!(
            pr_id = %request_id,
            old_reviewer_id = %current_reviewer_id,
            new_reviewer_id = %incoming.user_id,
            "reviewer replaced"
        );
        Ok(incoming.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ReviewDb;
    use crate::models::{NewPullRequest, User};

    fn handle_with_team(members: &[(&str, bool)]) -> DbHandle {
        let db = ReviewDb::new_in_memory().unwrap();
        db.create_team("backend").unwrap();
        for (id, active) in members {
            db.create_or_update_user(&User {
                user_id: (*id).into(),
                username: format!("user {}", id),
                team_name: "backend".into(),
                is_active: *active,
                created_at: String::new(),
                updated_at: String::new(),
            })
            .unwrap();
        }
        DbHandle::new(db)
    }

    fn open_request(db: &DbHandle, id: &str, author: &str, reviewers: &[&str]) {
        let guard = db.lock_sync().unwrap();
        guard
            .create_request(&NewPullRequest {
                pull_request_id: id.into(),
                pull_request_name: format!("{} title", id),
                author_id: author.into(),
            })
            .unwrap();
        for r in reviewers {
            guard.set_reviewer_active(id, r).unwrap();
        }
    }

    fn engine(db: DbHandle) -> ReplacementEngine {
        ReplacementEngine::new(db, Arc::new(Selector::seeded(5)))
    }

    #[tokio::test]
    async fn replaces_with_an_unassigned_active_teammate() {
        let db = handle_with_team(&[("u1", true), ("u2", true), ("u3", true), ("u4", true)]);
        open_request(&db, "pr-1", "u1", &["u2", "u3"]);
        let engine = engine(db.clone());

        let new_id = engine.replace("pr-1", "u2").await.unwrap();
        assert_eq!(new_id, "u4");

        let reviewers = db.call(|db| db.active_reviewers("pr-1")).await.unwrap();
        assert_eq!(reviewers, vec!["u3", "u4"]);
    }

    #[tokio::test]
    async fn replacement_count_stays_one_for_one() {
        let db = handle_with_team(&[("u1", true), ("u2", true), ("u3", true), ("u4", true)]);
        open_request(&db, "pr-1", "u1", &["u2", "u3"]);
        let engine = engine(db.clone());

        engine.replace("pr-1", "u2").await.unwrap();
        let reviewers = db.call(|db| db.active_reviewers("pr-1")).await.unwrap();
        assert_eq!(reviewers.len(), 2);
    }

    #[tokio::test]
    async fn missing_request_is_not_found() {
        let db = handle_with_team(&[("u1", true)]);
        let engine = engine(db);
        let err = engine.replace("pr-404", "u1").await.unwrap_err();
        assert!(matches!(err, EngineError::RequestNotFound { .. }));
    }

    #[tokio::test]
    async fn merged_request_rejects_replacement() {
        let db = handle_with_team(&[("u1", true), ("u2", true), ("u3", true)]);
        open_request(&db, "pr-1", "u1", &["u2"]);
        db.lock_sync().unwrap().merge_request("pr-1").unwrap();
        let engine = engine(db);

        let err = engine.replace("pr-1", "u2").await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyMerged { .. }));
    }

    #[tokio::test]
    async fn unassigned_reviewer_is_rejected() {
        let db = handle_with_team(&[("u1", true), ("u2", true), ("u3", true)]);
        open_request(&db, "pr-1", "u1", &["u2"]);
        let engine = engine(db);

        let err = engine.replace("pr-1", "u3").await.unwrap_err();
        assert!(matches!(err, EngineError::NotAssigned { .. }));
    }

    #[tokio::test]
    async fn exhausted_pool_is_no_candidate() {
        // Team is {u1 author, u2, u3}; u3 already reviews, u1 is the author,
        // so nobody is left to take over from u2.
        let db = handle_with_team(&[("u1", true), ("u2", true), ("u3", true)]);
        open_request(&db, "pr-1", "u1", &["u2", "u3"]);
        let engine = engine(db);

        let err = engine.replace("pr-1", "u2").await.unwrap_err();
        assert!(matches!(err, EngineError::NoCandidate));
    }

    #[tokio::test]
    async fn author_is_never_selected_as_replacement() {
        let db = handle_with_team(&[("u1", true), ("u2", true), ("u3", true), ("u4", true)]);
        open_request(&db, "pr-1", "u1", &["u2", "u3"]);
        let engine = engine(db.clone());

        // Only u4 is eligible; run the swap chain a few times to make sure
        // the author never slips in.
        engine.replace("pr-1", "u2").await.unwrap();
        let reviewers = db.call(|db| db.active_reviewers("pr-1")).await.unwrap();
        assert!(!reviewers.contains(&"u1".to_string()));
    }

    #[tokio::test]
    async fn inactive_teammates_are_not_candidates() {
        let db = handle_with_team(&[("u1", true), ("u2", true), ("u3", false), ("u4", false)]);
        open_request(&db, "pr-1", "u1", &["u2"]);
        let engine = engine(db);

        let err = engine.replace("pr-1", "u2").await.unwrap_err();
        assert!(matches!(err, EngineError::NoCandidate));
    }

    #[tokio::test]
    async fn concurrent_replacement_yields_one_success_one_not_assigned() {
        let db = handle_with_team(&[
            ("u1", true),
            ("u2", true),
            ("u3", true),
            ("u4", true),
            ("u5", true),
        ]);
        open_request(&db, "pr-1", "u1", &["u2"]);
        let engine = Arc::new(engine(db.clone()));

        let a = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.replace("pr-1", "u2").await })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.replace("pr-1", "u2").await })
        };
        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());

        let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one concurrent replacement must win");
        let loser = if ra.is_ok() { rb } else { ra };
        assert!(matches!(
            loser.unwrap_err(),
            EngineError::NotAssigned { .. }
        ));

        let reviewers = db.call(|db| db.active_reviewers("pr-1")).await.unwrap();
        assert_eq!(reviewers.len(), 1);
        assert_ne!(reviewers[0], "u2");
    }
}
