use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::db::DbHandle;

use super::replacement::ReplacementEngine;

/// One recorded outcome of a bulk-deactivation batch: either a user's
/// active-flag write (empty `pr_id`) or a single (user, request) repair
/// attempt (empty `new_reviewer` on failure).
#[derive(Debug, Clone, Serialize)]
pub struct Reassignment {
    pub old_reviewer: String,
    pub new_reviewer: String,
    pub pr_id: String,
    pub success: bool,
}

/// Drives concurrent reviewer replacement across every open request touched
/// by a batch of deactivated users.
///
/// One worker per user fetches and repairs that user's requests sequentially,
/// in parallel with other users' workers. Workers report completed records
/// over a single collector channel; the coordinator owns the result map, so
/// no shared mutable state is ever touched concurrently.
pub struct BulkCoordinator {
    db: DbHandle,
    replacer: Arc<ReplacementEngine>,
    latency_budget: Duration,
}

impl BulkCoordinator {
    pub fn new(db: DbHandle, replacer: Arc<ReplacementEngine>, latency_budget: Duration) -> Self {
        Self {
            db,
            replacer,
            latency_budget,
        }
    }

    /// Deactivate `user_ids` and repair their open review assignments.
    ///
    /// Best-effort sweep: per-item failures are recorded, never fatal, and
    /// the batch never aborts early. Repair entries are keyed
    /// `"{user}:{request}"`, deactivation entries by the bare user id.
    pub async fn bulk_deactivate(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> HashMap<String, Reassignment> {
        let start = Instant::now();
        info!(
            team_name,
            user_count = user_ids.len(),
            "starting bulk deactivation"
        );

        let mut results: HashMap<String, Reassignment> = HashMap::new();

        // Deactivation pass first: individual flag writes are fast, so a
        // sequential sweep keeps this simple. Repairs below proceed even for
        // users whose flag write failed (they may already be inactive).
        for user_id in user_ids {
            let flagged = self
                .db
                .call({
                    let id = user_id.clone();
                    move |db| db.set_user_active(&id, false)
                })
                .await;
            let success = match flagged {
                Ok(true) => true,
                Ok(false) => {
                    warn!(user_id = %user_id, "user not found during deactivation");
                    false
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "failed to deactivate user");
                    false
                }
            };
            results.insert(
                user_id.clone(),
                Reassignment {
                    old_reviewer: user_id.clone(),
                    new_reviewer: String::new(),
                    pr_id: String::new(),
                    success,
                },
            );
        }

        // Repair pass: one worker per user, requests within a user repaired
        // sequentially. Records flow through the channel only after the
        // underlying store write completed, so a dropped worker never leaves
        // a fabricated success behind.
        let (tx, mut rx) = mpsc::channel::<(String, Reassignment)>(64);
        let mut workers = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            let tx = tx.clone();
            let db = self.db.clone();
            let replacer = self.replacer.clone();
            let user_id = user_id.clone();
            workers.push(tokio::spawn(async move {
                repair_user_requests(db, replacer, user_id, tx).await;
            }));
        }
        drop(tx);

        while let Some((key, record)) = rx.recv().await {
            results.insert(key, record);
        }
        for worker in workers {
            // Workers only log and send; a panic here is a bug, not a batch failure.
            let _ = worker.await;
        }

        let duration = start.elapsed();
        info!(
            team_name,
            user_count = user_ids.len(),
            result_count = results.len(),
            ?duration,
            "completed bulk deactivation"
        );
        if duration > self.latency_budget {
            warn!(
                team_name,
                ?duration,
                budget = ?self.latency_budget,
                "bulk deactivation exceeded latency budget"
            );
        }

        results
    }
}

async fn repair_user_requests(
    db: DbHandle,
    replacer: Arc<ReplacementEngine>,
    user_id: String,
    tx: mpsc::Sender<(String, Reassignment)>,
) {
    let requests = match db
        .call({
            let id = user_id.clone();
            move |db| db.assigned_open_requests(&id)
        })
        .await
    {
        Ok(requests) => requests,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "failed to fetch assigned requests");
            let _ = tx
                .send((
                    user_id.clone(),
                    Reassignment {
                        old_reviewer: user_id,
                        new_reviewer: String::new(),
                        pr_id: String::new(),
                        success: false,
                    },
                ))
                .await;
            return;
        }
    };

    debug!(
        user_id = %user_id,
        pr_count = requests.len(),
        "repairing user's open requests"
    );

    for pr in requests {
        let key = format!("{}:{}", user_id, pr.pull_request_id);
        let record = match replacer.replace(&pr.pull_request_id, &user_id).await {
            Ok(new_reviewer) => Reassignment {
                old_reviewer: user_id.clone(),
                new_reviewer,
                pr_id: pr.pull_request_id,
                success: true,
            },
            Err(e) => {
                warn!(
                    pr_id = %pr.pull_request_id,
                    old_reviewer_id = %user_id,
                    error = %e,
                    "failed to replace reviewer during bulk repair"
                );
                Reassignment {
                    old_reviewer: user_id.clone(),
                    new_reviewer: String::new(),
                    pr_id: pr.pull_request_id,
                    success: false,
                }
            }
        };
        let _ = tx.send((key, record)).await;
    }
}
