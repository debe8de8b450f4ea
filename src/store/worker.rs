/*!
 * Single-writer queue for the pronoun store.
 *
 * All backing-store mutations, and the cache-miss loads queued behind them,
 * are processed strictly in the order they were queued, one at a time.
 */

use log::{debug, error};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::cache::PronounCache;
use super::Counters;
use crate::database::Repository;
use crate::errors::StoreError;

pub(crate) type Completion = oneshot::Sender<Result<(), StoreError>>;

/// Work item for the writer task
pub(crate) enum StoreOp {
    /// Delete then insert a user's full sequence
    Replace {
        user: Uuid,
        sets: Vec<String>,
        done: Option<Completion>,
    },
    /// Delete all of a user's rows
    Clear {
        user: Uuid,
        done: Option<Completion>,
    },
    /// Read a user's rows for a cache miss that must observe queued writes
    Load {
        user: Uuid,
        reply: oneshot::Sender<Result<Vec<String>, StoreError>>,
    },
    /// Signal once everything queued before it has completed
    Flush { done: oneshot::Sender<()> },
}

/// Drain the queue until every sender is gone
pub(crate) async fn run(
    mut ops: mpsc::UnboundedReceiver<StoreOp>,
    repository: Repository,
    counters: Arc<Counters>,
    cache: Arc<PronounCache>,
) {
    debug!("Pronoun store worker started");

    while let Some(op) = ops.recv().await {
        match op {
            StoreOp::Replace { user, sets, done } => {
                let result = repository
                    .replace_pronouns(user, sets)
                    .await
                    .map_err(|e| {
                        error!("Error setting pronouns for {}: {:#}", user, e);
                        StoreError::Unavailable(format!("{:#}", e))
                    });
                cache.write_finished(&user);
                finish_write(&counters, result, done);
            }
            StoreOp::Clear { user, done } => {
                let result = repository
                    .delete_pronouns(user)
                    .await
                    .map(|_| ())
                    .map_err(|e| {
                        error!("Error clearing pronouns for {}: {:#}", user, e);
                        StoreError::Unavailable(format!("{:#}", e))
                    });
                cache.write_finished(&user);
                finish_write(&counters, result, done);
            }
            StoreOp::Load { user, reply } => {
                let result = repository.load_pronouns(user).await.map_err(|e| {
                    error!("Error getting pronouns for {}: {:#}", user, e);
                    StoreError::Unavailable(format!("{:#}", e))
                });
                // The caller may have given up waiting
                let _ = reply.send(result);
            }
            StoreOp::Flush { done } => {
                let _ = done.send(());
            }
        }
    }

    debug!("Pronoun store worker stopped");
}

fn finish_write(counters: &Counters, result: Result<(), StoreError>, done: Option<Completion>) {
    match &result {
        Ok(()) => counters.writes_completed.fetch_add(1, Ordering::Relaxed),
        Err(_) => counters.write_failures.fetch_add(1, Ordering::Relaxed),
    };
    if let Some(done) = done {
        let _ = done.send(result);
    }
}
