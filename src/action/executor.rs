use std::time::Duration;

use crate::action::{ActionKind, ActionParams, ActionRegistry, ActionResult, ActionsResult};
use crate::book::Book;

/// Total attempts per action, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Follow-ups and retries one book may run on top of its queued actions.
pub const MAX_EXTRA_ACTIONS: usize = 64;

/// Runs a book's pending actions in order.
///
/// Follow-up actions returned by a handler go in front of what is left.
/// A permanent failure stops the chain and leaves the failed action's
/// successors queued on the book for the next run.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    registry: ActionRegistry,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ActionExecutor {
    pub fn new(registry: ActionRegistry, max_attempts: u32) -> Self {
        Self {
            registry,
            max_attempts: max_attempts.max(1),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub async fn run(&self, book: &mut Book, params: &ActionParams) -> ActionsResult {
        let mut queue = book.pending_actions().clone();
        let mut tracker = ActionsResult::new();
        let mut attempt = 0u32;
        let mut executed = 0usize;
        let budget = queue.len() + MAX_EXTRA_ACTIONS;

        while let Some(kind) = queue.pop_front() {
            // Dry run never splices or retries, so its queue cannot grow.
            if !params.dry_run && executed >= budget {
                tracing::error!(
                    book = book.label(),
                    action = %kind,
                    limit = budget,
                    "too many actions for one book; stopping"
                );
                queue.push_front(kind);
                tracker.report(&ActionResult::failure());
                break;
            }
            executed += 1;
            attempt += 1;

            let result = if params.dry_run {
                tracing::info!(book = book.label(), action = %kind, "dry run: skipping action");
                ActionResult::success()
            } else {
                tracing::info!(book = book.label(), action = %kind, attempt, "running action");
                self.execute(kind, book, params).await
            };

            let result = if result.is_retryable() {
                if attempt < self.max_attempts {
                    tracing::info!(book = book.label(), action = %kind, attempt, "action will be retried");
                    queue.push_front(kind);
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                    continue;
                }
                tracing::warn!(book = book.label(), action = %kind, attempt, "out of attempts");
                result.do_not_retry()
            } else {
                result
            };
            attempt = 0;

            if !params.dry_run && !result.patch().is_empty() {
                book.apply(result.patch().clone());
            }
            queue.splice_front(kind, result.next_actions());
            tracker.report(&result);

            if !result.is_success() {
                tracing::warn!(book = book.label(), action = %kind, remaining = %queue, "action failed; stopping");
            }
            if tracker.is_done() {
                tracker.resume();
                if tracker.is_done() {
                    break;
                }
            }
        }

        if !params.dry_run {
            book.set_pending_actions(queue);
        }
        tracker
    }

    async fn execute(&self, kind: ActionKind, book: &Book, params: &ActionParams) -> ActionResult {
        let Some(handler) = self.registry.get(kind) else {
            tracing::error!(book = book.label(), action = %kind, "no handler registered");
            return ActionResult::failure();
        };
        match handler.execute(book, params).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(book = book.label(), action = %kind, ?err, "action error");
                ActionResult::failure()
            }
        }
    }
}
