use crate::action::ActionKind;

/// Fields an action handler is allowed to change on a book.
///
/// Handlers only ever see `&Book`; the executor applies the patch after the
/// action returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub id: Option<String>,
    pub isbn: Option<String>,
    pub was_ever_published: Option<bool>,
    pub pub_status: Option<String>,
    pub pub_status_detail: Option<String>,
    pub cover_image_url: Option<String>,
    pub asin: Option<String>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of running one action for one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    success: bool,
    retry: bool,
    next_actions: Vec<ActionKind>,
    patch: BookPatch,
}

impl ActionResult {
    pub fn new(success: bool) -> Self {
        Self {
            success,
            retry: false,
            next_actions: Vec::new(),
            patch: BookPatch::default(),
        }
    }

    pub fn success() -> Self {
        Self::new(true)
    }

    pub fn failure() -> Self {
        Self::new(false)
    }

    /// A transient failure; the executor runs the same action again.
    pub fn retry() -> Self {
        Self {
            retry: true,
            ..Self::new(false)
        }
    }

    /// Pins the result as permanent.
    pub fn do_not_retry(mut self) -> Self {
        self.retry = false;
        self
    }

    pub fn with_next_actions(mut self, next: impl IntoIterator<Item = ActionKind>) -> Self {
        self.next_actions.extend(next);
        self
    }

    pub fn with_patch(mut self, patch: BookPatch) -> Self {
        self.patch = patch;
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_retryable(&self) -> bool {
        self.retry
    }

    pub fn next_actions(&self) -> &[ActionKind] {
        &self.next_actions
    }

    pub fn patch(&self) -> &BookPatch {
        &self.patch
    }
}

/// Accumulates the results of one book's action chain.
#[derive(Debug, Clone, Default)]
pub struct ActionsResult {
    succeeded: usize,
    failed: usize,
    done: bool,
    stopped: bool,
}

impl ActionsResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, result: &ActionResult) {
        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }

        if !result.is_success() && !result.is_retryable() {
            self.done = true;
            self.stopped = true;
        }
        if !result.next_actions().is_empty() {
            self.done = true;
        }
    }

    pub fn has_success(&self) -> bool {
        self.succeeded > 0
    }

    pub fn has_failed(&self) -> bool {
        self.failed > 0
    }

    /// The queue being followed is finished or stale: either a permanent
    /// failure was reported or a result injected follow-up actions.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Continues after follow-ups were spliced in. A permanent failure stays
    /// done.
    pub fn resume(&mut self) {
        self.done = self.stopped;
    }

    pub fn num_reported(&self) -> usize {
        self.succeeded + self.failed
    }
}
