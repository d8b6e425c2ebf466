//! Comment board controller — store calls orchestrated against one UI state.
//!
//! DESIGN
//! ======
//! Every user action spawns a tokio task. Tasks share one `Inner` behind a
//! `std::sync::Mutex` that is never held across an await. Each task ends
//! with the finalize step under the same lock that applied its outcome, so
//! handler-then-finalize ordering holds per operation. Follow-up refreshes
//! are triggered after the lock is released.
//!
//! Refreshes (bucket list, comment list) wait `REFRESH_DELAY` before hitting
//! the store. There is no coalescing: each trigger fetches once. A per-kind
//! request sequence decides which result lands; a result whose sequence is no
//! longer the newest issued is dropped.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here returns an error. A store failure becomes a banner message
//! plus finalize, so the board never ends up stuck in a loading or submitted
//! state.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use time::Date;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::state::{BoardState, Bucket, Comment, Message, bucket_name_for, display_date, noon_of};
use crate::store::{
    BucketEntry, CommentFields, CommentStore, NewComment, StoreError, StoreRejection, parse_comment_listing,
};

/// Pause before a triggered refresh fires.
pub const REFRESH_DELAY: Duration = Duration::from_millis(1000);
/// Lifetime of a banner message after the latest finalize.
pub const MESSAGE_TTL: Duration = Duration::from_millis(7000);
/// Comments fetched per listing.
pub const COMMENT_PAGE_SIZE: usize = 10;

pub const NETWORK_ERROR: &str = "There was a network error. Try again later.";
pub const PROCESSING_ERROR: &str = "Oops, we received your request, but there was an error processing it.";
pub const BUCKET_NAME_REQUIRED: &str = "Index cannot be empty";
pub const BUCKET_CREATED: &str = "Your index has been created!";
pub const BUCKET_EXISTS_HINT: &str =
    "This index already exists. Please reload the page to see it in the indices list";
pub const COMMENT_SAVED: &str = "Your comment has been saved!";
pub const COMMENT_DELETED: &str = "Your comment has been deleted!";

// =============================================================================
// REQUEST TRACKING
// =============================================================================

/// Sequence and in-flight count for one refresh kind.
#[derive(Debug, Default)]
struct RequestTracker {
    issued: u64,
    in_flight: usize,
}

impl RequestTracker {
    fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.in_flight += 1;
        self.issued
    }

    /// Release one in-flight slot. True if `seq` is still the newest request.
    fn finish(&mut self, seq: u64) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        seq == self.issued
    }

    fn busy(&self) -> bool {
        self.in_flight > 0
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

struct Inner {
    ui: BoardState,
    buckets: RequestTracker,
    comments: RequestTracker,
    /// The single pending dismiss timer.
    dismiss: Option<JoinHandle<()>>,
    /// Bumped on every re-arm; a timer only clears the message for its own generation.
    dismiss_generation: u64,
}

struct Shared {
    store: Arc<dyn CommentStore>,
    inner: Mutex<Inner>,
    /// Outstanding operations, dismiss timers excluded.
    pending: watch::Sender<usize>,
}

/// Owns the board state and every user-triggered action on it.
///
/// Cloning is cheap and yields a handle to the same board.
#[derive(Clone)]
pub struct CommentBoardController {
    shared: Arc<Shared>,
}

/// Decrements the pending count when an operation's task ends, however it ends.
struct PendingOp(Arc<Shared>);

impl Drop for PendingOp {
    fn drop(&mut self) {
        self.0.pending.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl CommentBoardController {
    /// A controller with fresh state and nothing scheduled.
    #[must_use]
    pub fn new(store: Arc<dyn CommentStore>) -> Self {
        let (pending, _) = watch::channel(0);
        let inner = Inner {
            ui: BoardState::default(),
            buckets: RequestTracker::default(),
            comments: RequestTracker::default(),
            dismiss: None,
            dismiss_generation: 0,
        };
        Self { shared: Arc::new(Shared { store, inner: Mutex::new(inner), pending }) }
    }

    /// Create a controller and run the page-load bootstrap. Must be called
    /// from within a tokio runtime.
    #[must_use]
    pub fn activate(store: Arc<dyn CommentStore>) -> Self {
        let controller = Self::new(store);
        controller.bootstrap();
        controller
    }

    /// Ensure the default bucket exists, then list buckets. The comment list
    /// loads alongside without waiting on either.
    pub fn bootstrap(&self) {
        self.spawn_op(|this| async move {
            if let Err(e) = this.shared.store.ensure_default_bucket().await {
                debug!(error = %e, "default bucket bootstrap failed; listing anyway");
            }
            this.refresh_buckets(None);
        });
        self.refresh_comments();
    }

    /// Clone of the current UI state.
    #[must_use]
    pub fn snapshot(&self) -> BoardState {
        self.lock().ui.clone()
    }

    /// Resolve once no operation is outstanding. Pending dismiss timers do
    /// not count.
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.pending.subscribe();
        // Only fails once the sender is dropped, and `shared` keeps it alive.
        if rx.wait_for(|n| *n == 0).await.is_err() {
            warn!("pending counter closed while waiting for idle");
        }
    }

    // =========================================================================
    // FORM FIELDS
    // =========================================================================

    pub fn set_pending_bucket_name(&self, name: impl Into<String>) {
        self.lock().ui.pending_bucket_name = name.into();
    }

    pub fn set_draft_body(&self, body: impl Into<String>) {
        self.lock().ui.draft.body = body.into();
    }

    pub fn set_draft_date(&self, date: Date) {
        self.lock().ui.draft.date = date;
    }

    /// Select a listed bucket by full name, or clear the selection with `None`.
    /// Returns false and leaves the selection alone if the name is not listed.
    pub fn select_bucket(&self, name: Option<&str>) -> bool {
        let mut inner = self.lock();
        let Some(name) = name else {
            inner.ui.selected_bucket = None;
            return true;
        };
        let found = inner.ui.buckets.iter().find(|b| b.name == name).cloned();
        if found.is_none() {
            return false;
        }
        inner.ui.selected_bucket = found;
        true
    }

    // =========================================================================
    // REFRESHES
    // =========================================================================

    /// Reload the bucket list and select `comments-<suffix>`, or the default
    /// bucket when `suffix` is `None`.
    pub fn refresh_buckets(&self, suffix: Option<&str>) {
        let target = bucket_name_for(suffix);
        let seq = {
            let mut inner = self.lock();
            inner.ui.loading_buckets = true;
            inner.buckets.begin()
        };

        self.spawn_op(move |this| async move {
            tokio::time::sleep(REFRESH_DELAY).await;
            let result = this.shared.store.list_buckets().await;

            let mut inner = this.lock();
            apply_bucket_listing(&mut inner, seq, &target, result);
            this.finalize(&mut inner);
        });
    }

    /// Reload the newest page of comments.
    pub fn refresh_comments(&self) {
        let seq = {
            let mut inner = self.lock();
            inner.ui.loading_comments = true;
            inner.comments.begin()
        };

        self.spawn_op(move |this| async move {
            tokio::time::sleep(REFRESH_DELAY).await;
            let result = this.shared.store.list_comments(COMMENT_PAGE_SIZE).await;

            let mut inner = this.lock();
            apply_comment_listing(&mut inner, seq, result);
            this.finalize(&mut inner);
        });
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Create a bucket from the name typed into the create-bucket field.
    pub fn create_pending_bucket(&self) {
        let name = self.lock().ui.pending_bucket_name.clone();
        self.create_bucket(&name);
    }

    /// Create bucket `name` and, once acknowledged, list buckets selecting it.
    pub fn create_bucket(&self, name: &str) {
        let name = name.trim().to_owned();
        if name.is_empty() {
            let mut inner = self.lock();
            inner.ui.message = Some(Message::danger(BUCKET_NAME_REQUIRED));
            self.finalize(&mut inner);
            return;
        }

        self.spawn_op(move |this| async move {
            let result = this.shared.store.create_bucket(&name).await;

            let created = {
                let mut inner = this.lock();
                let created = match result {
                    Ok(reply) if reply.acknowledged => {
                        info!(bucket = %name, "bucket created");
                        inner.ui.pending_bucket_name.clear();
                        inner.ui.message = Some(Message::success(BUCKET_CREATED));
                        true
                    }
                    Ok(reply) => {
                        let rejection = reply.error.unwrap_or_default();
                        inner.ui.message = Some(bucket_rejection_message(&name, &rejection));
                        false
                    }
                    Err(e) => {
                        error!(error = %e, bucket = %name, "bucket creation failed");
                        inner.ui.message = Some(Message::danger(NETWORK_ERROR));
                        false
                    }
                };
                this.finalize(&mut inner);
                created
            };

            if created {
                this.refresh_buckets(Some(name.as_str()));
            }
        });
    }

    /// Submit the draft comment into the selected bucket.
    ///
    /// `form_valid` is the caller's own form validation. A blank body is
    /// dropped before it is consulted and never marks the form submitted.
    pub fn submit_comment(&self, form_valid: bool) {
        let request = {
            let mut inner = self.lock();
            let ui = &mut inner.ui;
            if ui.draft.body.trim().is_empty() {
                ui.draft.body.clear();
                return;
            }
            ui.submitted = true;
            if !form_valid {
                return;
            }
            NewComment {
                index: ui.selected_bucket_name().map(str::to_owned),
                comment: CommentFields { date: noon_of(ui.draft.date), body: ui.draft.body.clone() },
            }
        };

        self.spawn_op(move |this| async move {
            let result = this.shared.store.create_comment(&request).await;

            let created = {
                let mut inner = this.lock();
                let created = match result {
                    Ok(reply) if reply.created => {
                        info!(bucket = ?request.index, "comment saved");
                        inner.ui.submitted = false;
                        inner.ui.draft.body.clear();
                        inner.ui.message = Some(Message::success(COMMENT_SAVED));
                        true
                    }
                    Ok(reply) => {
                        error!(?reply, bucket = ?request.index, "comment rejected by store");
                        inner.ui.message = Some(Message::danger(PROCESSING_ERROR));
                        false
                    }
                    Err(e) => {
                        error!(error = %e, bucket = ?request.index, "comment submission failed");
                        inner.ui.message = Some(Message::danger(NETWORK_ERROR));
                        false
                    }
                };
                this.finalize(&mut inner);
                created
            };

            if created {
                this.refresh_comments();
            }
        });
    }

    /// Delete comment `id` from `bucket`.
    pub fn delete_comment(&self, bucket: &str, id: &str) {
        let bucket = bucket.to_owned();
        let id = id.to_owned();

        self.spawn_op(move |this| async move {
            let result = this.shared.store.delete_comment(&bucket, &id).await;

            let deleted = {
                let mut inner = this.lock();
                let deleted = match result {
                    Ok(reply) if reply.deleted => {
                        info!(%bucket, %id, "comment deleted");
                        inner.ui.message = Some(Message::success(COMMENT_DELETED));
                        true
                    }
                    Ok(reply) => {
                        error!(?reply, %bucket, %id, "comment deletion rejected by store");
                        inner.ui.message = Some(Message::danger(PROCESSING_ERROR));
                        false
                    }
                    Err(e) => {
                        error!(error = %e, %bucket, %id, "comment deletion failed");
                        inner.ui.message = Some(Message::danger(NETWORK_ERROR));
                        false
                    }
                };
                this.finalize(&mut inner);
                deleted
            };

            if deleted {
                this.refresh_comments();
            }
        });
    }

    // =========================================================================
    // PLUMBING
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn an operation, counting it as pending until its task ends.
    fn spawn_op<F, Fut>(&self, op: F)
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.shared.pending.send_modify(|n| *n += 1);
        let guard = PendingOp(Arc::clone(&self.shared));
        let fut = op(self.clone());
        tokio::spawn(async move {
            fut.await;
            drop(guard);
        });
    }

    /// Reset the submitted flag and re-arm the dismiss timer, cancelling the
    /// previous one.
    fn finalize(&self, inner: &mut Inner) {
        inner.ui.submitted = false;
        if let Some(prior) = inner.dismiss.take() {
            prior.abort();
        }

        inner.dismiss_generation += 1;
        let generation = inner.dismiss_generation;
        let this = self.clone();
        inner.dismiss = Some(tokio::spawn(async move {
            tokio::time::sleep(MESSAGE_TTL).await;
            let mut inner = this.lock();
            if inner.dismiss_generation == generation {
                inner.ui.message = None;
                inner.dismiss = None;
            }
        }));
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

fn apply_bucket_listing(inner: &mut Inner, seq: u64, target: &str, result: Result<Vec<BucketEntry>, StoreError>) {
    let latest = inner.buckets.finish(seq);
    inner.ui.loading_buckets = inner.buckets.busy();
    if !latest {
        debug!(seq, newest = inner.buckets.issued, "dropping stale bucket listing");
        return;
    }

    match result {
        Ok(entries) => {
            let buckets: Vec<Bucket> = entries.into_iter().map(|e| Bucket::new(e.index)).collect();
            inner.ui.selected_bucket = buckets.iter().find(|b| b.name == target).cloned();
            debug!(count = buckets.len(), %target, found = inner.ui.selected_bucket.is_some(), "bucket list refreshed");
            inner.ui.buckets = buckets;
        }
        Err(e) => {
            error!(error = %e, "bucket list refresh failed");
            inner.ui.message = Some(Message::danger(NETWORK_ERROR));
        }
    }
}

fn apply_comment_listing(inner: &mut Inner, seq: u64, result: Result<serde_json::Value, StoreError>) {
    let latest = inner.comments.finish(seq);
    inner.ui.loading_comments = inner.comments.busy();
    if !latest {
        debug!(seq, newest = inner.comments.issued, "dropping stale comment listing");
        return;
    }

    match result {
        Ok(payload) => {
            inner.ui.comments = parse_comment_listing(payload)
                .into_iter()
                .take(COMMENT_PAGE_SIZE)
                .map(|c| Comment { id: c.id, bucket_name: c.index, date: display_date(&c.date), body: c.body })
                .collect();
            debug!(count = inner.ui.comments.len(), "comment list refreshed");
        }
        Err(e) => {
            error!(error = %e, "comment list refresh failed");
            inner.ui.message = Some(Message::danger(NETWORK_ERROR));
        }
    }
}

fn bucket_rejection_message(name: &str, rejection: &StoreRejection) -> Message {
    if rejection.is_bucket_exists() {
        warn!(bucket = %name, "bucket already exists");
        return Message::warning(BUCKET_EXISTS_HINT);
    }

    error!(bucket = %name, kind = ?rejection.kind, reason = ?rejection.reason, "bucket creation rejected by store");
    match rejection.reason.as_deref() {
        Some(reason) if !reason.is_empty() => Message::danger(format!("{PROCESSING_ERROR} Reason: {reason}")),
        _ => Message::danger(PROCESSING_ERROR),
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
