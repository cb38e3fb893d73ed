use crate::{
    db_types::{CheckoutSession, NewCheckoutSession, SessionId, UserId},
    traits::StoreError,
};

/// Storage for checkout sessions.
///
/// The backend guarantees that a buyer has at most one non-terminal session.
#[allow(async_fn_in_trait)]
pub trait CheckoutSessionManagement: Clone {
    /// In a single transaction, cancels every non-terminal session of the buyer and stores the new session in
    /// `pending`.
    ///
    /// Returns the new session and the sessions that were cancelled to make room for it, so that the caller can
    /// release their reservations and payment intents. If a concurrent request wins the race for the buyer's active
    /// slot, [`StoreError::ActiveSessionExists`] is returned.
    async fn insert_session_replacing_active(
        &self,
        session: NewCheckoutSession,
    ) -> Result<(CheckoutSession, Vec<CheckoutSession>), StoreError>;

    async fn fetch_session(&self, id: &SessionId) -> Result<Option<CheckoutSession>, StoreError>;

    /// Returns the buyer's non-terminal session, if any. No expiry check is made here.
    async fn fetch_active_session(&self, buyer_id: &UserId) -> Result<Option<CheckoutSession>, StoreError>;

    /// Writes the mutable fields of `session` back to storage if, and only if, the stored version still equals
    /// `session.version`. On success the version is incremented and the stored session is returned.
    ///
    /// Returns [`StoreError::VersionConflict`] if another writer got there first.
    async fn update_session(&self, session: &CheckoutSession) -> Result<CheckoutSession, StoreError>;

    /// Every non-terminal session, oldest first.
    async fn fetch_open_sessions(&self) -> Result<Vec<CheckoutSession>, StoreError>;
}
