use crate::{
    db_types::{NewUser, UserId, UserProfile},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait UserManagement: Clone {
    async fn fetch_user(&self, id: &UserId) -> Result<Option<UserProfile>, StoreError>;

    /// Inserts the user, or replaces the profile fields of an existing user. Sales metrics are left untouched.
    async fn upsert_user(&self, user: NewUser) -> Result<UserProfile, StoreError>;
}
