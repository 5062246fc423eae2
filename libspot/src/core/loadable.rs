//! Common behavior for objects that are stored in the database and can be
//! looked up by their ID
use crate::{Database, Result};
use async_trait::async_trait;

#[async_trait]
pub trait Loadable: Sized {
    type Id: Send + Sync;

    fn id(&self) -> &Self::Id;

    /// Load the object with the given id from the database
    async fn load(id: &Self::Id, db: &Database) -> Result<Self>;

    /// Remove the object with the given id from the database and return the
    /// state it had just before it was removed
    async fn delete_id(id: &Self::Id, db: &Database) -> Result<Self>;

    /// Remove this object from the database
    async fn delete(&self, db: &Database) -> Result<Self> {
        Self::delete_id(self.id(), db).await
    }
}
