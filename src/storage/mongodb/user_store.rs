//! MongoDB UserStore implementation.

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{from_bson_dt, is_duplicate_key, to_bson_dt, USERS_COLLECTION};
use crate::domain::{Role, User};
use crate::interfaces::{Result, StorageError, UserStore};

/// User document as persisted.
#[derive(Debug, Serialize, Deserialize)]
struct UserDoc {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    created_at: mongodb::bson::DateTime,
    updated_at: mongodb::bson::DateTime,
}

impl From<&User> for UserDoc {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            password_hash: u.password_hash.clone(),
            role: u.role,
            client_id: u.client_id.clone(),
            created_at: to_bson_dt(u.created_at),
            updated_at: to_bson_dt(u.updated_at),
        }
    }
}

impl From<UserDoc> for User {
    fn from(d: UserDoc) -> Self {
        Self {
            id: d.id,
            username: d.username,
            email: d.email,
            password_hash: d.password_hash,
            role: d.role,
            client_id: d.client_id,
            created_at: from_bson_dt(d.created_at),
            updated_at: from_bson_dt(d.updated_at),
        }
    }
}

/// MongoDB implementation of UserStore.
pub struct MongoUserStore {
    users: Collection<UserDoc>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection(USERS_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        for keys in [doc! { "username": 1 }, doc! { "email": 1 }] {
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.users.create_index(index).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn create(&self, user: &User) -> Result<()> {
        self.users
            .insert_one(UserDoc::from(user))
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    StorageError::UserExists
                } else {
                    StorageError::from(e)
                }
            })?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let found = self.users.find_one(doc! { "email": email }).await?;
        found.map(User::from).ok_or(StorageError::UserNotFound)
    }
}
