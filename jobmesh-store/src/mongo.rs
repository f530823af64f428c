//! MongoDB store implementation.
//!
//! The claim is a single `find_one_and_update`: the filter re-checks
//! `claimed: null`, so of any number of racing workers exactly one wins a
//! given record. Edge maintenance maps directly onto `$push`/`$pull`.

use bson::Bson;
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, IndexModel};
use serde::Deserialize;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::record::{JobId, JobRecord};
use crate::store::{EdgeField, JobField, Store};

/// Connection settings for [`MongoStore`].
#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Collection holding the job records.
    pub collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".into(),
            database: "jobmesh".into(),
            collection: "jobs".into(),
        }
    }
}

/// A [`Store`] backed by a MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoStore {
    collection: Collection<JobRecord>,
}

impl MongoStore {
    /// Connect and bind to the configured collection.
    pub async fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        tracing::debug!(uri = %config.uri, database = %config.database, "setting up mongo client");
        let client = mongodb::Client::with_uri_str(&config.uri).await?;
        let collection = client
            .database(&config.database)
            .collection::<JobRecord>(&config.collection);
        Ok(Self { collection })
    }

    /// Create the indexes backing the dedup lookup and the claim filter.
    pub async fn setup_collection(&self) -> Result<(), StoreError> {
        self.collection
            .create_index(
                IndexModel::builder()
                    .keys(bson::doc! { "hash": 1 })
                    .options(Some(IndexOptions::builder().build()))
                    .build(),
                None,
            )
            .await?;

        self.collection
            .create_index(
                IndexModel::builder()
                    .keys(bson::doc! {
                        "completed": 1,
                        "claimed": 1,
                        "ready": 1,
                    })
                    .build(),
                None,
            )
            .await?;

        Ok(())
    }

    fn id_filter(id: JobId) -> bson::Document {
        bson::doc! { "_id": id.to_string() }
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn insert(&self, record: &JobRecord) -> Result<JobId, StoreError> {
        self.collection.insert_one(record, None).await?;
        Ok(record.id)
    }

    async fn find_by_id(&self, id: JobId) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.collection.find_one(Self::id_filter(id), None).await?)
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self
            .collection
            .find_one(bson::doc! { "hash": hash }, None)
            .await?)
    }

    async fn claim_one(
        &self,
        claimed_at: DateTime<Utc>,
    ) -> Result<Option<JobRecord>, StoreError> {
        Ok(self
            .collection
            .find_one_and_update(
                bson::doc! {
                    "completed": false,
                    "claimed": Bson::Null,
                    "$or": [
                        bson::doc! {
                            "trigger_ids": { "$exists": true, "$size": 0 },
                        },
                        bson::doc! {
                            "ready": true,
                            "trigger_ids": { "$exists": false },
                        },
                    ],
                },
                bson::doc! {
                    "$set": { "claimed": claimed_at.to_rfc3339() },
                },
                Some(
                    FindOneAndUpdateOptions::builder()
                        .return_document(ReturnDocument::After)
                        .build(),
                ),
            )
            .await?)
    }

    async fn set(&self, id: JobId, field: JobField) -> Result<(), StoreError> {
        let value = match &field {
            JobField::Ready(v) => Bson::Boolean(*v),
            JobField::Completed(v) => Bson::Boolean(*v),
            JobField::Result(v) => bson::to_bson(v)?,
            JobField::Exception(v) => Bson::String(v.clone()),
        };
        self.collection
            .update_one(
                Self::id_filter(id),
                bson::doc! { "$set": { field.name(): value } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn push(&self, id: JobId, field: EdgeField, ids: &[JobId]) -> Result<(), StoreError> {
        let members: Vec<Bson> = ids.iter().map(|i| Bson::String(i.to_string())).collect();
        self.collection
            .update_one(
                Self::id_filter(id),
                bson::doc! { "$push": { field.name(): { "$each": members } } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn pull(
        &self,
        id: JobId,
        field: EdgeField,
        member: JobId,
    ) -> Result<u64, StoreError> {
        let result = self
            .collection
            .update_one(
                Self::id_filter(id),
                bson::doc! { "$pull": { field.name(): member.to_string() } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }
}
