//! Generic CRUD over a [`DocumentStore`] collection.
//!
//! Each backend entity (model, dataset, deployment, execution) is described
//! by a [`Resource`] that names its collection, its payload keys, and the
//! label used in error messages.

use mcp_core::envelope::now_timestamp;
use mcp_core::{Correlation, Envelope, ErrorKind, Payload, ResponseBuilder};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::store::{Document, DocumentStore};

// ---------------------------------------------------------------------------
// ResourceError
// ---------------------------------------------------------------------------

/// Failure of a backend operation, carried back as an error envelope.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ResourceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(_) => ErrorKind::InvalidPayload,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unsupported(_) => ErrorKind::UnsupportedOperation,
            Self::Storage(_) => ErrorKind::InternalError,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.kind().default_status()
    }

    #[must_use]
    pub fn to_envelope(&self, responses: &ResponseBuilder, request: &Correlation) -> Envelope {
        responses.failure(request, self.kind(), self.to_string(), self.status_code())
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// Describes one stored entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    /// Collection name in the document store.
    pub collection: &'static str,
    /// Payload key carrying one record, e.g. `model`.
    pub key: &'static str,
    /// Payload key carrying the id, e.g. `model_id`.
    pub id_field: &'static str,
    /// Capitalized name used in messages.
    pub label: &'static str,
}

pub const MODEL: Resource = Resource {
    collection: "models",
    key: "model",
    id_field: "model_id",
    label: "Model",
};

pub const DATASET: Resource = Resource {
    collection: "datasets",
    key: "dataset",
    id_field: "dataset_id",
    label: "Dataset",
};

pub const DEPLOYMENT: Resource = Resource {
    collection: "deployments",
    key: "deployment",
    id_field: "deployment_id",
    label: "Deployment",
};

pub const EXECUTION: Resource = Resource {
    collection: "executions",
    key: "execution",
    id_field: "execution_id",
    label: "Execution",
};

impl Resource {
    /// `"Model with ID m1 not found"`.
    #[must_use]
    pub fn not_found(&self, id: &str) -> ResourceError {
        ResourceError::NotFound(format!("{} with ID {id} not found", self.label))
    }

    /// The non-empty id under `id_field`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Invalid`] when the id is missing or empty.
    pub fn required_id(&self, payload: &Payload) -> Result<String, ResourceError> {
        text(payload, self.id_field)
            .map(str::to_string)
            .ok_or_else(|| ResourceError::Invalid(format!("{} ID is required", self.label)))
    }

    /// Loads a record that must exist.
    ///
    /// # Errors
    ///
    /// [`ResourceError::NotFound`] when absent, `Storage` on store failure.
    pub async fn fetch(&self, store: &dyn DocumentStore, id: &str) -> Result<Document, ResourceError> {
        store
            .get(self.collection, id)
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    /// `{<collection>: [...]}`.
    ///
    /// # Errors
    ///
    /// `Storage` on store failure.
    pub async fn list(&self, store: &dyn DocumentStore) -> Result<Payload, ResourceError> {
        let records = store.list(self.collection).await?;
        Ok(single(
            self.collection,
            Value::Array(records.into_iter().map(Value::Object).collect()),
        ))
    }

    /// `{<key>: record}` for the id in the payload.
    ///
    /// # Errors
    ///
    /// `Invalid` without an id, `NotFound` for an unknown one.
    pub async fn get(&self, store: &dyn DocumentStore, payload: &Payload) -> Result<Payload, ResourceError> {
        let id = self.required_id(payload)?;
        let record = self.fetch(store, &id).await?;
        Ok(self.wrap(record))
    }

    /// Builds a new record from `payload[key]`: assigns an id when absent and
    /// stamps `created_at`/`updated_at`. Nothing is stored yet.
    ///
    /// # Errors
    ///
    /// `Invalid` when the record is missing or empty.
    pub fn draft(&self, payload: &Payload) -> Result<(String, Document), ResourceError> {
        let mut record = payload
            .get(self.key)
            .and_then(Value::as_object)
            .filter(|record| !record.is_empty())
            .cloned()
            .ok_or_else(|| ResourceError::Invalid(format!("{} data is required", self.label)))?;

        let id = match text(&record, "id") {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                record.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        let now = now_timestamp();
        record.insert("created_at".to_string(), Value::String(now.clone()));
        record.insert("updated_at".to_string(), Value::String(now));
        Ok((id, record))
    }

    /// Stores a drafted record.
    ///
    /// # Errors
    ///
    /// `Conflict` when the id is taken.
    pub async fn insert(
        &self,
        store: &dyn DocumentStore,
        id: &str,
        record: Document,
    ) -> Result<Document, ResourceError> {
        if store.insert(self.collection, id, record.clone()).await? {
            Ok(record)
        } else {
            Err(ResourceError::Conflict(format!(
                "{} with ID {id} already exists",
                self.label
            )))
        }
    }

    /// Merges `payload[key]` (which must carry `id`) into the stored record
    /// and refreshes `updated_at`.
    ///
    /// # Errors
    ///
    /// `Invalid` without record or id, `NotFound` for an unknown id.
    pub async fn update(&self, store: &dyn DocumentStore, payload: &Payload) -> Result<Document, ResourceError> {
        let changes = payload.get(self.key).and_then(Value::as_object);
        let Some((changes, id)) = changes.and_then(|c| text(c, "id").map(|id| (c, id.to_string())))
        else {
            return Err(ResourceError::Invalid(format!(
                "{} data with ID is required",
                self.label
            )));
        };

        let mut record = self.fetch(store, &id).await?;
        record.extend(changes.clone());
        record.insert("updated_at".to_string(), Value::String(now_timestamp()));
        self.store(store, &id, record).await
    }

    /// Overwrites a record that must still exist.
    ///
    /// # Errors
    ///
    /// `NotFound` when it vanished in the meantime.
    pub async fn store(
        &self,
        store: &dyn DocumentStore,
        id: &str,
        record: Document,
    ) -> Result<Document, ResourceError> {
        if store.replace(self.collection, id, record.clone()).await? {
            Ok(record)
        } else {
            Err(self.not_found(id))
        }
    }

    /// Removes the record named in the payload and returns its id.
    ///
    /// # Errors
    ///
    /// `Invalid` without an id, `NotFound` for an unknown one.
    pub async fn delete(&self, store: &dyn DocumentStore, payload: &Payload) -> Result<String, ResourceError> {
        let id = self.required_id(payload)?;
        match store.delete(self.collection, &id).await? {
            Some(_) => Ok(id),
            None => Err(self.not_found(&id)),
        }
    }

    /// `{"message": "Model with ID m1 deleted successfully"}`.
    #[must_use]
    pub fn deleted(&self, id: &str) -> Payload {
        single(
            "message",
            Value::String(format!("{} with ID {id} deleted successfully", self.label)),
        )
    }

    /// `{<key>: record}`.
    #[must_use]
    pub fn wrap(&self, record: Document) -> Payload {
        single(self.key, Value::Object(record))
    }
}

/// Non-empty string field.
pub(crate) fn text<'a>(map: &'a Payload, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub(crate) fn single(key: &str, value: Value) -> Payload {
    let mut payload = Payload::new();
    payload.insert(key.to_string(), value);
    payload
}
