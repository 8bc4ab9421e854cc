//! In-memory reference implementations of the three backend services.
//!
//! A [`ReferenceBackend`] answers every operation its [`Backend`] owns using
//! a [`DocumentStore`] for records and an [`ObjectStore`] for files and
//! execution results. No model is ever trained or run: executions complete
//! immediately with an empty result set.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mcp_core::envelope::now_timestamp;
use mcp_core::operations as ops;
use mcp_core::{Correlation, Envelope, ErrorKind, Payload, ResponseBuilder};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::resource::{
    single, text, Resource, ResourceError, DATASET, DEPLOYMENT, EXECUTION, MODEL,
};
use super::store::{Document, DocumentStore, MemoryDocumentStore, MemoryObjectStore, ObjectStore};
use crate::service::Backend;

const ACTIVE_EXECUTION_STATES: [&str; 2] = ["pending", "running"];

pub struct ReferenceBackend {
    backend: Backend,
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    responses: ResponseBuilder,
}

impl std::fmt::Debug for ReferenceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceBackend")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl ReferenceBackend {
    #[must_use]
    pub fn new(
        backend: Backend,
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            backend,
            documents,
            objects,
            responses: ResponseBuilder::new(backend.party()),
        }
    }

    /// Backend with fresh in-memory stores.
    #[must_use]
    pub fn in_memory(backend: Backend) -> Self {
        Self::new(
            backend,
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryObjectStore::new()),
        )
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Decodes a raw message and answers it.
    pub async fn process(&self, raw: Value) -> Envelope {
        match Envelope::decode(raw.clone()) {
            Ok(envelope) => self.handle(&envelope).await,
            Err(e) => self.responses.failure(
                &Correlation::from_raw(&raw),
                ErrorKind::InvalidMessage,
                format!("Invalid MCP message format: {e}"),
                ErrorKind::InvalidMessage.default_status(),
            ),
        }
    }

    /// Answers one request envelope. Failures come back as error envelopes.
    pub async fn handle(&self, request: &Envelope) -> Envelope {
        let correlation = request.correlation();
        info!(backend = %self.backend, operation = %request.operation, "handling operation");

        match self.execute(&request.operation, &request.payload).await {
            Ok(payload) => self.responses.success(&correlation, payload),
            Err(err) => {
                warn!(
                    backend = %self.backend,
                    operation = %request.operation,
                    status = err.status_code(),
                    error = %err,
                    "operation failed"
                );
                err.to_envelope(&self.responses, &correlation)
            }
        }
    }

    async fn execute(&self, operation: &str, payload: &Payload) -> Result<Payload, ResourceError> {
        let docs = self.documents.as_ref();
        match (self.backend, operation) {
            (Backend::Model, ops::LIST_MODELS) => MODEL.list(docs).await,
            (Backend::Model, ops::GET_MODEL) => MODEL.get(docs, payload).await,
            (Backend::Model, ops::CREATE_MODEL) => self.create(MODEL, payload).await,
            (Backend::Model, ops::UPDATE_MODEL) => Ok(MODEL.wrap(MODEL.update(docs, payload).await?)),
            (Backend::Model, ops::DELETE_MODEL) => self.delete_with_files(MODEL, payload).await,
            (Backend::Model, ops::UPLOAD_MODEL_FILE) => self.upload(MODEL, payload).await,
            (Backend::Model, ops::DOWNLOAD_MODEL_FILE) => self.download(MODEL, payload).await,

            (Backend::Data, ops::LIST_DATASETS) => DATASET.list(docs).await,
            (Backend::Data, ops::GET_DATASET) => DATASET.get(docs, payload).await,
            (Backend::Data, ops::CREATE_DATASET) => self.create(DATASET, payload).await,
            (Backend::Data, ops::UPDATE_DATASET) => {
                Ok(DATASET.wrap(DATASET.update(docs, payload).await?))
            }
            (Backend::Data, ops::DELETE_DATASET) => self.delete_with_files(DATASET, payload).await,
            (Backend::Data, ops::UPLOAD_DATA) => self.upload(DATASET, payload).await,
            (Backend::Data, ops::DOWNLOAD_DATA) => self.download(DATASET, payload).await,

            (Backend::Execution, ops::LIST_DEPLOYMENTS) => DEPLOYMENT.list(docs).await,
            (Backend::Execution, ops::GET_DEPLOYMENT) => DEPLOYMENT.get(docs, payload).await,
            (Backend::Execution, ops::CREATE_DEPLOYMENT) => self.create_deployment(payload).await,
            (Backend::Execution, ops::UPDATE_DEPLOYMENT) => {
                Ok(DEPLOYMENT.wrap(DEPLOYMENT.update(docs, payload).await?))
            }
            (Backend::Execution, ops::DELETE_DEPLOYMENT) => self.delete_deployment(payload).await,
            (Backend::Execution, ops::LIST_EXECUTIONS) => self.list_executions(payload).await,
            (Backend::Execution, ops::GET_EXECUTION) => EXECUTION.get(docs, payload).await,
            (Backend::Execution, ops::CREATE_EXECUTION) => self.create_execution(payload).await,
            (Backend::Execution, ops::CANCEL_EXECUTION) => self.cancel_execution(payload).await,
            (Backend::Execution, ops::GET_EXECUTION_RESULTS) => {
                self.execution_results(payload).await
            }

            // transform_data included: no transformation engine here.
            _ => Err(ResourceError::Unsupported(operation.to_string())),
        }
    }

    async fn create(&self, resource: Resource, payload: &Payload) -> Result<Payload, ResourceError> {
        let (id, record) = resource.draft(payload)?;
        let record = resource.insert(self.documents.as_ref(), &id, record).await?;
        info!(backend = %self.backend, id = %id, "{} created", resource.key);
        Ok(resource.wrap(record))
    }

    /// Deletes the record and every object stored under `{id}/`.
    async fn delete_with_files(&self, resource: Resource, payload: &Payload) -> Result<Payload, ResourceError> {
        let id = resource.delete(self.documents.as_ref(), payload).await?;

        match self.objects.list(&format!("{id}/")).await {
            Ok(keys) => {
                for key in keys {
                    if let Err(e) = self.objects.delete(&key).await {
                        warn!(key = %key, error = %e, "could not delete stored file");
                    }
                }
            }
            Err(e) => warn!(id = %id, error = %e, "could not list stored files"),
        }
        Ok(resource.deleted(&id))
    }

    async fn upload(&self, resource: Resource, payload: &Payload) -> Result<Payload, ResourceError> {
        let (Some(id), Some(content), Some(file_name)) = (
            text(payload, resource.id_field),
            text(payload, "file_content"),
            text(payload, "file_name"),
        ) else {
            return Err(ResourceError::Invalid(format!(
                "{} ID, file content, and file name are required",
                resource.label
            )));
        };
        let content_type = text(payload, "content_type").unwrap_or("application/octet-stream");

        let mut record = resource.fetch(self.documents.as_ref(), id).await?;
        let bytes = STANDARD
            .decode(content)
            .map_err(|e| ResourceError::Invalid(format!("file_content is not valid base64: {e}")))?;
        let file_size = bytes.len();
        let file_path = format!("{id}/{file_name}");
        self.objects.put(&file_path, bytes).await?;

        record.insert("has_file".to_string(), Value::Bool(true));
        record.insert("file_name".to_string(), json!(file_name));
        record.insert("file_path".to_string(), json!(file_path));
        record.insert("file_size".to_string(), json!(file_size));
        record.insert("content_type".to_string(), json!(content_type));
        record.insert("updated_at".to_string(), json!(now_timestamp()));
        resource.store(self.documents.as_ref(), id, record).await?;

        info!(path = %file_path, size = file_size, "file stored");
        let mut result = single(
            "message",
            json!(format!(
                "File {file_name} uploaded successfully for {} {id}",
                resource.key
            )),
        );
        result.insert("file_path".to_string(), json!(file_path));
        Ok(result)
    }

    async fn download(&self, resource: Resource, payload: &Payload) -> Result<Payload, ResourceError> {
        let id = resource.required_id(payload)?;
        let record = resource.fetch(self.documents.as_ref(), &id).await?;

        let file_path = record
            .get("has_file")
            .and_then(Value::as_bool)
            .unwrap_or(false)
            .then(|| text(&record, "file_path"))
            .flatten()
            .ok_or_else(|| {
                ResourceError::NotFound(format!(
                    "{} with ID {id} has no associated file",
                    resource.label
                ))
            })?;
        let bytes = self
            .objects
            .get(file_path)
            .await?
            .ok_or_else(|| ResourceError::NotFound(format!("File {file_path} not found in storage")))?;

        let mut result = single(resource.id_field, json!(id));
        for field in ["file_name", "content_type", "file_size"] {
            result.insert(
                field.to_string(),
                record.get(field).cloned().unwrap_or(Value::Null),
            );
        }
        result.insert("file_content".to_string(), json!(STANDARD.encode(bytes)));
        Ok(result)
    }

    async fn create_deployment(&self, payload: &Payload) -> Result<Payload, ResourceError> {
        let (id, mut record) = DEPLOYMENT.draft(payload)?;
        if text(&record, "model_id").is_none() {
            return Err(ResourceError::Invalid(
                "Model ID is required for deployment".to_string(),
            ));
        }
        record
            .entry("status")
            .or_insert_with(|| json!("inactive"));

        let record = DEPLOYMENT.insert(self.documents.as_ref(), &id, record).await?;
        info!(id = %id, "deployment created");
        Ok(DEPLOYMENT.wrap(record))
    }

    /// Refuses while any execution of the deployment is pending or running.
    async fn delete_deployment(&self, payload: &Payload) -> Result<Payload, ResourceError> {
        let id = DEPLOYMENT.required_id(payload)?;
        DEPLOYMENT.fetch(self.documents.as_ref(), &id).await?;

        let busy = self
            .executions()
            .await?
            .iter()
            .any(|e| text(e, "deployment_id") == Some(id.as_str()) && is_active(e));
        if busy {
            return Err(ResourceError::Conflict(
                "Cannot delete deployment with active executions. Cancel executions first."
                    .to_string(),
            ));
        }

        let id = DEPLOYMENT.delete(self.documents.as_ref(), payload).await?;
        Ok(DEPLOYMENT.deleted(&id))
    }

    /// Optional `deployment_id` and `status` filters.
    async fn list_executions(&self, payload: &Payload) -> Result<Payload, ResourceError> {
        let deployment = text(payload, "deployment_id");
        let status = text(payload, "status");
        let executions: Vec<Value> = self
            .executions()
            .await?
            .into_iter()
            .filter(|e| deployment.is_none_or(|d| text(e, "deployment_id") == Some(d)))
            .filter(|e| status.is_none_or(|s| text(e, "status") == Some(s)))
            .map(Value::Object)
            .collect();
        Ok(single("executions", Value::Array(executions)))
    }

    /// Records the execution against an active deployment and completes it
    /// at once, storing an empty result set at `{id}/results.json`.
    async fn create_execution(&self, payload: &Payload) -> Result<Payload, ResourceError> {
        let docs = self.documents.as_ref();
        let (id, mut record) = EXECUTION.draft(payload)?;
        let deployment_id = text(&record, "deployment_id")
            .map(str::to_string)
            .ok_or_else(|| {
                ResourceError::Invalid("Deployment ID is required for execution".to_string())
            })?;
        let deployment = DEPLOYMENT.fetch(docs, &deployment_id).await?;
        if text(&deployment, "status") != Some("active") {
            return Err(ResourceError::Invalid(format!(
                "Deployment with ID {deployment_id} is not active"
            )));
        }

        let started_at = now_timestamp();
        record.insert(
            "model_id".to_string(),
            deployment.get("model_id").cloned().unwrap_or(Value::Null),
        );
        record.insert(
            "model_name".to_string(),
            json!(text(&deployment, "model_name").unwrap_or("Unknown Model")),
        );
        record.insert(
            "deployment_name".to_string(),
            json!(text(&deployment, "name").unwrap_or("Unknown Deployment")),
        );
        record.insert("status".to_string(), json!("pending"));
        record.insert("started_at".to_string(), json!(started_at));
        let mut record = EXECUTION.insert(docs, &id, record).await?;

        let result_path = format!("{id}/results.json");
        let results = json!({"execution_id": id, "results": {}});
        let stored = match serde_json::to_vec(&results) {
            Ok(bytes) => self.objects.put(&result_path, bytes).await,
            Err(e) => Err(e.into()),
        };
        let finished_at = now_timestamp();
        record.insert("updated_at".to_string(), json!(finished_at));
        if let Err(e) = stored {
            record.insert("status".to_string(), json!("failed"));
            record.insert("error".to_string(), json!(format!("Error storing results: {e}")));
            EXECUTION.store(docs, &id, record).await?;
            return Err(ResourceError::Storage(e));
        }

        record.insert("status".to_string(), json!("completed"));
        record.insert("result_path".to_string(), json!(result_path));
        record.insert("completed_at".to_string(), json!(finished_at));
        let record = EXECUTION.store(docs, &id, record).await?;
        info!(id = %id, deployment_id = %deployment_id, "execution completed");
        Ok(EXECUTION.wrap(record))
    }

    async fn cancel_execution(&self, payload: &Payload) -> Result<Payload, ResourceError> {
        let docs = self.documents.as_ref();
        let id = EXECUTION.required_id(payload)?;
        let mut record = EXECUTION.fetch(docs, &id).await?;
        if !is_active(&record) {
            let status = text(&record, "status").unwrap_or("unknown");
            return Err(ResourceError::Invalid(format!(
                "Cannot cancel execution with status '{status}'. Only pending or running executions can be cancelled."
            )));
        }

        let now = now_timestamp();
        record.insert("status".to_string(), json!("cancelled"));
        record.insert("cancelled_at".to_string(), json!(now));
        record.insert("updated_at".to_string(), json!(now));
        let record = EXECUTION.store(docs, &id, record).await?;

        let mut result = single(
            "message",
            json!(format!("Execution with ID {id} cancelled successfully")),
        );
        result.insert("execution".to_string(), Value::Object(record));
        Ok(result)
    }

    async fn execution_results(&self, payload: &Payload) -> Result<Payload, ResourceError> {
        let id = EXECUTION.required_id(payload)?;
        let record = EXECUTION.fetch(self.documents.as_ref(), &id).await?;

        let status = text(&record, "status").unwrap_or("unknown");
        if status != "completed" {
            return Err(ResourceError::Invalid(format!(
                "Execution with ID {id} is not completed. Current status: {status}"
            )));
        }
        let result_path = text(&record, "result_path").ok_or_else(|| {
            ResourceError::NotFound(format!(
                "Execution with ID {id} has no result path available"
            ))
        })?;
        let bytes = self.objects.get(result_path).await?.ok_or_else(|| {
            ResourceError::NotFound(format!("Results for execution {id} not found in storage"))
        })?;
        let stored: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ResourceError::Storage(anyhow::anyhow!("corrupt results at {result_path}: {e}")))?;

        let mut result = single("execution_id", json!(id));
        result.insert(
            "results".to_string(),
            stored.get("results").cloned().unwrap_or_else(|| json!({})),
        );
        Ok(result)
    }

    async fn executions(&self) -> Result<Vec<Document>, ResourceError> {
        Ok(self.documents.list(EXECUTION.collection).await?)
    }
}

fn is_active(execution: &Document) -> bool {
    text(execution, "status").is_some_and(|s| ACTIVE_EXECUTION_STATES.contains(&s))
}
