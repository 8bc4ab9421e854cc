//! Operation names understood by the hub and the backends.
//!
//! Operation names are the sole routing key. They are grouped by the service
//! that owns them; composite names are handled by the hub itself.

// Model service
pub const LIST_MODELS: &str = "list_models";
pub const GET_MODEL: &str = "get_model";
pub const CREATE_MODEL: &str = "create_model";
pub const UPDATE_MODEL: &str = "update_model";
pub const DELETE_MODEL: &str = "delete_model";
pub const UPLOAD_MODEL_FILE: &str = "upload_model_file";
pub const DOWNLOAD_MODEL_FILE: &str = "download_model_file";

// Data service
pub const LIST_DATASETS: &str = "list_datasets";
pub const GET_DATASET: &str = "get_dataset";
pub const CREATE_DATASET: &str = "create_dataset";
pub const UPDATE_DATASET: &str = "update_dataset";
pub const DELETE_DATASET: &str = "delete_dataset";
pub const UPLOAD_DATA: &str = "upload_data";
pub const DOWNLOAD_DATA: &str = "download_data";
pub const TRANSFORM_DATA: &str = "transform_data";

// Execution service
pub const LIST_DEPLOYMENTS: &str = "list_deployments";
pub const GET_DEPLOYMENT: &str = "get_deployment";
pub const CREATE_DEPLOYMENT: &str = "create_deployment";
pub const UPDATE_DEPLOYMENT: &str = "update_deployment";
pub const DELETE_DEPLOYMENT: &str = "delete_deployment";
pub const LIST_EXECUTIONS: &str = "list_executions";
pub const GET_EXECUTION: &str = "get_execution";
pub const CREATE_EXECUTION: &str = "create_execution";
pub const CANCEL_EXECUTION: &str = "cancel_execution";
pub const GET_EXECUTION_RESULTS: &str = "get_execution_results";

// Hub-local composites
pub const CHAIN_OPERATIONS: &str = "chain_operations";
pub const VALIDATE_AND_EXECUTE: &str = "validate_and_execute";
pub const ROUTE_REQUEST: &str = "route_request";
pub const PARALLEL_EXECUTE: &str = "parallel_execute";
pub const ORCHESTRATE_TASK: &str = "orchestrate_task";
pub const EVALUATE_AND_OPTIMIZE: &str = "evaluate_and_optimize";

pub const MODEL_OPERATIONS: [&str; 7] = [
    LIST_MODELS,
    GET_MODEL,
    CREATE_MODEL,
    UPDATE_MODEL,
    DELETE_MODEL,
    UPLOAD_MODEL_FILE,
    DOWNLOAD_MODEL_FILE,
];

pub const DATA_OPERATIONS: [&str; 8] = [
    LIST_DATASETS,
    GET_DATASET,
    CREATE_DATASET,
    UPDATE_DATASET,
    DELETE_DATASET,
    UPLOAD_DATA,
    DOWNLOAD_DATA,
    TRANSFORM_DATA,
];

pub const EXECUTION_OPERATIONS: [&str; 10] = [
    LIST_DEPLOYMENTS,
    GET_DEPLOYMENT,
    CREATE_DEPLOYMENT,
    UPDATE_DEPLOYMENT,
    DELETE_DEPLOYMENT,
    LIST_EXECUTIONS,
    GET_EXECUTION,
    CREATE_EXECUTION,
    CANCEL_EXECUTION,
    GET_EXECUTION_RESULTS,
];

pub const COMPOSITE_OPERATIONS: [&str; 6] = [
    CHAIN_OPERATIONS,
    VALIDATE_AND_EXECUTE,
    ROUTE_REQUEST,
    PARALLEL_EXECUTE,
    ORCHESTRATE_TASK,
    EVALUATE_AND_OPTIMIZE,
];
