// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::transform::TransformError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task '{task}' requires '{prerequisite}', which is not registered")]
    UnresolvedPrerequisite { task: String, prerequisite: String },

    #[error("Cyclic dependency: {0}")]
    CyclicDependency(String),

    #[error("Task registered twice: {0}")]
    DuplicateTask(String),

    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
