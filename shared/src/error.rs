//! Errors raised by the pure workflow planners and the application-state reducer

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Workflow error kinds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Insufficient stock for product {product_id}: available {available}, resulting {resulting}")]
    InsufficientStock {
        product_id: Uuid,
        available: Decimal,
        resulting: Decimal,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },
}

impl WorkflowError {
    pub fn validation(field: &str, message: &str) -> Self {
        WorkflowError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        WorkflowError::NotFound(resource.to_string())
    }
}

/// Reject actors without the manager role
pub fn require_manager(actor: &crate::models::Actor) -> Result<(), WorkflowError> {
    if actor.is_manager() {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden("manager role required".to_string()))
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
