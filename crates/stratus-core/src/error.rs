//! Shared error taxonomy for the Stratus services.
//!
//! Crate-local errors (weather source, document store, collector client)
//! convert into [`ServiceError`], which the HTTP layers turn into a status
//! code and a `{"error": ...}` envelope.

use thiserror::Error;

/// Request-level failure surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or unusable input.
    #[error("{0}")]
    Validation(String),

    /// Unknown collector or city id.
    #[error("{0}")]
    NotFound(String),

    /// Attribute outside the supported set.
    #[error("Unsupported attribute: {0}")]
    UnsupportedAttribute(String),

    /// Request conflicts with current state (duplicate city, city in use).
    #[error("{message}")]
    Conflict {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Weather source, document store or collector service call failed.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        ServiceError::Upstream(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ServiceError::Conflict {
            message: msg.into(),
            details: None,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) | ServiceError::UnsupportedAttribute(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Conflict { .. } => 409,
            ServiceError::Upstream(_) => 502,
        }
    }

    /// Build the JSON error envelope returned to clients.
    ///
    /// Conflict details are merged into the envelope when they are an object.
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({ "error": self.to_string() });
        if let ServiceError::Conflict {
            details: Some(serde_json::Value::Object(extra)),
            ..
        } = self
        {
            if let Some(map) = body.as_object_mut() {
                for (k, v) in extra {
                    map.insert(k.clone(), v.clone());
                }
            }
        }
        body
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Check STRATUS_CONFIG.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => {
                "A required setting is missing. Check your settings."
            }
        }
    }
}
