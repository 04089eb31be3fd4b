//! Error handling for Warden.
//!
//! This module provides:
//! - A crate-level error type with machine-readable codes
//! - HTTP status code mapping for API responses
//! - User-facing messages kept apart from internal detail
//! - Error logging with tracing integration
//! - Metrics integration for error tracking
//!
//! Policy misconfiguration (unknown permission, tenant-scoped actor without an
//! organization) always reaches clients as a generic 500; the detail only goes
//! to the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

use crate::rbac::{DenialReason, PolicyError};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

pub type Result<T> = std::result::Result<T, WardenError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes for API responses.
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authorization (1000-1099)
    NoSession,
    InsufficientRole,
    InsufficientPermission,
    OrganizationRequired,

    // Policy (1100-1199)
    UnknownPermission,
    MissingOrganizationContext,
    InvalidPermissionTable,
    InvalidRouteTable,
    InvalidRole,

    // Serialization (1300-1399)
    SerializationError,
    DeserializationError,
    InvalidJson,

    // Configuration (1400-1499)
    ConfigurationError,
    MissingConfiguration,
    InvalidConfiguration,

    // Data (1500-1599)
    RecordNotFound,

    // Internal (1900-1999)
    InternalError,
}

impl ErrorCode {
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::NoSession => 1000,
            Self::InsufficientRole => 1001,
            Self::InsufficientPermission => 1002,
            Self::OrganizationRequired => 1003,

            Self::UnknownPermission => 1100,
            Self::MissingOrganizationContext => 1101,
            Self::InvalidPermissionTable => 1102,
            Self::InvalidRouteTable => 1103,
            Self::InvalidRole => 1104,

            Self::SerializationError => 1300,
            Self::DeserializationError => 1301,
            Self::InvalidJson => 1302,

            Self::ConfigurationError => 1400,
            Self::MissingConfiguration => 1401,
            Self::InvalidConfiguration => 1402,

            Self::RecordNotFound => 1500,

            Self::InternalError => 1900,
        }
    }

    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::NoSession => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole | Self::InsufficientPermission | Self::OrganizationRequired => {
                StatusCode::FORBIDDEN
            }

            Self::InvalidRole | Self::InvalidJson => StatusCode::BAD_REQUEST,
            Self::RecordNotFound => StatusCode::NOT_FOUND,

            Self::UnknownPermission
            | Self::MissingOrganizationContext
            | Self::InvalidPermissionTable
            | Self::InvalidRouteTable
            | Self::SerializationError
            | Self::DeserializationError
            | Self::ConfigurationError
            | Self::MissingConfiguration
            | Self::InvalidConfiguration
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Code shown to clients. Server-side faults all surface as
    /// `InternalError`; the specific code stays in logs and metrics.
    pub fn public_code(&self) -> ErrorCode {
        if self.http_status().is_server_error() {
            Self::InternalError
        } else {
            *self
        }
    }

    /// Coarse grouping used in logs and metric labels.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "authorization",
            1100..=1199 => "policy",
            1300..=1399 => "serialization",
            1400..=1499 => "configuration",
            1500..=1599 => "data",
            _ => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Caller errors and policy denials
    Low,
    /// Malformed payloads
    Medium,
    /// Inconsistent policy or identity data
    High,
    /// Bugs
    Critical,
}

impl ErrorSeverity {
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::NoSession
            | ErrorCode::InsufficientRole
            | ErrorCode::InsufficientPermission
            | ErrorCode::OrganizationRequired
            | ErrorCode::InvalidRole
            | ErrorCode::RecordNotFound => Self::Low,

            ErrorCode::InvalidJson => Self::Medium,

            ErrorCode::UnknownPermission
            | ErrorCode::MissingOrganizationContext
            | ErrorCode::InvalidPermissionTable
            | ErrorCode::InvalidRouteTable
            | ErrorCode::SerializationError
            | ErrorCode::DeserializationError
            | ErrorCode::ConfigurationError
            | ErrorCode::MissingConfiguration
            | ErrorCode::InvalidConfiguration => Self::High,

            ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for Warden.
#[derive(Error, Debug)]
pub struct WardenError {
    code: ErrorCode,

    /// Safe to expose to clients
    user_message: Cow<'static, str>,

    /// For logging only
    internal_message: Option<String>,

    context: HashMap<String, serde_json::Value>,

    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for WardenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl WardenError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            context: HashMap::new(),
            source: None,
        };
        error.record_metrics();
        error
    }

    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Create an internal error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::InternalError, "An internal error occurred", message)
    }

    pub fn not_found(entity_type: &str, entity_id: impl Into<String>) -> Self {
        let entity_id = entity_id.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("{} not found: {}", entity_type, entity_id),
        )
        .with_context("entity_type", entity_type)
        .with_context("entity_id", entity_id)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::ConfigurationError,
            "Configuration error occurred",
            message,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn context(&self) -> &HashMap<String, serde_json::Value> {
        &self.context
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging & Metrics
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();
        let status = self.http_status().as_u16();

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    context = ?self.context,
                    source = ?self.source,
                    "Request failed"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    "Request could not be processed"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    "Request rejected"
                );
            }
        }
    }

    fn record_metrics(&self) {
        counter!(
            "warden_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category(),
            "severity" => format!("{:?}", self.severity()),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false for errors
    pub success: bool,
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&WardenError> for ErrorResponse {
    fn from(error: &WardenError) -> Self {
        let code = error.code.public_code();
        Self {
            success: false,
            error: ErrorInfo {
                code,
                numeric_code: code.numeric_code(),
                message: error.user_message.to_string(),
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Integration
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for WardenError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.http_status();
        let response = ErrorResponse::from(&self);

        (status, Json(response)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════════════════

impl From<DenialReason> for WardenError {
    fn from(reason: DenialReason) -> Self {
        let code = match reason {
            DenialReason::NoSession => ErrorCode::NoSession,
            DenialReason::InsufficientRole => ErrorCode::InsufficientRole,
            DenialReason::InsufficientPermission => ErrorCode::InsufficientPermission,
            DenialReason::OrganizationRequired => ErrorCode::OrganizationRequired,
        };
        Self::new(code, reason.as_str())
    }
}

impl From<PolicyError> for WardenError {
    fn from(error: PolicyError) -> Self {
        let code = match &error {
            PolicyError::UnknownPermission(_) => ErrorCode::UnknownPermission,
            PolicyError::MissingOrganizationContext { .. } => ErrorCode::MissingOrganizationContext,
            PolicyError::InvalidPermissionTable(_) => ErrorCode::InvalidPermissionTable,
            PolicyError::InvalidRouteTable(_) => ErrorCode::InvalidRouteTable,
            PolicyError::InvalidRole(_) => ErrorCode::InvalidRole,
        };

        let user_msg: Cow<'static, str> = match &error {
            PolicyError::InvalidRole(_) => error.to_string().into(),
            _ => "An internal error occurred".into(),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(error: serde_json::Error) -> Self {
        let code = if error.is_syntax() || error.is_data() {
            ErrorCode::DeserializationError
        } else if error.is_eof() {
            ErrorCode::InvalidJson
        } else {
            ErrorCode::SerializationError
        };

        Self::with_internal(code, "Failed to process JSON data", error.to_string())
            .with_source(error)
    }
}

impl From<config::ConfigError> for WardenError {
    fn from(error: config::ConfigError) -> Self {
        let (code, user_msg) = match &error {
            config::ConfigError::NotFound(_) => (
                ErrorCode::MissingConfiguration,
                "Required configuration not found",
            ),
            config::ConfigError::PathParse(_) | config::ConfigError::FileParse { .. } => (
                ErrorCode::InvalidConfiguration,
                "Configuration file is invalid",
            ),
            _ => (ErrorCode::ConfigurationError, "Configuration error occurred"),
        };

        Self::with_internal(code, user_msg, error.to_string())
    }
}

impl From<std::io::Error> for WardenError {
    fn from(error: std::io::Error) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "An internal error occurred",
            error.to_string(),
        )
        .with_source(error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
