//! Error types for the membrane calculation engine.
//!
//! This module provides a unified error type [`MembraneError`] that covers
//! every failure a solver or the orchestrator can report. Each variant maps
//! to one of the stable [`ErrorKind`]s of the dispatch contract, and every
//! message can be rendered in any supported [`Locale`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::Locale;

/// Result type alias using [`MembraneError`].
pub type Result<T> = std::result::Result<T, MembraneError>;

/// Stable error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Malformed or out-of-range parameter.
    InvalidInput,
    /// Missing parameter or empty input set.
    InsufficientInput,
    /// Too few (or degenerate) data points for the computation.
    InsufficientData,
    /// Mathematically undefined operation on otherwise valid inputs.
    DomainError,
}

impl ErrorKind {
    /// Stable identifier used in serialized errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::InsufficientInput => "InsufficientInput",
            ErrorKind::InsufficientData => "InsufficientData",
            ErrorKind::DomainError => "DomainError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric or structural constraint a parameter failed to meet.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    NonNegative,
    Positive,
    Finite,
    UnitInterval,
    FractionBelowOne,
    GreaterThanOne,
    NonZero,
    AtLeast(usize),
    AtMost(usize),
    Monovalent,
    Unique,
    Below(&'static str),
    NotAllZero,
    ExclusiveWith(&'static str),
}

impl Constraint {
    /// Describe the constraint in the given locale.
    pub fn describe(&self, locale: Locale) -> String {
        match locale {
            Locale::En => match self {
                Constraint::NonNegative => "must be non-negative".to_string(),
                Constraint::Positive => "must be greater than zero".to_string(),
                Constraint::Finite => "must be a finite number".to_string(),
                Constraint::UnitInterval => "must lie between 0 and 1".to_string(),
                Constraint::FractionBelowOne => "must lie in [0, 1)".to_string(),
                Constraint::GreaterThanOne => "must be greater than 1".to_string(),
                Constraint::NonZero => "must be non-zero".to_string(),
                Constraint::AtLeast(n) => format!("must be at least {}", n),
                Constraint::AtMost(n) => format!("must be at most {}", n),
                Constraint::Monovalent => {
                    "must be +1 or -1 (GHK handles monovalent ions only)".to_string()
                }
                Constraint::Unique => "must be unique".to_string(),
                Constraint::Below(other) => format!("must be below '{}'", other),
                Constraint::NotAllZero => "must not all be zero".to_string(),
                Constraint::ExclusiveWith(other) => format!("cannot be combined with '{}'", other),
            },
            Locale::Es => match self {
                Constraint::NonNegative => "no puede ser negativo".to_string(),
                Constraint::Positive => "debe ser mayor que cero".to_string(),
                Constraint::Finite => "debe ser un número finito".to_string(),
                Constraint::UnitInterval => "debe estar entre 0 y 1".to_string(),
                Constraint::FractionBelowOne => "debe estar en [0, 1)".to_string(),
                Constraint::GreaterThanOne => "debe ser mayor que 1".to_string(),
                Constraint::NonZero => "no puede ser cero".to_string(),
                Constraint::AtLeast(n) => format!("debe ser al menos {}", n),
                Constraint::AtMost(n) => format!("debe ser como máximo {}", n),
                Constraint::Monovalent => {
                    "debe ser +1 o -1 (GHK solo admite iones monovalentes)".to_string()
                }
                Constraint::Unique => "debe ser único".to_string(),
                Constraint::Below(other) => format!("debe ser menor que '{}'", other),
                Constraint::NotAllZero => "no pueden ser todos cero".to_string(),
                Constraint::ExclusiveWith(other) => format!("no se puede combinar con '{}'", other),
            },
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(Locale::En))
    }
}

/// Why a computation is mathematically undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainReason {
    /// A concentration of zero puts zero or infinity inside a logarithm.
    ZeroConcentration,
    /// The GHK numerator or denominator is zero.
    LogarithmOfZero,
    /// Membrane voltage equals the reversal potential.
    ZeroDrivingForce,
    /// A flat I-V line never crosses zero current.
    ZeroSlope,
    /// No impermeant solute outside the cell: the volume grows without bound.
    UnboundedVolume,
    /// The computation overflowed or produced NaN.
    NonFinite,
}

impl DomainReason {
    /// Describe the reason in the given locale.
    pub fn describe(&self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::En, DomainReason::ZeroConcentration) => {
                "a zero concentration makes the logarithm undefined"
            }
            (Locale::En, DomainReason::LogarithmOfZero) => {
                "the weighted concentration sum is zero, the logarithm is undefined"
            }
            (Locale::En, DomainReason::ZeroDrivingForce) => {
                "the driving force is zero, conductance is undefined"
            }
            (Locale::En, DomainReason::ZeroSlope) => {
                "the fitted conductance is zero, the reversal potential is undefined"
            }
            (Locale::En, DomainReason::UnboundedVolume) => {
                "the extracellular effective osmolarity is zero, the equilibrium volume is unbounded"
            }
            (Locale::En, DomainReason::NonFinite) => "the result is not a finite number",
            (Locale::Es, DomainReason::ZeroConcentration) => {
                "una concentración nula deja el logaritmo indefinido"
            }
            (Locale::Es, DomainReason::LogarithmOfZero) => {
                "la suma ponderada de concentraciones es cero, el logaritmo no está definido"
            }
            (Locale::Es, DomainReason::ZeroDrivingForce) => {
                "la fuerza impulsora es cero, la conductancia no está definida"
            }
            (Locale::Es, DomainReason::ZeroSlope) => {
                "la conductancia ajustada es cero, el potencial de reversión no está definido"
            }
            (Locale::Es, DomainReason::UnboundedVolume) => {
                "la osmolaridad efectiva extracelular es cero, el volumen de equilibrio no está acotado"
            }
            (Locale::Es, DomainReason::NonFinite) => "el resultado no es un número finito",
        }
    }
}

impl fmt::Display for DomainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe(Locale::En))
    }
}

/// Unified error type for all membrane_core operations.
#[derive(Error, Debug)]
pub enum MembraneError {
    // ============ Request Errors ============
    /// Solver identifier not in the registry
    #[error("Unknown solver '{id}'")]
    UnknownSolver { id: String },

    /// Parameter not declared by the solver's schema
    #[error("Unknown parameter '{name}'")]
    UnknownParameter { name: String },

    /// Configuration key the solver does not use
    #[error("Configuration key '{key}' is not accepted by this solver")]
    UnsupportedConfig { key: String },

    /// Required parameter absent
    #[error("Missing required parameter '{name}'")]
    MissingParameter { name: String },

    /// Parameter present with the wrong JSON shape
    #[error("Parameter '{name}' must be {expected}")]
    WrongType { name: String, expected: &'static str },

    /// Parameter value violates a constraint
    #[error("Invalid parameter '{param}': {constraint}")]
    InvalidParameter { param: String, constraint: Constraint },

    /// Parameter could not be decoded into its typed form
    #[error("Malformed parameter '{param}': {message}")]
    MalformedParameter { param: String, message: String },

    // ============ Data Errors ============
    /// Nothing to compute on
    #[error("No {subject} supplied")]
    EmptyInput { subject: String },

    /// Fewer data points than the computation needs
    #[error("'{subject}' needs at least {required} points, found {found}")]
    TooFewPoints {
        subject: String,
        required: usize,
        found: usize,
    },

    /// All points share the same abscissa
    #[error("All '{subject}' share the same voltage, the regression is undetermined")]
    ZeroVariance { subject: String },

    // ============ Domain Errors ============
    /// Mathematically undefined result
    #[error("Undefined result for '{subject}': {reason}")]
    Undefined { subject: String, reason: DomainReason },

    // ============ I/O Errors ============
    /// Error reading a request file
    #[error("Failed to read request file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing a result or error document
    #[error("Failed to write output: {source}")]
    WriteError {
        #[source]
        source: std::io::Error,
    },

    /// Request or result JSON could not be (de)serialized
    #[error("Malformed request JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl MembraneError {
    /// Create an invalid parameter error
    pub fn invalid(param: impl Into<String>, constraint: Constraint) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            constraint,
        }
    }

    /// Create a domain error
    pub fn undefined(subject: impl Into<String>, reason: DomainReason) -> Self {
        Self::Undefined {
            subject: subject.into(),
            reason,
        }
    }

    /// Create an empty input error
    pub fn empty(subject: impl Into<String>) -> Self {
        Self::EmptyInput {
            subject: subject.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MembraneError::UnknownSolver { .. }
            | MembraneError::UnknownParameter { .. }
            | MembraneError::UnsupportedConfig { .. }
            | MembraneError::WrongType { .. }
            | MembraneError::InvalidParameter { .. }
            | MembraneError::MalformedParameter { .. }
            | MembraneError::FileReadError { .. }
            | MembraneError::WriteError { .. }
            | MembraneError::Json(_) => ErrorKind::InvalidInput,
            MembraneError::MissingParameter { .. } | MembraneError::EmptyInput { .. } => {
                ErrorKind::InsufficientInput
            }
            MembraneError::TooFewPoints { .. } | MembraneError::ZeroVariance { .. } => {
                ErrorKind::InsufficientData
            }
            MembraneError::Undefined { .. } => ErrorKind::DomainError,
        }
    }

    /// Render the message in the given locale.
    pub fn localized(&self, locale: Locale) -> String {
        if locale == Locale::En {
            return self.to_string();
        }

        match self {
            MembraneError::UnknownSolver { id } => format!("Solver desconocido '{}'", id),
            MembraneError::UnknownParameter { name } => {
                format!("Parámetro desconocido '{}'", name)
            }
            MembraneError::UnsupportedConfig { key } => {
                format!("Este solver no acepta la opción de configuración '{}'", key)
            }
            MembraneError::MissingParameter { name } => {
                format!("Parámetro requerido faltante: '{}'", name)
            }
            MembraneError::WrongType { name, expected } => {
                format!("El parámetro '{}' debe ser {}", name, expected)
            }
            MembraneError::InvalidParameter { param, constraint } => {
                format!("Parámetro inválido '{}': {}", param, constraint.describe(locale))
            }
            MembraneError::MalformedParameter { param, message } => {
                format!("Parámetro mal formado '{}': {}", param, message)
            }
            MembraneError::EmptyInput { subject } => {
                format!("No se proporcionaron datos en '{}'", subject)
            }
            MembraneError::TooFewPoints {
                subject,
                required,
                found,
            } => format!(
                "'{}' necesita al menos {} puntos, se recibieron {}",
                subject, required, found
            ),
            MembraneError::ZeroVariance { subject } => format!(
                "Todos los puntos de '{}' tienen el mismo voltaje, la regresión no está determinada",
                subject
            ),
            MembraneError::Undefined { subject, reason } => format!(
                "Resultado indefinido para '{}': {}",
                subject,
                reason.describe(locale)
            ),
            MembraneError::FileReadError { path, source } => {
                format!("No se pudo leer el archivo de solicitud '{}': {}", path, source)
            }
            MembraneError::WriteError { source } => {
                format!("No se pudo escribir la salida: {}", source)
            }
            MembraneError::Json(e) => format!("JSON de solicitud mal formado: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            MembraneError::invalid("concentration", Constraint::NonNegative).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(MembraneError::missing("ions").kind(), ErrorKind::InsufficientInput);
        assert_eq!(
            MembraneError::ZeroVariance {
                subject: "samples".into()
            }
            .kind(),
            ErrorKind::InsufficientData
        );
        assert_eq!(
            MembraneError::undefined("Na", DomainReason::ZeroConcentration).kind(),
            ErrorKind::DomainError
        );
    }

    #[test]
    fn test_domain_message_names_subject() {
        let err = MembraneError::undefined("Na", DomainReason::ZeroConcentration);
        assert!(err.to_string().contains("'Na'"));
        assert!(err.localized(Locale::Es).contains("'Na'"));
        assert!(err.localized(Locale::Es).starts_with("Resultado indefinido"));
    }
}
