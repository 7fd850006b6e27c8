//! Request validation against a solver's declared parameters.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{ConfigKey, RequestConfig};
use crate::error::{MembraneError, Result};

/// JSON shape a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Number,
    String,
    Array,
    Object,
}

impl ParamKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamKind::Number => value.is_number(),
            ParamKind::String => value.is_string(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
        }
    }

    /// Phrase used in type errors.
    pub fn expected(&self) -> &'static str {
        match self {
            ParamKind::Number => "a number",
            ParamKind::String => "a string",
            ParamKind::Array => "an array",
            ParamKind::Object => "an object",
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Parameters and configuration keys a solver accepts.
///
/// `locale` is accepted by every solver and never listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub params: &'static [ParamSpec],
    pub config: &'static [ConfigKey],
}

impl Schema {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|spec| spec.name == name)
    }

    pub fn accepts_config(&self, key: ConfigKey) -> bool {
        key == ConfigKey::Locale || self.config.contains(&key)
    }

    /// Validate the shape of a request.
    ///
    /// Checks:
    /// - Every supplied parameter is declared
    /// - Every configuration key is accepted
    /// - Required parameters are present and not null
    /// - Present parameters have the declared JSON kind
    pub fn check(&self, params: &Map<String, Value>, config: &RequestConfig) -> Result<()> {
        if let Some(name) = params.keys().find(|name| self.param(name).is_none()) {
            return Err(MembraneError::UnknownParameter { name: name.clone() });
        }

        if let Some(key) = config.present_keys().into_iter().find(|&k| !self.accepts_config(k)) {
            return Err(MembraneError::UnsupportedConfig {
                key: key.as_str().to_string(),
            });
        }

        for spec in self.params {
            match params.get(spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(MembraneError::missing(spec.name));
                }
                None | Some(Value::Null) => {
                    log::trace!("optional parameter '{}' absent", spec.name);
                }
                Some(value) if !spec.kind.matches(value) => {
                    return Err(MembraneError::WrongType {
                        name: spec.name.to_string(),
                        expected: spec.kind.expected(),
                    });
                }
                Some(_) => log::trace!("parameter '{}' accepted", spec.name),
            }
        }

        Ok(())
    }
}
