use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::{all_numeric, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub values: Vec<Value>,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VariableKind, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Builds a variable whose kind is guessed from its values.
    pub fn inferred(name: impl Into<String>, values: Vec<Value>) -> Self {
        let kind = VariableKind::infer(&values);
        Self::new(name, kind, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    #[serde(alias = "cualitativa_nominal")]
    Nominal,
    #[serde(alias = "cualitativa_ordinal")]
    Ordinal,
    #[serde(alias = "cuantitativa_discreta")]
    Discrete,
    #[serde(alias = "cuantitativa_continua")]
    Continuous,
}

impl VariableKind {
    /// Numeric data is treated as continuous, anything else as nominal.
    pub fn infer(values: &[Value]) -> Self {
        if !values.is_empty() && all_numeric(values).is_some() {
            Self::Continuous
        } else {
            Self::Nominal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Nominal => "Cualitativa nominal",
            Self::Ordinal => "Cualitativa ordinal",
            Self::Discrete => "Cuantitativa discreta",
            Self::Continuous => "Cuantitativa continua",
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nominal => write!(f, "nominal"),
            Self::Ordinal => write!(f, "ordinal"),
            Self::Discrete => write!(f, "discrete"),
            Self::Continuous => write!(f, "continuous"),
        }
    }
}

impl std::str::FromStr for VariableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nominal" | "cualitativa_nominal" => Ok(Self::Nominal),
            "ordinal" | "cualitativa_ordinal" => Ok(Self::Ordinal),
            "discrete" | "discreta" | "cuantitativa_discreta" => Ok(Self::Discrete),
            "continuous" | "continua" | "cuantitativa_continua" => Ok(Self::Continuous),
            _ => Err(format!("invalid variable kind: {s}")),
        }
    }
}
