//! Function descriptors for introspection
//!
//! Static documentation metadata (description, call signature, parameters) per
//! function name. Consumed by documentation and UI tooling only; evaluation
//! never reads it.

use serde::{Deserialize, Serialize};

/// Parameter type as advertised to tooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamType {
    /// Series expression
    SeriesList,
    /// Series expressions (variadic)
    SeriesLists,
    /// Integer
    Integer,
    /// Float
    Float,
    /// String
    String,
    /// Boolean
    Boolean,
    /// Interval string
    Interval,
    /// Aggregation (reducer) name
    AggFunc,
    /// Node index within a dotted name
    NodeOrTag,
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    /// Parameter name
    pub name: String,
    /// Advertised type
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Whether the caller must supply it
    #[serde(default)]
    pub required: bool,
    /// Whether the parameter repeats
    #[serde(default)]
    pub multiple: bool,
    /// Default value rendering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Closed set of accepted values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FunctionParam {
    /// Required parameter
    pub fn required(name: &str, param_type: ParamType) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            multiple: false,
            default: None,
            options: Vec::new(),
        }
    }

    /// Optional parameter with a default
    pub fn optional(name: &str, param_type: ParamType, default: &str) -> Self {
        Self {
            required: false,
            default: Some(default.to_string()),
            ..Self::required(name, param_type)
        }
    }

    /// Mark as repeating
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Restrict to a closed set of values
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }
}

/// Documentation for one function name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Registered name
    pub name: String,
    /// Call signature, e.g. `ewma(seriesList, alpha)`
    pub function: String,
    /// Functional group (Combine, Transform, Filter Series, ...)
    pub group: String,
    /// Prose description
    pub description: String,
    /// Declared parameters in order
    pub params: Vec<FunctionParam>,
}

impl FunctionDescriptor {
    /// Create a descriptor
    pub fn new(name: &str, function: &str, group: &str, description: &str, params: Vec<FunctionParam>) -> Self {
        Self {
            name: name.to_string(),
            function: function.to_string(),
            group: group.to_string(),
            description: description.to_string(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_serializes_param_type() {
        let d = FunctionDescriptor::new(
            "ewma",
            "ewma(seriesList, alpha)",
            "Calculate",
            "Exponentially weighted moving average",
            vec![
                FunctionParam::required("seriesList", ParamType::SeriesList),
                FunctionParam::required("alpha", ParamType::Float),
            ],
        );
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"type\":\"seriesList\""));
        assert!(json.contains("\"type\":\"float\""));
        assert!(!json.contains("options"));
    }
}
