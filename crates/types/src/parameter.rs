use crate::ids::ElementId;
use serde::{Deserialize, Serialize};

/// Declared type of a report parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Array,
    SimpleArray,
    Map,
    Image,
    Sum,
    Average,
    #[serde(other)]
    None,
}

impl ParameterType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ParameterType::Number | ParameterType::Sum | ParameterType::Average)
    }

    /// Types whose values are scalars that can be parsed and formatted.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            ParameterType::String | ParameterType::Number | ParameterType::Boolean | ParameterType::Date
        )
    }
}

/// A typed parameter declaration. Array and map parameters carry their row
/// or field declarations in `children`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Parameter {
    pub id: ElementId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub array_item_type: ParameterType,
    pub eval: bool,
    pub nullable: bool,
    pub expression: String,
    pub pattern: String,
    pub children: Vec<Parameter>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<Parameter>) -> Self {
        self.children = children;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn child(&self, name: &str) -> Option<&Parameter> {
        self.children.iter().find(|p| p.name == name)
    }

    /// Parameters maintained by the engine itself rather than supplied data.
    pub fn is_internal(&self) -> bool {
        self.name == "page_count" || self.name == "page_number"
    }

    /// Parameters whose value is computed after the data has been loaded.
    pub fn is_computed(&self) -> bool {
        self.eval || matches!(self.kind, ParameterType::Sum | ParameterType::Average)
    }

    pub fn pattern_has_currency(&self) -> bool {
        self.pattern.contains('$')
    }
}
