use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{application::VariableType, error::Error};

/// A typed key/value declaration a template needs at apply time.
/// `value` is the default; an empty default marks the parameter
/// as required.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParam {
    pub name: String,
    pub param_type: VariableType,
    pub value: String,
    pub description: String,
}

impl TemplateParam {
    pub fn string(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: VariableType::String,
            value: default.into(),
            description: String::new(),
        }
    }

    pub fn is_required(&self) -> bool {
        self.value.is_empty()
    }
}

/// Registration-time schema check: names must be non-empty and unique
/// within one template. Matching is case-sensitive throughout.
pub fn validate_params(params: &[TemplateParam]) -> Result<(), Error> {
    let mut seen = HashSet::new();

    for param in params {
        if param.name.is_empty() {
            return Err(Error::Parameter(
                "template declares a parameter with an empty name".to_string(),
            ));
        }

        if !seen.insert(param.name.as_str()) {
            return Err(Error::Parameter(format!(
                "template declares parameter '{}' more than once",
                param.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_unique_names() {
        let params = vec![
            TemplateParam::string("param1", "value1"),
            TemplateParam::string("param2", "value2"),
        ];
        assert!(validate_params(&params).is_ok());
    }

    #[test]
    fn rejects_duplicate_names() {
        let params = vec![
            TemplateParam::string("param1", "a"),
            TemplateParam::string("param1", "b"),
        ];
        assert!(matches!(validate_params(&params), Err(Error::Parameter(_))));
    }

    #[test]
    fn rejects_empty_name() {
        let params = vec![TemplateParam::string("", "a")];
        assert!(matches!(validate_params(&params), Err(Error::Parameter(_))));
    }

    #[test]
    fn duplicate_check_is_case_sensitive() {
        let params = vec![
            TemplateParam::string("repo", "a"),
            TemplateParam::string("Repo", "b"),
        ];
        assert!(validate_params(&params).is_ok());
    }
}
