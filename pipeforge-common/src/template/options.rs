use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{error::Error, template::TemplateParam};

/// Read-only view passed into a template for one apply invocation.
/// Immutable for the duration of the call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplyOptions {
    application_name: String,
    project_key: String,
    parameters: BoundParams,
}

/// Parameter values resolved against a template's declared schema.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BoundParams {
    values: HashMap<String, String>,
}

impl BoundParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl ApplyOptions {
    /// Binds caller-supplied values against a declared schema.
    /// ---
    /// Every declared parameter resolves to the supplied value, or falls
    /// back to its schema default. A declared parameter with neither is
    /// a caller-visible parameter error. Supplied values for names the
    /// schema does not declare are carried through untouched, templates
    /// routinely consume ad-hoc values such as `repo`.
    pub fn bind(
        application_name: impl Into<String>,
        project_key: impl Into<String>,
        schema: &[TemplateParam],
        supplied: &HashMap<String, String>,
    ) -> Result<Self, Error> {
        let mut values: HashMap<String, String> = supplied.clone();

        for param in schema {
            if values.contains_key(&param.name) {
                continue;
            }

            if param.is_required() {
                return Err(Error::Parameter(format!(
                    "required parameter '{}' has no value",
                    param.name
                )));
            }

            values.insert(param.name.clone(), param.value.clone());
        }

        Ok(Self {
            application_name: application_name.into(),
            project_key: project_key.into(),
            parameters: BoundParams { values },
        })
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    pub fn parameters(&self) -> &BoundParams {
        &self.parameters
    }
}
