use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP method a form submits with. Anything other than `post` is treated as GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMethod {
    Get,
    Post,
}

impl FormMethod {
    pub fn from_attr(attr: Option<&str>) -> Self {
        match attr.map(|m| m.trim().to_lowercase()) {
            Some(m) if m == "post" => FormMethod::Post,
            _ => FormMethod::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormMethod::Get => "get",
            FormMethod::Post => "post",
        }
    }
}

impl fmt::Display for FormMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInputDescriptor {
    pub name: String,
    pub input_type: String,
    pub value: Option<String>,
}

impl FormInputDescriptor {
    pub fn new(name: impl Into<String>, input_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_type: input_type.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn is_hidden(&self) -> bool {
        self.input_type.eq_ignore_ascii_case("hidden")
    }
}

/// A `<form>` as an attacker sees it. `action_url` is always absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub page_url: String,
    pub action_url: String,
    pub method: FormMethod,
    pub inputs: Vec<FormInputDescriptor>,
    pub has_csrf_token: bool,
}

impl FormDescriptor {
    /// Distinct input names in document order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            if !names.contains(&input.name.as_str()) {
                names.push(&input.name);
            }
        }
        names
    }
}

/// A crawled page that carried at least one form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_url: String,
    pub forms: Vec<FormDescriptor>,
}

/// Raw result of one injected request, consumed right away by the analyzer.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub action_url: String,
    pub method: FormMethod,
    pub field: String,
    pub payload: String,
    pub response_body: String,
    pub status_code: u16,
}
