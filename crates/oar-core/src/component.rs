use std::fmt;
use std::str::FromStr;

use crate::error::UnknownComponentGroup;

/// A component group under `components` in an OpenAPI 3 document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentGroup {
    Schemas,
    Responses,
    Parameters,
    Examples,
    Headers,
    RequestBodies,
    Links,
    Callbacks,
    SecuritySchemes,
}

impl ComponentGroup {
    /// Every group, in the order they are processed.
    pub const ALL: [ComponentGroup; 9] = [
        ComponentGroup::Schemas,
        ComponentGroup::Responses,
        ComponentGroup::Parameters,
        ComponentGroup::Examples,
        ComponentGroup::Headers,
        ComponentGroup::RequestBodies,
        ComponentGroup::Links,
        ComponentGroup::Callbacks,
        ComponentGroup::SecuritySchemes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentGroup::Schemas => "schemas",
            ComponentGroup::Responses => "responses",
            ComponentGroup::Parameters => "parameters",
            ComponentGroup::Examples => "examples",
            ComponentGroup::Headers => "headers",
            ComponentGroup::RequestBodies => "requestBodies",
            ComponentGroup::Links => "links",
            ComponentGroup::Callbacks => "callbacks",
            ComponentGroup::SecuritySchemes => "securitySchemes",
        }
    }

    /// Whether the entrypoint drops its inline copy once a component is written
    /// to its own file. Security schemes stay listed in the entrypoint as
    /// pointers because security requirements name them from there.
    pub fn is_externalized(&self) -> bool {
        !matches!(self, ComponentGroup::SecuritySchemes)
    }
}

impl fmt::Display for ComponentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentGroup {
    type Err = UnknownComponentGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == s)
            .ok_or_else(|| UnknownComponentGroup(s.to_string()))
    }
}

/// HTTP method keys of a path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }
}
