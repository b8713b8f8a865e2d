//! Resource routing by URI template
//!
//! Templates look like `scheme://{variable}/literal`. Each `{variable}` binds
//! exactly one `/`-separated segment of the requested URI.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use rust_mcp_sdk::schema::{
    ReadResourceContent, ReadResourceResult, Resource, ResourceTemplate, TextResourceContents,
};
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("uri template `{0}` must start with `scheme://`")]
    MissingScheme(String),
    #[error("uri template `{template}` has a malformed segment `{segment}`")]
    MalformedSegment { template: String, segment: String },
    #[error("uri template `{template}` repeats variable `{variable}`")]
    DuplicateVariable { template: String, variable: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    scheme: String,
    segments: Vec<Segment>,
    defaults: HashMap<String, String>,
}

impl UriTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let (scheme, rest) = raw
            .split_once("://")
            .filter(|(scheme, _)| !scheme.is_empty())
            .ok_or_else(|| TemplateError::MissingScheme(raw.to_string()))?;

        let mut segments = Vec::new();
        for segment in rest.split('/') {
            let parsed = match segment
                .strip_prefix('{')
                .and_then(|inner| inner.strip_suffix('}'))
            {
                Some(name) if is_variable_name(name) => {
                    if segments.contains(&Segment::Variable(name.to_string())) {
                        return Err(TemplateError::DuplicateVariable {
                            template: raw.to_string(),
                            variable: name.to_string(),
                        });
                    }
                    Segment::Variable(name.to_string())
                }
                None if !segment.contains(['{', '}']) => Segment::Literal(segment.to_string()),
                _ => {
                    return Err(TemplateError::MalformedSegment {
                        template: raw.to_string(),
                        segment: segment.to_string(),
                    })
                }
            };
            segments.push(parsed);
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: scheme.to_string(),
            segments,
            defaults: HashMap::new(),
        })
    }

    /// Value substituted when `variable` is captured as an empty segment.
    pub fn with_default(mut self, variable: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(variable.into(), value.into());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn match_uri(&self, uri: &str) -> Option<TemplateVariables> {
        let (scheme, rest) = uri.split_once("://")?;
        if scheme != self.scheme {
            return None;
        }

        let candidate = rest.split('/').collect::<Vec<_>>();
        if candidate.len() != self.segments.len() {
            return None;
        }

        let mut captures = HashMap::new();
        for (segment, value) in self.segments.iter().zip(candidate) {
            match segment {
                Segment::Literal(literal) if literal != value => return None,
                Segment::Literal(_) => {}
                Segment::Variable(name) => {
                    captures.insert(name.clone(), value.to_string());
                }
            }
        }

        Some(self.apply_defaults(captures))
    }

    fn apply_defaults(&self, mut captures: HashMap<String, String>) -> TemplateVariables {
        for (name, fallback) in &self.defaults {
            if let Some(value) = captures.get_mut(name).filter(|value| value.is_empty()) {
                *value = fallback.clone();
            }
        }
        TemplateVariables(captures)
    }
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '_')
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVariables(HashMap<String, String>);

impl TemplateVariables {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceContent {
    pub uri: String,
    pub text: String,
    pub mime_type: Option<String>,
}

impl ResourceContent {
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            text: text.into(),
            mime_type: None,
        }
    }
}

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(
        &self,
        uri: &str,
        variables: &TemplateVariables,
    ) -> Result<Vec<ResourceContent>, AppError>;

    /// `None` means the template cannot be enumerated.
    async fn list(&self) -> Option<Vec<Resource>> {
        None
    }
}

struct RegisteredResource {
    template: UriTemplate,
    descriptor: ResourceTemplate,
    handler: Arc<dyn ResourceHandler>,
}

#[derive(Default)]
pub struct ResourceRouter {
    resources: Vec<RegisteredResource>,
}

impl ResourceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-registering a name replaces the earlier entry in place. The listed
    /// `uriTemplate` is always the pattern that is matched.
    pub fn register(
        &mut self,
        template: UriTemplate,
        mut descriptor: ResourceTemplate,
        handler: Arc<dyn ResourceHandler>,
    ) {
        descriptor.uri_template = template.as_str().to_string();
        let entry = RegisteredResource {
            template,
            descriptor,
            handler,
        };

        match self
            .resources
            .iter_mut()
            .find(|resource| resource.descriptor.name == entry.descriptor.name)
        {
            Some(existing) => *existing = entry,
            None => self.resources.push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub async fn resolve(&self, uri: &str) -> Result<ReadResourceResult, AppError> {
        let (resource, variables) = self
            .resources
            .iter()
            .find_map(|resource| {
                resource
                    .template
                    .match_uri(uri)
                    .map(|variables| (resource, variables))
            })
            .ok_or_else(|| AppError::resource_not_found(uri))?;

        debug!(resource = %resource.descriptor.name, uri = %uri, "resolving resource");
        let contents = resource.handler.read(uri, &variables).await?;
        if contents.is_empty() {
            return Err(AppError::handler(format!(
                "resource `{}` produced no contents",
                resource.descriptor.name
            )));
        }

        Ok(ReadResourceResult {
            contents: contents
                .into_iter()
                .map(|content| {
                    ReadResourceContent::from(TextResourceContents {
                        meta: None,
                        mime_type: content
                            .mime_type
                            .or_else(|| resource.descriptor.mime_type.clone()),
                        text: content.text,
                        uri: content.uri,
                    })
                })
                .collect(),
            meta: None,
        })
    }

    /// Entries for `resources/templates/list`, in registration order.
    pub fn list_templates(&self) -> Vec<ResourceTemplate> {
        self.resources
            .iter()
            .map(|resource| resource.descriptor.clone())
            .collect()
    }

    /// Concrete resources from every handler that supports enumeration.
    pub async fn list_resources(&self) -> Vec<Resource> {
        let mut listed = Vec::new();
        for resource in &self.resources {
            if let Some(items) = resource.handler.list().await {
                listed.extend(items);
            }
        }
        listed
    }
}
