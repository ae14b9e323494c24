use serde::{Deserialize, Serialize};

/// A named parameter a resource endpoint accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceParameter {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

impl ResourceParameter {
    pub const REQUEST_ID: &'static str = "requestId";
    pub const VERSION_NUMBER: &'static str = "version";
    pub const HASH: &'static str = "hash";
    pub const CALLBACK: &'static str = "callback";
    pub const TIMESTAMP: &'static str = "stamp";

    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }

    pub fn request_id() -> Self {
        Self::required(Self::REQUEST_ID)
    }

    pub fn version_number() -> Self {
        Self::optional(Self::VERSION_NUMBER)
    }

    pub fn hash() -> Self {
        Self::required(Self::HASH)
    }

    pub fn callback() -> Self {
        Self::optional(Self::CALLBACK)
    }
}

/// Descriptor of a diagnostic endpoint; only the name and accepted
/// parameters matter for URI generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ResourceParameter>,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ResourceParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

pub const CLIENT_RESOURCE: &str = "sightline_client";
pub const REQUEST_RESOURCE: &str = "sightline_request";
pub const METADATA_RESOURCE: &str = "sightline_metadata";
pub const AJAX_RESOURCE: &str = "sightline_ajax";
pub const HISTORY_RESOURCE: &str = "sightline_history";

/// Resources the panel expects to find on every installation.
pub fn builtin_resources() -> Vec<Resource> {
    vec![
        Resource::new(CLIENT_RESOURCE).with_parameter(ResourceParameter::hash()),
        Resource::new(REQUEST_RESOURCE)
            .with_parameter(ResourceParameter::request_id())
            .with_parameter(ResourceParameter::version_number())
            .with_parameter(ResourceParameter::callback()),
        Resource::new(METADATA_RESOURCE)
            .with_parameter(ResourceParameter::hash())
            .with_parameter(ResourceParameter::version_number())
            .with_parameter(ResourceParameter::callback()),
        Resource::new(AJAX_RESOURCE)
            .with_parameter(ResourceParameter::request_id())
            .with_parameter(ResourceParameter::callback()),
        Resource::new(HISTORY_RESOURCE)
            .with_parameter(ResourceParameter::optional(ResourceParameter::TIMESTAMP))
            .with_parameter(ResourceParameter::callback()),
    ]
}

/// Ordered set of resources, looked up by name ignoring ASCII case.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalogue {
    resources: Vec<Resource>,
}

impl ResourceCatalogue {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    /// Adds `resource`, replacing an existing entry with the same name.
    pub fn insert(&mut self, resource: Resource) {
        match self.resources.iter_mut().find(|r| r.matches(&resource.name)) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn find(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.matches(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl FromIterator<Resource> for ResourceCatalogue {
    fn from_iter<T: IntoIterator<Item = Resource>>(iter: T) -> Self {
        let mut catalogue = Self::default();
        for resource in iter {
            catalogue.insert(resource);
        }
        catalogue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let catalogue: ResourceCatalogue = builtin_resources().into_iter().collect();
        let found = catalogue.find("Sightline_REQUEST").expect("resource");
        assert_eq!(found.name, REQUEST_RESOURCE);
        assert!(catalogue.find("sightline_missing").is_none());
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut catalogue = ResourceCatalogue::default();
        catalogue.insert(Resource::new("timeline"));
        catalogue.insert(Resource::new("TimeLine").with_parameter(ResourceParameter::request_id()));
        assert_eq!(catalogue.len(), 1);
        let resource = catalogue.find("timeline").unwrap();
        assert_eq!(resource.name, "TimeLine");
        assert_eq!(resource.parameters.len(), 1);
    }
}
