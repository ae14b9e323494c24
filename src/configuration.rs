use crate::encoder::{HtmlAttributeEncoder, HtmlEncoder};
use crate::endpoint::{QueryStringEndpoint, ResourceEndpoint};
use crate::logging::{DiagnosticLogger, TracingLogger};
use crate::resources::{Resource, ResourceCatalogue, builtin_resources};
use crate::scripts::{ClientScript, ScriptKind, builtin_scripts};
use std::sync::Arc;

pub const DEFAULT_ENDPOINT_BASE_URI: &str = "/_sightline/resource";

/// Read-only view the generator works from. Built once per process.
pub struct Configuration {
    client_scripts: Vec<ClientScript>,
    resources: ResourceCatalogue,
    endpoint: Arc<dyn ResourceEndpoint>,
    endpoint_base_uri: String,
    encoder: Arc<dyn HtmlEncoder>,
    logger: Arc<dyn DiagnosticLogger>,
    version: String,
    hash: String,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    pub fn client_scripts(&self) -> &[ClientScript] {
        &self.client_scripts
    }

    pub fn resources(&self) -> &ResourceCatalogue {
        &self.resources
    }

    pub fn endpoint(&self) -> &dyn ResourceEndpoint {
        self.endpoint.as_ref()
    }

    pub fn endpoint_base_uri(&self) -> &str {
        &self.endpoint_base_uri
    }

    pub fn encoder(&self) -> &dyn HtmlEncoder {
        self.encoder.as_ref()
    }

    pub fn logger(&self) -> &dyn DiagnosticLogger {
        self.logger.as_ref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("client_scripts", &self.client_scripts)
            .field("resources", &self.resources)
            .field("endpoint_base_uri", &self.endpoint_base_uri)
            .field("version", &self.version)
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

pub struct ConfigurationBuilder {
    client_scripts: Vec<ClientScript>,
    resources: ResourceCatalogue,
    endpoint: Arc<dyn ResourceEndpoint>,
    endpoint_base_uri: String,
    encoder: Arc<dyn HtmlEncoder>,
    logger: Arc<dyn DiagnosticLogger>,
    version: String,
    hash: Option<String>,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self {
            client_scripts: Vec::new(),
            resources: ResourceCatalogue::default(),
            endpoint: Arc::new(QueryStringEndpoint),
            endpoint_base_uri: DEFAULT_ENDPOINT_BASE_URI.to_string(),
            encoder: Arc::new(HtmlAttributeEncoder),
            logger: Arc::new(TracingLogger),
            version: env!("CARGO_PKG_VERSION").to_string(),
            hash: None,
        }
    }
}

impl ConfigurationBuilder {
    /// Registers the panel's own scripts together with the resources they need.
    pub fn with_builtins(mut self) -> Self {
        for resource in builtin_resources() {
            self.resources.insert(resource);
        }
        self.client_scripts.extend(builtin_scripts());
        self
    }

    pub fn script(mut self, script: ClientScript) -> Self {
        self.client_scripts.push(script);
        self
    }

    pub fn scripts(mut self, scripts: impl IntoIterator<Item = ClientScript>) -> Self {
        self.client_scripts.extend(scripts);
        self
    }

    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.insert(resource);
        self
    }

    pub fn endpoint(mut self, endpoint: Arc<dyn ResourceEndpoint>) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn endpoint_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.endpoint_base_uri = base_uri.into();
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn HtmlEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn DiagnosticLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Pins the content hash instead of deriving it.
    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn build(self) -> Configuration {
        let hash = self
            .hash
            .unwrap_or_else(|| content_hash(&self.version, &self.resources, &self.client_scripts));
        Configuration {
            client_scripts: self.client_scripts,
            resources: self.resources,
            endpoint: self.endpoint,
            endpoint_base_uri: self.endpoint_base_uri,
            encoder: self.encoder,
            logger: self.logger,
            version: self.version,
            hash,
        }
    }
}

/// FNV-1a over the version, resources and what each script requests, so the
/// browser can cache resources until the installation changes.
fn content_hash(version: &str, resources: &ResourceCatalogue, scripts: &[ClientScript]) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut sorted: Vec<&Resource> = resources.iter().collect();
    sorted.sort_by_key(|r| r.name.to_ascii_lowercase());

    let mut hash = OFFSET;
    let mut feed = |bytes: &[u8]| {
        for b in bytes.iter().chain(std::iter::once(&0u8)) {
            hash ^= u64::from(*b);
            hash = hash.wrapping_mul(PRIME);
        }
    };
    feed(version.as_bytes());
    for resource in sorted {
        feed(resource.name.to_ascii_lowercase().as_bytes());
        for parameter in &resource.parameters {
            feed(parameter.name.as_bytes());
            feed(&[u8::from(parameter.required)]);
        }
    }
    for script in scripts {
        feed(script.name().as_bytes());
        feed(&script.order().0.to_le_bytes());
        match script.kind() {
            ScriptKind::Dynamic(dynamic) => {
                feed(b"dynamic");
                feed(dynamic.fingerprint().as_bytes());
            }
            ScriptKind::Static(fixed) => {
                feed(b"static");
                feed(fixed.fingerprint().as_bytes());
            }
            ScriptKind::Unrecognized(kind) => feed(kind.as_bytes()),
        }
    }
    format!("{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceParameter;
    use crate::scripts::{ResourceScript, ScriptOrder, VersionedUri};

    fn hash_of(script: ClientScript, resource: Resource) -> String {
        Configuration::builder()
            .version("1.0")
            .resource(resource)
            .script(script.named("entry"))
            .build()
            .hash()
            .to_string()
    }

    #[test]
    fn derived_hash_is_stable() {
        let a = Configuration::builder().with_builtins().version("1.0").build();
        let b = Configuration::builder().with_builtins().version("1.0").build();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 16);
    }

    #[test]
    fn derived_hash_tracks_scripts_and_version() {
        let base = Configuration::builder().with_builtins().version("1.0").build();
        let bumped = Configuration::builder().with_builtins().version("1.1").build();
        let extra = Configuration::builder()
            .with_builtins()
            .version("1.0")
            .script(ClientScript::static_uri(
                ScriptOrder::INCLUDE_AFTER_REQUEST_DATA,
                VersionedUri::new("/x.js"),
            ))
            .build();
        assert_ne!(base.hash(), bumped.hash());
        assert_ne!(base.hash(), extra.hash());
    }

    #[test]
    fn derived_hash_tracks_static_uri() {
        let resource = Resource::new("timeline");
        let a = hash_of(ClientScript::static_uri(0, VersionedUri::new("/a.js")), resource.clone());
        let b = hash_of(ClientScript::static_uri(0, VersionedUri::new("/b.js")), resource);
        assert_ne!(a, b);
    }

    #[test]
    fn derived_hash_tracks_dynamic_resource_and_overrides() {
        let resource = || Resource::new("timeline");
        let plain = hash_of(ClientScript::dynamic(0, ResourceScript::new("timeline")), resource());
        let other = hash_of(ClientScript::dynamic(0, ResourceScript::new("ajax")), resource());
        let overridden = hash_of(
            ClientScript::dynamic(0, ResourceScript::new("timeline").with_parameter("callback", "x")),
            resource(),
        );
        assert_ne!(plain, other);
        assert_ne!(plain, overridden);
    }

    #[test]
    fn derived_hash_tracks_resource_parameters_and_kind() {
        let script = || ClientScript::static_uri(0, VersionedUri::new("/a.js"));
        let bare = hash_of(script(), Resource::new("timeline"));
        let with_param = hash_of(
            script(),
            Resource::new("timeline").with_parameter(ResourceParameter::optional("callback")),
        );
        let required = hash_of(
            script(),
            Resource::new("timeline").with_parameter(ResourceParameter::request_id()),
        );
        let renamed = hash_of(
            script(),
            Resource::new("timeline").with_parameter(ResourceParameter::optional("requestId")),
        );
        assert_ne!(bare, with_param);
        assert_ne!(required, renamed);

        let inline = hash_of(ClientScript::unrecognized("entry", 0, "inline"), Resource::new("timeline"));
        let module = hash_of(ClientScript::unrecognized("entry", 0, "module"), Resource::new("timeline"));
        assert_ne!(inline, module);
    }

    #[test]
    fn pinned_hash_wins() {
        let config = Configuration::builder().hash("fixed").build();
        assert_eq!(config.hash(), "fixed");
        assert_eq!(config.endpoint_base_uri(), DEFAULT_ENDPOINT_BASE_URI);
        assert!(config.client_scripts().is_empty());
    }
}
