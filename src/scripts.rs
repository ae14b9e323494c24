use crate::resources::{CLIENT_RESOURCE, METADATA_RESOURCE, REQUEST_RESOURCE, ResourceParameter};
use crate::uri_template::TemplateError;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Template parameter values handed to dynamic scripts before expansion.
pub type ParameterValues = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("uri template error: {0}")]
    Template(#[from] TemplateError),
    #[error("endpoint error: {0}")]
    Endpoint(String),
    #[error("script panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Failed(String),
}

impl ScriptError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Script resolved at generation time against a named resource.
pub trait DynamicClientScript: Send + Sync {
    fn resource_name(&self) -> &str;

    /// Adds or replaces template parameter values. The reserved
    /// `requestId`, `version` and `hash` entries are already present.
    fn override_parameter_values(&self, _values: &mut ParameterValues) -> Result<(), ScriptError> {
        Ok(())
    }

    /// Stable description of what this script requests; feeds the content hash.
    fn fingerprint(&self) -> String {
        self.resource_name().to_ascii_lowercase()
    }
}

/// Script whose URI depends only on the version string.
pub trait StaticClientScript: Send + Sync {
    fn uri(&self, version: &str) -> Result<String, ScriptError>;

    fn fingerprint(&self) -> String {
        String::new()
    }
}

/// Emission slot of a client script. Lower values are emitted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScriptOrder(pub i32);

impl ScriptOrder {
    pub const INCLUDE_BEFORE_CLIENT_INTERFACE: Self = Self(0);
    pub const CLIENT_INTERFACE: Self = Self(1);
    pub const INCLUDE_AFTER_CLIENT_INTERFACE: Self = Self(2);
    pub const INCLUDE_BEFORE_REQUEST_DATA: Self = Self(3);
    pub const REQUEST_DATA: Self = Self(4);
    pub const REQUEST_METADATA: Self = Self(5);
    pub const INCLUDE_AFTER_REQUEST_DATA: Self = Self(6);
}

impl From<i32> for ScriptOrder {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

#[derive(Clone)]
pub enum ScriptKind {
    Dynamic(Arc<dyn DynamicClientScript>),
    Static(Arc<dyn StaticClientScript>),
    /// Registered entry that supports neither capability; carries the
    /// declared kind for diagnostics.
    Unrecognized(String),
}

impl std::fmt::Debug for ScriptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptKind::Dynamic(_) => f.write_str("Dynamic"),
            ScriptKind::Static(_) => f.write_str("Static"),
            ScriptKind::Unrecognized(kind) => write!(f, "Unrecognized({kind:?})"),
        }
    }
}

/// A registered client script: identity, emission order, capability.
#[derive(Debug, Clone)]
pub struct ClientScript {
    name: String,
    order: ScriptOrder,
    kind: ScriptKind,
}

impl ClientScript {
    pub fn dynamic<S>(order: impl Into<ScriptOrder>, script: S) -> Self
    where
        S: DynamicClientScript + 'static,
    {
        Self {
            name: short_type_name::<S>().to_string(),
            order: order.into(),
            kind: ScriptKind::Dynamic(Arc::new(script)),
        }
    }

    pub fn static_uri<S>(order: impl Into<ScriptOrder>, script: S) -> Self
    where
        S: StaticClientScript + 'static,
    {
        Self {
            name: short_type_name::<S>().to_string(),
            order: order.into(),
            kind: ScriptKind::Static(Arc::new(script)),
        }
    }

    pub fn unrecognized(
        name: impl Into<String>,
        order: impl Into<ScriptOrder>,
        declared_kind: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            order: order.into(),
            kind: ScriptKind::Unrecognized(declared_kind.into()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> ScriptOrder {
        self.order
    }

    pub fn kind(&self) -> &ScriptKind {
        &self.kind
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Dynamic script bound to a resource with fixed parameter overrides.
#[derive(Debug, Clone)]
pub struct ResourceScript {
    resource: String,
    overrides: ParameterValues,
}

impl ResourceScript {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            overrides: ParameterValues::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, values: ParameterValues) -> Self {
        self.overrides.extend(values);
        self
    }
}

impl DynamicClientScript for ResourceScript {
    fn resource_name(&self) -> &str {
        &self.resource
    }

    fn override_parameter_values(&self, values: &mut ParameterValues) -> Result<(), ScriptError> {
        for (name, value) in &self.overrides {
            values.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    fn fingerprint(&self) -> String {
        let mut out = self.resource.to_ascii_lowercase();
        for (name, value) in &self.overrides {
            out.push_str(&format!("\0{name}={value}"));
        }
        out
    }
}

/// Static script whose URI may contain a literal `{version}` placeholder.
#[derive(Debug, Clone)]
pub struct VersionedUri {
    uri: String,
}

impl VersionedUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl StaticClientScript for VersionedUri {
    fn uri(&self, version: &str) -> Result<String, ScriptError> {
        Ok(self.uri.replace("{version}", version))
    }

    fn fingerprint(&self) -> String {
        self.uri.clone()
    }
}

pub const REQUEST_DATA_CALLBACK: &str = "sightline.data.initData";
pub const METADATA_CALLBACK: &str = "sightline.data.initMetadata";

/// The panel's own scripts: client bundle, request data and metadata.
pub fn builtin_scripts() -> Vec<ClientScript> {
    vec![
        ClientScript::dynamic(ScriptOrder::CLIENT_INTERFACE, ResourceScript::new(CLIENT_RESOURCE))
            .named("client"),
        ClientScript::dynamic(
            ScriptOrder::REQUEST_DATA,
            ResourceScript::new(REQUEST_RESOURCE)
                .with_parameter(ResourceParameter::CALLBACK, REQUEST_DATA_CALLBACK),
        )
        .named("request-data"),
        ClientScript::dynamic(
            ScriptOrder::REQUEST_METADATA,
            ResourceScript::new(METADATA_RESOURCE)
                .with_parameter(ResourceParameter::CALLBACK, METADATA_CALLBACK),
        )
        .named("request-metadata"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panel;

    impl StaticClientScript for Panel {
        fn uri(&self, version: &str) -> Result<String, ScriptError> {
            Ok(format!("/panel-{version}.js"))
        }
    }

    #[test]
    fn registered_scripts_default_to_type_name() {
        let script = ClientScript::static_uri(3, Panel);
        assert_eq!(script.name(), "Panel");
        assert_eq!(script.order(), ScriptOrder::INCLUDE_BEFORE_REQUEST_DATA);
        assert!(matches!(script.kind(), ScriptKind::Static(_)));

        let generic = ClientScript::dynamic(0, ResourceScript::new("r"));
        assert_eq!(generic.name(), "ResourceScript");
    }

    #[test]
    fn resource_script_overrides_win() {
        let script = ResourceScript::new("r").with_parameter("hash", "custom");
        let mut values = ParameterValues::new();
        values.insert("hash".into(), "default".into());
        values.insert("requestId".into(), "abc".into());
        script.override_parameter_values(&mut values).unwrap();
        assert_eq!(values["hash"], "custom");
        assert_eq!(values["requestId"], "abc");
    }

    #[test]
    fn versioned_uri_substitutes_version() {
        let uri = VersionedUri::new("/static/vendor-{version}.js")
            .uri("2.1")
            .unwrap();
        assert_eq!(uri, "/static/vendor-2.1.js");
    }

    #[test]
    fn builtins_are_ordered_slots() {
        let orders: Vec<_> = builtin_scripts().iter().map(ClientScript::order).collect();
        assert_eq!(
            orders,
            vec![
                ScriptOrder::CLIENT_INTERFACE,
                ScriptOrder::REQUEST_DATA,
                ScriptOrder::REQUEST_METADATA
            ]
        );
    }
}
