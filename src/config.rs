use crate::configuration::{Configuration, DEFAULT_ENDPOINT_BASE_URI};
use crate::resources::Resource;
use crate::scripts::{ClientScript, ParameterValues, ResourceScript, VersionedUri};
use crate::uri_template::is_valid_variable_name;
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Runtime configuration for the diagnostics server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub config_path: Option<PathBuf>,
    pub enable_cors: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = std::env::var("SIGHTLINE_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("failed to parse SIGHTLINE_BIND_ADDR")?;

        let config_path = std::env::var("SIGHTLINE_CONFIG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let enable_cors = std::env::var("SIGHTLINE_ENABLE_CORS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            bind_addr,
            config_path,
            enable_cors,
        })
    }

    /// Loads the diagnostics file if one is configured, otherwise the defaults.
    pub fn diagnostics(&self) -> anyhow::Result<DiagnosticsFile> {
        match &self.config_path {
            Some(path) => DiagnosticsFile::load(path),
            None => Ok(DiagnosticsFile::default()),
        }
    }
}

/// On-disk description of scripts and resources (TOML).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default = "default_base_uri")]
    pub endpoint_base_uri: String,
    #[serde(default = "default_true")]
    pub include_builtin_scripts: bool,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub scripts: Vec<ScriptEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub parameters: ParameterValues,
}

fn default_base_uri() -> String {
    DEFAULT_ENDPOINT_BASE_URI.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DiagnosticsFile {
    fn default() -> Self {
        Self {
            version: None,
            hash: None,
            endpoint_base_uri: default_base_uri(),
            include_builtin_scripts: true,
            resources: Vec::new(),
            scripts: Vec::new(),
        }
    }
}

impl DiagnosticsFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading diagnostics config {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("parsing diagnostics config {:?}", path))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Builds the immutable configuration; entries that reference a resource
    /// are validated here, unknown kinds are kept and reported at generation.
    pub fn into_configuration(self) -> anyhow::Result<Configuration> {
        let mut builder = Configuration::builder().endpoint_base_uri(self.endpoint_base_uri);
        if self.include_builtin_scripts {
            builder = builder.with_builtins();
        }
        if let Some(version) = self.version {
            builder = builder.version(version);
        }
        if let Some(hash) = self.hash {
            builder = builder.hash(hash);
        }
        for resource in self.resources {
            validate_resource(&resource)
                .with_context(|| format!("invalid resource {:?}", resource.name))?;
            builder = builder.resource(resource);
        }
        for entry in self.scripts {
            builder = builder.script(entry.into_client_script()?);
        }
        Ok(builder.build())
    }
}

fn validate_resource(resource: &Resource) -> anyhow::Result<()> {
    if resource.name.trim().is_empty() {
        bail!("resource name is empty");
    }
    for parameter in &resource.parameters {
        if !is_valid_variable_name(&parameter.name) {
            bail!(
                "parameter {:?} is not a valid uri template variable name",
                parameter.name
            );
        }
    }
    Ok(())
}

impl ScriptEntry {
    fn into_client_script(self) -> anyhow::Result<ClientScript> {
        let script = if self.kind.eq_ignore_ascii_case("dynamic") {
            let Some(resource) = self.resource else {
                bail!("dynamic script {} has no resource", self.name);
            };
            ClientScript::dynamic(
                self.order,
                ResourceScript::new(resource).with_parameters(self.parameters),
            )
        } else if self.kind.eq_ignore_ascii_case("static") {
            let Some(uri) = self.uri else {
                bail!("static script {} has no uri", self.name);
            };
            ClientScript::static_uri(self.order, VersionedUri::new(uri))
        } else {
            return Ok(ClientScript::unrecognized(self.name, self.order, self.kind));
        };
        Ok(script.named(self.name))
    }
}
