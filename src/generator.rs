use crate::configuration::Configuration;
use crate::resources::ResourceParameter;
use crate::scripts::{
    ClientScript, DynamicClientScript, ParameterValues, ScriptError, ScriptKind,
    StaticClientScript,
};
use crate::uri_template::UriTemplate;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

/// Turns the configured client scripts into the `<script>` tags for one request.
#[derive(Debug, Clone)]
pub struct ScriptTagGenerator {
    configuration: Arc<Configuration>,
}

impl ScriptTagGenerator {
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Builds the tag fragment for `request_id`.
    ///
    /// Scripts are emitted by ascending order, ties keeping registration
    /// order. A script that cannot be resolved is logged and left out; this
    /// never fails as a whole.
    pub fn generate(&self, request_id: Uuid) -> String {
        let mut scripts: Vec<&ClientScript> = self.configuration.client_scripts().iter().collect();
        scripts.sort_by_key(|script| script.order());

        scripts
            .into_iter()
            .filter_map(|script| self.render(script, request_id))
            .collect()
    }

    fn render(&self, script: &ClientScript, request_id: Uuid) -> Option<String> {
        let logger = self.configuration.logger();
        let resolved = match script.kind() {
            ScriptKind::Dynamic(dynamic) => {
                self.isolate(|| self.dynamic_uri(script.name(), dynamic.as_ref(), request_id))
            }
            ScriptKind::Static(fixed) => self.isolate(|| self.static_uri(fixed.as_ref())),
            ScriptKind::Unrecognized(kind) => {
                logger.warn(&format!(
                    "client script '{}' (kind '{kind}') is neither a dynamic nor a static script and will not be rendered",
                    script.name()
                ));
                return None;
            }
        };

        match resolved {
            Ok(Some(uri)) if !uri.is_empty() => Some(script_tag(&uri)),
            Ok(_) => None,
            Err(err) => {
                let flavour = match script.kind() {
                    ScriptKind::Dynamic(_) => "dynamic",
                    _ => "static",
                };
                logger.error(
                    &format!(
                        "failed to generate script tag for {flavour} client script '{}'",
                        script.name()
                    ),
                    &err,
                );
                None
            }
        }
    }

    /// Runs one script's resolution, turning a panic into an error.
    fn isolate<F>(&self, resolve: F) -> Result<Option<String>, ScriptError>
    where
        F: FnOnce() -> Result<Option<String>, ScriptError>,
    {
        panic::catch_unwind(AssertUnwindSafe(resolve))
            .unwrap_or_else(|payload| Err(ScriptError::Panicked(panic_message(payload.as_ref()))))
    }

    /// `Ok(None)` when the declared resource is not registered.
    fn dynamic_uri(
        &self,
        name: &str,
        script: &dyn DynamicClientScript,
        request_id: Uuid,
    ) -> Result<Option<String>, ScriptError> {
        let config = &self.configuration;
        let mut values = ParameterValues::new();
        values.insert(
            ResourceParameter::REQUEST_ID.to_string(),
            request_id.hyphenated().to_string(),
        );
        values.insert(
            ResourceParameter::VERSION_NUMBER.to_string(),
            config.version().to_string(),
        );
        values.insert(ResourceParameter::HASH.to_string(), config.hash().to_string());

        let resource_name = script.resource_name();
        let Some(resource) = config.resources().find(resource_name) else {
            config.logger().warn(&format!(
                "client script '{name}' requires resource '{resource_name}', which is not registered; skipping"
            ));
            return Ok(None);
        };

        let template = config
            .endpoint()
            .uri_template(resource, config.endpoint_base_uri())?;
        script.override_parameter_values(&mut values)?;

        let mut template = UriTemplate::new(template);
        template.set_parameters(values);
        let uri = template.resolve()?;
        Ok(Some(config.encoder().attribute_encode(&uri)))
    }

    fn static_uri(&self, script: &dyn StaticClientScript) -> Result<Option<String>, ScriptError> {
        let config = &self.configuration;
        let uri = script.uri(config.version())?;
        Ok(Some(config.encoder().attribute_encode(&uri)))
    }
}

fn script_tag(uri: &str) -> String {
    format!("<script type='text/javascript' src='{uri}'></script>")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
