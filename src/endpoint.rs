use crate::resources::Resource;
use crate::scripts::ScriptError;
use crate::uri_template::encode_component;

/// Builds the URI template under which a resource is served.
pub trait ResourceEndpoint: Send + Sync {
    fn uri_template(&self, resource: &Resource, base_uri: &str) -> Result<String, ScriptError>;
}

/// Endpoint that addresses every resource through a single handler:
/// `{base}?n={name}&required={required}{&optional,...}`.
#[derive(Debug, Clone, Default)]
pub struct QueryStringEndpoint;

impl ResourceEndpoint for QueryStringEndpoint {
    fn uri_template(&self, resource: &Resource, base_uri: &str) -> Result<String, ScriptError> {
        if base_uri.trim().is_empty() {
            return Err(ScriptError::Endpoint(format!(
                "no endpoint base uri configured for resource {}",
                resource.name
            )));
        }
        if resource.name.is_empty() {
            return Err(ScriptError::Endpoint("resource has an empty name".to_string()));
        }

        let mut template = format!("{base_uri}?n={}", encode_component(&resource.name));
        let (required, optional): (Vec<_>, Vec<_>) =
            resource.parameters.iter().partition(|p| p.required);
        for parameter in required {
            template.push_str(&format!("&{0}={{{0}}}", parameter.name));
        }
        if !optional.is_empty() {
            let names: Vec<&str> = optional.iter().map(|p| p.name.as_str()).collect();
            template.push_str(&format!("{{&{}}}", names.join(",")));
        }
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceParameter;
    use crate::uri_template::UriTemplate;

    #[test]
    fn required_then_optional_parameters() {
        let resource = Resource::new("sightline_request")
            .with_parameter(ResourceParameter::optional("callback"))
            .with_parameter(ResourceParameter::request_id())
            .with_parameter(ResourceParameter::version_number());
        let template = QueryStringEndpoint
            .uri_template(&resource, "/_sightline/resource")
            .unwrap();
        assert_eq!(
            template,
            "/_sightline/resource?n=sightline_request&requestId={requestId}{&callback,version}"
        );
    }

    #[test]
    fn resource_without_parameters() {
        let template = QueryStringEndpoint
            .uri_template(&Resource::new("plain"), "/diag")
            .unwrap();
        assert_eq!(template, "/diag?n=plain");
    }

    #[test]
    fn resource_name_is_escaped_in_the_query() {
        let template = QueryStringEndpoint
            .uri_template(
                &Resource::new("my time&line#1").with_parameter(ResourceParameter::request_id()),
                "/diag",
            )
            .unwrap();
        assert_eq!(
            template,
            "/diag?n=my%20time%26line%231&requestId={requestId}"
        );
    }

    #[test]
    fn braces_in_resource_name_do_not_become_expressions() {
        let template = QueryStringEndpoint
            .uri_template(&Resource::new("odd{requestId}"), "/diag")
            .unwrap();
        assert_eq!(template, "/diag?n=odd%7BrequestId%7D");
        let mut resolved = UriTemplate::new(template);
        resolved.set_parameter("requestId", "abc");
        assert_eq!(resolved.resolve().unwrap(), "/diag?n=odd%7BrequestId%7D");
    }

    #[test]
    fn empty_base_uri_is_an_error() {
        let err = QueryStringEndpoint
            .uri_template(&Resource::new("plain"), "  ")
            .unwrap_err();
        assert!(matches!(err, ScriptError::Endpoint(_)));
    }
}
