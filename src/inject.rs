use kuchiki::traits::*;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("html manipulation failed: {0}")]
    Html(String),
}

/// Appends the generated tag fragment as the last children of `<body>`.
pub fn inject_tags(html: String, fragment: &str) -> Result<String, InjectError> {
    if fragment.is_empty() {
        return Ok(html);
    }

    let document = kuchiki::parse_html().one(html);
    let body = document
        .select_first("body")
        .map_err(|_| InjectError::Html("document has no body".to_string()))?;

    // Parse fragment wrapped to ensure valid HTML structure
    let wrapper_html =
        format!("<html><body><div id=\"__sightline_wrapper\">{fragment}</div></body></html>");
    let fragment_doc = kuchiki::parse_html().one(wrapper_html);
    let wrapper = fragment_doc
        .select_first("#__sightline_wrapper")
        .map_err(|_| InjectError::Html("select wrapper failed".to_string()))?;

    let children: Vec<_> = wrapper.as_node().children().collect();
    debug!(nodes = children.len(), "injecting diagnostic tags");
    for child in children {
        body.as_node().append(child);
    }

    Ok(document.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: &str = "<script type='text/javascript' src='/diag?n=a&amp;requestId=1'></script>";

    #[test]
    fn appends_tags_at_end_of_body() {
        let html = "<html><head><title>t</title></head><body><main>page</main></body></html>";
        let injected = inject_tags(html.to_string(), TAG).unwrap();
        let main = injected.find("<main>page</main>").unwrap();
        let script = injected
            .find(r#"src="/diag?n=a&amp;requestId=1""#)
            .unwrap();
        let body_end = injected.find("</body>").unwrap();
        assert!(main < script && script < body_end);
        assert!(!injected.contains("__sightline_wrapper"));

        let document = kuchiki::parse_html().one(injected);
        let node = document.select_first("body > script").unwrap();
        let attrs = node.attributes.borrow();
        assert_eq!(attrs.get("type"), Some("text/javascript"));
        assert_eq!(attrs.get("src"), Some("/diag?n=a&requestId=1"));
    }

    #[test]
    fn bare_markup_still_gets_a_body() {
        let injected = inject_tags("<p>hi</p>".to_string(), TAG).unwrap();
        assert!(injected.contains("<body><p>hi</p><script"));
    }

    #[test]
    fn empty_fragment_leaves_document_untouched() {
        let html = "<p>untouched".to_string();
        assert_eq!(inject_tags(html.clone(), "").unwrap(), html);
    }
}
