//! Generates the `<script>` tags that wire a server-rendered page to the
//! diagnostics resources of one request.

pub mod config;
pub mod configuration;
pub mod encoder;
pub mod endpoint;
pub mod generator;
pub mod inject;
pub mod logging;
pub mod resources;
pub mod scripts;
pub mod server;
pub mod uri_template;

pub use configuration::{Configuration, ConfigurationBuilder};
pub use generator::ScriptTagGenerator;
pub use scripts::{
    ClientScript, DynamicClientScript, ParameterValues, ScriptError, ScriptKind, ScriptOrder,
    StaticClientScript,
};
