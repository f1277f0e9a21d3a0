//! Adapter settings and the chain configuration document

use std::path::{Path, PathBuf};
use std::str::FromStr;

use json_comments::StripComments;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::DEFAULT_EXPORT_STAGE;
use crate::error::ConfigError;

/// Default location of the adapter document
pub const DOCUMENT_FILENAME: &str = "streamadapter.json";

/// Name of the appsrc element when nothing else is configured
pub const DEFAULT_APPSRC_NAME: &str = "streamadapter";

/// Optional settings file, layered under environment variables
pub const SETTINGS_FILENAME: &str = "streamadapter.toml";

/// Prefix of environment variables overriding settings, e.g. `STREAMADAPTER_APPSRC_NAME`
pub const ENV_PREFIX: &str = "STREAMADAPTER";

/// Adapter-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub document_path: PathBuf,
    /// Name of the appsrc element frames are pushed into
    pub appsrc_name: String,
    /// Chain stage whose frames are exported
    pub export_stage: String,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from(DOCUMENT_FILENAME),
            appsrc_name: DEFAULT_APPSRC_NAME.to_string(),
            export_stage: DEFAULT_EXPORT_STAGE.to_string(),
            log_filter: "streamadapter=info".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then `streamadapter.toml` if present, then `STREAMADAPTER_*` variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Path::new(SETTINGS_FILENAME), ENV_PREFIX)
    }

    pub fn load_with(settings_file: &Path, env_prefix: &str) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let settings = config::Config::builder()
            .set_default(
                "document_path",
                defaults.document_path.to_string_lossy().into_owned(),
            )?
            .set_default("appsrc_name", defaults.appsrc_name)?
            .set_default("export_stage", defaults.export_stage)?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(
                config::File::new(&settings_file.to_string_lossy(), config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix(env_prefix))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// The document handed to the chain runtime: `IFF` runtime settings and the chain list
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterDocument {
    /// `IFF` section, passed to runtime initialization verbatim
    pub runtime: Value,
    /// `chains` section, each entry passed to chain creation verbatim
    pub chains: Vec<Value>,
}

impl AdapterDocument {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        text.parse()
    }

    pub fn from_value(mut document: Value) -> Result<Self, ConfigError> {
        let chains = match document.get_mut("chains").map(Value::take) {
            None => return Err(ConfigError::MissingSection("chains")),
            Some(Value::Array(chains)) => chains,
            Some(_) => return Err(ConfigError::NotAnArray("chains")),
        };
        // Several chains can feed one sink, but only one may be configured
        if chains.len() != 1 {
            return Err(ConfigError::ChainCount(chains.len()));
        }

        let runtime = document
            .get_mut("IFF")
            .map(Value::take)
            .ok_or(ConfigError::MissingSection("IFF"))?;

        Ok(Self { runtime, chains })
    }
}

impl FromStr for AdapterDocument {
    type Err = ConfigError;

    /// Accepts `//`, `/* */` and `#` comments, which are dropped before parsing
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_value(serde_json::from_reader(StripComments::new(s.as_bytes()))?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[test]
    fn document_sections_are_extracted() {
        let document: AdapterDocument = r#"{
            "IFF": { "devices": [ { "id": "cpu_dev", "type": "cpu" } ] },
            "chains": [ { "id": "main", "elements": [] } ]
        }"#
        .parse()
        .unwrap();

        assert_eq!(document.runtime, json!({ "devices": [ { "id": "cpu_dev", "type": "cpu" } ] }));
        assert_eq!(document.chains, vec![json!({ "id": "main", "elements": [] })]);
    }

    #[test]
    fn missing_sections_are_named() {
        let err = AdapterDocument::from_value(json!({ "IFF": {} })).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection("chains")));

        let err = AdapterDocument::from_value(json!({ "chains": [{}] })).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection("IFF")));
        assert_eq!(err.to_string(), "missing `IFF` section");
    }

    #[test]
    fn chains_must_be_a_single_element_array() {
        let err = AdapterDocument::from_value(json!({ "IFF": {}, "chains": {} })).unwrap_err();
        assert!(matches!(err, ConfigError::NotAnArray("chains")));

        let err = AdapterDocument::from_value(json!({ "IFF": {}, "chains": [] })).unwrap_err();
        assert!(matches!(err, ConfigError::ChainCount(0)));

        let err =
            AdapterDocument::from_value(json!({ "IFF": {}, "chains": [{}, {}] })).unwrap_err();
        assert!(matches!(err, ConfigError::ChainCount(2)));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = "{ \"chains\": [".parse::<AdapterDocument>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn commented_document_is_accepted() {
        let document: AdapterDocument = r#"{
            // runtime settings
            "IFF": { "devices": [] /* no GPU */ },
            /*
             * exactly one chain
             */
            "chains": [ { "id": "main", "url": "http://example.com/a//b" } ] // trailing
        }"#
        .parse()
        .unwrap();

        assert_eq!(document.runtime, json!({ "devices": [] }));
        assert_eq!(
            document.chains,
            vec![json!({ "id": "main", "url": "http://example.com/a//b" })]
        );
    }

    #[test]
    fn document_is_loaded_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "IFF": {{}}, "chains": [ {{ "id": "main" }} ] }}"#).unwrap();

        let document = AdapterDocument::load(file.path()).unwrap();
        assert_eq!(document.chains.len(), 1);

        let err = AdapterDocument::load(Path::new("/nonexistent/streamadapter.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn settings_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings =
            Settings::load_with(&dir.path().join("absent.toml"), "STREAMADAPTER_TEST_NONE")
                .unwrap();
        assert_eq!(settings.appsrc_name, DEFAULT_APPSRC_NAME);
        assert_eq!(settings.export_stage, "exporter");
        assert_eq!(settings.document_path, PathBuf::from(DOCUMENT_FILENAME));
    }

    #[test]
    fn settings_file_and_environment_are_layered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streamadapter.toml");
        std::fs::write(&path, "appsrc_name = \"src0\"\nexport_stage = \"out\"\n").unwrap();

        std::env::set_var("STREAMADAPTER_TEST_LAYERED_EXPORT_STAGE", "preview");
        let settings = Settings::load_with(&path, "STREAMADAPTER_TEST_LAYERED").unwrap();
        std::env::remove_var("STREAMADAPTER_TEST_LAYERED_EXPORT_STAGE");

        assert_eq!(settings.appsrc_name, "src0");
        assert_eq!(settings.export_stage, "preview");
        assert_eq!(settings.log_filter, "streamadapter=info");
    }
}
