use crate::core::error_modular::ModularError;
use config::{Config, Environment, Source, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "json-config")]
use config::{File, FileFormat};

/// Flat key/value configuration handed to modules during the capabilities phase.
///
/// Keys are case-insensitive `section:key` paths, e.g. `smtp:host`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

impl From<BTreeMap<String, String>> for Configuration {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self::from_pairs(values)
    }
}

impl From<Configuration> for BTreeMap<String, String> {
    fn from(configuration: Configuration) -> Self {
        configuration.values
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(key, value)| (normalize_key(key.as_ref()), value.into()))
            .collect();
        Self { values }
    }

    /// Flattens every source loaded into `config` into `section:key` entries.
    /// Arrays become indexed keys (`modules:0`, `modules:1`, ...).
    pub fn from_config(config: Config) -> Result<Self, ModularError> {
        let root = config
            .collect()
            .map_err(|err| ModularError::InvalidConfiguration(err.to_string()))?;

        let mut values = BTreeMap::new();
        for (key, value) in root {
            flatten_value(&normalize_key(&key), value, &mut values);
        }
        Ok(Self { values })
    }

    /// Reads every environment variable starting with `prefix`; `__` separates sections.
    pub fn from_env(prefix: &str) -> Result<Self, ModularError> {
        let environment = match prefix.trim_end_matches('_') {
            "" => Environment::default(),
            prefix => Environment::with_prefix(prefix).prefix_separator("_"),
        };

        let config = Config::builder()
            .add_source(environment.separator("__"))
            .build()
            .map_err(|err| ModularError::InvalidConfiguration(err.to_string()))?;
        Self::from_config(config)
    }

    #[cfg(feature = "json-config")]
    pub fn from_json_str(json: &str) -> Result<Self, ModularError> {
        let config = Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()
            .map_err(|err| ModularError::InvalidConfiguration(err.to_string()))?;
        Self::from_config(config)
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    /// Layers `other` on top of `self`; keys present in both take `other`'s value.
    pub fn merge(mut self, other: Configuration) -> Self {
        self.values.extend(other.values);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ModularError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };

        match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ModularError::InvalidConfiguration(format!(
                "'{}' is not a boolean: '{}'",
                key, raw
            ))),
        }
    }

    /// Either a comma separated value under `key`, or indexed entries `key:0`, `key:1`, ...
    pub fn get_list(&self, key: &str) -> Vec<String> {
        if let Some(raw) = self.get(key) {
            return raw
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect();
        }

        let mut indexed: Vec<(usize, String)> = self
            .section(key)
            .values
            .into_iter()
            .filter_map(|(index, value)| index.parse::<usize>().ok().map(|index| (index, value)))
            .collect();
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, value)| value).collect()
    }

    pub fn section(&self, prefix: &str) -> Configuration {
        let prefix = format!("{}:", normalize_key(prefix));
        let values = self
            .values
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .map(|rest| (rest.to_string(), value.clone()))
            })
            .collect();
        Self { values }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn flatten_value(key: &str, value: Value, out: &mut BTreeMap<String, String>) {
    let join = |segment: &str| format!("{}:{}", key, normalize_key(segment));

    match value.kind {
        ValueKind::Table(table) => {
            for (segment, nested) in table {
                flatten_value(&join(&segment), nested, out);
            }
        }
        ValueKind::Array(items) => {
            for (index, nested) in items.into_iter().enumerate() {
                flatten_value(&join(&index.to_string()), nested, out);
            }
        }
        ValueKind::Nil => {}
        scalar => {
            out.insert(key.to_string(), scalar.to_string());
        }
    }
}
