use crate::core::configuration::Configuration;

pub const ENVIRONMENT_KEY: &str = "host:environment";

const DEVELOPMENT: &str = "development";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostEnvironment {
    name: String,
}

impl HostEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_lowercase(),
        }
    }

    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self::new(configuration.get_or(ENVIRONMENT_KEY, "production"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_development(&self) -> bool {
        self.name == DEVELOPMENT
    }
}
