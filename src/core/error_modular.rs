use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModularError {
    #[error("ModularError: No capability registered for contract '{0}'")]
    UnregisteredContract(String),

    #[error(
        "ModularError: Invalid lifetime policy '{0}'. Expected one of 'scoped', 'singleton', 'transient'"
    )]
    InvalidLifetime(String),

    #[error("ModularError: Pipeline is frozen, steps can no longer be appended")]
    PipelineFrozen,

    #[error("ModularError: Capability registry is frozen, contract '{0}' can no longer be registered")]
    RegistryFrozen(String),

    #[error(
        "ModularError: Capability registry has not been frozen yet, contract '{0}' cannot be resolved"
    )]
    RegistryNotFrozen(String),

    #[error("ModularError: Module '{0}' failed during {1}: '{2}'")]
    ModuleContribution(String, String, String),

    #[error("ModularError: Scoped contract '{0}' cannot be resolved outside of a request scope")]
    ScopeRequired(String),

    #[error("ModularError: Circular dependency while resolving '{0}': {1}")]
    CircularDependency(String, String),

    #[error("ModularError: Cant invocation capability factory for contract '{0}' error '{1}'")]
    CapabilityFactoryFailed(String, String),

    #[error("ModularError: Incorrect instance type stored for contract '{0}'")]
    CapabilityIncorrectType(String),

    #[error(
        "ModularError: Composition has already run (state '{0}'). Composition must only be run once."
    )]
    AlreadyComposed(String),

    #[error("ModularError: Composition is not available to start (state '{0}')")]
    NotComposed(String),

    #[error("ModularError: Unknown module identifier '{0}'")]
    UnknownModule(String),

    #[error("ModularError: Module identifier '{0}' registered already")]
    ModuleAlreadyCataloged(String),

    #[error("ModularError: Invalid configuration: '{0}'")]
    InvalidConfiguration(String),

    #[error("ModularError: Request '{0}' failed: '{1}'")]
    RequestFailed(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_all_variants() {
        let cases: Vec<(ModularError, &str)> = vec![
            (
                ModularError::UnregisteredContract("dyn Notifier".into()),
                "ModularError: No capability registered for contract 'dyn Notifier'",
            ),
            (
                ModularError::InvalidLifetime("forever".into()),
                "ModularError: Invalid lifetime policy 'forever'. Expected one of 'scoped', 'singleton', 'transient'",
            ),
            (
                ModularError::PipelineFrozen,
                "ModularError: Pipeline is frozen, steps can no longer be appended",
            ),
            (
                ModularError::RegistryFrozen("dyn Notifier".into()),
                "ModularError: Capability registry is frozen, contract 'dyn Notifier' can no longer be registered",
            ),
            (
                ModularError::RegistryNotFrozen("dyn Notifier".into()),
                "ModularError: Capability registry has not been frozen yet, contract 'dyn Notifier' cannot be resolved",
            ),
            (
                ModularError::ModuleContribution(
                    "SmtpModule".into(),
                    "capabilities phase".into(),
                    "boom".into(),
                ),
                "ModularError: Module 'SmtpModule' failed during capabilities phase: 'boom'",
            ),
            (
                ModularError::ScopeRequired("dyn Notifier".into()),
                "ModularError: Scoped contract 'dyn Notifier' cannot be resolved outside of a request scope",
            ),
            (
                ModularError::CircularDependency("A".into(), "A -> B -> A".into()),
                "ModularError: Circular dependency while resolving 'A': A -> B -> A",
            ),
            (
                ModularError::CapabilityFactoryFailed("dyn Notifier".into(), "oops".into()),
                "ModularError: Cant invocation capability factory for contract 'dyn Notifier' error 'oops'",
            ),
            (
                ModularError::CapabilityIncorrectType("dyn Notifier".into()),
                "ModularError: Incorrect instance type stored for contract 'dyn Notifier'",
            ),
            (
                ModularError::AlreadyComposed("Composed".into()),
                "ModularError: Composition has already run (state 'Composed'). Composition must only be run once.",
            ),
            (
                ModularError::NotComposed("Failed".into()),
                "ModularError: Composition is not available to start (state 'Failed')",
            ),
            (
                ModularError::UnknownModule("smtp".into()),
                "ModularError: Unknown module identifier 'smtp'",
            ),
            (
                ModularError::ModuleAlreadyCataloged("smtp".into()),
                "ModularError: Module identifier 'smtp' registered already",
            ),
            (
                ModularError::InvalidConfiguration("bad json".into()),
                "ModularError: Invalid configuration: 'bad json'",
            ),
            (
                ModularError::RequestFailed("/".into(), "boom".into()),
                "ModularError: Request '/' failed: 'boom'",
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }
}
