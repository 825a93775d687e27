use std::fmt;
use std::process::Command;

use anyhow::Context;
use thiserror::Error;

use crate::config::RunConfig;
use crate::redact::Redactor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreatePackages,
    SetupRepository,
}

impl Action {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "create-packages" => Some(Action::CreatePackages),
            "setup-repository" => Some(Action::SetupRepository),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::CreatePackages => "create-packages",
            Action::SetupRepository => "setup-repository",
        }
    }

    /// Environment variable holding the shell command for this action.
    pub fn hook_var(self) -> &'static str {
        match self {
            Action::CreatePackages => "BIN_DEB_CREATE_PACKAGES_CMD",
            Action::SetupRepository => "BIN_DEB_SETUP_REPOSITORY_CMD",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no command configured for {action}, set {var}")]
    NoHook { action: Action, var: &'static str },
    #[error("{action} command failed: {message}")]
    HookFailed { action: Action, message: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The package and repository collaborators behind the two actions.
pub trait ActionHandler {
    fn create_packages(&self, config: &RunConfig) -> Result<(), ActionError>;
    fn setup_repository(&self, config: &RunConfig) -> Result<(), ActionError>;
}

/// Run the action named on the command line.
///
/// Unknown or absent names do nothing and are not an error; `Ok(None)` tells
/// the caller nothing ran.
pub fn dispatch(
    action_name: Option<&str>,
    config: &RunConfig,
    handler: &dyn ActionHandler,
) -> Result<Option<Action>, ActionError> {
    let Some(action) = action_name.and_then(Action::parse) else {
        log::debug!("ignoring unrecognized action {action_name:?}");
        return Ok(None);
    };

    match action {
        Action::CreatePackages => handler.create_packages(config)?,
        Action::SetupRepository => handler.setup_repository(config)?,
    }
    Ok(Some(action))
}

/// Positional arguments handed to every hook, in `$1..$7` order.
pub fn hook_args(config: &RunConfig) -> Vec<String> {
    vec![
        config.repo_slug.clone(),
        config.gh_token.clone(),
        config.email.clone(),
        config.version.clone(),
        config.archs.clone(),
        config.out_dir.to_string_lossy().to_string(),
        config.push.to_string(),
    ]
}

pub fn hook_env(config: &RunConfig) -> Vec<(&'static str, String)> {
    let names = [
        "DEB_REPO",
        "DEB_GH_TOKEN",
        "DEB_EMAIL",
        "DEB_VERSION",
        "DEB_ARCHS",
        "DEB_OUT",
        "DEB_PUSH",
    ];
    names.into_iter().zip(hook_args(config)).collect()
}

/// Runs operator supplied shell commands through `/bin/sh -c`.
pub struct HookHandler {
    create_packages: Option<String>,
    setup_repository: Option<String>,
    redactor: Redactor,
}

impl HookHandler {
    pub fn new(
        create_packages: Option<String>,
        setup_repository: Option<String>,
        redactor: Redactor,
    ) -> Self {
        Self {
            create_packages,
            setup_repository,
            redactor,
        }
    }

    pub fn from_env(redactor: Redactor) -> Self {
        let lookup = |action: Action| {
            std::env::var(action.hook_var())
                .ok()
                .filter(|cmd| !cmd.trim().is_empty())
        };
        Self::new(
            lookup(Action::CreatePackages),
            lookup(Action::SetupRepository),
            redactor,
        )
    }

    fn run_hook(
        &self,
        action: Action,
        command: Option<&str>,
        config: &RunConfig,
    ) -> Result<(), ActionError> {
        let command = command.ok_or(ActionError::NoHook {
            action,
            var: action.hook_var(),
        })?;

        log::info!("==> {action}: {}", self.redactor.redact(command));
        let status = Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .arg(env!("CARGO_PKG_NAME"))
            .args(hook_args(config))
            .envs(hook_env(config))
            .status()
            .with_context(|| format!("running {action} command"))?;

        if !status.success() {
            return Err(ActionError::HookFailed {
                action,
                message: status.to_string(),
            });
        }

        log::info!("{action} finished");
        Ok(())
    }
}

impl ActionHandler for HookHandler {
    fn create_packages(&self, config: &RunConfig) -> Result<(), ActionError> {
        self.run_hook(
            Action::CreatePackages,
            self.create_packages.as_deref(),
            config,
        )
    }

    fn setup_repository(&self, config: &RunConfig) -> Result<(), ActionError> {
        self.run_hook(
            Action::SetupRepository,
            self.setup_repository.as_deref(),
            config,
        )
    }
}
