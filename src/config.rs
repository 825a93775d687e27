use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::env_detect::{CiSystem, EnvSnapshot, detect_ci};

pub const DEFAULT_ARCHS: &str = "386,amd64";

/// Raw flag values as typed on the command line. Empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct FlagValues {
    pub repo: String,
    pub gh_token: String,
    pub email: String,
    pub version: String,
    pub archs: String,
    pub out: String,
    pub push: bool,
}

#[derive(Clone, Serialize)]
pub struct RunConfig {
    pub repo_slug: String,
    #[serde(skip_serializing)]
    pub gh_token: String,
    pub email: String,
    pub version: String,
    pub archs: String,
    pub out_dir: PathBuf,
    pub push: bool,
    pub ci: CiSystem,
}

impl RunConfig {
    pub fn arch_list(&self) -> Vec<String> {
        self.archs
            .split(',')
            .map(str::trim)
            .filter(|arch| !arch.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("repo_slug", &self.repo_slug)
            .field("gh_token", &"<redacted>")
            .field("email", &self.email)
            .field("version", &self.version)
            .field("archs", &self.archs)
            .field("out_dir", &self.out_dir)
            .field("push", &self.push)
            .field("ci", &self.ci)
            .finish()
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "repo={} email={} version={} archs={} out={} push={} ci={}",
            self.repo_slug,
            self.email,
            self.version,
            self.archs,
            self.out_dir.display(),
            self.push,
            self.ci
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing argument -{flag} or env {}", quoted(.envs))]
    MissingArgument {
        flag: &'static str,
        envs: Vec<&'static str>,
    },
    #[error("no supported CI system detected (expected Travis CI or a Vagrant box)")]
    UnsupportedCi,
}

impl ConfigError {
    /// Missing input the operator can supply, as opposed to a fatal stop.
    pub fn is_validation(&self) -> bool {
        matches!(self, ConfigError::MissingArgument { .. })
    }
}

fn quoted(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("{name:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One step of a fallback chain.
#[derive(Debug, Clone, Copy)]
enum Candidate<'a> {
    Flag(&'a str),
    Env(&'static str),
}

/// First non-empty candidate wins.
fn first_non_empty(chain: &[Candidate<'_>], env: &EnvSnapshot) -> String {
    chain
        .iter()
        .map(|candidate| match candidate {
            Candidate::Flag(value) => *value,
            Candidate::Env(name) => env.var(name),
        })
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn require(
    value: String,
    flag: &'static str,
    envs: &[&'static str],
) -> Result<String, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::MissingArgument {
            flag,
            envs: envs.to_vec(),
        });
    }
    Ok(value)
}

/// Merge flags with environment fallbacks and validate the result.
///
/// Repo, token and email are checked first. The CI system is detected next
/// and only its own variables back up `-version` and `-out`. A run with no
/// recognised CI is refused even when every flag is present.
pub fn resolve(flags: &FlagValues, env: &EnvSnapshot) -> Result<RunConfig, ConfigError> {
    let repo_slug = first_non_empty(
        &[Candidate::Flag(&flags.repo), Candidate::Env("REPO")],
        env,
    );
    let gh_token = first_non_empty(
        &[Candidate::Flag(&flags.gh_token), Candidate::Env("GH_TOKEN")],
        env,
    );
    let email = first_non_empty(
        &[
            Candidate::Flag(&flags.email),
            Candidate::Env("EMAIL"),
            Candidate::Env("MYEMAIL"),
        ],
        env,
    );

    let repo_slug = require(repo_slug, "repo", &["REPO"])?;
    let gh_token = require(gh_token, "ghToken", &["GH_TOKEN"])?;
    let email = require(email, "email", &["EMAIL", "MYEMAIL"])?;

    let ci = detect_ci(env).ok_or(ConfigError::UnsupportedCi)?;

    let version = first_non_empty(
        &[
            Candidate::Flag(&flags.version),
            Candidate::Env(ci.version_var()),
        ],
        env,
    );
    let out = first_non_empty(
        &[Candidate::Flag(&flags.out), Candidate::Env(ci.out_var())],
        env,
    );
    let version = require(version, "version", &[ci.version_var()])?;
    let out = require(out, "out", &[ci.out_var()])?;

    let archs = if flags.archs.is_empty() {
        DEFAULT_ARCHS.to_string()
    } else {
        flags.archs.clone()
    };

    Ok(RunConfig {
        repo_slug,
        gh_token,
        email,
        version,
        archs,
        out_dir: PathBuf::from(out),
        push: flags.push,
        ci,
    })
}
