use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;

/// Directory shared into every Vagrant box.
pub const VAGRANT_SHARE: &str = "/vagrant/";

/// Every environment variable the resolver and the detectors may look at.
pub const CONSULTED_VARS: &[&str] = &[
    "EMAIL",
    "MYEMAIL",
    "REPO",
    "GH_TOKEN",
    "CI",
    "TRAVIS",
    "TRAVIS_TAG",
    "TRAVIS_BUILD_DIR",
    "VAGRANT_CWD",
    "VERSION",
    "BUILD_DIR",
];

/// Read-only view of the process environment taken once at startup.
#[derive(Clone, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
    vagrant_share: bool,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        let vars = CONSULTED_VARS
            .iter()
            .filter_map(|name| {
                std::env::var(name)
                    .ok()
                    .map(|value| (name.to_string(), value))
            })
            .collect();

        Self {
            vars,
            vagrant_share: path_present(Path::new(VAGRANT_SHARE)),
        }
    }

    pub fn from_vars<I, K, V>(vars: I, vagrant_share: bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            vagrant_share,
        }
    }

    /// Value of `name`, or the empty string when unset.
    pub fn var(&self, name: &str) -> &str {
        self.vars.get(name).map(String::as_str).unwrap_or_default()
    }

    pub fn has_vagrant_share(&self) -> bool {
        self.vagrant_share
    }
}

/// Anything but "not found" counts as present, so an unreadable share still
/// identifies a Vagrant box.
pub fn path_present(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(_) => true,
        Err(err) => err.kind() != ErrorKind::NotFound,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CiSystem {
    Travis,
    Vagrant,
}

impl CiSystem {
    /// Environment variable holding the package version on this CI.
    pub fn version_var(self) -> &'static str {
        match self {
            CiSystem::Travis => "TRAVIS_TAG",
            CiSystem::Vagrant => "VERSION",
        }
    }

    /// Environment variable holding the build output directory on this CI.
    pub fn out_var(self) -> &'static str {
        match self {
            CiSystem::Travis => "TRAVIS_BUILD_DIR",
            CiSystem::Vagrant => "BUILD_DIR",
        }
    }
}

impl fmt::Display for CiSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CiSystem::Travis => f.write_str("travis"),
            CiSystem::Vagrant => f.write_str("vagrant"),
        }
    }
}

pub fn is_travis(env: &EnvSnapshot) -> bool {
    log::debug!("CI={:?} TRAVIS={:?}", env.var("CI"), env.var("TRAVIS"));
    env.var("CI") == "TRUE" && env.var("TRAVIS") == "TRUE"
}

pub fn is_vagrant(env: &EnvSnapshot) -> bool {
    log::debug!(
        "VAGRANT_CWD={:?} {VAGRANT_SHARE} present={}",
        env.var("VAGRANT_CWD"),
        env.has_vagrant_share()
    );
    env.has_vagrant_share()
}

/// Travis is checked first; a box that looks like both is treated as Travis.
pub fn detect_ci(env: &EnvSnapshot) -> Option<CiSystem> {
    if is_travis(env) {
        Some(CiSystem::Travis)
    } else if is_vagrant(env) {
        Some(CiSystem::Vagrant)
    } else {
        None
    }
}
