use std::ffi::OsString;

use anyhow::Context;
use clap::{ArgAction, Parser};

use crate::config::{ConfigError, DEFAULT_ARCHS, FlagValues, resolve};
use crate::env_detect::EnvSnapshot;
use crate::executor::{HookHandler, dispatch};
use crate::output::prepare_output_dir;
use crate::redact::Redactor;
use crate::release::{GithubApi, resolve_version};

/// Flags that may be written with a single leading dash, `-repo=a/b` style.
const LONG_FLAGS: &[&str] = &[
    "repo", "ghToken", "email", "version", "archs", "out", "push", "help",
];

#[derive(Debug, Parser)]
#[command(
    name = "bin-deb-utils",
    about = "Create debian packages and repositories from CI build artifacts",
    args_override_self = true
)]
pub struct Cli {
    /// Action to run: create-packages or setup-repository
    action: Option<String>,
    /// The repo slug such as USER/REPO [env: REPO]
    #[arg(long, value_name = "USER/REPO", allow_hyphen_values = true)]
    repo: Option<String>,
    /// Token allowed to write on the repository [env: GH_TOKEN]
    #[arg(long = "ghToken", value_name = "TOKEN", allow_hyphen_values = true)]
    gh_token: Option<String>,
    /// Your GitHub email [env: EMAIL, MYEMAIL]
    #[arg(long, allow_hyphen_values = true)]
    email: Option<String>,
    /// The package version, LAST for the latest GitHub release
    #[arg(long, allow_hyphen_values = true)]
    version: Option<String>,
    /// Comma separated architectures to build
    #[arg(long, default_value = DEFAULT_ARCHS, allow_hyphen_values = true)]
    archs: String,
    /// The output build directory, wiped before every run
    #[arg(long, allow_hyphen_values = true)]
    out: Option<String>,
    /// Push the new assets
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        default_value_t = false
    )]
    push: bool,
    /// Flag parsing stops at the first argument after the action; the rest
    /// is ignored.
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    ignored: Vec<String>,
}

impl Cli {
    fn flag_values(&self) -> FlagValues {
        FlagValues {
            repo: self.repo.clone().unwrap_or_default(),
            gh_token: self.gh_token.clone().unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
            version: self.version.clone().unwrap_or_default(),
            archs: self.archs.clone(),
            out: self.out.clone().unwrap_or_default(),
            push: self.push,
        }
    }
}

/// Rewrite `-flag` into `--flag` for the known long flags so Go style
/// invocations keep working. Everything after `--` is left alone.
pub fn normalize_go_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut seen_terminator = false;
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(idx, arg)| {
            if idx == 0 || seen_terminator {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                seen_terminator = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split('=').next().unwrap_or_default();
                    if LONG_FLAGS.contains(&name) {
                        OsString::from(format!("-{text}"))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}

/// 1 for missing input, 2 for every fatal stop.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ConfigError>() {
        Some(config_err) if config_err.is_validation() => 1,
        _ => 2,
    }
}

pub fn run() -> i32 {
    let _ = dotenvy::dotenv();
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let cli = Cli::parse_from(normalize_go_flags(std::env::args_os()));

    let mut redactor = Redactor::new();
    match execute(&cli, &mut redactor) {
        Ok(()) => 0,
        Err(err) => {
            log::error!("{}", failure_message(&err, &redactor));
            exit_code(&err)
        }
    }
}

fn failure_message(err: &anyhow::Error, redactor: &Redactor) -> String {
    redactor.redact(&format!("{err:#}"))
}

fn execute(cli: &Cli, redactor: &mut Redactor) -> anyhow::Result<()> {
    if !cli.ignored.is_empty() {
        log::debug!("ignoring arguments after the action: {:?}", cli.ignored);
    }

    let env = EnvSnapshot::capture();
    let mut config = resolve(&cli.flag_values(), &env)?;

    redactor.hide(config.gh_token.as_str(), "$GH_TOKEN");
    log::info!("{}", redactor.redact(&format!("resolved configuration: {config}")));
    log::debug!("{}", redactor.redact(&serde_json::to_string(&config)?));
    log::info!("target architectures: {}", config.arch_list().join(" "));

    prepare_output_dir(&config.out_dir)?;

    config.version = resolve_version(&config.version, &config.repo_slug, GithubApi::new)
        .context("resolving release version")?;

    let handler = HookHandler::from_env(redactor.clone());
    dispatch(cli.action.as_deref(), &config, &handler)?;
    Ok(())
}
