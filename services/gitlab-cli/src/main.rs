//! GitLab CLI
//!
//! Small command-line front end over `gitlab-client`:
//! - `version`: print the instance version
//! - `commits <project> [ref]`: list recent commits of a project
//! - `authorize-url [scope]`: print a PKCE authorization URL with its state and verifier
//! - `exchange-code <code> [verifier]`: trade an authorization code for a token

mod config;

use anyhow::{Context as _, Result, bail};
use gitlab_auth::{TokenRequest, compute_challenge, generate_verifier};
use gitlab_client::{CancellationToken, Client, Context, ListCommitsOptions, ListOptions};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Subcommand parsed from argv
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Version,
    Commits { project: String, ref_name: Option<String> },
    AuthorizeUrl { scope: String },
    ExchangeCode { code: String, verifier: Option<String> },
}

/// Authorization URL plus the values the caller must keep for the callback:
/// `state` to check against the redirect, `verifier` for `exchange-code`.
struct AuthorizeRequest {
    url: String,
    state: String,
    verifier: String,
}

impl AuthorizeRequest {
    fn new(client: &Client, client_id: &str, redirect_uri: &str, scope: &str) -> Self {
        let verifier = generate_verifier();
        let state = generate_verifier();
        let url = client.oauth().authorize_url_with_pkce(
            client_id,
            redirect_uri,
            scope,
            &state,
            &compute_challenge(&verifier),
        );
        Self {
            url,
            state,
            verifier,
        }
    }
}

/// Split argv into the `--config` value and the subcommand.
fn parse_args(args: &[String]) -> Result<(Option<String>, Command)> {
    let mut config_path = None;
    let mut rest = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().context("--config requires a path")?;
            config_path = Some(path.clone());
        } else {
            rest.push(arg.as_str());
        }
    }

    let command = match rest.as_slice() {
        [] | ["version"] => Command::Version,
        ["commits", project] => Command::Commits {
            project: (*project).to_owned(),
            ref_name: None,
        },
        ["commits", project, ref_name] => Command::Commits {
            project: (*project).to_owned(),
            ref_name: Some((*ref_name).to_owned()),
        },
        ["authorize-url"] => Command::AuthorizeUrl {
            scope: "api".to_owned(),
        },
        ["authorize-url", scope] => Command::AuthorizeUrl {
            scope: (*scope).to_owned(),
        },
        ["exchange-code", code] => Command::ExchangeCode {
            code: (*code).to_owned(),
            verifier: None,
        },
        ["exchange-code", code, verifier] => Command::ExchangeCode {
            code: (*code).to_owned(),
            verifier: Some((*verifier).to_owned()),
        },
        other => bail!("unrecognized command: {}", other.join(" ")),
    };
    Ok((config_path, command))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (cli_config_path, command) = parse_args(&args)?;

    let config_path = Config::resolve_path(cli_config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let credential = config.credential().context("invalid [auth] section")?;
    let client = Client::new(Some(credential), config.client_options())
        .context("failed to build GitLab client")?;

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling in-flight request");
            on_signal.cancel();
        }
    });
    let ctx = Context::with_cancellation(shutdown);
    match command {
        Command::Version => {
            let version = client.version().get(&ctx).await?;
            println!("{} ({})", version.version, version.revision);
        }
        Command::Commits { project, ref_name } => {
            let opts = ListCommitsOptions {
                list: ListOptions::page(1, None),
                ref_name,
                ..ListCommitsOptions::default()
            };
            let commits = client
                .commits()
                .list(&ctx, &project, &opts)
                .await
                .with_context(|| format!("failed to list commits of {project}"))?;
            for commit in commits {
                println!("{} {}", commit.short_id, commit.title);
            }
        }
        Command::AuthorizeUrl { scope } => {
            let client_id = config
                .auth
                .client_id
                .as_deref()
                .context("authorize-url needs auth.client_id")?;
            let redirect_uri = config
                .auth
                .redirect_uri
                .as_deref()
                .context("authorize-url needs auth.redirect_uri")?;
            let auth = AuthorizeRequest::new(&client, client_id, redirect_uri, &scope);
            println!("{}", auth.url);
            println!("state: {}", auth.state);
            println!("code_verifier: {}", auth.verifier);
        }
        Command::ExchangeCode { code, verifier } => {
            let mut request = TokenRequest::code(code);
            if let Some(verifier) = verifier {
                request = request.with_code_verifier(verifier);
            }
            match client.oauth().access_token(&ctx, &request).await? {
                Some(token) => println!(
                    "token_type={} expires_in={} scope={}",
                    token.token_type,
                    token.expires_in,
                    token.scope.as_deref().unwrap_or("")
                ),
                None => println!("credential uses a static token; nothing to exchange"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("gitlab-cli")
            .chain(args.iter().copied())
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_defaults_to_version() {
        let (path, command) = parse_args(&argv(&[])).unwrap();
        assert!(path.is_none());
        assert_eq!(command, Command::Version);
    }

    #[test]
    fn test_config_flag_anywhere() {
        let (path, command) =
            parse_args(&argv(&["commits", "--config", "/tmp/g.toml", "group/project", "main"]))
                .unwrap();
        assert_eq!(path.as_deref(), Some("/tmp/g.toml"));
        assert_eq!(
            command,
            Command::Commits {
                project: "group/project".into(),
                ref_name: Some("main".into()),
            }
        );
    }

    #[test]
    fn test_exchange_code_with_verifier() {
        let (_, command) = parse_args(&argv(&["exchange-code", "abc", "ver"])).unwrap();
        assert_eq!(
            command,
            Command::ExchangeCode {
                code: "abc".into(),
                verifier: Some("ver".into()),
            }
        );
    }

    #[test]
    fn test_authorize_request_carries_state_and_challenge() {
        let client = Client::new(
            None,
            gitlab_client::ClientOptions {
                endpoint: Some("https://gitlab.example.com".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let auth = AuthorizeRequest::new(&client, "app", "http://127.0.0.1/cb", "api");

        assert!(!auth.state.is_empty());
        assert_ne!(auth.state, auth.verifier);
        assert!(auth.url.contains(&format!("&state={}&", auth.state)));
        assert!(auth.url.contains(&format!(
            "&code_challenge={}&",
            compute_challenge(&auth.verifier)
        )));
    }

    #[test]
    fn test_rejects_unknown_command() {
        assert!(parse_args(&argv(&["delete", "everything"])).is_err());
        assert!(parse_args(&argv(&["--config"])).is_err());
    }
}
