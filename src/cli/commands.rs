use crate::config::RouterConfig;
use crate::dispatcher::Handler;
use crate::pattern::{build, Params};
use crate::router::{RouteOptions, Router};
use crate::server::{Connected, Request, Response};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Command-line interface for routeweave
#[derive(Parser, Debug)]
#[command(name = "routeweave")]
#[command(about = "Dispatch mock requests against a route table", long_about = None)]
pub struct Cli {
    /// Log level for diagnostics written to stderr
    #[arg(long, global = true, env = "ROUTEWEAVE_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch a single request and print the response
    Request {
        /// Request method (GET, POST, ...)
        method: String,

        /// Request target, `/path` or `/path?query`
        path: String,

        /// YAML route file
        #[arg(short, long)]
        routes: PathBuf,

        /// YAML router configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Send as an asynchronous (XMLHttpRequest) request
        #[arg(long, default_value_t = false, conflicts_with = "cli")]
        ajax: bool,

        /// Send on the command-line channel
        #[arg(long, default_value_t = false)]
        cli: bool,

        /// Extra request header, `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// List registered routes in match order
    Routes {
        /// YAML route file
        #[arg(short, long)]
        routes: PathBuf,

        /// YAML router configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Route file contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteFile {
    /// Routes in registration order
    #[serde(default)]
    pub routes: Vec<RouteDef>,
}

/// One route of a route file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteDef {
    /// Route expression, e.g. `GET item: /items/@id`
    pub route: String,
    /// Response body; `@token` references are filled from the match
    #[serde(default)]
    pub body: Option<String>,
    /// Response status
    #[serde(default = "default_status")]
    pub status: u16,
    /// Cache lifetime in seconds
    #[serde(default)]
    pub ttl: u32,
    /// Throttle rate in KB/s
    #[serde(default)]
    pub kbps: u32,
    /// Reroute target instead of a body
    #[serde(default)]
    pub redirect: Option<String>,
    /// Permanent (301) redirect
    #[serde(default)]
    pub permanent: bool,
}

fn default_status() -> u16 {
    200
}

impl RouteFile {
    /// Read and parse a route file.
    ///
    /// # Errors
    ///
    /// The file cannot be read or is not a valid route file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read route file {}", path.display()))?;
        let file: RouteFile = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse route file {}", path.display()))?;
        debug!(path = %path.display(), routes = file.routes.len(), "Loaded route file");
        Ok(file)
    }
}

/// Register every route of `file` on a new router.
///
/// # Errors
///
/// A route defines both `body` and `redirect`, or its expression is rejected
/// by the router.
pub fn build_router(file: &RouteFile, config: RouterConfig) -> Result<Router> {
    let mut router = Router::new(config)?;
    for def in &file.routes {
        let handler = match (&def.redirect, &def.body) {
            (Some(_), Some(_)) => bail!("route '{}' has both body and redirect", def.route),
            (Some(target), None) => Handler::redirect(target, def.permanent),
            (None, body) => {
                let body = body.clone().unwrap_or_default();
                let status = def.status;
                Handler::func(move |_req: &Request, res: Response, params: &Params| {
                    res.with_status(status).with_body(build(&body, params))
                })
            }
        };
        let options = RouteOptions {
            ttl: def.ttl,
            kbps: def.kbps,
        };
        router
            .route_with(&def.route, handler, options)
            .with_context(|| format!("invalid route '{}'", def.route))?;
    }
    Ok(router)
}

fn load_config(path: Option<&Path>) -> Result<RouterConfig> {
    Ok(match path {
        Some(path) => RouterConfig::load(path)?.with_env_overrides(),
        None => RouterConfig::from_env(),
    })
}

fn parse_header(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => bail!("invalid header '{raw}', expected 'Name: value'"),
    }
}

/// Run `cli`, writing command output to `out`.
///
/// # Errors
///
/// Route/config loading failures, invalid arguments and dispatch errors.
pub fn execute(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Commands::Request {
            method,
            path,
            routes,
            config,
            ajax,
            cli: on_cli,
            headers,
        } => {
            let router = build_router(&RouteFile::load(routes)?, load_config(config.as_deref())?)?;
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("invalid method '{method}'"))?;
            let mut req = Request::new(method, path).ajax(*ajax).cli(*on_cli);
            for raw in headers {
                let (name, value) = parse_header(raw)?;
                req = req.header(name, value);
            }
            router.serve(&req, &mut *out, &Connected)?;
            if !req.is_cli() {
                writeln!(out)?;
            }
            Ok(())
        }
        Commands::Routes { routes, config } => {
            let router = build_router(&RouteFile::load(routes)?, load_config(config.as_deref())?)?;
            for slot in router.table().slots() {
                for (channel, verbs) in slot.channels() {
                    for (verb, entry) in verbs {
                        let mut line = format!("{:<7} {} [{}]", verb.as_str(), slot.pattern().as_str(), channel);
                        if let Some(alias) = &entry.alias {
                            line.push_str(&format!(" @{alias}"));
                        }
                        if entry.ttl > 0 {
                            line.push_str(&format!(" ttl={}", entry.ttl));
                        }
                        if entry.kbps > 0 {
                            line.push_str(&format!(" kbps={}", entry.kbps));
                        }
                        writeln!(out, "{line}")?;
                    }
                }
            }
            Ok(())
        }
    }
}

/// Run `cli` against stdout.
///
/// # Errors
///
/// See [`execute`].
pub fn run_cli(cli: &Cli) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(cli, &mut out)?;
    out.flush()?;
    Ok(())
}
