use crate::delegate::{HttpDelegate, ResponseDelegate};
use crate::dispatcher::{MockContext, MockDispatcher, MockResponse};
use crate::registry::EndpointRegistry;
use crate::runtime_config::RuntimeConfig;
use crate::selector::SelectionPolicy;
use crate::server::{parse_body, HttpServer, MockService};
use crate::spec::load_spec;
use crate::synth::SynthMode;
use crate::validator::Validator;
use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use http::Method;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Command-line interface for specmock
#[derive(Parser)]
#[command(name = "specmock")]
#[command(about = "Serve synthesized mock responses for an API document", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Engine settings shared by `serve` and `mock`. Unset flags keep the environment value.
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct EngineArgs {
    /// Default integer range: simple [0,100] or comprehensive [1,1000]
    #[arg(long)]
    pub mode: Option<SynthMode>,

    /// Response selection: preference or success
    #[arg(long)]
    pub policy: Option<SelectionPolicy>,

    /// Seed for reproducible responses
    #[arg(long)]
    pub seed: Option<u64>,

    /// Reject request properties the schema does not declare
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// External generator endpoint, tried before local synthesis
    #[arg(long)]
    pub delegate_url: Option<String>,

    /// Time budget for the external generator
    #[arg(long)]
    pub delegate_timeout_ms: Option<u64>,
}

impl EngineArgs {
    /// Overlay these flags on `config`.
    pub fn apply(&self, mut config: RuntimeConfig) -> RuntimeConfig {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.strict {
            config.strict = true;
        }
        if self.delegate_url.is_some() {
            config.delegate_url.clone_from(&self.delegate_url);
        }
        if let Some(ms) = self.delegate_timeout_ms {
            config.delegate_timeout = Duration::from_millis(ms);
        }
        config
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Serve mock responses over HTTP
    Serve {
        /// Path to the API document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Address and port to bind the server to
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Print the route table
    Routes {
        /// Path to the API document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,
    },
    /// Produce a single mock response and print it
    Mock {
        /// Path to the API document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path, query string allowed
        #[arg(short, long)]
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Load `spec`, build the registry and wire the dispatcher according to `config`.
///
/// # Errors
///
/// Returns an error if the document cannot be loaded, has startup defects, or the delegate
/// client cannot be created.
pub fn build_dispatcher(spec: &Path, config: &RuntimeConfig) -> anyhow::Result<MockDispatcher> {
    let (document, endpoints) = load_spec(spec)?;
    let registry = EndpointRegistry::new(endpoints)
        .with_context(|| format!("conflicting routes in {}", spec.display()))?;

    let mut context = MockContext::new(Arc::new(document), registry)
        .with_synth_config(config.synth_config())
        .with_policy(config.policy)
        .with_validator(Validator::new(config.strict));
    if let Some(url) = &config.delegate_url {
        let delegate: Arc<dyn ResponseDelegate> =
            Arc::new(HttpDelegate::new(url.as_str(), config.delegate_timeout)?);
        context = context.with_delegate(delegate, config.delegate_timeout);
    }

    let dispatcher = MockDispatcher::new(Arc::new(context));
    Ok(match config.seed {
        Some(seed) => dispatcher.with_seed(seed),
        None => dispatcher,
    })
}

/// One line per endpoint: method, template, operation id and declared statuses.
pub fn render_routes(registry: &EndpointRegistry) -> String {
    let mut out = String::new();
    for endpoint in registry.endpoints() {
        let statuses: Vec<String> = endpoint.statuses().map(|s| s.to_string()).collect();
        out.push_str(&format!(
            "{:<7} {:<40} {:<30} {}\n",
            endpoint.method.as_str(),
            endpoint.path_pattern,
            endpoint.operation_id,
            statuses.join(",")
        ));
    }
    out
}

/// Run one request through `dispatcher` as the HTTP layer would.
///
/// # Errors
///
/// Returns an error if `method` is not a valid HTTP method token.
pub fn mock_once(
    dispatcher: &MockDispatcher,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> anyhow::Result<MockResponse> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|e| anyhow!("invalid method '{method}': {e}"))?;
    let payload = match parse_body(body.unwrap_or_default()) {
        Ok(payload) => payload,
        Err(reason) => {
            return Ok(MockResponse::bad_request(vec![format!(
                "field $: malformed JSON ({reason})"
            )]))
        }
    };
    Ok(dispatcher.handle(path, &method, payload.as_ref()))
}

fn print_response(out: &mut impl Write, response: &MockResponse) -> anyhow::Result<()> {
    writeln!(out, "{}", response.status)?;
    if let Some(body) = &response.body {
        writeln!(out, "{}", serde_json::to_string_pretty(body)?)?;
    }
    Ok(())
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns an error if the document cannot be loaded or the server fails to start.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { spec, addr, engine } => {
            let config = engine.apply(RuntimeConfig::from_env());
            may::config().set_stack_size(config.stack_size);
            let dispatcher = build_dispatcher(&spec, &config)?;
            info!(
                spec = %spec.display(),
                endpoints = dispatcher.context().registry().len(),
                policy = %config.policy,
                mode = %config.mode,
                seed = ?config.seed,
                strict = config.strict,
                delegate = config.delegate_url.as_deref().unwrap_or("none"),
                stack_size = config.stack_size,
                "Starting mock server"
            );
            let handle = HttpServer(MockService::new(Arc::new(dispatcher)))
                .start(addr.as_str())
                .with_context(|| format!("failed to bind {addr}"))?;
            handle
                .join()
                .map_err(|e| anyhow!("server coroutine panicked: {e:?}"))
        }
        Commands::Routes { spec } => {
            let (_, endpoints) = load_spec(&spec)?;
            let registry = EndpointRegistry::new(endpoints)
                .with_context(|| format!("conflicting routes in {}", spec.display()))?;
            print!("{}", render_routes(&registry));
            Ok(())
        }
        Commands::Mock {
            spec,
            method,
            path,
            body,
            engine,
        } => {
            let config = engine.apply(RuntimeConfig::from_env());
            let dispatcher = build_dispatcher(&spec, &config)?;
            let response = mock_once(&dispatcher, &method, &path, body.as_deref())?;
            print_response(&mut std::io::stdout().lock(), &response)
        }
    }
}

/// Parse the process arguments and execute the command.
///
/// # Errors
///
/// See [`run`].
pub fn run_cli() -> anyhow::Result<()> {
    run(Cli::parse())
}
