//! querybot gateway service
//!
//! Serves the HTTP console API in front of a key-protected remote SQL
//! endpoint. With `--probe` it only runs auth negotiation, prints what each
//! candidate returned, and exits.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use querybot_common::config::TelemetrySettings;
use querybot_common::{credential_issues, mask_secret, CredentialIssue};
use querybot_gateway::auth::{AuthNegotiator, Endpoint};
use querybot_gateway::http_api::{self, AppState};
use querybot_gateway::remote::RemoteClient;
use querybot_gateway::translator::{OpenAiTranslator, Translator, UnavailableTranslator};
use querybot_gateway::{metrics, telemetry, EndpointConfig, GatewayConfig, QueryGateway, TranslatorConfig};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "querybot-gateway")]
#[command(about = "querybot gateway - natural language SQL over a remote query endpoint")]
struct Args {
    /// Remote query endpoint URL (may embed a `code` credential)
    #[arg(long, env = "QUERY_ENDPOINT_URL")]
    endpoint_url: String,

    /// Separate endpoint credential
    #[arg(long, env = "QUERY_ENDPOINT_KEY", hide_env_values = true)]
    endpoint_key: Option<String>,

    /// Header name for the header-credential method
    #[arg(long, env = "AUTH_HEADER_NAME", default_value = "x-functions-key")]
    auth_header_name: String,

    /// Query parameter for embedded/query-param credentials
    #[arg(long, env = "AUTH_QUERY_PARAM", default_value = "code")]
    auth_query_param: String,

    /// REST API port
    #[arg(long, env = "HTTP_PORT", default_value = "8000")]
    http_port: u16,

    /// Database new sessions start on
    #[arg(long, env = "DEFAULT_DATABASE", default_value = "master")]
    default_database: String,

    /// Dialogue turns kept per session
    #[arg(long, env = "SESSION_CONTEXT_CAP", default_value = "20")]
    session_context_cap: usize,

    #[arg(long, env = "METADATA_TIMEOUT_SECS", default_value = "15")]
    metadata_timeout_secs: u64,

    #[arg(long, env = "STATEMENT_TIMEOUT_SECS", default_value = "30")]
    statement_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Run auth negotiation once, print the report and exit
    #[arg(long)]
    probe: bool,
}

impl Args {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            endpoint: EndpointConfig {
                url: self.endpoint_url.trim().to_string(),
                credential: self
                    .endpoint_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from),
                header_name: self.auth_header_name.clone(),
                credential_param: self.auth_query_param.clone(),
                metadata_timeout_secs: self.metadata_timeout_secs,
                statement_timeout_secs: self.statement_timeout_secs,
                ..Default::default()
            },
            default_database: self.default_database.clone(),
            context_cap: self.session_context_cap,
            http_port: self.http_port,
        }
    }

    /// Paste mistakes in the key as supplied, before it is trimmed for use
    fn endpoint_key_issues(&self) -> Vec<CredentialIssue> {
        match self.endpoint_key.as_deref() {
            Some(raw) if !raw.trim().is_empty() => credential_issues(raw),
            _ => Vec::new(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let telemetry_settings = TelemetrySettings {
        service_name: "querybot-gateway".into(),
        log_level: args.log_level.clone(),
        ..TelemetrySettings::from_env()
    };
    telemetry::init(&telemetry_settings)?;

    metrics::init_metrics();

    let config = args.gateway_config();
    let endpoint = Endpoint::from_config(&config.endpoint)?;

    info!("Starting querybot gateway");
    info!("  Endpoint: {}", endpoint.display_url());
    info!("  Embedded credential: {}", endpoint.has_embedded_credential());
    match config.endpoint.credential.as_deref() {
        Some(key) => {
            info!("  Separate credential: {}", mask_secret(key));
            for issue in args.endpoint_key_issues() {
                warn!("Configured endpoint key looks wrong: {}", issue);
            }
        }
        None => info!("  Separate credential: none"),
    }

    if args.probe {
        return run_probe(&config.endpoint).await;
    }

    let translator_config = TranslatorConfig::from_env()?;
    let translator: Arc<dyn Translator> = if translator_config.url.is_some() {
        let translator = OpenAiTranslator::new(&translator_config)?;
        info!("  Translator: enabled ({} tokens/day)", translator_config.max_daily_tokens);
        Arc::new(translator)
    } else {
        warn!("TRANSLATOR__URL not set; natural-language questions will be rejected");
        Arc::new(UnavailableTranslator)
    };

    let gateway = Arc::new(QueryGateway::new(&config, translator)?);

    // Failures here are retried on first use
    if let Err(failure) = gateway.negotiator().acquire().await {
        warn!("Initial auth negotiation failed: {}", failure.report());
    }

    let app = http_api::router(AppState {
        gateway: gateway.clone(),
    });

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("binding {}", http_addr))?;

    info!("HTTP server listening on {}", http_addr);
    info!("  /api/message - console messages");
    info!("  /metrics - Prometheus metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down querybot gateway");
        })
        .await?;

    Ok(())
}

/// Negotiate once without caching and print each candidate's outcome
async fn run_probe(config: &EndpointConfig) -> anyhow::Result<()> {
    let client = RemoteClient::new(config)?;
    let negotiator = AuthNegotiator::new(client, config);

    println!("Probing {} candidate(s):", negotiator.candidates().len());
    match negotiator.negotiate().await {
        Ok(negotiated) => {
            for attempt in &negotiated.attempts {
                println!("  - {}", attempt);
            }
            println!("Working method: {}", negotiated.method);
            Ok(())
        }
        Err(failure) => {
            println!("{}", failure.report());
            anyhow::bail!("no working authentication method")
        }
    }
}
