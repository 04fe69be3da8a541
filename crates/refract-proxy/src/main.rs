use clap::{Parser, ValueEnum};
use refract_proxy::{Config, ProxyServer};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "refract-proxy", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "REFRACT_CONFIG")]
    config: PathBuf,
    /// Override listen.port
    #[arg(short, long)]
    port: Option<u16>,
    /// Override upstream.url
    #[arg(short, long)]
    upstream: Option<String>,
    /// Filter every response regardless of status and content type
    #[arg(long)]
    force: bool,
    #[arg(long, value_enum, default_value = "pretty", env = "REFRACT_LOG_FORMAT")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let subscriber = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    match format {
        LogFormat::Pretty => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let mut config = Config::from_file(&args.config)?;
    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(upstream) = args.upstream {
        config.upstream.url = upstream;
    }
    config.force |= args.force;
    config.validate()?;

    info!(
        config = ?args.config,
        upstream = %config.upstream.url,
        force = config.force,
        restricted = config.restricted.len(),
        "Starting refract-proxy"
    );

    let server = ProxyServer::new(&config)?;
    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
