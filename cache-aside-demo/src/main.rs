use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_aside::{InterceptorConfig, TimeUnit};
use cache_aside_demo::inspect;

#[derive(Parser)]
#[command(name = "cache-aside-demo")]
#[command(about = "Cache-aside decoration demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the demo HTTP server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Deadline for each store call in milliseconds
        #[arg(long)]
        store_timeout_ms: Option<u64>,
    },

    /// Render a key template against argument bindings
    Expand {
        /// Key template, e.g. "'user:info:' + #id"
        template: String,

        /// Argument binding name=value (value read as JSON when possible)
        #[arg(short, long = "arg")]
        args: Vec<String>,

        /// Property key=value, overrides the environment
        #[arg(short = 'P', long = "property")]
        properties: Vec<String>,
    },

    /// Show the effective TTL of a directive
    Ttl {
        /// Base TTL
        #[arg(long, default_value = "60")]
        base: u64,

        /// Unit of the base TTL (ms, s, m, h, d)
        #[arg(short, long, default_value = "s")]
        unit: TimeUnit,

        /// TTL override template in the same unit, e.g. "${app.cache.search.ttl:300}"
        #[arg(short, long = "override")]
        ttl_override: Option<String>,

        /// Disable the random extension
        #[arg(long)]
        no_jitter: bool,

        /// Number of samples to draw
        #[arg(short, long, default_value = "5")]
        samples: usize,

        /// Property key=value, overrides the environment
        #[arg(short = 'P', long = "property")]
        properties: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "cache_aside=info,cache_aside_demo=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            store_timeout_ms,
        } => {
            use cache_aside_demo::api::{ApiServer, ApiServerConfig};

            let mut config = ApiServerConfig {
                host: host.clone(),
                port,
                interceptor: InterceptorConfig::from_env()?,
                ..Default::default()
            };
            if let Some(ms) = store_timeout_ms {
                config.store_timeout = std::time::Duration::from_millis(ms);
            }

            let server = ApiServer::new(config);
            println!("Starting API server on {}:{}", host, port);
            server.start().await?;
        }

        Commands::Expand {
            template,
            args,
            properties,
        } => {
            let props = inspect::properties(&properties)?;
            let key = inspect::expand_key(&template, &args, props)?;
            println!("{}", key);
        }

        Commands::Ttl {
            base,
            unit,
            ttl_override,
            no_jitter,
            samples,
            properties,
        } => {
            let props = inspect::properties(&properties)?;
            let ttls = inspect::sample_ttls(
                base,
                unit,
                ttl_override.as_deref(),
                !no_jitter,
                samples,
                props,
            )?;

            println!("Effective TTLs:");
            for ttl in ttls {
                println!("  {:>10} ms", ttl.as_millis());
            }
        }
    }

    Ok(())
}
