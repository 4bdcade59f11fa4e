use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mock-server", about = "In-memory grocery API for local development")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Start with the demo catalog
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let listener = TcpListener::bind(("127.0.0.1", args.port)).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, seed = args.seed, "listening");

    let app = if args.seed {
        mock_server::seeded_app()
    } else {
        mock_server::app()
    };
    mock_server::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn args_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_parse() {
        let args = Args::parse_from(["mock-server", "--port", "9090", "--seed"]);
        assert_eq!(args.port, 9090);
        assert!(args.seed);
        assert!(Args::try_parse_from(["mock-server", "--port", "http"]).is_err());
    }
}
