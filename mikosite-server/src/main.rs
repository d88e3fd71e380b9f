use std::{env, io, net::SocketAddr, sync::Arc};

use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mikosite_server::{
    cache, cli,
    clock::SystemClock,
    store::{Store, Tables},
    throttle, AppState,
};

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = cli::parse(env::args().collect());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_filter))
        .init();

    let store = match &args.data {
        Some(path) => match Store::open(path).await {
            Ok(store) => store,
            Err(err) => {
                error!(path = %path.display(), %err, "failed to load snapshot");
                return Err(io::Error::other(err.to_string()));
            }
        },
        None => Store::in_memory(Tables::default()),
    };

    if args.admin_tokens.is_empty() {
        info!("no admin tokens configured, the API is read-only");
    }

    let state = AppState::new(
        store,
        cache::Config {
            enabled: args.enable_cache,
            ..cache::Config::default()
        },
        throttle::Config {
            requests: args.rate_limit,
            ..throttle::Config::default()
        },
        Arc::new(SystemClock),
        args.admin_tokens,
    );

    let listener = TcpListener::bind(args.address).await?;
    info!("listening at http://{}", args.address);

    let app = mikosite_server::router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = signal::ctrl_c().await {
                error!(%err, "failed to listen for shutdown signal");
            }
            info!("shutting down");
        })
        .await
}
