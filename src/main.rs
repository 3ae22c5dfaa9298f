use std::net::SocketAddr;

use clap::Parser;
use sessiongate::cli::{Args, build_config, init_logging, load_directory, load_secrets};
use sessiongate::directory::MemoryDirectory;
use sessiongate::{create_app, init_cleanup};
use tracing::{error, info};

fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    // Secrets are removed from the environment, so they must be loaded
    // before the runtime starts its worker threads.
    let Some((access_secret, refresh_secret)) = load_secrets(&args) else {
        std::process::exit(1);
    };

    let Some(directory) = load_directory(args.users_file.as_deref()) else {
        std::process::exit(1);
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to start the async runtime");
            std::process::exit(1);
        });

    runtime.block_on(serve(args, directory, access_secret, refresh_secret));
}

async fn serve(
    args: Args,
    directory: MemoryDirectory,
    access_secret: String,
    refresh_secret: String,
) {
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();

    let config = build_config(&args, directory, access_secret, refresh_secret);
    init_cleanup(&config.sessions).await;
    let app = create_app(&config);

    info!(address = %local_addr, "Listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
