use clap::Parser;
use tollgate::cli::{
    Args, build_config, handle_generate_keys, handle_promote_admin, init_logging,
    load_token_codec, open_database,
};
use tollgate::{init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    if let Some(dir) = &args.generate_keys {
        let ok = handle_generate_keys(dir);
        std::process::exit(if ok { 0 } else { 1 });
    }

    // A codec that cannot sign is fatal; refuse to serve.
    let Some(codec) = load_token_codec(args.keys_dir.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(email) = &args.promote_admin {
        if !handle_promote_admin(&db, email).await {
            std::process::exit(1);
        }
    }

    init_cleanup(&db).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(_) => info!(address = %addr, "Listening"),
    }

    let config = build_config(&args, db, codec);
    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
