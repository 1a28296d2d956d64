use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db_path = std::env::var("MARQUEE_DB").unwrap_or_else(|_| "marquee.db".to_string());
    info!(db_path = %db_path, "connecting to database");

    let pool = marquee_db::connect(&db_path)
        .await
        .context("failed to connect to database")?;

    marquee_db::migrate::run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("migrations complete");

    // Bootstrap an administrator on an empty database when credentials are given.
    let account_count = marquee_db::repo::accounts::count_accounts(&pool)
        .await
        .context("failed to count accounts")?;

    if account_count == 0 {
        match (
            std::env::var("MARQUEE_ADMIN_EMAIL"),
            std::env::var("MARQUEE_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => {
                let email = email.trim().to_lowercase();
                marquee_db::repo::accounts::create_admin_account(&pool, &email, &password)
                    .await
                    .context("failed to bootstrap admin account")?;
                info!(email = %email, "admin account bootstrapped");
            }
            _ => warn!("no accounts exist and MARQUEE_ADMIN_EMAIL/MARQUEE_ADMIN_PASSWORD are unset"),
        }
    }

    let jwt_secret = std::env::var("MARQUEE_JWT_SECRET")
        .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

    let federated_secret = std::env::var("MARQUEE_FEDERATED_SECRET").ok();
    if federated_secret.is_none() {
        info!("federated sign-in disabled");
    }

    let blob_dir: std::path::PathBuf = std::env::var("MARQUEE_BLOB_DIR")
        .unwrap_or_else(|_| "/tmp/marquee_blobs".to_string())
        .into();
    std::fs::create_dir_all(&blob_dir).context("failed to create blob dir")?;

    let public_url =
        std::env::var("MARQUEE_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

    let app_state = marquee_server::state::AppState {
        db: pool,
        jwt_secret,
        federated_secret,
        blob_dir,
        public_url,
    };

    let app = marquee_server::routes::build_router(app_state);

    let bind_addr = std::env::var("MARQUEE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %bind_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}
