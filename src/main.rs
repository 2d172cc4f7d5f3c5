use std::sync::Arc;
use tokio::net::TcpListener;

use tenantgate::config::Config;
use tenantgate::notify::Notifier;
use tenantgate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenantgate=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();
    print_banner(&config);

    let db = tenantgate::db::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");

    let state = AppState {
        db,
        notifier: Notifier::from_url(config.notify_url.as_deref()),
        invite_policy: config.invite_policy(),
        admin_guard: config.admin_guard(),
        invite_base_url: Arc::from(config.invite_base_url.as_str()),
    };

    let app = tenantgate::routes::router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");

    let actual_port = listener
        .local_addr()
        .expect("failed to get local address")
        .port();
    eprintln!("  \x1b[32m→ listening on 0.0.0.0:{actual_port}\x1b[0m");
    eprintln!();

    axum::serve(listener, app).await.expect("server error");
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let notify = config.notify_url.as_deref().unwrap_or("log only");

    eprintln!();
    eprintln!("  \x1b[1;36mtenantgate\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mport\x1b[0m         {}", config.port);
    eprintln!("  \x1b[2mdatabase\x1b[0m     {}", config.database_url);
    eprintln!("  \x1b[2mnotify\x1b[0m       {notify}");
    eprintln!(
        "  \x1b[2minvites\x1b[0m      {}h, {} otp attempt(s)",
        config.invite_ttl_hours, config.max_otp_attempts
    );
    eprintln!("  \x1b[2madmins\x1b[0m       at least {} per service", config.min_admins);
    eprintln!();
}
