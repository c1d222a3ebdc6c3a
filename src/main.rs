mod config;
mod db;
mod error;
mod handlers;
mod ledger;
mod middleware;
mod models;
mod quotes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use config::Config;
use handlers::{
    buy, buy_form, history, index, login, login_form, logout, quote, quote_form, register,
    register_form, sell, sell_form,
};
use quotes::HttpQuoteClient;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    let pool = db::create_pool(&config).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let quotes = Arc::new(HttpQuoteClient::new(
        config.quote_api_url.clone(),
        config.quote_api_key.clone(),
    ));

    let state = AppState {
        pool,
        config: config.clone(),
        quotes,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/", get(index))
        .route("/buy", get(buy_form).post(buy))
        .route("/sell", get(sell_form).post(sell))
        .route("/quote", get(quote_form).post(quote))
        .route("/history", get(history))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/register", get(register_form).post(register))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    log::info!("listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}
