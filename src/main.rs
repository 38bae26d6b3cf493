use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod store;
mod utils;

#[cfg(test)]
mod test_support;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::utils::username_cache;
use crate::utils::username_filter;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi; // needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HR Desk is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(backend = ?config.storage_backend, "Server starting...");

    let db = Data::new(init_db(&config).await.inspect_err(|e| {
        error!(error = %e, "Failed to open storage");
    })?);

    let db_for_filter_warmup = db.clone();
    let db_for_cache_warmup = db.clone();
    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());

    actix_web::rt::spawn(async move {
        if let Err(e) = username_filter::warmup_username_filter(&db_for_filter_warmup, 100).await {
            error!(error = %e, "Failed to warmup username filter");
        }
    });

    actix_web::rt::spawn(async move {
        // users seen in the last 30 days, in batches of 250
        if let Err(e) = username_cache::warmup_username_cache(&db_for_cache_warmup, 30, 250).await
        {
            error!(error = %e, "Failed to warmup username cache");
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(db.clone())
            .app_data(config_data.clone())
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await
    .context("server stopped with an error")
}
