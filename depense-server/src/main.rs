#[macro_use]
extern crate tracing;

use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpServer};
use anyhow::Context;
use rustls::{Certificate, PrivateKey, ServerConfig};
use rustls_pemfile::{certs, pkcs8_private_keys};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;

use depense_lib::config::{Config, SSLConfig};

const SERVICE_NAME: &str = "depense-server";

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = registry::Registry::default()
        .with(LevelFilter::INFO)
        .with(tracing_subscriber::fmt::Layer::default());
    let tracing_guard = tracing::subscriber::set_default(subscriber);
    info!("tracing initialized");

    let config = match get_config_file() {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            warn!("Config file not found, reading config from environment");
            Config::from_env()?
        }
    };

    let telemetry_layer = match &config.telemetry {
        Some(telemetry) => Some(depense_lib::tracing::create_opentelemetry_layer(
            SERVICE_NAME,
            telemetry,
        )?),
        None => None,
    };
    let subscriber = registry::Registry::default()
        .with(LevelFilter::INFO)
        .with(tracing_subscriber::fmt::Layer::default())
        .with(telemetry_layer);
    tracing::subscriber::set_global_default(subscriber).context("Unable to set up subscriber")?;
    drop(tracing_guard);

    let depense_repo =
        depense_repo::sqlx_repo::create_repos(&config.database_url, config.max_pool_size).await?;
    info!(media_root = %config.media_root.display(), "Storing attachments");
    let attachment_store = depense_repo::fs_store::create_store(config.media_root.clone());
    let media_config = config.media_config();
    let cors_allowed_origins = config.cors_allowed_origins.clone();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(create_cors(&cors_allowed_origins))
            .wrap(depense_lib::tracing::create_middleware())
            .configure(depense_lib::configure_app(
                depense_repo.clone(),
                attachment_store.clone(),
                media_config.clone(),
            ))
    });
    let server = match config.ssl {
        None => {
            warn!("Using http");
            server.bind(&config.bind_address)?
        }
        Some(ssl_config) => {
            info!("Using https");
            server.bind_rustls(&config.bind_address, load_rustls_config(ssl_config)?)?
        }
    };
    server.run().await?;

    Ok(())
}

fn create_cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);
    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

fn load_rustls_config(ssl_config: SSLConfig) -> Result<ServerConfig, anyhow::Error> {
    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth();

    let mut cert_file = BufReader::new(
        File::open(ssl_config.certificate_chain_file)
            .context("Error opening certificate chain file")?,
    );
    let mut key_file = BufReader::new(
        File::open(ssl_config.private_key_file).context("Error opening private key file")?,
    );

    let cert_chain = certs(&mut cert_file)
        .context("Unable to read certificate chain file")?
        .into_iter()
        .map(Certificate)
        .collect();
    let mut keys: Vec<PrivateKey> = pkcs8_private_keys(&mut key_file)
        .context("Unable to read private key file")?
        .into_iter()
        .map(PrivateKey)
        .collect();

    if keys.is_empty() {
        anyhow::bail!("No private key found in file");
    }

    config
        .with_single_cert(cert_chain, keys.remove(0))
        .context("Invalid certificate or private key")
}

fn get_config_file() -> Option<PathBuf> {
    let config_current_dir = PathBuf::from("config.toml");
    if config_current_dir.exists() {
        return Some(config_current_dir);
    }
    if let Ok(config_env) = std::env::var("CONFIGURATION_DIRECTORY") {
        let config_path = PathBuf::from(config_env).join("config.toml");
        if config_path.exists() {
            return Some(config_path);
        }
    }

    None
}
