mod config;
mod error;
mod interactions;
mod rooms;
mod saver;

use actix_web::{middleware, web, App, HttpServer};
use config::Config;
use guildplan_libs::{FileStore, RoomStore};
use rooms::Rooms;
use std::io;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub config: Config,
    pub rooms: Rooms,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RoomStore>) -> AppState {
        AppState {
            rooms: Rooms::new(store, config.save_debounce, config.session_idle),
            config,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    interactions::configure(cfg);
    rooms::configure(cfg);
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env();
    let store = FileStore::open(&config.data_dir)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    info!("storing rooms in {}", store.dir().display());

    let (bind, port) = (config.bind.clone(), config.port);
    let state = web::Data::new(AppState::new(config, Arc::new(store)));

    info!("listening on {}:{}", bind, port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((bind.as_str(), port))?
    .run()
    .await
}
