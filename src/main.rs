use actix_web::{web, App, HttpServer};
use colored::Colorize;

use content_server::api::{self, AppState};
use content_server::utils;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = utils::load_config().map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", e)))?;
    let state = AppState::from_config(config.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", e)))?;
    let state = web::Data::new(state);

    println!(
        "{} serving {} on http://{}:{}",
        "content_server".green().bold(),
        config.content_storage_dir.cyan(),
        config.bind_address,
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::configure)
    })
        .bind((config.bind_address.as_str(), config.port))?
        .run()
        .await
}
