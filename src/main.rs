// Copyright (c) 2022 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

#![forbid(non_ascii_idents)]
#![deny(unsafe_code)]

use std::io;
use std::net::TcpListener;
use std::path::Path;

use actix::Actor;
use actix_web::{middleware, web, App, HttpServer};
use clap::{arg, Command};
use log::info;

use enhanced_people::configuration::{get_configuration, get_driver_metadata, DEF_CONFIG_FILE};
use enhanced_people::server::{json_error_handler, ws_index};
use enhanced_people::{built_info, Controller, APP_VERSION};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let args = Command::new(built_info::PKG_NAME)
        .author("Unfolded Circle Aps")
        .version(APP_VERSION)
        .about("Enhanced People integration for Home Assistant")
        .arg(arg!(-c --config <FILE> "Configuration file").required(false))
        .get_matches();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg_file = match args.get_one::<String>("config").map(String::as_str) {
        None => {
            if Path::new(DEF_CONFIG_FILE).exists() {
                info!("Loading default configuration file: {DEF_CONFIG_FILE}");
                Some(DEF_CONFIG_FILE)
            } else {
                None
            }
        }
        Some(c) => Some(c),
    };
    let cfg = get_configuration(cfg_file)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    let driver_metadata = get_driver_metadata()?;

    if !cfg.integration.http.enabled {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "The http listener must be enabled",
        ));
    }
    let address = format!("{}:{}", cfg.integration.interface, cfg.integration.http.port);
    println!("{} listening on: {address}", built_info::PKG_NAME);
    let listener = TcpListener::bind(address)?;

    let websocket_settings = web::Data::new(cfg.integration.websocket.clone().unwrap_or_default());
    let controller = web::Data::new(Controller::new(cfg, driver_metadata).start());

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(
                web::JsonConfig::default()
                    .limit(16 * 1024) // limit size of the payload (global configuration)
                    .error_handler(json_error_handler),
            )
            .app_data(websocket_settings.clone())
            .app_data(controller.clone())
            // WebSockets
            .service(ws_index)
    })
    .workers(1)
    .listen(listener)?
    .run()
    .await?;

    Ok(())
}
