use std::process;
use waypoint::config::Config;
use waypoint::logger::{log, set_min_severity, LogSeverity::*};
use waypoint::server;

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            log(format!("Failed to load config: {}", err), Fatal);
            process::exit(1);
        }
    };
    set_min_severity(config.log_level);

    log("Waypoint init".to_string(), Info);
    if let Err(err) = server::run(config).await {
        log(format!("Failed to start proxy: {}", err), Fatal);
        process::exit(1);
    }
}
