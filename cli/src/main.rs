mod commands;
mod terminal;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use arpcast_common::config::Config;
use arpcast_core::broker;
use arpcast_core::driver::ScanLoop;
use arpcast_core::scanner::ArpScanner;
use arpcast_core::system;
use commands::CommandLine;
use terminal::print;
use terminal::progress::ConsoleObserver;
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let commands = CommandLine::parse_args();

    terminal::logging::init_logging(commands.verbose)?;
    print::banner();

    print::header("loading configuration");
    let config = match Config::load(&commands.config) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("[config]: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    print::aligned_line("file", commands.config.display());
    config.log_summary();
    let privileged = system::check_privileges();
    print::aligned_line("privilege", if privileged { "root" } else { "unprivileged" });

    print::header("connecting to broker");
    let (link, supervisor) = broker::connect(&config.mqtt, &config.reconnect)
        .with_context(|| format!("setting up MQTT link to {}:{}", config.mqtt.ip, config.mqtt.port))?;
    print::aligned_line("client id", &config.mqtt.client_id);
    print::aligned_line("topic", &config.mqtt.topic);
    print::fat_separator();

    let observer = ConsoleObserver::new().with_link(link.state());
    let scan_loop = ScanLoop::new(config, Arc::new(ArpScanner), Arc::new(link))
        .with_observer(Arc::new(observer));

    tokio::select! {
        _ = scan_loop.run() => Ok(ExitCode::SUCCESS),
        joined = supervisor => {
            match joined {
                Ok(()) => error!("[mqtt]: link supervisor stopped"),
                Err(e) => error!("[mqtt]: link supervisor crashed: {e}"),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
