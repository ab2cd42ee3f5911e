//! ARINC 615A firmware-upload target binary.
//!
//! # Usage
//!
//! ```bash
//! loader-app --bind 0.0.0.0:69 --keys-mount /keys --firmware-mount /firmware
//! ```

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use loader_app::{
    config::DEFAULT_FIRMWARE_MOUNT_POINT, maintenance_trigger::DEFAULT_GPIO_VALUE_PATH,
    GpioMaintenanceTrigger, LoaderConfig, LoaderDriver,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ARINC 615A firmware-upload target
#[derive(Parser, Debug)]
#[command(name = "loader-app")]
#[command(about = "Target-side ARINC 615A firmware-upload session driver")]
#[command(version)]
struct Args {
    /// Address the main TFTP socket binds to
    #[arg(short, long, default_value = "0.0.0.0:69")]
    bind: SocketAddr,

    /// Key partition mount point
    #[arg(long, default_value = loader_crypto::DEFAULT_KEYS_MOUNT_POINT)]
    keys_mount: PathBuf,

    /// Firmware partition mount point
    #[arg(long, default_value = DEFAULT_FIRMWARE_MOUNT_POINT)]
    firmware_mount: PathBuf,

    /// Maintenance trigger GPIO sysfs value file
    #[arg(long, default_value = DEFAULT_GPIO_VALUE_PATH)]
    maintenance_gpio: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("loader-app starting");
    tracing::info!(bind = %args.bind, "binding main TFTP socket");

    let config = LoaderConfig {
        bind_addr: args.bind,
        keys_mount: args.keys_mount,
        staging_path: args.firmware_mount.join("staging.bin"),
        final_path: args.firmware_mount.join("final.bin"),
        firmware_mount: args.firmware_mount,
        ..LoaderConfig::default()
    };

    let trigger = GpioMaintenanceTrigger::new(args.maintenance_gpio);
    let driver = LoaderDriver::new(config, trigger)?;

    driver.run().await?;

    Ok(())
}
