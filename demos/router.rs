//! RIPv2 router over Linux TUN devices.
//!
//! Each `--iface` is one router interface; the matching `--tun` device is
//! opened and, with `--configure`, given a host-side address. For example:
//!
//! ```text
//! sudo cargo run --example router -- \
//!     --iface 10.0.1.1/24 --tun rip0 --host 10.0.1.2/24 \
//!     --iface 10.0.2.1/24 --tun rip1 --host 10.0.2.2/24 --configure
//! ```

mod utils;

use std::error::Error;
use std::time::Duration;

use clap::Parser;
use tracing::{info, Level};

use rip_router::config::DEFAULT_UPDATE_INTERVAL;
use rip_router::{logging, Router, RouterConfig, SystemClock, TunLink, UnreachablePolicy};

#[derive(Parser, Debug)]
#[command(version, about = "A small RIPv2 router")]
struct Cli {
    /// Router interface address, ADDRESS/LEN; repeat once per interface
    #[arg(long = "iface", value_name = "CIDR", required = true)]
    ifaces: Vec<String>,

    /// TUN device for the interface at the same position
    #[arg(long = "tun", value_name = "NAME")]
    tuns: Vec<String>,

    /// Host-side address of each TUN device, used with --configure
    #[arg(long = "host", value_name = "CIDR")]
    hosts: Vec<String>,

    /// Assign the --host addresses and bring the devices up
    #[arg(long)]
    configure: bool,

    /// Seconds between unsolicited updates
    #[arg(long, default_value_t = DEFAULT_UPDATE_INTERVAL.as_secs())]
    interval: u64,

    /// Upper bound on routes in the table
    #[arg(long)]
    max_routes: Option<usize>,

    /// Drop undeliverable datagrams instead of answering with ICMP
    #[arg(long)]
    silent: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init(if cli.verbose { Level::DEBUG } else { Level::INFO })?;

    let mut config = RouterConfig::from_cidrs(&cli.ifaces[..])?;
    config.update_interval = Duration::from_secs(cli.interval);
    config.max_routes = cli.max_routes;
    if cli.silent {
        config.unreachable = UnreachablePolicy::Drop;
    }

    let names: Vec<String> = (0..cli.ifaces.len())
        .map(|i| cli.tuns.get(i).cloned().unwrap_or_else(|| format!("rip{}", i)))
        .collect();
    let link = TunLink::open(&names[..])?;

    if cli.configure {
        for (name, host) in link.names().into_iter().zip(&cli.hosts) {
            utils::configure_interface(name, host)?;
        }
    }

    info!(devices = ?link.names(), "router starting");
    let mut router = Router::new(config, link)?;
    router.run(&SystemClock)?;
    Ok(())
}
