use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use adept_depp::Manager;
use adept_depp::probe::{self, ProbeOptions};

#[cfg(not(any(feature = "runtime", feature = "sim")))]
compile_error!("depp-probe needs either the `runtime` or the `sim` feature");

/// Checks that a DEPP device can be reached: versions, enumeration, open,
/// enable, one register read, close.
#[derive(Debug, Parser)]
#[command(name = "depp-probe", version)]
struct Args {
    /// Device name or connection string to open.
    #[arg(default_value = "CmodS6")]
    selector: String,

    /// Register address to read.
    #[arg(short, long, default_value_t = 5)]
    register: u8,

    /// Transaction timeout to request, in nanoseconds.
    #[arg(short, long)]
    timeout_ns: Option<u32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let options = ProbeOptions {
        selector: args.selector,
        register: args.register,
        timeout_ns: args.timeout_ns,
    };

    let report = probe::run(&manager(), &options)
        .with_context(|| format!("probing `{}` failed", options.selector))?;

    println!("DMGR {}", report.manager_version);
    println!("DEPP {}", report.transport_version);
    for device in &report.devices {
        println!("{:<16} {:<24} {}", device.name, device.connection, device.transport);
    }
    if let Some(timeout_ns) = report.timeout_ns {
        println!("timeout {timeout_ns} ns");
    }
    println!("register {} = {:#04x}", report.register, report.value);
    Ok(())
}

#[cfg(feature = "runtime")]
fn manager() -> Manager<adept_depp::Runtime> {
    Manager::runtime()
}

#[cfg(all(feature = "sim", not(feature = "runtime")))]
fn manager() -> Manager<adept_depp::sim::Simulator> {
    use adept_depp::Transport;
    use adept_depp::sim::{SimDevice, Simulator};

    tracing::warn!("built without the `runtime` feature, probing a simulated board");
    let board = SimDevice::new("CmodS6", "SN:210328000000", Transport::Usb).with_register(5, 0x5a);
    Manager::new(Simulator::new().with_device(board))
}
