use std::io;
use std::process::Command;

use tracing::info;

/// Run `ip` with `args`, failing if it exits unsuccessfully.
fn ip(args: &[&str]) -> io::Result<()> {
    let status = Command::new("ip").args(args).status()?;
    if !status.success() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("`ip {}` failed: {}", args.join(" "), status),
        ));
    }
    Ok(())
}

/// Assign `ip_cidr` to the TUN device `iface_name` and bring it up.
pub fn configure_interface(iface_name: &str, ip_cidr: &str) -> io::Result<()> {
    ip(&["addr", "add", ip_cidr, "dev", iface_name])?;
    ip(&["link", "set", "up", "dev", iface_name])?;

    info!(iface = iface_name, cidr = ip_cidr, "interface configured and up");
    Ok(())
}
