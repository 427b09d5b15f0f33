//! A [`LinkLayer`] over Linux TUN devices, one device per router interface.
//!
//! TUN devices carry bare IP datagrams and are point-to-point, so there is
//! no link address to learn: every next hop resolves to the zero address.

use std::io;

use tracing::debug;
use tun_tap::{Iface, Mode};

use super::link::{LinkLayer, MacAddr, Received};
use crate::route::InterfaceId;

const NO_LINK_ADDRESS: MacAddr = [0; 6];

pub struct TunLink {
    ifaces: Vec<Iface>,
    // interface polled first on the next receive, so one busy device
    // cannot starve the others
    next: usize,
}

impl TunLink {
    /// Open (or create) the named TUN devices. Interface `i` of the router
    /// is `names[i]`.
    pub fn open<S: AsRef<str>>(names: &[S]) -> io::Result<Self> {
        let ifaces = names
            .iter()
            .map(|name| {
                let iface = Iface::without_packet_info(name.as_ref(), Mode::Tun)?;
                iface.set_non_blocking()?;
                debug!(name = iface.name(), "opened TUN device");
                Ok(iface)
            })
            .collect::<io::Result<Vec<_>>>()?;

        Ok(TunLink { ifaces, next: 0 })
    }

    /// Kernel names of the devices, in interface order.
    pub fn names(&self) -> Vec<&str> {
        self.ifaces.iter().map(|iface| iface.name()).collect()
    }

    fn iface(&self, interface: InterfaceId) -> io::Result<&Iface> {
        self.ifaces.get(interface as usize).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no TUN device for interface {}", interface),
            )
        })
    }
}

impl LinkLayer for TunLink {
    fn recv_frame(&mut self, buf: &mut [u8]) -> io::Result<Received> {
        if self.ifaces.is_empty() {
            return Ok(Received::Closed);
        }

        let count = self.ifaces.len();
        for offset in 0..count {
            let index = (self.next + offset) % count;
            match self.ifaces[index].recv(buf) {
                Ok(len) => {
                    self.next = (index + 1) % count;
                    return Ok(Received::Frame {
                        interface: index as InterfaceId,
                        len,
                        src: NO_LINK_ADDRESS,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(Received::Idle)
    }

    fn send_frame(
        &mut self,
        interface: InterfaceId,
        packet: &[u8],
        _dest: MacAddr,
    ) -> io::Result<()> {
        self.iface(interface)?.send(packet)?;
        Ok(())
    }

    fn resolve_link_address(&mut self, interface: InterfaceId, _next_hop: u32) -> Option<MacAddr> {
        self.iface(interface).ok().map(|_| NO_LINK_ADDRESS)
    }
}
