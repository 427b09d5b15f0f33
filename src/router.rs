//! The router: dispatches received datagrams and sends periodic updates.
//!
//! A datagram addressed to one of the router's own addresses or to the RIP
//! group is consumed as RIP; anything else is forwarded. All state lives in
//! one [`RoutingTable`] owned by the [`Router`], and every datagram is
//! handled to completion through `&mut self`, so no lookup ever observes a
//! half-applied update.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{RouterConfig, UnreachablePolicy};
use crate::error::{ChecksumError, RouterError};
use crate::forward::{forward, Decision};
use crate::iface::{Clock, LinkLayer, MacAddr, Received, RIP_MULTICAST_MAC};
use crate::network::icmp::IcmpKind;
use crate::network::ipv4::{from_ipv4, protocol, to_ipv4, Ipv4Header};
use crate::network::{compute_checksum, validate_checksum};
use crate::rip::{
    build_datagram, build_datagram_to, disassemble, Command, FormatError, RipMessage,
    RIP_MULTICAST, RIP_PORT,
};
use crate::route::{
    answer_request, apply_response, build_responses, mask, InterfaceId, Route, RoutingTable,
    UpdateSummary,
};
use crate::transport::UdpHeader;

/// Largest datagram the receive loop accepts
const MAX_DATAGRAM: usize = 2048;
/// Pause when no link had anything to read
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Why a datagram was dropped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NoRoute,
    NoLinkAddress,
    Malformed,
}

/// What happened to one received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A RIP response was applied to the table
    Updated(UpdateSummary),
    /// A RIP request was answered with `messages` responses
    Answered { messages: usize },
    /// The datagram went out of `interface`
    Forwarded { interface: InterfaceId },
    /// An ICMP error went back to the source
    IcmpSent(IcmpKind),
    Dropped(DropReason),
    /// Addressed to the router but not RIP, or a response from a source
    /// that cannot be a neighbour
    Ignored,
}

pub struct Router<L> {
    config: RouterConfig,
    table: RoutingTable,
    link: L,
    last_update: Option<Instant>,
}

impl<L: LinkLayer> Router<L> {
    /// Create a router and install a direct route for every interface.
    pub fn new(config: RouterConfig, link: L) -> Result<Self, RouterError> {
        config.validate()?;

        let mut table = match config.max_routes {
            Some(limit) => RoutingTable::with_limit(limit),
            None => RoutingTable::new(),
        };
        for (index, iface) in config.interfaces.iter().enumerate() {
            let route = Route::direct(iface.network(), iface.prefix_len, index as InterfaceId);
            info!(interface = index, %route, "direct route");
            table.upsert(route);
        }

        Ok(Router {
            config,
            table,
            link,
            last_update: None,
        })
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// The table, for drivers that expire or install routes themselves.
    pub fn table_mut(&mut self) -> &mut RoutingTable {
        &mut self.table
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Address of `interface`, network order; zero for an unknown interface.
    fn local_addr(&self, interface: InterfaceId) -> u32 {
        self.config
            .interfaces
            .get(interface as usize)
            .map_or(0, |iface| iface.addr())
    }

    fn is_local(&self, addr: u32) -> bool {
        addr == from_ipv4(RIP_MULTICAST) || self.config.interfaces.iter().any(|i| i.addr() == addr)
    }

    /// Whether `addr` can be a neighbouring router on `interface`: some other
    /// host inside the interface's network.
    fn is_neighbour(&self, interface: InterfaceId, addr: u32) -> bool {
        let Some(iface) = self.config.interfaces.get(interface as usize) else {
            return false;
        };
        addr != 0 && !self.is_local(addr) && addr & mask(iface.prefix_len) == iface.network()
    }

    /// Ask every neighbour for its whole table.
    pub fn start(&mut self) -> Result<(), RouterError> {
        let request = RipMessage::full_table_request();
        let group = from_ipv4(RIP_MULTICAST);

        for (index, iface) in self.config.interfaces.iter().enumerate() {
            let packet = build_datagram(iface.addr(), group, &request);
            self.link
                .send_frame(index as InterfaceId, &packet, RIP_MULTICAST_MAC)?;
        }
        info!(interfaces = self.config.interfaces.len(), "requested neighbour tables");
        Ok(())
    }

    /// Handle one datagram received on `ingress` from link address `src`.
    pub fn handle_datagram(
        &mut self,
        ingress: InterfaceId,
        packet: &[u8],
        src: MacAddr,
    ) -> Result<Disposition, RouterError> {
        let header = Ipv4Header::from_bytes(packet).ok_or(FormatError::NotIpv4)?;
        if !validate_checksum(packet) {
            return Err(ChecksumError {
                stored: header.checksum,
                computed: compute_checksum(packet),
            }
            .into());
        }

        if self.is_local(header.dst_addr) {
            self.consume(ingress, &header, packet, src)
        } else {
            self.transit(ingress, packet, src)
        }
    }

    fn consume(
        &mut self,
        ingress: InterfaceId,
        header: &Ipv4Header,
        packet: &[u8],
        src: MacAddr,
    ) -> Result<Disposition, RouterError> {
        if header.protocol != protocol::UDP {
            return Ok(Disposition::Ignored);
        }
        let udp = packet
            .get(header.header_len()..)
            .and_then(UdpHeader::from_bytes)
            .ok_or(FormatError::Truncated)?;
        if udp.dst_port != RIP_PORT {
            return Ok(Disposition::Ignored);
        }

        let message = disassemble(packet)?;
        match message.command {
            Command::Request => {
                debug!(source = %header.source(), interface = ingress, "RIP request");
                let local = self.local_addr(ingress);
                let responses = if message.is_full_table_request() {
                    build_responses(&self.table, ingress, local)
                } else {
                    vec![answer_request(&self.table, &message)]
                };

                for response in &responses {
                    let datagram = build_datagram_to(local, header.src_addr, udp.src_port, response);
                    self.link.send_frame(ingress, &datagram, src)?;
                }
                Ok(Disposition::Answered {
                    messages: responses.len(),
                })
            }
            Command::Response => {
                if udp.src_port != RIP_PORT {
                    warn!(
                        source = %header.source(),
                        port = udp.src_port,
                        "ignoring response not sent from the RIP port"
                    );
                    return Ok(Disposition::Ignored);
                }
                if !self.is_neighbour(ingress, header.src_addr) {
                    warn!(
                        source = %header.source(),
                        interface = ingress,
                        "ignoring response from outside the attached network"
                    );
                    return Ok(Disposition::Ignored);
                }
                debug!(
                    source = %header.source(),
                    interface = ingress,
                    entries = message.entries.len(),
                    "RIP response"
                );
                let summary = apply_response(&mut self.table, &message.entries, ingress, header.src_addr);
                if summary.changed() {
                    debug!("routing table:\n{}", self.table);
                }
                Ok(Disposition::Updated(summary))
            }
        }
    }

    fn transit(
        &mut self,
        ingress: InterfaceId,
        packet: &[u8],
        src: MacAddr,
    ) -> Result<Disposition, RouterError> {
        let reply_from = self.local_addr(ingress);

        match forward(&self.table, &mut self.link, packet, reply_from) {
            Decision::Forward {
                interface,
                link_addr,
                packet,
            } => {
                self.link.send_frame(interface, &packet, link_addr)?;
                Ok(Disposition::Forwarded { interface })
            }
            Decision::TtlExceeded { reply } => {
                self.link.send_frame(ingress, &reply, src)?;
                Ok(Disposition::IcmpSent(IcmpKind::TimeExceeded))
            }
            Decision::Unreachable { reply } => match self.config.unreachable {
                UnreachablePolicy::Reply => {
                    self.link.send_frame(ingress, &reply, src)?;
                    Ok(Disposition::IcmpSent(IcmpKind::NetUnreachable))
                }
                UnreachablePolicy::Drop => Ok(Disposition::Dropped(DropReason::NoRoute)),
            },
            Decision::NoLinkAddress {
                interface,
                next_hop,
            } => {
                debug!(interface, next_hop = %to_ipv4(next_hop), "next hop not resolved");
                Ok(Disposition::Dropped(DropReason::NoLinkAddress))
            }
            Decision::Malformed => Ok(Disposition::Dropped(DropReason::Malformed)),
        }
    }

    /// Multicast the table out of every interface, split horizon applied.
    ///
    /// Returns the number of messages sent.
    pub fn send_updates(&mut self) -> Result<usize, RouterError> {
        let group = from_ipv4(RIP_MULTICAST);
        let mut sent = 0;

        for (index, iface) in self.config.interfaces.iter().enumerate() {
            let index = index as InterfaceId;
            for message in build_responses(&self.table, index, iface.addr()) {
                let packet = build_datagram(iface.addr(), group, &message);
                self.link.send_frame(index, &packet, RIP_MULTICAST_MAC)?;
                sent += 1;
            }
        }
        debug!(messages = sent, "sent periodic update");
        Ok(sent)
    }

    /// Send the periodic update if it is due at `now`.
    ///
    /// Returns whether an update went out.
    pub fn poll(&mut self, now: Instant) -> Result<bool, RouterError> {
        let due = self.last_update.map_or(true, |last| {
            now.saturating_duration_since(last) >= self.config.update_interval
        });
        if !due {
            return Ok(false);
        }

        self.last_update = Some(now);
        self.send_updates()?;
        Ok(true)
    }

    /// Run until the links close.
    ///
    /// Errors caused by a single datagram are logged and the datagram is
    /// dropped; only a failing link ends the loop early.
    pub fn run<C: Clock>(&mut self, clock: &C) -> Result<(), RouterError> {
        self.start()?;
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            if let Err(e) = self.poll(clock.now()) {
                warn!(error = %e, "periodic update failed");
            }

            match self.link.recv_frame(&mut buf)? {
                Received::Closed => {
                    info!("links closed, stopping");
                    return Ok(());
                }
                Received::Idle => thread::sleep(IDLE_BACKOFF),
                Received::Frame { len, .. } if len > buf.len() => {
                    warn!(len, "datagram larger than the receive buffer, dropped");
                }
                Received::Frame {
                    interface,
                    len,
                    src,
                } => match self.handle_datagram(interface, &buf[..len], src) {
                    Ok(disposition) => debug!(interface, ?disposition, "handled datagram"),
                    Err(e) => warn!(interface, error = %e, "dropped datagram"),
                },
            }
        }
    }
}
