use crate::membership::ServerId;
use std::convert::TryFrom;
use std::net::{IpAddr, SocketAddr};

/// Where every replica listens. All replicas of a deployment share one layout, so any replica
/// can work out any other replica's address from its id.
#[derive(Copy, Clone, Debug)]
pub(crate) struct PortLayout {
    pub host: IpAddr,
    pub master_command_port: u16,
    pub bootstrap_port: u16,
    pub follower_port_base: u16,
}

impl PortLayout {
    /// `None` if the id pushes the port past `u16::MAX`.
    pub(crate) fn follower_port(&self, id: ServerId) -> Option<u16> {
        let port = u32::from(self.follower_port_base).checked_add(id.as_u32())?;
        u16::try_from(port).ok()
    }

    pub(crate) fn follower_addr(&self, id: ServerId) -> Option<SocketAddr> {
        self.follower_port(id).map(|port| self.addr(port))
    }

    pub(crate) fn master_addr(&self) -> SocketAddr {
        self.addr(self.master_command_port)
    }

    pub(crate) fn bootstrap_addr(&self) -> SocketAddr {
        self.addr(self.bootstrap_port)
    }

    fn addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.host, port)
    }
}
