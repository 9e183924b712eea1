//! Port allocation for exporter web listeners.

use std::net::{Ipv4Addr, TcpListener};

use crate::PatchError;

/// Hands out listen ports for per-instance exporters.
pub trait PortAllocator {
    /// Return a port no other exporter of this run uses.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::PortAllocation`] if no port is available.
    fn allocate(&mut self) -> Result<u16, PatchError>;
}

/// Asks the operating system for a free port on the loopback interface.
///
/// The bound socket is closed before the port is returned, so another
/// process could in principle take it before the exporter starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralPorts;

impl PortAllocator for EphemeralPorts {
    fn allocate(&mut self) -> Result<u16, PatchError> {
        let listener =
            TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(PatchError::PortAllocation)?;
        let port = listener
            .local_addr()
            .map_err(PatchError::PortAllocation)?
            .port();
        Ok(port)
    }
}

/// Hands out consecutive ports from a starting value.
#[derive(Debug, Clone, Copy)]
pub struct SequentialPorts {
    next: Option<u16>,
}

impl SequentialPorts {
    /// Start handing out ports at `first`.
    pub fn starting_at(first: u16) -> Self {
        Self { next: Some(first) }
    }
}

impl PortAllocator for SequentialPorts {
    fn allocate(&mut self) -> Result<u16, PatchError> {
        let port = self.next.ok_or_else(|| {
            PatchError::PortAllocation(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "port sequence exhausted",
            ))
        })?;
        self.next = port.checked_add(1);
        Ok(port)
    }
}

impl<P: PortAllocator + ?Sized> PortAllocator for &mut P {
    fn allocate(&mut self) -> Result<u16, PatchError> {
        (**self).allocate()
    }
}
