//! Destinations for raw packets

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::types::RawPacket;

/// Anything that accepts packets from a producer thread without blocking.
pub trait PacketSink: Send + Sync {
    /// Returns `false` when the packet was rejected (e.g. the consumer stopped).
    fn accept(&self, packet: RawPacket) -> bool;
}

impl PacketSink for mpsc::UnboundedSender<RawPacket> {
    fn accept(&self, packet: RawPacket) -> bool {
        self.send(packet).is_ok()
    }
}

impl<S: PacketSink + ?Sized> PacketSink for Arc<S> {
    fn accept(&self, packet: RawPacket) -> bool {
        (**self).accept(packet)
    }
}
