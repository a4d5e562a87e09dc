//! Verbindungszähler für Protokoll-Sessions
//!
//! Wird vom Session-Task hoch- und runtergezählt und vom
//! `NoteProtocolSink` gelesen. Atomic, damit er als `static`
//! zwischen Tasks geteilt werden kann.
//!
//! `PeerTable` führt die Gegenstellen und ist die einzige Stelle, die den
//! Zähler verändert: genau ein `connect()` pro aufgenommener und ein
//! `disconnect()` pro entfernter Gegenstelle.

use core::sync::atomic::{AtomicU8, Ordering};

use heapless::Vec;

use crate::traits::SessionState;

pub struct SessionCounter(AtomicU8);

impl SessionCounter {
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    pub fn connect(&self) -> u8 {
        self.0.fetch_add(1, Ordering::Relaxed).saturating_add(1)
    }

    /// Zählt nie unter 0
    pub fn disconnect(&self) -> u8 {
        let previous = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                Some(count.saturating_sub(1))
            })
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

impl Default for SessionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState for SessionCounter {
    fn connected_sessions(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Verbundene Gegenstelle, `E` ist der Endpoint-Typ des Netzwerk-Stacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer<E> {
    pub ssrc: u32,
    pub endpoint: E,
}

/// Gegenstellen einer Session, höchstens `P` gleichzeitig
pub struct PeerTable<'c, E, const P: usize> {
    peers: Vec<Peer<E>, P>,
    counter: &'c SessionCounter,
}

impl<'c, E, const P: usize> PeerTable<'c, E, P> {
    pub fn new(counter: &'c SessionCounter) -> Self {
        Self {
            peers: Vec::new(),
            counter,
        }
    }

    /// Nimmt eine Gegenstelle auf, `false` wenn alle Slots belegt sind
    ///
    /// Eine erneute Einladung derselben SSRC frischt nur den Endpoint auf.
    pub fn accept(&mut self, ssrc: u32, endpoint: E) -> bool {
        if let Some(peer) = self.peers.iter_mut().find(|peer| peer.ssrc == ssrc) {
            peer.endpoint = endpoint;
            return true;
        }
        if self.peers.push(Peer { ssrc, endpoint }).is_err() {
            return false;
        }
        self.counter.connect();
        true
    }

    /// Entfernt die Gegenstelle, liefert die verbleibende Anzahl
    ///
    /// Unbekannte SSRCs (abgelehnt oder bereits beendet) ändern nichts.
    pub fn end(&mut self, ssrc: u32) -> Option<u8> {
        let index = self.peers.iter().position(|peer| peer.ssrc == ssrc)?;
        self.peers.swap_remove(index);
        Some(self.counter.disconnect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer<E>> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_disconnect() {
        let counter = SessionCounter::new();
        assert!(!counter.is_connected());

        assert_eq!(counter.connect(), 1);
        assert_eq!(counter.connect(), 2);
        assert_eq!(counter.disconnect(), 1);
        assert!(counter.is_connected());
    }

    #[test]
    fn test_disconnect_saturates() {
        let counter = SessionCounter::new();
        assert_eq!(counter.disconnect(), 0);
        assert_eq!(counter.connected_sessions(), 0);
    }

    #[test]
    fn test_peer_table_counts_each_session_once() {
        let counter = SessionCounter::new();
        let mut peers = PeerTable::<u16, 2>::new(&counter);

        assert!(peers.accept(1, 5004));
        // Erneute Einladung zählt nicht doppelt
        assert!(peers.accept(1, 5006));
        assert_eq!(counter.connected_sessions(), 1);
        assert_eq!(peers.iter().next().map(|peer| peer.endpoint), Some(5006));

        assert_eq!(peers.end(1), Some(0));
        assert_eq!(peers.end(1), None);
        assert_eq!(counter.connected_sessions(), 0);
    }

    #[test]
    fn test_rejected_peer_end_keeps_live_session() {
        let counter = SessionCounter::new();
        let mut peers = PeerTable::<u16, 1>::new(&counter);

        assert!(peers.accept(0xA, 5004));
        // Kein Slot frei für B
        assert!(!peers.accept(0xB, 6004));
        assert_eq!(peers.end(0xB), None);

        assert_eq!(peers.len(), 1);
        assert!(counter.is_connected());
    }
}
