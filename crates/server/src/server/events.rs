//! Event batching.
//!
//! Direct events go to one client and are drained after the intent or tick that
//! produced them. Broadcast events are queued and compiled into a single payload
//! at most every `flush_interval_ms`.

use bytes::Bytes;
use std::collections::HashMap;
use protocol::packets::ServerEvent;
use protocol::{ProtocolError, compile};

/// A compiled frame bound for the transport.
#[derive(Debug, Clone)]
pub enum Outgoing {
    /// Goes to every connection.
    Broadcast(Bytes),
    Direct { client_id: u32, payload: Bytes },
    /// Closes one connection after everything before it was sent.
    Close { client_id: u32 },
}

impl Outgoing {
    /// Whether this frame should be written to `client_id`'s socket.
    pub fn is_for(&self, client_id: u32) -> bool {
        match self {
            Outgoing::Broadcast(_) => true,
            Outgoing::Direct { client_id: target, .. } | Outgoing::Close { client_id: target } => {
                *target == client_id
            }
        }
    }
}

/// Ordered log of a round's broadcast events.
#[derive(Debug, Default)]
pub struct RoundLog {
    pub entries: Vec<(u64, ServerEvent)>,
    /// Last recorded player update per client.
    last_update_recorded: HashMap<u32, u64>,
}

impl RoundLog {
    /// Record an event. Player updates are thinned to one per client every `update_interval_ms`.
    pub fn record(&mut self, event: &ServerEvent, now: u64, update_interval_ms: u64) -> bool {
        if let Some(id) = event.player_update_id() {
            if let Some(&last) = self.last_update_recorded.get(&id) {
                if now.saturating_sub(last) <= update_interval_ms {
                    return false;
                }
            }
            self.last_update_recorded.insert(id, now);
        }
        self.entries.push((now, event.clone()));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_update_recorded.clear();
    }
}

/// Pending events plus compiled frames waiting for the transport.
#[derive(Debug, Default)]
pub struct Outbox {
    direct: Vec<(u32, ServerEvent)>,
    queue: Vec<ServerEvent>,
    outgoing: Vec<Outgoing>,
    last_flush: u64,
    pub log: RoundLog,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for every client and record it on the round.
    pub fn broadcast(&mut self, event: ServerEvent, now: u64, update_interval_ms: u64) {
        self.log.record(&event, now, update_interval_ms);
        self.queue.push(event);
    }

    /// Queue an event for one client.
    pub fn direct(&mut self, client_id: u32, event: ServerEvent) {
        self.direct.push((client_id, event));
    }

    /// Schedule a socket close.
    pub fn close(&mut self, client_id: u32) {
        self.outgoing.push(Outgoing::Close { client_id });
    }

    /// Broadcast events not yet flushed.
    pub fn queued(&self) -> &[ServerEvent] {
        &self.queue
    }

    /// Direct events not yet drained.
    pub fn pending_direct(&self) -> &[(u32, ServerEvent)] {
        &self.direct
    }

    /// Compile direct events, one frame per recipient in first-seen order.
    pub fn drain_direct(&mut self) -> Result<(), ProtocolError> {
        if self.direct.is_empty() {
            return Ok(());
        }
        let mut recipients: Vec<u32> = Vec::new();
        for (id, _) in &self.direct {
            if !recipients.contains(id) {
                recipients.push(*id);
            }
        }
        for client_id in recipients {
            let payload = compile(self.direct.iter().filter(|(id, _)| *id == client_id).map(|(_, e)| e))?;
            self.outgoing.push(Outgoing::Direct { client_id, payload });
        }
        self.direct.clear();
        Ok(())
    }

    /// Whether a periodic flush is due.
    pub fn flush_due(&self, now: u64, interval_ms: u64) -> bool {
        now.saturating_sub(self.last_flush) >= interval_ms
    }

    /// Compile the broadcast queue FIFO into one frame and clear it.
    pub fn flush(&mut self, now: u64) -> Result<(), ProtocolError> {
        self.last_flush = now;
        if self.queue.is_empty() {
            return Ok(());
        }
        let payload = compile(&self.queue)?;
        self.queue.clear();
        self.outgoing.push(Outgoing::Broadcast(payload));
        Ok(())
    }

    /// Hand compiled frames to the transport.
    pub fn take_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoing)
    }
}
