use std::collections::VecDeque;

use crate::protocol::codec::Packet;

/// Rolling sequence number stamped on every packet. The bulbs drop a packet
/// whose counter equals the previous one, so it must change on every send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter(u8);

impl Counter {
    pub fn new(start: u8) -> Self {
        Counter(start)
    }

    /// Moves to the next value, 255 wraps to 0, and returns it.
    pub fn advance(&mut self) -> u8 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

/// FIFO of packets waiting for the bridge, plus whether a drain is running.
#[derive(Debug, Default)]
pub struct SendQueue {
    packets: VecDeque<Packet>,
    sending: bool,
}

impl SendQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, packet: Packet) {
        self.packets.push_back(packet);
    }

    /// Marks a drain as started. Returns false while the link is not open
    /// yet or a drain is already running. A drain of an empty queue ends on
    /// its first `pop_next`.
    pub fn begin_drain(&mut self, opened: bool) -> bool {
        if !opened || self.sending {
            return false;
        }
        self.sending = true;
        true
    }

    /// Next packet of the running drain. `None` ends the drain and clears
    /// the sending flag.
    pub fn pop_next(&mut self) -> Option<Packet> {
        let next = self.packets.pop_front();
        if next.is_none() {
            self.sending = false;
        }
        next
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn clear(&mut self) {
        self.packets.clear();
        self.sending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::encode;
    use crate::protocol::command::{Command, Zone};

    fn packet(counter: u8) -> Packet {
        let id = "1122".parse().unwrap();
        let zone = Zone::new(1).unwrap();
        encode(&id, zone, &Command::SetBrightness { percent: 10 }, counter).unwrap()
    }

    #[test]
    fn test_counter_wraps() {
        let mut counter = Counter::new(254);
        assert_eq!(counter.advance(), 255);
        assert_eq!(counter.advance(), 0);
        assert_eq!(counter.advance(), 1);
        assert_eq!(Counter::default().get(), 0);
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = SendQueue::new();
        for counter in 1..=3 {
            queue.enqueue(packet(counter));
        }
        assert_eq!(queue.len(), 3);
        assert!(queue.begin_drain(true));

        let counters: Vec<u8> = std::iter::from_fn(|| queue.pop_next())
            .map(|p| p.counter())
            .collect();
        assert_eq!(counters, vec![1, 2, 3]);
        assert!(!queue.is_sending());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_needs_open_link() {
        let mut queue = SendQueue::new();
        queue.enqueue(packet(1));
        assert!(!queue.begin_drain(false));
        assert!(!queue.is_sending());
        assert!(queue.begin_drain(true));
        assert!(!queue.begin_drain(true));
    }

    #[test]
    fn test_empty_queue_drain_ends_at_once() {
        let mut queue = SendQueue::new();
        assert!(queue.begin_drain(true));
        assert!(queue.is_sending());
        assert_eq!(queue.pop_next(), None);
        assert!(!queue.is_sending());
    }

    #[test]
    fn test_sending_stays_set_until_queue_runs_dry() {
        let mut queue = SendQueue::new();
        queue.enqueue(packet(1));
        assert!(queue.begin_drain(true));
        assert!(queue.pop_next().is_some());
        assert!(queue.is_sending());
        queue.enqueue(packet(2));
        assert!(!queue.begin_drain(true));
        assert!(queue.pop_next().is_some());
        assert!(queue.pop_next().is_none());
        assert!(!queue.is_sending());
    }
}
