//! # Priority Send Queue
//!
//! Five priority levels, strict ordering: a lower level is drained
//! completely before a higher one yields anything, and within a level
//! dispatch is FIFO. The whole queue serializes for snapshots.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use bcast_core::{ContactId, PhoneE164, TemplateId};

// ─── Priority ────────────────────────────────────────────────────────

/// Send priority, highest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// OTP and time-critical sends.
    Urgent,
    /// Contacts inside the 24-hour free window.
    FreeWindow,
    /// Regular campaign traffic.
    Normal,
    /// Deferrable traffic.
    Low,
    /// Backfill.
    Background,
}

impl Priority {
    /// Every level, highest first.
    pub fn all() -> [Self; 5] {
        [
            Self::Urgent,
            Self::FreeWindow,
            Self::Normal,
            Self::Low,
            Self::Background,
        ]
    }

    /// Numeric level, 1 = highest.
    pub fn level(&self) -> u8 {
        match self {
            Self::Urgent => 1,
            Self::FreeWindow => 2,
            Self::Normal => 3,
            Self::Low => 4,
            Self::Background => 5,
        }
    }

    fn lane(&self) -> usize {
        usize::from(self.level()) - 1
    }
}

// ─── Queue ───────────────────────────────────────────────────────────

/// One pending send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedSend {
    /// The target contact.
    pub contact_id: ContactId,
    /// The target identity.
    pub phone: PhoneE164,
    /// The approved template to send.
    pub template_id: TemplateId,
    /// Queue level.
    pub priority: Priority,
    /// Send attempts already made.
    pub attempts: u32,
    /// Skip the reduced-cost path; set after a reduced-cost rejection.
    pub full_path_only: bool,
}

impl QueuedSend {
    /// A fresh send at the given priority.
    pub fn new(
        contact_id: ContactId,
        phone: PhoneE164,
        template_id: TemplateId,
        priority: Priority,
    ) -> Self {
        Self {
            contact_id,
            phone,
            template_id,
            priority,
            attempts: 0,
            full_path_only: false,
        }
    }
}

/// Strict-priority FIFO queue over the five levels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityQueue {
    lanes: [VecDeque<QueuedSend>; 5],
}

impl PriorityQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue at the back of the item's level.
    pub fn push(&mut self, item: QueuedSend) {
        self.lanes[item.priority.lane()].push_back(item);
    }

    /// Re-enqueue at the front of the item's level, ahead of its FIFO
    /// peers. Used for the immediate full-path fallback.
    pub fn push_front(&mut self, item: QueuedSend) {
        self.lanes[item.priority.lane()].push_front(item);
    }

    /// Dequeue the oldest item of the highest non-empty level.
    pub fn pop(&mut self) -> Option<QueuedSend> {
        self.lanes.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Total queued items.
    pub fn len(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(VecDeque::is_empty)
    }

    /// Items in dequeue order, without draining.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedSend> {
        self.lanes.iter().flatten()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn send(priority: Priority) -> QueuedSend {
        QueuedSend::new(
            ContactId::new(),
            PhoneE164::parse("+919876543210").unwrap(),
            TemplateId::new(),
            priority,
        )
    }

    #[test]
    fn test_strict_priority_order() {
        let mut queue = PriorityQueue::new();
        let background = send(Priority::Background);
        let urgent = send(Priority::Urgent);
        let normal = send(Priority::Normal);
        queue.push(background.clone());
        queue.push(urgent.clone());
        queue.push(normal.clone());

        assert_eq!(queue.pop().unwrap().contact_id, urgent.contact_id);
        assert_eq!(queue.pop().unwrap().contact_id, normal.contact_id);
        assert_eq!(queue.pop().unwrap().contact_id, background.contact_id);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_fifo_within_level() {
        let mut queue = PriorityQueue::new();
        let first = send(Priority::Normal);
        let second = send(Priority::Normal);
        queue.push(first.clone());
        queue.push(second.clone());

        assert_eq!(queue.pop().unwrap().contact_id, first.contact_id);
        assert_eq!(queue.pop().unwrap().contact_id, second.contact_id);
    }

    #[test]
    fn test_lower_level_starves_until_higher_drained() {
        let mut queue = PriorityQueue::new();
        queue.push(send(Priority::Low));
        for _ in 0..3 {
            queue.push(send(Priority::Urgent));
        }
        for _ in 0..3 {
            assert_eq!(queue.pop().unwrap().priority, Priority::Urgent);
        }
        assert_eq!(queue.pop().unwrap().priority, Priority::Low);
    }

    #[test]
    fn test_push_front_jumps_fifo_peers() {
        let mut queue = PriorityQueue::new();
        let waiting = send(Priority::Normal);
        let fallback = send(Priority::Normal);
        queue.push(waiting.clone());
        queue.push_front(fallback.clone());
        assert_eq!(queue.pop().unwrap().contact_id, fallback.contact_id);
    }

    #[test]
    fn test_serde_preserves_order() {
        let mut queue = PriorityQueue::new();
        for priority in [Priority::Normal, Priority::Normal, Priority::Urgent] {
            queue.push(send(priority));
        }
        let order: Vec<ContactId> = queue.iter().map(|s| s.contact_id).collect();

        let json = serde_json::to_string(&queue).unwrap();
        let restored: PriorityQueue = serde_json::from_str(&json).unwrap();
        let restored_order: Vec<ContactId> = restored.iter().map(|s| s.contact_id).collect();
        assert_eq!(order, restored_order);
    }

    #[test]
    fn test_priority_levels() {
        let levels: Vec<u8> = Priority::all().iter().map(Priority::level).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5]);
    }
}
