//! Player queue
//!
//! Ordered, mutable sequence of upcoming items owned by the controller.
//! End-of-file handling in queue and shuffle modes pops from the front.

use rand::seq::SliceRandom;
use rand::thread_rng;
use std::collections::VecDeque;
use vireo_core::{PlayerQueueItem, QueueItemId};

#[derive(Debug, Clone, Default)]
pub struct PlayerQueue {
    items: VecDeque<PlayerQueueItem>,
}

impl PlayerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the end
    pub fn append(&mut self, item: PlayerQueueItem) {
        self.items.push_back(item);
    }

    /// Add to the front, ahead of everything queued
    pub fn play_next(&mut self, item: PlayerQueueItem) {
        self.items.push_front(item);
    }

    /// Remove an entry by id
    pub fn remove(&mut self, id: QueueItemId) -> Option<PlayerQueueItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        self.items.remove(index)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the whole queue
    pub fn replace(&mut self, items: Vec<PlayerQueueItem>) {
        self.items = items.into();
    }

    /// Take the next entry
    pub fn pop_next(&mut self) -> Option<PlayerQueueItem> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<&PlayerQueueItem> {
        self.items.front()
    }

    /// Randomize order in place (Fisher-Yates)
    pub fn shuffle(&mut self) {
        self.items.make_contiguous().shuffle(&mut thread_rng());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerQueueItem> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use vireo_core::Video;

    fn create_item(id: &str) -> PlayerQueueItem {
        PlayerQueueItem::new(Video::new(id, format!("Video {id}"), "Author"))
    }

    #[test]
    fn pops_in_order() {
        let mut queue = PlayerQueue::new();
        queue.append(create_item("1"));
        queue.append(create_item("2"));
        queue.play_next(create_item("0"));

        let order: Vec<String> = std::iter::from_fn(|| queue.pop_next())
            .map(|item| item.video_id().to_string())
            .collect();
        assert_eq!(order, vec!["0", "1", "2"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_by_id() {
        let mut queue = PlayerQueue::new();
        let keep = create_item("keep");
        let removed = create_item("removed");
        let removed_id = removed.id;
        queue.replace(vec![keep, removed]);

        assert_eq!(queue.remove(removed_id).unwrap().video_id().as_str(), "removed");
        assert!(queue.remove(removed_id).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn shuffle_preserves_entries() {
        let mut queue = PlayerQueue::new();
        for i in 0..50 {
            queue.append(create_item(&i.to_string()));
        }
        let before: HashSet<QueueItemId> = queue.iter().map(|item| item.id).collect();

        queue.shuffle();

        let after: HashSet<QueueItemId> = queue.iter().map(|item| item.id).collect();
        assert_eq!(before, after);
        assert_eq!(queue.len(), 50);
    }

    #[test]
    fn shuffle_empty_queue() {
        let mut queue = PlayerQueue::new();
        queue.shuffle();
        assert!(queue.is_empty());
    }
}
