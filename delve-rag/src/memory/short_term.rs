//! Short-term memory: a sliding window over the most recent items

use std::collections::VecDeque;

/// Keeps at most `limit` items, dropping the oldest first, the same way a
/// context window forgets early turns of a conversation.
#[derive(Debug, Clone)]
pub struct ShortTermMemory<T> {
    limit: usize,
    items: VecDeque<T>,
}

impl<T> ShortTermMemory<T> {
    /// Create a window of `limit` items (at least one)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            items: VecDeque::with_capacity(limit),
        }
    }

    /// Append an item, evicting the oldest one if the window is full
    pub fn add(&mut self, item: T) {
        if self.items.len() == self.limit {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Items oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> ShortTermMemory<T> {
    /// Snapshot of the window, oldest first
    pub fn get(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_core::PromptMessage;

    #[test]
    fn test_window_drops_oldest() {
        let mut memory = ShortTermMemory::new(3);
        for i in 1..=5 {
            memory.add(i);
        }
        assert_eq!(memory.get(), vec![3, 4, 5]);
        assert_eq!(memory.len(), 3);
    }

    #[test]
    fn test_zero_limit_keeps_latest() {
        let mut memory = ShortTermMemory::new(0);
        memory.add("first");
        memory.add("second");
        assert_eq!(memory.get(), vec!["second"]);
    }

    #[test]
    fn test_holds_prompt_messages() {
        let mut memory = ShortTermMemory::new(2);
        memory.add(PromptMessage::user("hi"));
        memory.add(PromptMessage::assistant("hello"));
        memory.add(PromptMessage::user("what's new?"));

        let window = memory.get();
        assert_eq!(window[0], PromptMessage::assistant("hello"));
        assert_eq!(window[1].content, "what's new?");
    }
}
