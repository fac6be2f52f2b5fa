use crate::event::Event;
use std::collections::{BTreeMap, VecDeque};

/// Invocation key: tool name plus timestamp truncated to the second
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallKey<'a> {
    pub tool: &'a str,
    pub second: &'a str,
}

impl<'a> CallKey<'a> {
    pub fn of(event: &'a Event) -> Self {
        Self {
            tool: event.tool(),
            second: event.timestamp_second(),
        }
    }
}

/// PreToolUse events waiting for completion
///
/// Several calls may share one key (parallel calls in the same second);
/// they are kept FIFO so no pending call is ever overwritten.
#[derive(Debug, Default)]
pub struct PendingCalls<'a> {
    by_key: BTreeMap<CallKey<'a>, VecDeque<&'a Event>>,
    len: usize,
}

impl<'a> PendingCalls<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pre: &'a Event) {
        self.by_key
            .entry(CallKey::of(pre))
            .or_default()
            .push_back(pre);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Take the oldest pending call with exactly this key
    pub fn take_exact(&mut self, key: &CallKey<'a>) -> Option<&'a Event> {
        let queue = self.by_key.get_mut(key)?;
        let pre = queue.pop_front();
        if queue.is_empty() {
            self.by_key.remove(key);
        }
        if pre.is_some() {
            self.len -= 1;
        }
        pre
    }

    /// Take some pending call for this tool, whatever its second
    pub fn take_any(&mut self, tool: &'a str) -> Option<&'a Event> {
        let start = CallKey { tool, second: "" };
        let key = self
            .by_key
            .range(start..)
            .next()
            .map(|(key, _)| *key)
            .filter(|key| key.tool == tool)?;
        self.take_exact(&key)
    }

    /// Calls never completed, in timestamp order
    pub fn into_remaining(self) -> Vec<&'a Event> {
        let mut remaining: Vec<&'a Event> = self.by_key.into_values().flatten().collect();
        remaining.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        remaining
    }
}
