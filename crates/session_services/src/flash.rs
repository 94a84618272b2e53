use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Category of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    /// Confirmation shown in the green banner
    Success,
    /// Problem shown in the red banner
    Error,
}

/// Flash messages waiting to be shown, grouped by category.
///
/// Insertion order is preserved within a category. Reading is destructive:
/// [`FlashQueues::drain_all`] empties every queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlashQueues(BTreeMap<FlashKind, Vec<String>>);

impl FlashQueues {
    /// Appends a message to the queue for `kind`.
    pub fn push(&mut self, kind: FlashKind, message: impl Into<String>) {
        self.0.entry(kind).or_default().push(message.into());
    }

    /// Takes every pending message, leaving the queues empty.
    pub fn drain_all(&mut self) -> BTreeMap<FlashKind, Vec<String>> {
        std::mem::take(&mut self.0)
    }

    /// Whether no message is pending.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_delivers_once() {
        let mut flash = FlashQueues::default();
        flash.push(FlashKind::Success, "x");

        let drained = flash.drain_all();
        assert_eq!(drained.get(&FlashKind::Success), Some(&vec!["x".to_string()]));

        let again = flash.drain_all();
        assert!(again.get(&FlashKind::Success).is_none());
        assert!(flash.is_empty());
    }

    #[test]
    fn test_order_preserved_within_category() {
        let mut flash = FlashQueues::default();
        flash.push(FlashKind::Error, "first");
        flash.push(FlashKind::Success, "ok");
        flash.push(FlashKind::Error, "second");

        let drained = flash.drain_all();
        assert_eq!(drained[&FlashKind::Error], vec!["first", "second"]);
        assert_eq!(drained[&FlashKind::Success], vec!["ok"]);
    }

    #[test]
    fn test_serializes_as_category_map() {
        let mut flash = FlashQueues::default();
        flash.push(FlashKind::Success, "Welcome back!");

        let json = serde_json::to_value(&flash).unwrap();
        assert_eq!(json, serde_json::json!({ "success": ["Welcome back!"] }));

        let back: FlashQueues = serde_json::from_value(json).unwrap();
        assert_eq!(back, flash);
    }
}
