//! Channel registry for muxbus.
//!
//! Tracks, per channel, one entry for every outstanding subscription of an
//! event kind. A channel is present exactly while the transport holds a
//! subscription for it.

use std::collections::HashMap;
use tracing::trace;

/// A channel identifier.
pub type ChannelId = String;

/// Outcome of releasing one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsubscribed {
    /// The channel had no registrations. Nothing changed.
    NotSubscribed,
    /// The channel is active but the event kind was not registered on it.
    NotRegistered,
    /// One entry was removed; the channel stays active.
    Released {
        /// Entries still registered on the channel.
        remaining: usize,
    },
    /// The last entry was removed and the channel was torn down.
    Drained,
}

impl Unsubscribed {
    /// Whether this outcome tore down the channel subscription.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        matches!(self, Unsubscribed::Drained)
    }
}

/// Channel -> multiset of registered event kinds.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: HashMap<ChannelId, Vec<String>>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one registration of `event` on `channel`.
    ///
    /// Returns the number of entries now registered on the channel.
    pub fn register(&mut self, channel: &str, event: &str) -> usize {
        let entries = self.channels.entry(channel.to_string()).or_default();
        entries.push(event.to_string());
        trace!(channel = %channel, event = %event, entries = entries.len(), "Registered");
        entries.len()
    }

    /// Remove exactly one registration of `event` from `channel`.
    ///
    /// Other entries, including further entries for the same event kind, are
    /// left untouched. The channel is removed when its last entry goes.
    pub fn release(&mut self, channel: &str, event: &str) -> Unsubscribed {
        let Some(entries) = self.channels.get_mut(channel) else {
            return Unsubscribed::NotSubscribed;
        };

        let Some(index) = entries.iter().position(|e| e == event) else {
            return Unsubscribed::NotRegistered;
        };
        entries.remove(index);

        if entries.is_empty() {
            self.channels.remove(channel);
            Unsubscribed::Drained
        } else {
            Unsubscribed::Released {
                remaining: entries.len(),
            }
        }
    }

    /// Check if a channel has any registration.
    #[must_use]
    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    /// Get the event kinds registered on a channel, one per registration.
    #[must_use]
    pub fn registrations(&self, channel: &str) -> &[String] {
        self.channels.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Get all active channel names.
    #[must_use]
    pub fn channels(&self) -> Vec<ChannelId> {
        self.channels.keys().cloned().collect()
    }

    /// Get the number of active channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Get the total number of registrations across all channels.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    /// Check if no channel is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_creates_channel() {
        let mut registry = ChannelRegistry::new();
        assert!(registry.is_empty());

        assert_eq!(registry.register("c", "a"), 1);
        assert_eq!(registry.register("c", "a"), 2);
        assert_eq!(registry.register("c", "b"), 3);

        assert!(registry.contains("c"));
        assert_eq!(registry.registrations("c"), ["a", "a", "b"]);
        assert_eq!(registry.registration_count(), 3);
    }

    #[test]
    fn test_release_unknown_channel() {
        let mut registry = ChannelRegistry::new();
        assert_eq!(registry.release("nope", "a"), Unsubscribed::NotSubscribed);
    }

    #[test]
    fn test_release_unknown_event() {
        let mut registry = ChannelRegistry::new();
        registry.register("c", "a");

        assert_eq!(registry.release("c", "b"), Unsubscribed::NotRegistered);
        assert_eq!(registry.registrations("c"), ["a"]);
    }

    #[test]
    fn test_release_removes_single_entry() {
        let mut registry = ChannelRegistry::new();
        registry.register("c", "a");
        registry.register("c", "b");
        registry.register("c", "a");

        assert_eq!(
            registry.release("c", "a"),
            Unsubscribed::Released { remaining: 2 }
        );
        assert_eq!(registry.registrations("c"), ["b", "a"]);

        assert_eq!(
            registry.release("c", "a"),
            Unsubscribed::Released { remaining: 1 }
        );
        assert_eq!(registry.registrations("c"), ["b"]);

        let outcome = registry.release("c", "b");
        assert!(outcome.is_drained());
        assert!(!registry.contains("c"));
        assert!(registry.registrations("c").is_empty());
    }

    #[test]
    fn test_channels_are_independent() {
        let mut registry = ChannelRegistry::new();
        registry.register("c1", "a");
        registry.register("c2", "a");

        assert_eq!(registry.release("c1", "a"), Unsubscribed::Drained);
        assert!(registry.contains("c2"));
        assert_eq!(registry.channels(), vec!["c2".to_string()]);
        assert_eq!(registry.channel_count(), 1);
    }
}
