//! Per-board lookup of rendered cards and columns, used only for post-move
//! visual feedback.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use models::{ColumnId, EntityId};

/// Callback that makes a rendered element flash.
pub type FlashHandle = Arc<dyn Fn() + Send + Sync>;

enum Key {
    Card(EntityId),
    Column(ColumnId),
}

struct Entry {
    token: u64,
    flash: FlashHandle,
}

#[derive(Default)]
struct Entries {
    cards: DashMap<EntityId, Entry>,
    columns: DashMap<ColumnId, Entry>,
    next_token: AtomicU64,
}

#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<Entries>,
}

/// Keeps a registration alive. Dropping it removes the handle, unless the
/// same key was registered again since.
#[must_use = "the element is unregistered when the guard is dropped"]
pub struct Registration {
    entries: Arc<Entries>,
    key: Key,
    token: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let token = self.token;
        match &self.key {
            Key::Card(id) => {
                self.entries
                    .cards
                    .remove_if(id, |_, entry| entry.token == token);
            }
            Key::Column(id) => {
                self.entries
                    .columns
                    .remove_if(id, |_, entry| entry.token == token);
            }
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_token(&self) -> u64 {
        self.entries.next_token.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register_card(&self, athlete_id: EntityId, flash: FlashHandle) -> Registration {
        let token = self.next_token();
        self.entries
            .cards
            .insert(athlete_id.clone(), Entry { token, flash });
        Registration {
            entries: self.entries.clone(),
            key: Key::Card(athlete_id),
            token,
        }
    }

    pub fn register_column(&self, column: ColumnId, flash: FlashHandle) -> Registration {
        let token = self.next_token();
        self.entries
            .columns
            .insert(column.clone(), Entry { token, flash });
        Registration {
            entries: self.entries.clone(),
            key: Key::Column(column),
            token,
        }
    }

    #[cfg(test)]
    fn card_count(&self) -> usize {
        self.entries.cards.len()
    }

    #[cfg(test)]
    fn column_count(&self) -> usize {
        self.entries.columns.len()
    }

    /// Flash the moved card, or the column it landed in when the card is
    /// not rendered. Returns whether anything flashed.
    pub fn flash_moved(&self, athlete_id: &EntityId, to: &ColumnId) -> bool {
        // Clone the handle out so the callback runs without a shard lock held.
        let handle = self
            .entries
            .cards
            .get(athlete_id)
            .map(|entry| entry.flash.clone())
            .or_else(|| {
                self.entries
                    .columns
                    .get(to)
                    .map(|entry| entry.flash.clone())
            });

        match handle {
            Some(flash) => {
                flash();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, FlashHandle) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle: FlashHandle = {
            let count = count.clone();
            Arc::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        (count, handle)
    }

    #[test]
    fn test_card_flash_preferred_over_column() {
        let registry = Registry::new();
        let (card_hits, card) = counter();
        let (column_hits, column) = counter();
        let _card = registry.register_card(EntityId::from(10), card);
        let _column = registry.register_column(ColumnId::parse("1"), column);

        assert!(registry.flash_moved(&EntityId::from("10"), &ColumnId::parse("1")));
        assert_eq!(card_hits.load(Ordering::SeqCst), 1);
        assert_eq!(column_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_falls_back_to_destination_column() {
        let registry = Registry::new();
        let (column_hits, column) = counter();
        let _column = registry.register_column(ColumnId::Unassigned, column);

        assert!(registry.flash_moved(&EntityId::from(10), &ColumnId::Unassigned));
        assert!(!registry.flash_moved(&EntityId::from(10), &ColumnId::parse("2")));
        assert_eq!(column_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropping_guard_unregisters() {
        let registry = Registry::new();
        let (_, card) = counter();
        let guard = registry.register_card(EntityId::from(10), card);
        assert_eq!(registry.card_count(), 1);
        drop(guard);
        assert_eq!(registry.card_count(), 0);
    }

    #[test]
    fn test_stale_guard_keeps_newer_registration() {
        let registry = Registry::new();
        let (_, first) = counter();
        let (second_hits, second) = counter();

        let old = registry.register_column(ColumnId::parse("1"), first);
        let _new = registry.register_column(ColumnId::parse("1"), second);
        drop(old);

        assert_eq!(registry.column_count(), 1);
        assert!(registry.flash_moved(&EntityId::from(10), &ColumnId::parse("1")));
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }
}
