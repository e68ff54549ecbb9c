//! Read-only view of completed actions

use std::ops::Index;

use crate::action::AnyAction;

/// A snapshot of the actions a dispatcher completed.
///
/// Actions are listed in the order they cleared middleware, not the order
/// they completed: a parent is listed ahead of its follow-ups even though
/// it completes after them. While an invocation is in flight, an earlier
/// snapshot is therefore not always a prefix of a later one. A `post` hook
/// for `Pong` sees `[Pong]`, the one for its parent `Ping` then sees
/// `[Ping, Pong]`.
///
/// Taken with [`Dispatcher::history`](crate::Dispatcher::history); later
/// dispatches do not change an existing snapshot.
#[derive(Debug, Clone, Default)]
pub struct History {
    actions: Vec<AnyAction>,
}

impl History {
    pub(crate) fn new(actions: Vec<AnyAction>) -> Self {
        Self { actions }
    }

    /// Number of completed actions.
    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if nothing completed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate over completed actions in the order they cleared middleware.
    pub fn iter(&self) -> impl Iterator<Item = &AnyAction> {
        self.actions.iter()
    }

    /// Names of completed actions in the order they cleared middleware.
    pub fn names(&self) -> Vec<&'static str> {
        self.actions.iter().map(AnyAction::name).collect()
    }

    /// Returns true if an action with this name completed.
    pub fn contains(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.name() == name)
    }

    /// How many actions with this name completed.
    pub fn count(&self, name: &str) -> usize {
        self.actions.iter().filter(|a| a.name() == name).count()
    }

    /// The completed action that cleared middleware last.
    pub fn last(&self) -> Option<&AnyAction> {
        self.actions.last()
    }

    /// The completed action at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&AnyAction> {
        self.actions.get(index)
    }

    /// Consume the snapshot into its actions.
    pub fn into_vec(self) -> Vec<AnyAction> {
        self.actions
    }
}

impl Index<usize> for History {
    type Output = AnyAction;

    fn index(&self, index: usize) -> &AnyAction {
        &self.actions[index]
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a AnyAction;
    type IntoIter = std::slice::Iter<'a, AnyAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

/// Handle to a reserved history position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Slot(u64);

/// The dispatcher's backing store for history.
///
/// An action reserves its position once it clears middleware and commits it
/// after all of its follow-up work succeeded. Positions follow reservation
/// order, so a parent precedes the follow-ups it spawned even though it
/// commits after them. Uncommitted positions are invisible to snapshots.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    entries: Vec<(Slot, AnyAction, bool)>,
    next: u64,
}

impl Ledger {
    pub(crate) fn reserve(&mut self, action: &AnyAction) -> Slot {
        let slot = Slot(self.next);
        self.next += 1;
        self.entries.push((slot, action.clone(), false));
        slot
    }

    /// Mark a reservation complete. Returns false if it no longer exists.
    pub(crate) fn commit(&mut self, slot: Slot) -> bool {
        match self.position(slot) {
            Some(index) => {
                self.entries[index].2 = true;
                true
            }
            None => false,
        }
    }

    /// Drop a reservation that will never complete.
    pub(crate) fn abandon(&mut self, slot: Slot) {
        if let Some(index) = self.position(slot) {
            if !self.entries[index].2 {
                self.entries.remove(index);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn committed(&self) -> usize {
        self.entries.iter().filter(|(_, _, done)| *done).count()
    }

    pub(crate) fn snapshot(&self) -> History {
        History::new(
            self.entries
                .iter()
                .filter(|(_, _, done)| *done)
                .map(|(_, action, _)| action.clone())
                .collect(),
        )
    }

    fn position(&self, slot: Slot) -> Option<usize> {
        self.entries.binary_search_by_key(&slot, |(s, _, _)| *s).ok()
    }
}
