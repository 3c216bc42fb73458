//! Members registry
//!
//! The set of joined clients, kept in join order so broadcasts are
//! delivered in a deterministic order.

use crate::types::ClientId;

/// Joined clients in join order
///
/// A client appears at most once. Only members are broadcast targets.
#[derive(Debug, Default)]
pub struct Members {
    ids: Vec<ClientId>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client
    ///
    /// Returns false if the client is already a member.
    pub fn insert(&mut self, client_id: ClientId) -> bool {
        if self.contains(client_id) {
            false
        } else {
            self.ids.push(client_id);
            true
        }
    }

    /// Remove a client
    ///
    /// Returns false if the client was not a member.
    pub fn remove(&mut self, client_id: ClientId) -> bool {
        match self.ids.iter().position(|id| *id == client_id) {
            Some(index) => {
                self.ids.remove(index);
                true
            }
            None => false,
        }
    }

    /// Check if a client is a member
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.ids.contains(&client_id)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All members in join order
    pub fn iter(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.ids.iter().copied()
    }

    /// All members except `client_id`, in join order
    pub fn others(&self, client_id: ClientId) -> impl Iterator<Item = ClientId> + '_ {
        self.iter().filter(move |id| *id != client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members_creation() {
        let members = Members::new();
        assert!(members.is_empty());
        assert_eq!(members.len(), 0);
    }

    #[test]
    fn test_insert_once() {
        let alice = ClientId::new();
        let mut members = Members::new();

        assert!(members.insert(alice));
        assert!(!members.insert(alice));
        assert_eq!(members.len(), 1);
        assert!(members.contains(alice));
    }

    #[test]
    fn test_remove() {
        let alice = ClientId::new();
        let bob = ClientId::new();
        let mut members = Members::new();
        members.insert(alice);
        members.insert(bob);

        assert!(members.remove(alice));
        assert!(!members.remove(alice));
        assert!(!members.contains(alice));
        assert!(members.contains(bob));
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn test_join_order_preserved() {
        let ids: Vec<ClientId> = (0..4).map(|_| ClientId::new()).collect();
        let mut members = Members::new();
        for id in &ids {
            members.insert(*id);
        }
        members.remove(ids[1]);

        let order: Vec<ClientId> = members.iter().collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn test_others_excludes_sender() {
        let alice = ClientId::new();
        let bob = ClientId::new();
        let carol = ClientId::new();
        let mut members = Members::new();
        members.insert(alice);
        members.insert(bob);
        members.insert(carol);

        let others: Vec<ClientId> = members.others(alice).collect();
        assert_eq!(others, vec![bob, carol]);

        // A non-member sees everyone
        assert_eq!(members.others(ClientId::new()).count(), 3);
    }
}
