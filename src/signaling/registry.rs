use std::collections::{HashMap, HashSet};

use tracing::info;

use super::types::{PeerId, RoomId};

/// Room membership table.
///
/// Rooms exist only while they have members: the first join creates one and
/// the last leave drops it. Unknown rooms and peers are no-ops everywhere.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Members in join order
    rooms: HashMap<RoomId, Vec<PeerId>>,
    peer_rooms: HashMap<PeerId, HashSet<RoomId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `peer` to `room`, returning the members after the join.
    ///
    /// Joining a room twice leaves its member set unchanged.
    pub fn join(&mut self, peer: PeerId, room: &RoomId) -> Vec<PeerId> {
        let members = self.rooms.entry(room.clone()).or_default();
        if members.is_empty() {
            info!(room = %room, "room created");
        }
        if !members.contains(&peer) {
            members.push(peer);
        }
        self.peer_rooms
            .entry(peer)
            .or_default()
            .insert(room.clone());
        members.clone()
    }

    /// Remove `peer` from `room`. Returns whether it was a member.
    pub fn leave(&mut self, peer: PeerId, room: &RoomId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let Some(pos) = members.iter().position(|p| *p == peer) else {
            return false;
        };
        members.remove(pos);

        if members.is_empty() {
            self.rooms.remove(room);
            info!(room = %room, "room removed (empty)");
        }

        if let Some(rooms) = self.peer_rooms.get_mut(&peer) {
            rooms.remove(room);
            if rooms.is_empty() {
                self.peer_rooms.remove(&peer);
            }
        }
        true
    }

    /// Remove `peer` from every room it is in. Returns the rooms it left,
    /// sorted so callers notify rooms in a stable order.
    pub fn leave_all(&mut self, peer: PeerId) -> Vec<RoomId> {
        let mut left: Vec<RoomId> = self
            .peer_rooms
            .get(&peer)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();
        left.sort();

        for room in &left {
            self.leave(peer, room);
        }
        left
    }

    /// Broadcast targets: every member of `room` except `peer`, in join order.
    pub fn members_except(&self, room: &RoomId, peer: PeerId) -> Vec<PeerId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().filter(|p| *p != peer).collect())
            .unwrap_or_default()
    }

    pub fn members(&self, room: &RoomId) -> &[PeerId] {
        self.rooms.get(room).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_member(&self, room: &RoomId, peer: PeerId) -> bool {
        self.members(room).contains(&peer)
    }

    pub fn rooms_of(&self, peer: PeerId) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self
            .peer_rooms
            .get(&peer)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(s: &str) -> PeerId {
        PeerId::from(s)
    }

    #[test]
    fn join_creates_room_and_returns_members_in_order() {
        let mut reg = RoomRegistry::new();
        let room = RoomId::from("abc");

        assert_eq!(reg.join(peer("peer_a"), &room), vec![peer("peer_a")]);
        assert_eq!(
            reg.join(peer("peer_b"), &room),
            vec![peer("peer_a"), peer("peer_b")]
        );
        assert_eq!(reg.room_count(), 1);
    }

    #[test]
    fn join_is_idempotent() {
        let mut reg = RoomRegistry::new();
        let room = RoomId::from("abc");

        reg.join(peer("peer_a"), &room);
        reg.join(peer("peer_b"), &room);
        let again = reg.join(peer("peer_a"), &room);

        assert_eq!(again, vec![peer("peer_a"), peer("peer_b")]);
        assert_eq!(reg.members(&room).len(), 2);
        assert_eq!(reg.rooms_of(peer("peer_a")), vec![room]);
    }

    #[test]
    fn members_except_excludes_sender() {
        let mut reg = RoomRegistry::new();
        let room = RoomId::from("abc");
        for p in ["peer_a", "peer_b", "peer_c", "peer_d"] {
            reg.join(peer(p), &room);
        }

        let targets = reg.members_except(&room, peer("peer_b"));
        assert_eq!(targets, vec![peer("peer_a"), peer("peer_c"), peer("peer_d")]);
        assert_eq!(targets.len(), reg.members(&room).len() - 1);
    }

    #[test]
    fn members_except_for_non_member_returns_everyone() {
        let mut reg = RoomRegistry::new();
        let room = RoomId::from("abc");
        reg.join(peer("peer_a"), &room);

        assert_eq!(reg.members_except(&room, peer("peer_x")), vec![peer("peer_a")]);
    }

    #[test]
    fn unknown_room_is_a_noop() {
        let mut reg = RoomRegistry::new();
        let room = RoomId::from("nowhere");

        assert!(reg.members_except(&room, peer("peer_a")).is_empty());
        assert!(!reg.leave(peer("peer_a"), &room));
        assert!(reg.leave_all(peer("peer_a")).is_empty());
        assert_eq!(reg.room_count(), 0);
    }

    #[test]
    fn leave_drops_empty_room() {
        let mut reg = RoomRegistry::new();
        let room = RoomId::from("abc");
        reg.join(peer("peer_a"), &room);
        reg.join(peer("peer_b"), &room);

        assert!(reg.leave(peer("peer_a"), &room));
        assert_eq!(reg.members(&room), &[peer("peer_b")]);
        assert!(!reg.leave(peer("peer_a"), &room));

        assert!(reg.leave(peer("peer_b"), &room));
        assert_eq!(reg.room_count(), 0);
        assert!(reg.rooms_of(peer("peer_b")).is_empty());
    }

    #[test]
    fn leave_all_removes_peer_everywhere() {
        let mut reg = RoomRegistry::new();
        let r1 = RoomId::from("one");
        let r2 = RoomId::from("two");
        reg.join(peer("peer_a"), &r1);
        reg.join(peer("peer_a"), &r2);
        reg.join(peer("peer_b"), &r2);

        let left = reg.leave_all(peer("peer_a"));
        assert_eq!(left, vec![r1.clone(), r2.clone()]);

        assert!(!reg.is_member(&r1, peer("peer_a")));
        assert!(!reg.is_member(&r2, peer("peer_a")));
        assert!(reg.members_except(&r2, peer("peer_b")).is_empty());
        assert_eq!(reg.room_count(), 1);
        assert!(reg.rooms_of(peer("peer_a")).is_empty());
    }
}
