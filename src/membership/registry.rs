use crate::membership::ServerId;
use std::sync::{Mutex, MutexGuard};

/// Membership is the set of replicas this process believes to be alive, plus who it believes
/// the master is. Every read and every mutation goes through one mutex. Nothing in here does
/// network I/O, so callers snapshot what they need, release the lock, and then talk to peers.
pub(crate) struct Membership {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    self_id: Option<ServerId>,
    master_id: Option<ServerId>,
    is_master: bool,
    listen_port: Option<u16>,
    active_servers: Vec<ServerId>,
    // Highest id this process has handed out as master. Keeps ids from being reused after the
    // replica holding the current maximum dies.
    highest_assigned: Option<ServerId>,
}

/// Point-in-time copy of the membership state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MembershipSnapshot {
    pub self_id: Option<ServerId>,
    pub master_id: Option<ServerId>,
    pub is_master: bool,
    pub listen_port: Option<u16>,
    pub active_servers: Vec<ServerId>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ElectionOutcome {
    Promoted,
    Follower { master_id: ServerId },
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum MembershipError {
    #[error("This replica has not been assigned an id yet")]
    NotJoined,
}

impl Membership {
    pub(crate) fn new() -> Self {
        Membership {
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("Membership mutex guard poison")
    }

    /// Nobody answered on the bootstrap port, so we are the first master.
    pub(crate) fn become_initial_master(&self, master_id: ServerId, master_port: u16) {
        let mut state = self.lock();
        state.self_id = Some(master_id);
        state.master_id = Some(master_id);
        state.is_master = true;
        state.listen_port = Some(master_port);
        state.active_servers = vec![master_id];
        state.highest_assigned = Some(master_id);
    }

    /// Adopt the identity and server list the master handed us at join time.
    pub(crate) fn adopt_assignment(
        &self,
        new_id: ServerId,
        server_list: &[ServerId],
        master_id: Option<ServerId>,
        listen_port: u16,
    ) {
        let mut state = self.lock();
        state.self_id = Some(new_id);
        state.master_id = master_id;
        state.is_master = false;
        state.listen_port = Some(listen_port);
        state.active_servers.clear();
        for id in server_list.iter().copied().chain(std::iter::once(new_id)) {
            if !state.active_servers.contains(&id) {
                state.active_servers.push(id);
            }
        }
    }

    /// Forget everything we know about the cluster. Used before re-running bootstrap so stale
    /// entries don't leak into the fresh membership.
    pub(crate) fn reset_servers(&self) {
        let mut state = self.lock();
        state.active_servers.clear();
        state.master_id = None;
        state.is_master = false;
        state.highest_assigned = None;
    }

    /// Give up a self-promotion that could not be completed.
    pub(crate) fn demote(&self) {
        let mut state = self.lock();
        state.is_master = false;
        state.listen_port = None;
    }

    /// Returns true if `id` was not already a member.
    pub(crate) fn add(&self, id: ServerId) -> bool {
        let mut state = self.lock();
        if state.active_servers.contains(&id) {
            return false;
        }
        state.active_servers.push(id);
        true
    }

    /// Returns true if `id` was a member.
    pub(crate) fn remove(&self, id: ServerId) -> bool {
        let mut state = self.lock();
        let before = state.active_servers.len();
        state.active_servers.retain(|member| *member != id);
        state.active_servers.len() != before
    }

    /// Follower side of a master ping. Returns true if the sender is a master we didn't know of.
    pub(crate) fn accept_ping(&self, sender: ServerId) -> bool {
        let mut state = self.lock();
        if state.master_id == Some(sender) {
            return false;
        }
        state.master_id = Some(sender);
        if !state.active_servers.contains(&sender) {
            state.active_servers.push(sender);
        }
        true
    }

    /// Every member except ourselves.
    pub(crate) fn peers(&self) -> Vec<ServerId> {
        let state = self.lock();
        state
            .active_servers
            .iter()
            .copied()
            .filter(|id| Some(*id) != state.self_id)
            .collect()
    }

    /// Every member except ourselves and `excluded`.
    pub(crate) fn peers_except(&self, excluded: ServerId) -> Vec<ServerId> {
        self.peers().into_iter().filter(|id| *id != excluded).collect()
    }

    /// Strictly greater than every current member and every id handed out before.
    fn next_id(state: &State) -> ServerId {
        let current_max = state.active_servers.iter().copied().max();
        match current_max.max(state.highest_assigned) {
            Some(max) => max.next(),
            None => ServerId::new(1),
        }
    }

    /// Allocate an id for a joining replica and add it, as one atomic step. Returns the new id
    /// and the full member list including it.
    pub(crate) fn admit_new_replica(&self) -> (ServerId, Vec<ServerId>) {
        let mut state = self.lock();
        let new_id = Self::next_id(&state);
        state.active_servers.push(new_id);
        state.highest_assigned = Some(new_id);

        (new_id, state.active_servers.clone())
    }

    /// Drop the presumed-dead master and pick the lowest remaining id. If that's us, we become
    /// master and will listen on `master_port`.
    ///
    /// Self is not skipped here, because we may legitimately be the lowest id.
    pub(crate) fn hold_election(&self, master_port: u16) -> Result<ElectionOutcome, MembershipError> {
        let mut state = self.lock();
        let self_id = state.self_id.ok_or(MembershipError::NotJoined)?;

        if let Some(dead_master) = state.master_id {
            state.active_servers.retain(|id| *id != dead_master);
        }
        if !state.active_servers.contains(&self_id) {
            state.active_servers.push(self_id);
        }

        let winner = state.active_servers.iter().copied().min().unwrap_or(self_id);
        state.master_id = Some(winner);

        if winner == self_id {
            state.is_master = true;
            state.listen_port = Some(master_port);
            Ok(ElectionOutcome::Promoted)
        } else {
            Ok(ElectionOutcome::Follower { master_id: winner })
        }
    }

    pub(crate) fn self_id(&self) -> Option<ServerId> {
        self.lock().self_id
    }

    pub(crate) fn master_id(&self) -> Option<ServerId> {
        self.lock().master_id
    }

    pub(crate) fn is_master(&self) -> bool {
        self.lock().is_master
    }

    pub(crate) fn snapshot(&self) -> MembershipSnapshot {
        let state = self.lock();
        MembershipSnapshot {
            self_id: state.self_id,
            master_id: state.master_id,
            is_master: state.is_master,
            listen_port: state.listen_port,
            active_servers: state.active_servers.clone(),
        }
    }
}
