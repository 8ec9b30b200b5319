/// Per-session request queue.
///
/// Requests that touch the current game (new game, move, undo, redo, hint,
/// check, game stats) go through a FIFO with at most one in flight. Each
/// carries the session number it was issued under. Leaving a session drops
/// everything queued and forgets the in-flight request; when its reply
/// finally arrives it no longer matches and is reported stale.
///
/// A new game is opened next to the running session: the old one keeps
/// sending and adopting until `commit_session`, so a failed new game leaves
/// it in step with the server.
///
/// Session-independent calls (user statistics) skip the FIFO and are tagged
/// with session 0, which is never a game session.

use std::collections::VecDeque;

use crate::net::api::ApiCall;
use crate::net::worker::{Outgoing, Ticket};

pub const GLOBAL_SESSION: u64 = 0;

/// How a reply relates to the queue.
#[derive(Debug, PartialEq)]
pub enum Accepted {
    /// Reply to the in-flight request of the current session.
    Current(ApiCall),
    /// Reply to the request opening session `.0`.
    Opening(u64),
    /// Reply to a session-independent call.
    Global,
    /// Reply to a superseded session or an unknown ticket.
    Stale,
}

#[derive(Debug)]
pub struct SessionQueue {
    session: u64,
    last_session: u64,
    next_seq: u64,
    pending: VecDeque<ApiCall>,
    in_flight: Option<(Ticket, ApiCall)>,
    opening: Option<Ticket>,
    ready: Vec<Outgoing>,
}

impl Default for SessionQueue {
    fn default() -> Self {
        SessionQueue {
            session: GLOBAL_SESSION + 1,
            last_session: GLOBAL_SESSION + 1,
            next_seq: 0,
            pending: VecDeque::new(),
            in_flight: None,
            opening: None,
            ready: Vec::new(),
        }
    }
}

impl SessionQueue {
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Supersede the current session. Queued requests and any session
    /// being opened are dropped.
    pub fn begin_session(&mut self) -> u64 {
        self.last_session += 1;
        self.opening = None;
        self.enter(self.last_session);
        self.session
    }

    /// Send `call` under a fresh session without leaving the current one.
    /// A newer opening supersedes an older one.
    pub fn open_session(&mut self, call: ApiCall) -> u64 {
        self.last_session += 1;
        let ticket = self.ticket(self.last_session);
        self.ready.retain(|out| Some(out.ticket) != self.opening);
        self.opening = Some(ticket);
        self.ready.push(Outgoing { ticket, call });
        self.last_session
    }

    /// Switch to a session whose opening reply succeeded. Requests of the
    /// previous session are dropped and their replies become stale.
    pub fn commit_session(&mut self, session: u64) {
        if session > self.session {
            self.enter(session);
        }
    }

    fn enter(&mut self, session: u64) {
        self.session = session;
        self.pending.clear();
        self.in_flight = None;
        self.ready
            .retain(|out| out.ticket.session == GLOBAL_SESSION || out.ticket.session == session);
    }

    pub fn push_back(&mut self, call: ApiCall) {
        self.pending.push_back(call);
    }

    /// Queue ahead of everything else still waiting.
    pub fn push_front(&mut self, call: ApiCall) {
        self.pending.push_front(call);
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn send_global(&mut self, call: ApiCall) {
        let ticket = self.ticket(GLOBAL_SESSION);
        self.ready.push(Outgoing { ticket, call });
    }

    /// Waiting or in-flight requests matching `pred`.
    pub fn count_matching(&self, pred: impl Fn(&ApiCall) -> bool) -> usize {
        let flying = self.in_flight.iter().filter(|(_, c)| pred(c)).count();
        flying + self.pending.iter().filter(|c| pred(c)).count()
    }

    /// Match a reply to what was sent. Frees the in-flight slot on `Current`.
    pub fn accept(&mut self, ticket: Ticket) -> Accepted {
        if ticket.session == GLOBAL_SESSION {
            return Accepted::Global;
        }
        if self.opening == Some(ticket) {
            self.opening = None;
            return Accepted::Opening(ticket.session);
        }
        match self.in_flight.take() {
            Some((sent, call)) if sent == ticket => Accepted::Current(call),
            other => {
                self.in_flight = other;
                Accepted::Stale
            }
        }
    }

    /// Release the next session request if none is in flight, then hand
    /// back everything ready to send.
    pub fn drain_ready(&mut self) -> Vec<Outgoing> {
        if self.in_flight.is_none() {
            if let Some(call) = self.pending.pop_front() {
                let ticket = self.ticket(self.session);
                self.in_flight = Some((ticket, call.clone()));
                self.ready.push(Outgoing { ticket, call });
            }
        }
        std::mem::take(&mut self.ready)
    }

    fn ticket(&mut self, session: u64) -> Ticket {
        self.next_seq += 1;
        Ticket { session, seq: self.next_seq }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::Difficulty;

    fn undo() -> ApiCall {
        ApiCall::Undo { game_id: "g".into() }
    }

    fn redo() -> ApiCall {
        ApiCall::Redo { game_id: "g".into() }
    }

    #[test]
    fn one_session_request_in_flight_at_a_time() {
        let mut q = SessionQueue::default();
        q.push_back(undo());
        q.push_back(redo());

        let first = q.drain_ready();
        assert_eq!(first.len(), 1);
        assert!(matches!(first[0].call, ApiCall::Undo { .. }));
        assert!(q.drain_ready().is_empty(), "second waits for the first reply");

        assert!(matches!(q.accept(first[0].ticket), Accepted::Current(ApiCall::Undo { .. })));
        let second = q.drain_ready();
        assert_eq!(second.len(), 1);
        assert!(matches!(second[0].call, ApiCall::Redo { .. }));
    }

    #[test]
    fn new_session_drops_queue_and_marks_old_replies_stale() {
        let mut q = SessionQueue::default();
        q.push_back(undo());
        q.push_back(redo());
        let sent = q.drain_ready();

        q.begin_session();
        q.push_back(ApiCall::NewGame { difficulty: Difficulty::Hard });
        let fresh = q.drain_ready();
        assert_eq!(fresh.len(), 1, "old in-flight request does not block");
        assert!(matches!(fresh[0].call, ApiCall::NewGame { .. }));

        assert_eq!(q.accept(sent[0].ticket), Accepted::Stale);
        // the fresh request is still in flight after the stale reply
        assert!(matches!(q.accept(fresh[0].ticket), Accepted::Current(_)));
        assert!(q.drain_ready().is_empty(), "redo from the old session is gone");
    }

    #[test]
    fn opening_runs_beside_the_current_session() {
        let mut q = SessionQueue::default();
        q.push_back(undo());
        q.push_back(redo());
        let old = q.drain_ready();

        let next = q.open_session(ApiCall::NewGame { difficulty: Difficulty::Easy });
        let opening = q.drain_ready();
        assert_eq!(opening.len(), 1);
        assert_eq!(opening[0].ticket.session, next);

        // the old session carries on until the new one is committed
        assert!(matches!(q.accept(old[0].ticket), Accepted::Current(ApiCall::Undo { .. })));
        let queued = q.drain_ready();
        assert!(matches!(queued[0].call, ApiCall::Redo { .. }));

        assert_eq!(q.accept(opening[0].ticket), Accepted::Opening(next));
        q.commit_session(next);
        assert_eq!(q.session(), next);
        assert_eq!(q.accept(queued[0].ticket), Accepted::Stale);
        assert_eq!(q.count_matching(|_| true), 0);
    }

    #[test]
    fn failed_opening_leaves_session_untouched() {
        let mut q = SessionQueue::default();
        let before = q.session();
        q.push_back(undo());
        let old = q.drain_ready();
        q.open_session(ApiCall::NewGame { difficulty: Difficulty::Hard });
        let opening = q.drain_ready();

        assert!(matches!(q.accept(opening[0].ticket), Accepted::Opening(_)));
        assert_eq!(q.session(), before);
        assert!(matches!(q.accept(old[0].ticket), Accepted::Current(_)));
    }

    #[test]
    fn newer_opening_and_leaving_supersede_older_ones() {
        let mut q = SessionQueue::default();
        q.open_session(ApiCall::NewGame { difficulty: Difficulty::Hard });
        let first = q.drain_ready();
        q.open_session(ApiCall::NewGame { difficulty: Difficulty::Easy });
        let second = q.drain_ready();
        assert_eq!(q.accept(first[0].ticket), Accepted::Stale);

        q.begin_session();
        assert_eq!(q.accept(second[0].ticket), Accepted::Stale);
    }

    #[test]
    fn push_front_jumps_the_queue() {
        let mut q = SessionQueue::default();
        q.push_back(ApiCall::CheckSolution { game_id: "g".into() });
        q.push_back(undo());
        let sent = q.drain_ready();
        q.accept(sent[0].ticket);
        q.push_front(redo());
        let next = q.drain_ready();
        assert!(matches!(next[0].call, ApiCall::Redo { .. }));
    }

    #[test]
    fn global_calls_bypass_the_fifo() {
        let mut q = SessionQueue::default();
        q.push_back(undo());
        q.drain_ready();
        q.send_global(ApiCall::UserStats);
        let out = q.drain_ready();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ticket.session, GLOBAL_SESSION);
        assert_eq!(q.accept(out[0].ticket), Accepted::Global);
        assert_eq!(q.count_matching(|_| true), 1, "undo still in flight");
    }

    #[test]
    fn counts_include_in_flight() {
        let mut q = SessionQueue::default();
        q.push_back(undo());
        q.push_back(undo());
        q.push_back(redo());
        q.drain_ready();
        assert_eq!(q.count_matching(|c| matches!(c, ApiCall::Undo { .. })), 2);
    }
}
