//! Shared scenario-testing harness used by the integration tests.
//!
//! Mirrors the queue-and-flush shape of a real transport: client/server
//! `send` callbacks stage JSON into a queue instead of delivering it
//! immediately, and tests flush those queues explicitly to control
//! interleaving.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use collab_ot::{Client, Op, Server};

pub struct Scenario {
    pub server: Server,
    pub clients: Vec<Client>,
    client_queues: Rc<RefCell<Vec<VecDeque<String>>>>,
    server_queue: Rc<RefCell<VecDeque<String>>>,
}

impl Scenario {
    pub fn new(num_clients: u32) -> Self {
        let server_queue = Rc::new(RefCell::new(VecDeque::new()));
        let server_queue_clone = server_queue.clone();
        let server = Server::new(move |json| server_queue_clone.borrow_mut().push_back(json), |_event| {});

        let client_queues = Rc::new(RefCell::new((0..num_clients).map(|_| VecDeque::new()).collect()));
        let clients = (0..num_clients)
            .map(|id| {
                let queues = client_queues.clone();
                Client::new(
                    id,
                    move |json| queues.borrow_mut()[id as usize].push_back(json),
                    |_event| {},
                )
            })
            .collect();

        Scenario { server, clients, client_queues, server_queue }
    }

    pub fn apply(&mut self, client: usize, op: Op) {
        self.clients[client].apply(op).unwrap();
    }

    /// Delivers every queued message from one client to the server.
    pub fn flush_client(&mut self, id: usize) {
        let pending: Vec<String> = self.client_queues.borrow_mut()[id].drain(..).collect();
        assert!(!pending.is_empty(), "flush_client({id}) called with an empty queue");
        for json in pending {
            self.server.receive(&json);
        }
    }

    /// Delivers every client's queued messages to the server, skipping
    /// clients with nothing staged.
    pub fn flush_clients(&mut self) {
        let mut flushed = false;
        for id in 0..self.clients.len() {
            if !self.client_queues.borrow()[id].is_empty() {
                flushed = true;
                self.flush_client(id);
            }
        }
        assert!(flushed, "flush_clients() called with every queue empty");
    }

    /// Delivers every queued server broadcast to every client.
    pub fn flush_server(&mut self) {
        let pending: Vec<String> = self.server_queue.borrow_mut().drain(..).collect();
        assert!(!pending.is_empty(), "flush_server() called with an empty queue");
        for json in pending {
            for client in &mut self.clients {
                client.receive(&json);
            }
        }
    }

    /// Same as `flush_server`, but tolerates an empty queue (useful from a
    /// fuzzer driving many clients where not every round produces traffic).
    pub fn drain_server(&mut self) {
        let pending: Vec<String> = self.server_queue.borrow_mut().drain(..).collect();
        for json in pending {
            for client in &mut self.clients {
                client.receive(&json);
            }
        }
    }

    /// Same as `flush_client`, but tolerates an empty queue.
    pub fn drain_client(&mut self, id: usize) {
        let pending: Vec<String> = self.client_queues.borrow_mut()[id].drain(..).collect();
        for json in pending {
            self.server.receive(&json);
        }
    }

    pub fn snapshot(&self, client: usize) -> String {
        self.clients[client].doc.composed().map(|op| op.snapshot()).unwrap_or_default()
    }

    pub fn server_snapshot(&self) -> String {
        self.server.doc.composed().map(|op| op.snapshot()).unwrap_or_default()
    }

    pub fn assert_convergence(&self, expected: &str) {
        for id in 0..self.clients.len() {
            assert_eq!(self.snapshot(id), expected, "client {id} did not converge");
        }
        assert_eq!(self.server_snapshot(), expected, "server did not converge");
    }

    pub fn client_queue_is_empty(&self, id: usize) -> bool {
        self.client_queues.borrow()[id].is_empty()
    }

    pub fn server_queue_is_empty(&self) -> bool {
        self.server_queue.borrow().is_empty()
    }
}

pub fn op(build: impl FnOnce(&mut Op)) -> Op {
    let mut o = Op::new(0);
    build(&mut o);
    o
}
