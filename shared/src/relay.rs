//! In-process relay implementing [`Transport`] for tests and local play.
//!
//! A [`LocalRelay`] plays the role of the remote relay service: it hands out
//! session codes and participant ids, routes host payloads to every client
//! and client payloads to the host, and announces joins and leaves. Game
//! payloads can be dropped at a configurable rate to exercise the
//! unreliable-channel behaviour; join/leave notifications are never dropped.

use crate::error::TransportError;
use crate::protocol::{ParticipantId, SessionCode};
use crate::transport::{EventKind, Transport, TransportEvent};
use async_trait::async_trait;
use log::{debug, info};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

const SESSION_CODE_LEN: usize = 6;

type EventSender = mpsc::UnboundedSender<TransportEvent>;

struct RelaySession {
    host: ParticipantId,
    members: BTreeMap<ParticipantId, EventSender>,
}

struct RelayState {
    sessions: HashMap<SessionCode, RelaySession>,
    next_message_id: u64,
    drop_rate: f64,
    rng: StdRng,
}

impl RelayState {
    fn next_message_id(&mut self) -> u64 {
        self.next_message_id += 1;
        self.next_message_id
    }

    fn fresh_code(&mut self) -> SessionCode {
        loop {
            let raw: String = (0..SESSION_CODE_LEN)
                .map(|_| char::from(self.rng.sample(Alphanumeric)).to_ascii_uppercase())
                .collect();
            if let Ok(code) = SessionCode::parse(&raw) {
                if !self.sessions.contains_key(&code) {
                    return code;
                }
            }
        }
    }

    fn fresh_participant(&mut self) -> ParticipantId {
        loop {
            let id = ParticipantId::new(format!("{:08x}", self.rng.gen::<u32>()));
            let taken = self
                .sessions
                .values()
                .any(|session| session.members.contains_key(&id));
            if !taken {
                return id;
            }
        }
    }

    fn should_drop(&mut self) -> bool {
        self.drop_rate > 0.0 && self.rng.gen_bool(self.drop_rate)
    }

    fn deliver(&mut self, to: &EventSender, kind: EventKind, origin: &ParticipantId, payload: Value) {
        let event = TransportEvent {
            kind,
            message_id: self.next_message_id(),
            origin: origin.clone(),
            payload,
        };
        // a closed receiver just means that endpoint went away
        let _ = to.send(event);
    }
}

/// Shared handle to an in-process relay. Cloning yields another handle to
/// the same relay.
#[derive(Clone)]
pub struct LocalRelay {
    state: Arc<Mutex<RelayState>>,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: Arc::new(Mutex::new(RelayState {
                sessions: HashMap::new(),
                next_message_id: 0,
                drop_rate: 0.0,
                rng,
            })),
        }
    }

    /// Sets the probability that a game payload is silently lost
    pub fn with_drop_rate(self, rate: f64) -> Self {
        self.lock().drop_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Creates an unattached endpoint
    pub fn connect(&self) -> LocalTransport {
        LocalTransport {
            relay: self.clone(),
            endpoint: None,
        }
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn member_count(&self, code: &SessionCode) -> usize {
        self.lock()
            .sessions
            .get(code)
            .map_or(0, |session| session.members.len())
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LocalRelay {
    fn default() -> Self {
        Self::new()
    }
}

struct Endpoint {
    code: SessionCode,
    id: ParticipantId,
    is_host: bool,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// One participant's connection to a [`LocalRelay`]
pub struct LocalTransport {
    relay: LocalRelay,
    endpoint: Option<Endpoint>,
}

impl LocalTransport {
    pub fn participant_id(&self) -> Option<&ParticipantId> {
        self.endpoint.as_ref().map(|endpoint| &endpoint.id)
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn host(&mut self) -> Result<(SessionCode, ParticipantId), TransportError> {
        if self.endpoint.is_some() {
            return Err(TransportError::Rejected("already attached to a session".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.relay.lock();
        let code = state.fresh_code();
        let id = state.fresh_participant();

        let mut members = BTreeMap::new();
        members.insert(id.clone(), tx);
        state.sessions.insert(
            code.clone(),
            RelaySession {
                host: id.clone(),
                members,
            },
        );
        drop(state);

        info!("Relay opened session {} for host {}", code, id);
        self.endpoint = Some(Endpoint {
            code: code.clone(),
            id: id.clone(),
            is_host: true,
            events: rx,
        });
        Ok((code, id))
    }

    async fn join(&mut self, code: &SessionCode) -> Result<ParticipantId, TransportError> {
        if self.endpoint.is_some() {
            return Err(TransportError::Rejected("already attached to a session".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.relay.lock();
        if !state.sessions.contains_key(code) {
            return Err(TransportError::UnknownSession(code.to_string()));
        }
        let id = state.fresh_participant();

        let host_tx = match state.sessions.get_mut(code) {
            Some(session) => {
                session.members.insert(id.clone(), tx);
                session.members.get(&session.host).cloned()
            }
            None => None,
        };
        if let Some(host_tx) = host_tx {
            state.deliver(&host_tx, EventKind::Joined, &id, Value::Null);
        }
        drop(state);

        info!("Relay attached {} to session {}", id, code);
        self.endpoint = Some(Endpoint {
            code: code.clone(),
            id: id.clone(),
            is_host: false,
            events: rx,
        });
        Ok(id)
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        match self.endpoint.as_mut() {
            Some(endpoint) => endpoint.events.recv().await,
            None => None,
        }
    }

    fn try_next_event(&mut self) -> Option<TransportEvent> {
        self.endpoint
            .as_mut()
            .and_then(|endpoint| endpoint.events.try_recv().ok())
    }

    fn transmit(&mut self, payload: Value) -> Result<(), TransportError> {
        let endpoint = self.endpoint.as_ref().ok_or(TransportError::NotConnected)?;
        let mut state = self.relay.lock();

        let recipients: Vec<EventSender> = {
            let session = state
                .sessions
                .get(&endpoint.code)
                .ok_or(TransportError::Closed)?;
            if endpoint.is_host {
                session
                    .members
                    .iter()
                    .filter(|(id, _)| **id != endpoint.id)
                    .map(|(_, tx)| tx.clone())
                    .collect()
            } else {
                session.members.get(&session.host).cloned().into_iter().collect()
            }
        };

        for tx in recipients {
            if state.should_drop() {
                debug!("Relay dropped a payload from {}", endpoint.id);
                continue;
            }
            state.deliver(&tx, EventKind::Game, &endpoint.id, payload.clone());
        }
        Ok(())
    }

    async fn leave(&mut self) {
        let Some(endpoint) = self.endpoint.take() else {
            return;
        };
        let mut state = self.relay.lock();

        if endpoint.is_host {
            if let Some(session) = state.sessions.remove(&endpoint.code) {
                for (id, tx) in &session.members {
                    if *id != endpoint.id {
                        state.deliver(tx, EventKind::Left, &endpoint.id, Value::Null);
                    }
                }
            }
            info!("Relay closed session {}", endpoint.code);
        } else {
            let host_tx = state.sessions.get_mut(&endpoint.code).and_then(|session| {
                session.members.remove(&endpoint.id);
                session.members.get(&session.host).cloned()
            });
            if let Some(host_tx) = host_tx {
                state.deliver(&host_tx, EventKind::Left, &endpoint.id, Value::Null);
            }
            info!("Relay detached {} from session {}", endpoint.id, endpoint.code);
        }
    }
}
