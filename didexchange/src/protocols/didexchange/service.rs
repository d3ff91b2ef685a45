use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, RwLock};

use futures::channel::oneshot;
use futures::lock::Mutex as ConnectionMutex;
use messages::a2a::A2AMessage;
use messages::didexchange::invitation::Invitation;

use crate::errors::error::prelude::*;
use crate::protocols::didexchange::states::{state_from_msg_type, state_from_name, State};
use crate::protocols::didexchange::ExchangeContext;
use crate::storage::{ConnectionRecord, Namespace};
use crate::utils::uuid::uuid;

/// Bound on every subscriber channel; a subscriber that falls further behind
/// loses events rather than blocking the protocol.
pub const EVENT_BUFFER_SIZE: usize = 32;

/// Pause point surfaced to subscribers before a gated transition executes.
/// Resolve it with [ConnectionService::continue_exchange] or
/// [ConnectionService::stop_exchange].
#[derive(Debug, Clone)]
pub struct ActionEvent {
    pub connection_id: String,
    pub thread_id: String,
    pub message: A2AMessage,
}

/// Emitted after a state has been durably committed.
#[derive(Debug, Clone)]
pub struct StateEvent {
    pub connection_id: String,
    pub thread_id: String,
    pub state: String,
    pub message: Option<A2AMessage>,
    pub error_msg: Option<String>,
}

#[derive(Debug)]
enum ActionDecision {
    Continue,
    Stop(String),
}

struct PendingAction {
    msg_type: &'static str,
    decision: oneshot::Sender<ActionDecision>,
}

/// The protocol service: correlates inbound messages with connection
/// records, drives the state machine, and publishes action and post-state
/// events. Message processing for a single connection is serialized behind a
/// per-connection mutex; distinct connections progress in parallel.
pub struct ConnectionService {
    ctx: Arc<ExchangeContext>,
    connection_locks: RwLock<HashMap<String, Arc<ConnectionMutex<()>>>>,
    action_senders: Mutex<Vec<SyncSender<ActionEvent>>>,
    state_senders: Mutex<Vec<SyncSender<StateEvent>>>,
    pending_actions: Mutex<HashMap<String, PendingAction>>,
}

impl ConnectionService {
    pub fn new(ctx: ExchangeContext) -> ConnectionService {
        ConnectionService {
            ctx: Arc::new(ctx),
            connection_locks: RwLock::new(HashMap::new()),
            action_senders: Mutex::new(Vec::new()),
            state_senders: Mutex::new(Vec::new()),
            pending_actions: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_action_event_receiver(&self) -> Receiver<ActionEvent> {
        let (tx, rx) = sync_channel(EVENT_BUFFER_SIZE);
        self.action_senders.lock().expect("unpoisoned mutex").push(tx);
        rx
    }

    pub fn register_state_event_receiver(&self) -> Receiver<StateEvent> {
        let (tx, rx) = sync_channel(EVENT_BUFFER_SIZE);
        self.state_senders.lock().expect("unpoisoned mutex").push(tx);
        rx
    }

    fn emit_action_event(&self, event: ActionEvent) -> usize {
        let mut delivered = 0;
        self.action_senders
            .lock()
            .expect("unpoisoned mutex")
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(_) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!("Action event subscriber is not keeping up, dropping event");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
        delivered
    }

    fn emit_state_event(&self, event: StateEvent) {
        trace!(
            "Emitting state event for connection {}: {}",
            event.connection_id,
            event.state
        );
        self.state_senders
            .lock()
            .expect("unpoisoned mutex")
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(_) => true,
                Err(TrySendError::Full(_)) => {
                    warn!("State event subscriber is not keeping up, dropping event");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    fn connection_lock(&self, connection_id: &str) -> Arc<ConnectionMutex<()>> {
        {
            let locks = self.connection_locks.read().expect("unpoisoned lock");
            if let Some(lock) = locks.get(connection_id) {
                return Arc::clone(lock);
            }
        }
        let mut locks = self.connection_locks.write().expect("unpoisoned lock");
        Arc::clone(
            locks
                .entry(connection_id.to_string())
                .or_insert_with(|| Arc::new(ConnectionMutex::new(()))),
        )
    }

    /// Entry point for the transport: a raw JSON message buffer.
    pub async fn handle_inbound_bytes(&self, payload: &[u8]) -> ExchangeResult<String> {
        let message: A2AMessage = serde_json::from_slice(payload)?;
        self.handle_inbound(message).await
    }

    /// Dispatches one inbound protocol message, returning the id of the
    /// connection it progressed.
    pub async fn handle_inbound(&self, message: A2AMessage) -> ExchangeResult<String> {
        let next = state_from_msg_type(&message)?;
        let namespace = Namespace::from_msg(&message).ok_or(err_msg(
            ExchangeErrorKind::UnrecognizedMsgType,
            "Message type carries no namespace",
        ))?;
        let thread_id = message.thread_id().unwrap_or_else(|| message.id());

        debug!(
            "Handling inbound {} message on thread {} (namespace {})",
            message.type_name(),
            thread_id,
            namespace
        );

        let connection_id = self.resolve_connection_id(&message, namespace, &thread_id).await?;

        let lock = self.connection_lock(&connection_id);
        let _guard = lock.lock().await;

        let record = self.ctx.store.get(&connection_id).await?;

        // replay of the message committed last is idempotent
        let msg_id = message.id();
        if record.last_msg_id.as_deref() == Some(msg_id.as_str()) {
            debug!(
                "Duplicate {} message {} on connection {}, ignoring",
                message.type_name(),
                message.id(),
                connection_id
            );
            self.ctx.store.save(&record).await?;
            return Ok(connection_id);
        }

        let current = state_from_name(&record.state)?;
        if !current.can_transition_to(next) {
            return Err(err_msg(
                ExchangeErrorKind::IllegalTransition,
                format!(
                    "Transition from {} to {} is not allowed for connection {}",
                    record.state,
                    next.name(),
                    connection_id
                ),
            ));
        }

        // invitations and exchange requests pause for approval; responses
        // and acks execute unattended
        if matches!(
            message,
            A2AMessage::ConnectionInvitation(_) | A2AMessage::ConnectionRequest(_)
        ) {
            if let Some(reason) = self.await_approval(&connection_id, &thread_id, &message).await {
                self.abandon(record, Some(reason.clone()), Some(&message)).await;
                return Err(err_msg(
                    ExchangeErrorKind::InvalidState,
                    format!("Exchange stopped by subscriber: {}", reason),
                ));
            }
        }

        self.execute_transitions(record, next, &message).await?;
        Ok(connection_id)
    }

    async fn resolve_connection_id(
        &self,
        message: &A2AMessage,
        namespace: Namespace,
        thread_id: &str,
    ) -> ExchangeResult<String> {
        match self.ctx.store.get_by_ns_thread(namespace, thread_id).await {
            Ok(record) => Ok(record.connection_id),
            Err(err) if err.kind() == ExchangeErrorKind::NotFound => {
                self.create_record(message, namespace, thread_id).await
            }
            Err(err) => Err(err),
        }
    }

    /// Only an invitation, or a request referencing one of our invitations
    /// by parent thread id, may open a new record.
    async fn create_record(
        &self,
        message: &A2AMessage,
        namespace: Namespace,
        thread_id: &str,
    ) -> ExchangeResult<String> {
        match message {
            A2AMessage::ConnectionInvitation(invitation) => {
                let record = ConnectionRecord {
                    connection_id: uuid(),
                    thread_id: thread_id.to_string(),
                    namespace,
                    invitation_id: Some(invitation.id.0.clone()),
                    ..Default::default()
                };
                self.ctx.store.save_with_ns_thread(&record).await?;
                Ok(record.connection_id)
            }
            A2AMessage::ConnectionRequest(_) => {
                let parent_thread_id = message.parent_thread_id().ok_or(err_msg(
                    ExchangeErrorKind::UnknownThread,
                    format!("No connection record matches thread {}", thread_id),
                ))?;
                let mut record = self
                    .ctx
                    .store
                    .get_by_ns_thread(Namespace::Their, &parent_thread_id)
                    .await
                    .map_err(|_| {
                        err_msg(
                            ExchangeErrorKind::UnknownThread,
                            format!(
                                "Request references unknown invitation {} on thread {}",
                                parent_thread_id, thread_id
                            ),
                        )
                    })?;
                record.thread_id = thread_id.to_string();
                record.parent_thread_id = Some(parent_thread_id);
                self.ctx.store.save_with_ns_thread(&record).await?;
                Ok(record.connection_id)
            }
            _ => Err(err_msg(
                ExchangeErrorKind::UnknownThread,
                format!("No connection record matches thread {}", thread_id),
            )),
        }
    }

    /// Runs the rendezvous with action subscribers. Returns the stop reason
    /// when the subscriber denied the transition.
    async fn await_approval(&self, connection_id: &str, thread_id: &str, message: &A2AMessage) -> Option<String> {
        {
            let senders = self.action_senders.lock().expect("unpoisoned mutex");
            if senders.is_empty() {
                return None;
            }
        }

        let (tx, rx) = oneshot::channel();
        self.pending_actions.lock().expect("unpoisoned mutex").insert(
            connection_id.to_string(),
            PendingAction {
                msg_type: message.type_name(),
                decision: tx,
            },
        );

        let delivered = self.emit_action_event(ActionEvent {
            connection_id: connection_id.to_string(),
            thread_id: thread_id.to_string(),
            message: message.clone(),
        });
        if delivered == 0 {
            // all subscribers went away; execute unattended
            self.pending_actions.lock().expect("unpoisoned mutex").remove(connection_id);
            return None;
        }

        match rx.await {
            Ok(ActionDecision::Continue) => None,
            Ok(ActionDecision::Stop(reason)) => Some(reason),
            Err(oneshot::Canceled) => Some("Action decision channel was dropped".to_string()),
        }
    }

    async fn execute_transitions(
        &self,
        record: ConnectionRecord,
        next: State,
        message: &A2AMessage,
    ) -> ExchangeResult<()> {
        let mut record = record;
        let mut next = next;
        loop {
            let before = record.clone();
            let (updated, followup) = match self.execute_single(record, next, message).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    if err.kind().is_transient() {
                        return Err(err);
                    }
                    self.abandon(before, Some(err.to_string()), Some(message)).await;
                    return Err(err);
                }
            };
            record = updated;
            if followup == State::NoOp {
                return Ok(());
            }
            next = followup;
        }
    }

    async fn execute_single(
        &self,
        record: ConnectionRecord,
        state: State,
        message: &A2AMessage,
    ) -> ExchangeResult<(ConnectionRecord, State)> {
        let (mut updated, followup, action) = state.execute_inbound(&self.ctx, record, message).await?;

        if let Some(action) = action {
            action.await?;
        }

        updated.state = state.name().to_string();
        updated.last_msg_id = Some(message.id());
        self.ctx.store.save_with_ns_thread(&updated).await?;

        self.emit_state_event(StateEvent {
            connection_id: updated.connection_id.clone(),
            thread_id: updated.thread_id.clone(),
            state: updated.state.clone(),
            message: Some(message.clone()),
            error_msg: None,
        });

        Ok((updated, followup))
    }

    async fn abandon(&self, record: ConnectionRecord, reason: Option<String>, message: Option<&A2AMessage>) {
        let mut record = record;
        record.state = State::Abandoned.name().to_string();
        record.abandon_reason = reason.clone();
        if let Err(err) = self.ctx.store.save_with_ns_thread(&record).await {
            warn!(
                "Failed to persist abandoned connection {}: {}",
                record.connection_id, err
            );
        }
        self.emit_state_event(StateEvent {
            connection_id: record.connection_id.clone(),
            thread_id: record.thread_id.clone(),
            state: record.state,
            message: message.cloned(),
            error_msg: reason,
        });
    }
}

/// Client operations.
impl ConnectionService {
    /// Publishes a fresh out-of-band invitation and opens its connection
    /// record, awaiting the counterpart's request.
    pub async fn create_invitation(&self) -> ExchangeResult<(Invitation, ConnectionRecord)> {
        let verkey = self.ctx.wallet.create_key().await?;
        let invitation = Invitation::new(
            self.ctx.label.clone(),
            vec![verkey.clone()],
            self.ctx.service_endpoint.clone(),
            self.ctx.routing_keys.clone(),
        );

        let record = ConnectionRecord {
            connection_id: uuid(),
            thread_id: invitation.id.0.clone(),
            namespace: Namespace::Their,
            invitation_id: Some(invitation.id.0.clone()),
            service_endpoint: self.ctx.service_endpoint.clone(),
            recipient_keys: vec![verkey],
            routing_keys: self.ctx.routing_keys.clone(),
            ..Default::default()
        };
        self.ctx.store.save_with_ns_thread(&record).await?;

        info!(
            "Created invitation {} on connection {}",
            invitation.id.0, record.connection_id
        );
        Ok((invitation, record))
    }

    /// Accepts an out-of-band invitation received by the embedding
    /// application, driving the record to `requested`.
    pub async fn handle_invitation(&self, invitation: Invitation) -> ExchangeResult<String> {
        self.handle_inbound(A2AMessage::from(invitation)).await
    }

    /// Approves a pending inbound exchange request, letting the state
    /// machine respond to it.
    pub fn accept_exchange_request(&self, connection_id: &str) -> ExchangeResult<()> {
        let mut pending = self.pending_actions.lock().expect("unpoisoned mutex");
        match pending.get(connection_id) {
            Some(action) if action.msg_type == "request" => {}
            Some(action) => {
                return Err(err_msg(
                    ExchangeErrorKind::InvalidState,
                    format!(
                        "Pending action for connection {} is a {}, not an exchange request",
                        connection_id, action.msg_type
                    ),
                ))
            }
            None => {
                return Err(err_msg(
                    ExchangeErrorKind::InvalidState,
                    format!("No pending exchange request for connection {}", connection_id),
                ))
            }
        }
        send_decision(pending.remove(connection_id), connection_id, ActionDecision::Continue)
    }

    /// Approves whatever transition is pending for the connection.
    pub fn continue_exchange(&self, connection_id: &str) -> ExchangeResult<()> {
        let pending = self
            .pending_actions
            .lock()
            .expect("unpoisoned mutex")
            .remove(connection_id);
        send_decision(pending, connection_id, ActionDecision::Continue)
    }

    /// Denies the pending transition; the record moves to `abandoned` with
    /// the reason recorded.
    pub fn stop_exchange(&self, connection_id: &str, reason: &str) -> ExchangeResult<()> {
        let pending = self
            .pending_actions
            .lock()
            .expect("unpoisoned mutex")
            .remove(connection_id);
        send_decision(pending, connection_id, ActionDecision::Stop(reason.to_string()))
    }

    pub async fn get_connection(&self, connection_id: &str) -> ExchangeResult<ConnectionRecord> {
        self.ctx.store.get(connection_id).await
    }

    pub async fn query_connections(&self, state_filter: Option<&str>) -> ExchangeResult<Vec<ConnectionRecord>> {
        self.ctx.store.query(state_filter).await
    }
}

fn send_decision(
    pending: Option<PendingAction>,
    connection_id: &str,
    decision: ActionDecision,
) -> ExchangeResult<()> {
    let pending = pending.ok_or(err_msg(
        ExchangeErrorKind::InvalidState,
        format!("No pending action for connection {}", connection_id),
    ))?;
    pending.decision.send(decision).map_err(|_| {
        err_msg(
            ExchangeErrorKind::InvalidState,
            format!("Pending action for connection {} is no longer awaited", connection_id),
        )
    })
}

/// Approval loop for embedders that do not gate transitions: replies
/// `Continue` to every action event until the service goes away.
pub fn auto_execute_action_events(
    service: Arc<ConnectionService>,
    receiver: Receiver<ActionEvent>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for event in receiver.iter() {
            if let Err(err) = service.continue_exchange(&event.connection_id) {
                warn!("Failed to auto-continue exchange {}: {}", event.connection_id, err);
            }
        }
    })
}
