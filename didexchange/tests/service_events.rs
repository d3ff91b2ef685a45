mod utils;

use std::sync::Arc;
use std::time::Duration;

use didexchange::errors::error::ExchangeErrorKind;
use didexchange::protocols::didexchange::service::{auto_execute_action_events, ActionEvent};

use utils::*;

async fn recv_action_event(receiver: std::sync::mpsc::Receiver<ActionEvent>) -> (ActionEvent, std::sync::mpsc::Receiver<ActionEvent>) {
    tokio::task::spawn_blocking(move || {
        let event = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("an action event within the timeout");
        (event, receiver)
    })
    .await
    .expect("spawn_blocking join")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exchange_request_waits_for_approval() {
    init_logging();
    let alice = agent("alice", "https://alice.example.org");
    let bob = agent("bob", "https://bob.example.org");

    let action_receiver = alice.service.register_action_event_receiver();

    let (invitation, alice_record) = alice.service.create_invitation().await.unwrap();
    bob.service.handle_invitation(invitation).await.unwrap();
    let (request, _) = bob.dispatcher.pop().unwrap();

    let alice_service = alice.service.clone();
    let inbound = tokio::spawn(async move { alice_service.handle_inbound(request).await });

    let (event, _receiver) = recv_action_event(action_receiver).await;
    assert_eq!(event.connection_id, alice_record.connection_id);
    assert_eq!(event.message.type_name(), "request");

    // nothing ran yet: the record is still where the invitation left it
    assert_eq!(
        alice.service.get_connection(&alice_record.connection_id).await.unwrap().state,
        "null"
    );

    alice.service.accept_exchange_request(&event.connection_id).unwrap();
    inbound.await.unwrap().unwrap();

    let record = alice.service.get_connection(&alice_record.connection_id).await.unwrap();
    assert_eq!(record.state, "responded");
    assert!(!alice.dispatcher.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stopped_exchange_is_abandoned_with_reason() {
    init_logging();
    let alice = agent("alice", "https://alice.example.org");
    let bob = agent("bob", "https://bob.example.org");

    let action_receiver = alice.service.register_action_event_receiver();
    let state_receiver = alice.service.register_state_event_receiver();

    let (invitation, alice_record) = alice.service.create_invitation().await.unwrap();
    bob.service.handle_invitation(invitation).await.unwrap();
    let (request, _) = bob.dispatcher.pop().unwrap();

    let alice_service = alice.service.clone();
    let inbound = tokio::spawn(async move { alice_service.handle_inbound(request).await });

    let (event, _receiver) = recv_action_event(action_receiver).await;
    alice.service.stop_exchange(&event.connection_id, "not today").unwrap();

    let err = inbound.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ExchangeErrorKind::InvalidState);

    let record = alice.service.get_connection(&alice_record.connection_id).await.unwrap();
    assert_eq!(record.state, "abandoned");
    assert_eq!(record.abandon_reason.as_deref(), Some("not today"));
    // no response went out
    assert!(alice.dispatcher.is_empty());

    let events: Vec<_> = state_receiver.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].state, "abandoned");
    assert_eq!(events[0].error_msg.as_deref(), Some("not today"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_accept_exchange_request_rejects_pending_invitation() {
    init_logging();
    let alice = agent("alice", "https://alice.example.org");
    let bob = agent("bob", "https://bob.example.org");

    let action_receiver = bob.service.register_action_event_receiver();

    let (invitation, _) = alice.service.create_invitation().await.unwrap();
    let bob_service = bob.service.clone();
    let inbound = tokio::spawn(async move { bob_service.handle_invitation(invitation).await });

    let (event, _receiver) = recv_action_event(action_receiver).await;
    assert_eq!(event.message.type_name(), "invitation");

    // the pending action is an invitation, not an exchange request
    let err = bob.service.accept_exchange_request(&event.connection_id).unwrap_err();
    assert_eq!(err.kind(), ExchangeErrorKind::InvalidState);

    bob.service.continue_exchange(&event.connection_id).unwrap();
    inbound.await.unwrap().unwrap();

    let record = bob.service.get_connection(&event.connection_id).await.unwrap();
    assert_eq!(record.state, "requested");
}

#[tokio::test]
async fn test_accept_exchange_request_without_pending_action_fails() {
    init_logging();
    let alice = agent("alice", "https://alice.example.org");

    let err = alice.service.accept_exchange_request("no-such-connection").unwrap_err();
    assert_eq!(err.kind(), ExchangeErrorKind::InvalidState);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_auto_execute_approves_every_transition() {
    init_logging();
    let alice = agent("alice", "https://alice.example.org");
    let bob = agent("bob", "https://bob.example.org");

    let alice_actions = alice.service.register_action_event_receiver();
    let bob_actions = bob.service.register_action_event_receiver();
    let _alice_loop = auto_execute_action_events(alice.service.clone(), alice_actions);
    let _bob_loop = auto_execute_action_events(bob.service.clone(), bob_actions);

    let (invitation, alice_record) = alice.service.create_invitation().await.unwrap();
    let bob_connection_id = bob.service.handle_invitation(invitation).await.unwrap();
    let alice_connection_id = deliver_one(&bob, &alice).await.unwrap();
    deliver_one(&alice, &bob).await.unwrap();
    deliver_one(&bob, &alice).await.unwrap();

    assert_eq!(alice_connection_id, alice_record.connection_id);
    assert_eq!(
        alice.service.get_connection(&alice_connection_id).await.unwrap().state,
        "completed"
    );
    assert_eq!(
        bob.service.get_connection(&bob_connection_id).await.unwrap().state,
        "completed"
    );
}
