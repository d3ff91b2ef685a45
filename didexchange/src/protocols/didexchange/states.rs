use std::sync::Arc;

use messages::a2a::A2AMessage;
use messages::ack::Ack;
use messages::didexchange::invitation::Invitation;
use messages::didexchange::request::{ConnectionData, Request};
use messages::didexchange::response::SignedResponse;

use diddoc::aries::diddoc::AriesDidDoc;
use url::Url;

use crate::errors::error::prelude::*;
use crate::protocols::didexchange::ExchangeContext;
use crate::protocols::PostAction;
use crate::signature::{prepare_connection_signature, verify_connection_signature};
use crate::storage::{ConnectionRecord, Namespace};
use crate::transport::Destination;

/// Protocol states. `NoOp` is a sentinel follow-up meaning "remain here";
/// it is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    NoOp,
    Null,
    Invited,
    Requested,
    Responded,
    Completed,
    Abandoned,
}

/// The legal transition relation of the exchange graph. A pure function of
/// the two state names; kept beside the variant definitions rather than on
/// them.
pub fn can_transition(from: State, to: State) -> bool {
    match from {
        State::Null => matches!(to, State::Invited | State::Requested),
        State::Invited => matches!(to, State::Requested),
        State::Requested => matches!(to, State::Responded),
        State::Responded => matches!(to, State::Completed),
        State::NoOp | State::Completed | State::Abandoned => false,
    }
}

pub fn state_from_name(name: &str) -> ExchangeResult<State> {
    match name {
        "noop" => Ok(State::NoOp),
        "null" => Ok(State::Null),
        "invited" => Ok(State::Invited),
        "requested" => Ok(State::Requested),
        "responded" => Ok(State::Responded),
        "completed" => Ok(State::Completed),
        "abandoned" => Ok(State::Abandoned),
        name => Err(err_msg(
            ExchangeErrorKind::UnknownState,
            format!("Unknown state name: {}", name),
        )),
    }
}

/// State an inbound message drives the record towards.
pub fn state_from_msg_type(msg: &A2AMessage) -> ExchangeResult<State> {
    match msg {
        A2AMessage::ConnectionInvitation(_) => Ok(State::Invited),
        A2AMessage::ConnectionRequest(_) => Ok(State::Requested),
        A2AMessage::ConnectionResponse(_) => Ok(State::Responded),
        A2AMessage::Ack(_) => Ok(State::Completed),
        A2AMessage::Generic(value) => Err(err_msg(
            ExchangeErrorKind::UnrecognizedMsgType,
            format!("Unrecognized message type: {}", value["@type"]),
        )),
    }
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::NoOp => "noop",
            State::Null => "null",
            State::Invited => "invited",
            State::Requested => "requested",
            State::Responded => "responded",
            State::Completed => "completed",
            State::Abandoned => "abandoned",
        }
    }

    pub fn can_transition_to(&self, target: State) -> bool {
        can_transition(*self, target)
    }

    /// Runs this state's inbound behavior and returns the updated record,
    /// the follow-up state and an optional deferred outbound dispatch.
    pub async fn execute_inbound(
        &self,
        ctx: &Arc<ExchangeContext>,
        record: ConnectionRecord,
        msg: &A2AMessage,
    ) -> ExchangeResult<(ConnectionRecord, State, Option<PostAction>)> {
        match self {
            State::NoOp => Err(err_msg(
                ExchangeErrorKind::InvalidState,
                "Cannot execute an inbound message on the noop state",
            )),
            State::Null => Ok((record, State::NoOp, None)),
            State::Invited => execute_invited(record, msg),
            State::Requested => execute_requested(ctx, record, msg).await,
            State::Responded => execute_responded(ctx, record, msg).await,
            State::Completed => execute_completed(ctx, record, msg).await,
            State::Abandoned => Err(err_msg(
                ExchangeErrorKind::NotImplemented,
                "Inbound processing on abandoned connections is not implemented",
            )),
        }
    }
}

fn unexpected_message_err(state: State, msg: &A2AMessage) -> ExchangeError {
    err_msg(
        ExchangeErrorKind::InvalidState,
        format!(
            "Message of type {} cannot be handled in the {} state",
            msg.type_name(),
            state.name()
        ),
    )
}

fn validate_invitation(invitation: &Invitation) -> ExchangeResult<()> {
    if !invitation.did.is_empty() {
        return Ok(());
    }
    if invitation.recipient_keys.is_empty() || invitation.service_endpoint.is_empty() {
        return Err(err_msg(
            ExchangeErrorKind::InvalidState,
            "Invitation must name a public DID or carry recipient keys and a service endpoint",
        ));
    }
    Url::parse(&invitation.service_endpoint).map_err(|err| {
        err_msg(
            ExchangeErrorKind::InvalidState,
            format!(
                "Invitation service endpoint {:?} is not a valid URL: {}",
                invitation.service_endpoint, err
            ),
        )
    })?;
    Ok(())
}

fn first_recipient_key(did_doc: &AriesDidDoc) -> ExchangeResult<String> {
    did_doc.recipient_keys().first().cloned().ok_or(err_msg(
        ExchangeErrorKind::ServiceNotFound,
        format!("DID Document {} names no recipient keys", did_doc.id),
    ))
}

fn cache_destination(record: &mut ConnectionRecord, destination: &Destination) {
    record.service_endpoint = destination.service_endpoint.clone();
    record.recipient_keys = destination.recipient_keys.clone();
    record.routing_keys = destination.routing_keys.clone();
}

fn record_destination(record: &ConnectionRecord) -> Destination {
    Destination {
        service_endpoint: record.service_endpoint.clone(),
        recipient_keys: record.recipient_keys.clone(),
        routing_keys: record.routing_keys.clone(),
    }
}

/// Where replies to an invitation go: the invitation either names a public
/// DID to resolve or inlines keys and an endpoint.
async fn invitation_destination(ctx: &Arc<ExchangeContext>, invitation: &Invitation) -> ExchangeResult<Destination> {
    if invitation.did.is_empty() {
        return Ok(Destination::from_invitation(invitation));
    }
    let their_doc = ctx.did_resolver.resolve(&invitation.did).await.map_err(|err| {
        err_msg(
            ExchangeErrorKind::DidResolveFailed,
            format!("Cannot resolve invitation DID {}: {}", invitation.did, err),
        )
    })?;
    Destination::from_did_doc(&their_doc)
}

fn execute_invited(
    mut record: ConnectionRecord,
    msg: &A2AMessage,
) -> ExchangeResult<(ConnectionRecord, State, Option<PostAction>)> {
    match msg {
        A2AMessage::ConnectionInvitation(invitation) => {
            validate_invitation(invitation)?;
            record.invitation_id = Some(invitation.id.0.clone());
            record.parent_thread_id = Some(invitation.id.0.clone());
            record.service_endpoint = invitation.service_endpoint.clone();
            record.recipient_keys = invitation.recipient_keys.clone();
            record.routing_keys = invitation.routing_keys.clone();
            Ok((record, State::Requested, None))
        }
        other => Err(unexpected_message_err(State::Invited, other)),
    }
}

async fn execute_requested(
    ctx: &Arc<ExchangeContext>,
    record: ConnectionRecord,
    msg: &A2AMessage,
) -> ExchangeResult<(ConnectionRecord, State, Option<PostAction>)> {
    match msg {
        A2AMessage::ConnectionInvitation(invitation) => handle_inbound_invitation(ctx, record, invitation).await,
        A2AMessage::ConnectionRequest(request) => {
            let mut record = record;
            request.connection.did_doc.validate()?;
            ctx.did_store.store(&request.connection.did_doc).await?;
            record.their_did = Some(request.connection.did.clone());
            let destination = Destination::from_did_doc(&request.connection.did_doc)?;
            cache_destination(&mut record, &destination);
            Ok((record, State::Responded, None))
        }
        other => Err(unexpected_message_err(State::Requested, other)),
    }
}

/// Invitee side: mint our pairwise DID and send the exchange request back to
/// the inviter. The conversation thread becomes the request id from here on.
async fn handle_inbound_invitation(
    ctx: &Arc<ExchangeContext>,
    mut record: ConnectionRecord,
    invitation: &Invitation,
) -> ExchangeResult<(ConnectionRecord, State, Option<PostAction>)> {
    let my_doc = ctx.did_creator.create(&ctx.did_method).await?;
    ctx.did_store.store(&my_doc).await?;
    let sender_verkey = first_recipient_key(&my_doc)?;

    let request =
        Request::new(ctx.label.clone(), my_doc.id.clone(), my_doc.clone()).in_reply_to(&invitation.id.0);

    record.my_did = Some(my_doc.id.clone());
    record.thread_id = request.id.0.clone();
    record.namespace = Namespace::My;

    let destination = invitation_destination(ctx, invitation).await?;
    cache_destination(&mut record, &destination);

    let dispatcher = Arc::clone(&ctx.dispatcher);
    let payload = A2AMessage::from(request);
    let action: PostAction = Box::pin(async move { dispatcher.send(&payload, &sender_verkey, &destination).await });

    Ok((record, State::NoOp, Some(action)))
}

async fn execute_responded(
    ctx: &Arc<ExchangeContext>,
    record: ConnectionRecord,
    msg: &A2AMessage,
) -> ExchangeResult<(ConnectionRecord, State, Option<PostAction>)> {
    match msg {
        A2AMessage::ConnectionRequest(request) => handle_inbound_request(ctx, record, request).await,
        A2AMessage::ConnectionResponse(signed_response) => {
            let (record, ack_action) = process_inbound_response(ctx, record, signed_response, true).await?;
            Ok((record, State::Completed, ack_action))
        }
        other => Err(unexpected_message_err(State::Responded, other)),
    }
}

/// Inviter side: mint our pairwise DID, wrap it in a connection signature
/// and answer the exchange request.
async fn handle_inbound_request(
    ctx: &Arc<ExchangeContext>,
    mut record: ConnectionRecord,
    _request: &Request,
) -> ExchangeResult<(ConnectionRecord, State, Option<PostAction>)> {
    let my_doc = ctx.did_creator.create(&ctx.did_method).await?;
    ctx.did_store.store(&my_doc).await?;
    let sender_verkey = first_recipient_key(&my_doc)?;

    let connection = ConnectionData {
        did: my_doc.id.clone(),
        did_doc: my_doc.clone(),
    };
    let connection_sig = prepare_connection_signature(&ctx.wallet, &connection, &sender_verkey).await?;
    let signed_response = SignedResponse::new(record.thread_id.clone(), connection_sig);

    record.my_did = Some(my_doc.id.clone());

    let destination = record_destination(&record);
    let dispatcher = Arc::clone(&ctx.dispatcher);
    let payload = A2AMessage::from(signed_response);
    let action: PostAction = Box::pin(async move { dispatcher.send(&payload, &sender_verkey, &destination).await });

    Ok((record, State::NoOp, Some(action)))
}

/// Invitee side: verify the inviter's connection signature and accept their
/// DID Document. When `send_ack` is set, an acknowledgement is dispatched to
/// close out the handshake.
async fn process_inbound_response(
    ctx: &Arc<ExchangeContext>,
    mut record: ConnectionRecord,
    signed_response: &SignedResponse,
    send_ack: bool,
) -> ExchangeResult<(ConnectionRecord, Option<PostAction>)> {
    let connection = verify_connection_signature(&ctx.wallet, &signed_response.connection_sig).await?;
    connection.did_doc.validate()?;

    ctx.did_store.store(&connection.did_doc).await?;
    record.their_did = Some(connection.did.clone());
    let destination = Destination::from_did_doc(&connection.did_doc)?;
    cache_destination(&mut record, &destination);

    if !send_ack {
        return Ok((record, None));
    }

    let my_did = record.my_did.clone().ok_or(err_msg(
        ExchangeErrorKind::InvalidState,
        "Cannot acknowledge a response before a local DID was assigned",
    ))?;
    let my_doc = ctx.did_store.get(&my_did).await?;
    let sender_verkey = first_recipient_key(&my_doc)?;

    let thread_id = signed_response.thread.thid.clone().unwrap_or(record.thread_id.clone());
    let ack = Ack::for_thread(thread_id);

    let dispatcher = Arc::clone(&ctx.dispatcher);
    let payload = A2AMessage::from(ack);
    let action: PostAction = Box::pin(async move { dispatcher.send(&payload, &sender_verkey, &destination).await });

    Ok((record, Some(action)))
}

async fn execute_completed(
    ctx: &Arc<ExchangeContext>,
    record: ConnectionRecord,
    msg: &A2AMessage,
) -> ExchangeResult<(ConnectionRecord, State, Option<PostAction>)> {
    match msg {
        A2AMessage::ConnectionResponse(signed_response) => {
            // final arrival for the invitee; same verification path as
            // responded, without re-acknowledging
            let (record, _) = process_inbound_response(ctx, record, signed_response, false).await?;
            Ok((record, State::NoOp, None))
        }
        A2AMessage::Ack(_) => Ok((record, State::NoOp, None)),
        other => Err(unexpected_message_err(State::Completed, other)),
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    const ALL_STATES: [State; 7] = [
        State::NoOp,
        State::Null,
        State::Invited,
        State::Requested,
        State::Responded,
        State::Completed,
        State::Abandoned,
    ];

    #[test]
    fn test_noop_state_cannot_transition() {
        for state in ALL_STATES {
            assert!(!State::NoOp.can_transition_to(state));
        }
    }

    #[test]
    fn test_null_state_transitions() {
        assert_eq!(State::Null.name(), "null");
        assert!(!State::Null.can_transition_to(State::Null));
        assert!(State::Null.can_transition_to(State::Invited));
        assert!(State::Null.can_transition_to(State::Requested));
        assert!(!State::Null.can_transition_to(State::Responded));
        assert!(!State::Null.can_transition_to(State::Completed));
    }

    #[test]
    fn test_invited_state_transitions() {
        assert_eq!(State::Invited.name(), "invited");
        assert!(!State::Invited.can_transition_to(State::Null));
        assert!(!State::Invited.can_transition_to(State::Invited));
        assert!(State::Invited.can_transition_to(State::Requested));
        assert!(!State::Invited.can_transition_to(State::Responded));
        assert!(!State::Invited.can_transition_to(State::Completed));
    }

    #[test]
    fn test_requested_state_transitions() {
        assert_eq!(State::Requested.name(), "requested");
        assert!(!State::Requested.can_transition_to(State::Null));
        assert!(!State::Requested.can_transition_to(State::Invited));
        assert!(!State::Requested.can_transition_to(State::Requested));
        assert!(State::Requested.can_transition_to(State::Responded));
        assert!(!State::Requested.can_transition_to(State::Completed));
    }

    #[test]
    fn test_responded_state_transitions() {
        assert_eq!(State::Responded.name(), "responded");
        assert!(!State::Responded.can_transition_to(State::Null));
        assert!(!State::Responded.can_transition_to(State::Invited));
        assert!(!State::Responded.can_transition_to(State::Requested));
        assert!(!State::Responded.can_transition_to(State::Responded));
        assert!(State::Responded.can_transition_to(State::Completed));
    }

    #[test]
    fn test_completed_state_is_terminal() {
        assert_eq!(State::Completed.name(), "completed");
        for state in ALL_STATES {
            assert!(!State::Completed.can_transition_to(state));
        }
    }

    #[test]
    fn test_abandoned_state_is_terminal() {
        assert_eq!(State::Abandoned.name(), "abandoned");
        for state in ALL_STATES {
            assert!(!State::Abandoned.can_transition_to(state));
        }
    }

    #[test]
    fn test_state_from_msg_type() {
        use messages::didexchange::invitation::test_utils::_invitation;
        use messages::didexchange::request::test_utils::_request;
        use messages::didexchange::response::ConnectionSignature;

        let empty_sig = ConnectionSignature::new(String::new(), String::new(), String::new());

        assert_eq!(
            state_from_msg_type(&A2AMessage::from(_invitation())).unwrap(),
            State::Invited
        );
        assert_eq!(
            state_from_msg_type(&A2AMessage::from(_request())).unwrap(),
            State::Requested
        );
        assert_eq!(
            state_from_msg_type(&A2AMessage::from(SignedResponse::new("thread-1".to_string(), empty_sig))).unwrap(),
            State::Responded
        );
        assert_eq!(
            state_from_msg_type(&A2AMessage::from(Ack::for_thread("thread-1".to_string()))).unwrap(),
            State::Completed
        );

        let err = state_from_msg_type(&A2AMessage::Generic(serde_json::json!({
            "@type": "https://didcomm.org/trust_ping/1.0/ping"
        })))
        .unwrap_err();
        assert_eq!(err.kind(), ExchangeErrorKind::UnrecognizedMsgType);
    }

    #[test]
    fn test_state_from_name_roundtrip() {
        for state in ALL_STATES {
            assert_eq!(state_from_name(state.name()).unwrap(), state);
        }
        let err = state_from_name("invalid").unwrap_err();
        assert_eq!(err.kind(), ExchangeErrorKind::UnknownState);
    }

    #[test]
    fn test_validate_invitation() {
        use messages::didexchange::invitation::test_utils::_invitation;

        validate_invitation(&_invitation()).unwrap();
        validate_invitation(&Invitation::from_public_did(
            "alice-agent".to_string(),
            "did:sov:abcd".to_string(),
        ))
        .unwrap();

        let empty = Invitation::new("alice-agent".to_string(), vec![], String::new(), vec![]);
        let err = validate_invitation(&empty).unwrap_err();
        assert_eq!(err.kind(), ExchangeErrorKind::InvalidState);

        let bad_endpoint = Invitation::new(
            "alice-agent".to_string(),
            vec!["key-1".to_string()],
            "not a url".to_string(),
            vec![],
        );
        let err = validate_invitation(&bad_endpoint).unwrap_err();
        assert_eq!(err.kind(), ExchangeErrorKind::InvalidState);
    }
}
