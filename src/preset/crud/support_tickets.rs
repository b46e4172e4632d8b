//! Support tickets crud preset: tickets and their replies.

use serde::Deserialize;
use tracing::debug;

use crate::interceptor::{
    paginate, respond_ok, HandlerError, HandlerResult, Interceptor, MockResponse, RequestContext,
    Resolution,
};
use crate::preset::{SeedFuture, SeedOptions};
use crate::state::{
    factories, Collection, MockState, SupportReply, SupportTicket, TicketStatus,
};

/// Add `options.count` open tickets with one support reply each.
///
/// The n-th new ticket is about the n-th linode in state, if there is one.
pub fn seed(state: MockState, options: SeedOptions) -> SeedFuture {
    Box::pin(async move { Ok::<_, anyhow::Error>(seed_tickets(state, options.count)) })
}

fn seed_tickets(mut state: MockState, count: u32) -> MockState {
    let first = state.next_id(Collection::SupportTickets);
    let first_reply = state.next_id(Collection::SupportReplies);
    for i in 0..count as usize {
        let id = first + i as u64;
        let entity = state.linodes.get(i).map(factories::linode_ref);
        state.support_tickets.push(factories::support_ticket(id, entity));

        state
            .support_replies
            .push(factories::support_reply(first_reply + i as u64, id));
    }
    debug!(count, total = state.support_tickets.len(), "seeded support tickets");
    state
}

pub fn handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![
        Interceptor::get("/support/tickets", |ctx, state| {
            paginate(&state.support_tickets, &ctx.request)
        }),
        Interceptor::get("/support/tickets/:id", |ctx, state| {
            let id = ctx.params.id("id")?;
            respond_ok(find(state, id)?)
        }),
        Interceptor::post("/support/tickets", create_ticket),
        Interceptor::post("/support/tickets/:id/close", close_ticket),
        Interceptor::get("/support/tickets/:id/replies", |ctx, state| {
            let id = ctx.params.id("id")?;
            find(state, id)?;
            let replies: Vec<SupportReply> = state
                .support_replies
                .iter()
                .filter(|r| r.ticket_id == id)
                .cloned()
                .collect();
            paginate(&replies, &ctx.request)
        }),
        Interceptor::post("/support/tickets/:id/replies", create_reply),
    ]
}

fn find(state: &MockState, id: u64) -> Result<&SupportTicket, HandlerError> {
    state
        .support_tickets
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| HandlerError::not_found("Support ticket"))
}

#[derive(Debug, Deserialize)]
struct CreateTicket {
    summary: Option<String>,
    description: Option<String>,
    linode_id: Option<u64>,
}

fn create_ticket(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let body: CreateTicket = ctx.body()?;
    let summary = body
        .summary
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| HandlerError::invalid_field("summary", "Summary is required."))?;
    let description = body
        .description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| HandlerError::invalid_field("description", "Description is required."))?;
    let entity = match body.linode_id {
        Some(linode_id) => Some(factories::linode_ref(&super::referenced_linode(
            state,
            "linode_id",
            linode_id,
        )?)),
        None => None,
    };

    let id = state.next_id(Collection::SupportTickets);
    let now = factories::now_timestamp();
    let ticket = SupportTicket {
        summary,
        description,
        status: TicketStatus::New,
        opened: now.clone(),
        updated: now,
        ..factories::support_ticket(id, entity)
    };
    state.support_tickets.push(ticket.clone());
    respond_ok(&ticket)
}

fn close_ticket(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let ticket = state
        .support_ticket_mut(id)
        .ok_or_else(|| HandlerError::not_found("Support ticket"))?;
    if !ticket.closable {
        return Err(HandlerError::BadRequest(
            "This ticket cannot be closed.".to_string(),
        ));
    }
    if ticket.status == TicketStatus::Closed {
        return Err(HandlerError::BadRequest("Ticket is already closed.".to_string()));
    }
    let now = factories::now_timestamp();
    ticket.status = TicketStatus::Closed;
    ticket.closed = Some(now.clone());
    ticket.updated = now;
    ticket.updated_by = factories::MOCK_USERNAME.to_string();
    Ok(Resolution::Respond(MockResponse::empty()))
}

#[derive(Debug, Deserialize)]
struct CreateReply {
    description: Option<String>,
}

fn create_reply(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let body: CreateReply = ctx.body()?;
    let description = body
        .description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| HandlerError::invalid_field("description", "Description is required."))?;

    let reply_id = state.next_id(Collection::SupportReplies);
    let now = factories::now_timestamp();
    let ticket = state
        .support_ticket_mut(id)
        .ok_or_else(|| HandlerError::not_found("Support ticket"))?;
    if ticket.status == TicketStatus::Closed {
        return Err(HandlerError::BadRequest(
            "Cannot reply to a closed ticket.".to_string(),
        ));
    }
    // A customer reply reopens a ticket awaiting the customer.
    ticket.status = TicketStatus::Open;
    ticket.updated = now.clone();
    ticket.updated_by = factories::MOCK_USERNAME.to_string();

    let reply = SupportReply {
        description,
        from_linode: false,
        created: now,
        created_by: factories::MOCK_USERNAME.to_string(),
        ..factories::support_reply(reply_id, id)
    };
    state.support_replies.push(reply.clone());
    respond_ok(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::MockRequest;
    use crate::layer::MockLayer;
    use serde_json::json;

    fn layer(state: MockState) -> MockLayer {
        let interceptors = handlers(&state);
        MockLayer::new(state, interceptors, Vec::new())
    }

    #[test]
    fn test_seed_links_tickets_to_linodes() {
        let mut state = MockState::initialize();
        state.linodes.push(factories::linode(1, factories::DEFAULT_REGION));
        let state = seed_tickets(state, 2);

        assert_eq!(state.support_tickets.len(), 2);
        assert_eq!(state.support_replies.len(), 2);
        assert_eq!(state.support_tickets[0].entity.as_ref().unwrap().id, 1);
        assert!(state.support_tickets[1].entity.is_none());
        assert!(state.orphans().is_empty());
    }

    #[test]
    fn test_create_ticket_requires_summary() {
        let mut layer = layer(MockState::initialize());
        let resp = layer.dispatch(MockRequest::post(
            "/support/tickets",
            json!({"description": "help"}),
        ));
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["errors"][0]["field"], "summary");

        let resp = layer.dispatch(MockRequest::post(
            "/support/tickets",
            json!({"summary": "Disk full", "description": "help"}),
        ));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["status"], "new");
    }

    #[test]
    fn test_reply_then_close() {
        let mut layer = layer(seed_tickets(MockState::initialize(), 1));
        let resp = layer.dispatch(MockRequest::post(
            "/support/tickets/1/replies",
            json!({"description": "Any update?"}),
        ));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["from_linode"], false);

        let resp = layer.dispatch(MockRequest::get("/support/tickets/1/replies"));
        assert_eq!(resp.body["results"], 2);

        let resp = layer.dispatch(MockRequest::post("/support/tickets/1/close", json!({})));
        assert_eq!(resp.status, 200);
        assert_eq!(layer.state().support_tickets[0].status, TicketStatus::Closed);

        let resp = layer.dispatch(MockRequest::post(
            "/support/tickets/1/replies",
            json!({"description": "reopen?"}),
        ));
        assert_eq!(resp.status, 400);
        let resp = layer.dispatch(MockRequest::post("/support/tickets/1/close", json!({})));
        assert_eq!(resp.status, 400);
    }

    #[test]
    fn test_missing_ticket() {
        let mut layer = layer(MockState::initialize());
        let resp = layer.dispatch(MockRequest::get("/support/tickets/3/replies"));
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body["errors"][0]["reason"], "Support ticket not found");
    }
}
