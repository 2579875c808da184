//! Server-sent change feed.

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use serde::Deserialize;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::services::{ChangeEvent, Table};
use crate::state::AppState;

/// Feed selection. Omitting `table` subscribes to every table.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub table: Option<Table>,
}

/// Check that `caller` may watch `table`.
///
/// The product feed is public. Appointment, order and profile events carry
/// other customers' ids, so those feeds are for admins.
fn check_feed_access(table: Option<Table>, caller: Option<&CurrentUser>) -> Result<()> {
    if matches!(table, Some(Table::Products)) {
        return Ok(());
    }
    match caller {
        None => Err(AppError::Unauthorized(
            "Authentication required".to_string(),
        )),
        Some(user) if !user.is_admin() => Err(AppError::Forbidden(
            "Access denied. Admin privileges required.".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

fn to_event(change: &ChangeEvent) -> Event {
    let json = serde_json::to_string(change).unwrap_or_else(|_| "{}".to_string());
    Event::default().event("change").data(json)
}

/// Stream change events.
///
/// Subscribers that fall behind skip the events they missed.
///
/// GET /api/realtime
#[instrument(skip(state, caller))]
pub async fn stream(
    State(state): State<AppState>,
    OptionalAuth(caller): OptionalAuth,
    Query(query): Query<FeedQuery>,
) -> Result<Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>>> {
    check_feed_access(query.table, caller.as_ref())?;

    let table = query.table;
    let events = BroadcastStream::new(state.changes().subscribe()).filter_map(move |received| {
        let change = received.ok()?;
        table
            .is_none_or(|t| t == change.table)
            .then(|| Ok(to_event(&change)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
