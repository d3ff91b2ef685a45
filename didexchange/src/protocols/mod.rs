use futures::future::BoxFuture;

use crate::errors::error::ExchangeResult;

pub mod didexchange;

/// Deferred outbound side effect of a state transition. The coordinator runs
/// it after the transition function returns and before the record commit, so
/// a failed dispatch leaves the committed state untouched.
pub type PostAction = BoxFuture<'static, ExchangeResult<()>>;
