//! Ticket sources.
//!
//! The monitor only sees [`TicketSource`]; whether tickets come from the
//! live tracker or from fixed samples is decided once at startup.

pub mod live;
pub mod simulated;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::ticket::Ticket;

pub use live::LiveSource;
pub use simulated::SimulatedSource;

/// Something that can return the current escalation tickets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Fetch every ticket currently returned by the escalation query.
    async fn fetch(&self) -> Result<Vec<Ticket>, FetchError>;
}
