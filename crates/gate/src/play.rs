//! Handoff seam to the play phase.

use crate::conduit::Conduit;
use crate::connection::AuthorizedConnection;
use crate::error::Result;
use async_trait::async_trait;

/// The next protocol phase after a successful login. Implementations own
/// the conduit from here on.
#[async_trait]
pub trait PlayHandler: Send {
    async fn run(self: Box<Self>, conduit: Conduit, connection: AuthorizedConnection)
        -> Result<()>;
}

/// Produces the play-phase handler for an authorized connection. Returning
/// `None` is a configuration error: an authorized player must have
/// somewhere to go.
pub trait PlayHandlerFactory: Send + Sync {
    fn create_handler(&self, connection: &AuthorizedConnection) -> Option<Box<dyn PlayHandler>>;
}
