pub mod dispatcher;
pub mod server;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use server::{spawn_service, start_server, Supervisor};
pub use transport::{build_router, verify_slack_signature, AppState, InboundCommand};
