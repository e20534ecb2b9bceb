pub mod exchange;
pub mod listener;
pub mod resolver;
pub mod server;

pub use exchange::{Exchanger, HttpsUpstream};
pub use listener::Listener;
pub use resolver::{FailoverResolver, QueryHandler};
pub use server::ProxyHandler;
