//! Tower layers of the default transport stack
//!
//! - [`UserAgentLayer`] - Adds the client User-Agent when a request has none
//! - [`AuthForwardingRedirectPolicy`] - Redirect policy re-attaching `Authorization`

mod redirect;
mod user_agent;

pub use redirect::AuthForwardingRedirectPolicy;
pub use user_agent::{UserAgentLayer, UserAgentService};
