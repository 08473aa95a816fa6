use std::fmt;
use std::sync::Arc;

/// A connection agent: a shared handle over a [`reqwest::Client`] and its connection pool.
///
/// Agents are compared by identity, never by value. Clones of an `Agent` are the same agent,
/// while two agents built from identical `reqwest::Client` settings are not.
///
/// ```
/// use reqwest_interceptor::Agent;
///
/// let keep_alive = Agent::new(reqwest::Client::new());
/// let same = keep_alive.clone();
/// let other = Agent::new(reqwest::Client::new());
///
/// assert!(Agent::ptr_eq(&keep_alive, &same));
/// assert!(!Agent::ptr_eq(&keep_alive, &other));
/// ```
#[derive(Clone)]
pub struct Agent {
    client: Arc<reqwest::Client>,
}

impl Agent {
    pub fn new(client: reqwest::Client) -> Self {
        Agent {
            client: Arc::new(client),
        }
    }

    /// The `reqwest::Client` requests dispatched through this agent are executed on.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Returns `true` if both handles refer to the same agent.
    pub fn ptr_eq(this: &Agent, other: &Agent) -> bool {
        Arc::ptr_eq(&this.client, &other.client)
    }
}

impl From<reqwest::Client> for Agent {
    fn from(client: reqwest::Client) -> Self {
        Agent::new(client)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &Arc::as_ptr(&self.client))
            .finish_non_exhaustive()
    }
}

/// The agent-like fields carried by a [`RequestConfig`](crate::RequestConfig) and by the
/// client [`Defaults`](crate::Defaults).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentField {
    /// Used for any scheme when no scheme-specific agent applies.
    General,
    /// Used for `http` URLs.
    Http,
    /// Used for `https` URLs.
    Https,
}

impl AgentField {
    pub const ALL: [AgentField; 3] = [AgentField::General, AgentField::Http, AgentField::Https];

    /// The scheme-specific field for a URL scheme, if there is one.
    pub fn for_scheme(scheme: &str) -> Option<AgentField> {
        match scheme {
            "http" => Some(AgentField::Http),
            "https" => Some(AgentField::Https),
            _ => None,
        }
    }
}
