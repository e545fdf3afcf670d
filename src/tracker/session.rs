use reqwest::Proxy;
use reqwest::blocking::Client;

/// Local intercepting proxy used when the debug toggle is set.
const DEBUG_PROXY_URL: &str = "http://127.0.0.1:8080";

/// Authenticated HTTP client state for one submission run.
///
/// The cookie store is what makes the login exchange stick: the login POST
/// and the later multipart upload ride the same cookies. Sessions live for a
/// single process and are never persisted.
#[derive(Clone)]
pub(crate) struct Session {
    client: Client,
}

impl Session {
    /// Builds the session client. With `debug_proxy` set, all traffic is
    /// routed through a local intercepting proxy and certificate
    /// verification is disabled so the proxy can decrypt it.
    pub(crate) fn new(user_agent: &str, debug_proxy: bool) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .user_agent(user_agent.to_string())
            .cookie_store(true);

        if debug_proxy {
            warn!("Routing all requests through {}", DEBUG_PROXY_URL);
            builder = builder
                .proxy(Proxy::all(DEBUG_PROXY_URL)?)
                .danger_accept_invalid_certs(true);
        }

        Ok(Session {
            client: builder.build()?,
        })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }
}
