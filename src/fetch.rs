//! Blocking HTTP GET + JSON decoding, shared by every refresh task

use log::debug;
use serde::de::DeserializeOwned;
use std::error::Error as StdError;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The request couldn't be completed, or the server said no
    #[error("Error requesting {url}")]
    Network {
        url: String,
        #[source]
        source: BoxError,
    },
    /// We got a body, but not one we understand
    #[error("Error decoding response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn network(url: &str, source: impl Into<BoxError>) -> Self {
        Self::Network {
            url: url.to_owned(),
            source: source.into(),
        }
    }
}

/// Something that can GET a URL and hand back the body. Split out from the
/// decoding so refresh logic can run against canned bodies.
pub trait HttpGet: Send + Sync {
    fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// GET a URL and decode its body as JSON
pub fn get_json<T: DeserializeOwned>(
    client: &impl HttpGet,
    url: &str,
) -> Result<T, FetchError> {
    debug!("Fetching {url}");
    let body = client.get(url)?;
    serde_json::from_str(&body).map_err(|source| FetchError::Decode {
        url: url.to_owned(),
        source,
    })
}

/// The real client. No timeout is configured, so a hung server hangs the
/// calling task (and only that task).
#[derive(Clone, Debug)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .user_agent(concat!("dashterm/", env!("CARGO_PKG_VERSION")))
                .build(),
        }
    }
}

impl HttpGet for UreqClient {
    fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| FetchError::network(url, err))?;
        response
            .into_string()
            .map_err(|err| FetchError::network(url, err))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use serde::Deserialize;
    use std::{collections::HashMap, sync::Mutex};

    /// Canned responses keyed by URL. Anything not registered is a network
    /// error, like an unreachable host.
    #[derive(Debug, Default)]
    pub struct MockHttp {
        bodies: Mutex<HashMap<String, String>>,
    }

    impl MockHttp {
        pub fn respond(&self, url: &str, body: &str) {
            self.bodies
                .lock()
                .unwrap()
                .insert(url.to_owned(), body.to_owned());
        }

        pub fn go_offline(&self, url: &str) {
            self.bodies.lock().unwrap().remove(url);
        }
    }

    impl HttpGet for MockHttp {
        fn get(&self, url: &str) -> Result<String, FetchError> {
            self.bodies
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::network(url, "connection refused"))
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Message {
        message: String,
    }

    #[test]
    fn test_get_json() {
        let http = MockHttp::default();
        http.respond("http://a", r#"{"message": "hello"}"#);
        let message: Message = get_json(&http, "http://a").unwrap();
        assert_eq!(
            message,
            Message {
                message: "hello".into()
            }
        );
    }

    #[test]
    fn test_get_json_network_error() {
        let http = MockHttp::default();
        let result: Result<Message, _> = get_json(&http, "http://nowhere");
        assert!(matches!(result, Err(FetchError::Network { url, .. }) if url == "http://nowhere"));
    }

    #[test]
    fn test_get_json_decode_error() {
        let http = MockHttp::default();
        http.respond("http://a", "<html>oops</html>");
        let result: Result<Message, _> = get_json(&http, "http://a");
        assert!(matches!(result, Err(FetchError::Decode { .. })));

        // Valid JSON, wrong shape
        http.respond("http://a", r#"{"other": 3}"#);
        let result: Result<Message, _> = get_json(&http, "http://a");
        assert!(matches!(result, Err(FetchError::Decode { .. })));
    }
}
