use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::timeout;
use tracing::debug;

/// Decides whether a host looks like it points at a de-provisioned service.
#[async_trait]
pub trait TakeoverProbe: Send + Sync {
    async fn possible_takeover(&self, host: &str) -> bool;
}

/// Fetches `http://host/` and looks for known dangling-service pages.
pub struct HttpTakeoverProbe {
    client: Client,
    signatures: Vec<String>,
    port: u16,
    timeout: Duration,
}

impl HttpTakeoverProbe {
    pub fn new(client: Client, signatures: Vec<String>, port: u16, probe_timeout: Duration) -> Self {
        Self {
            client,
            signatures,
            port,
            timeout: probe_timeout,
        }
    }

    fn url(&self, host: &str) -> String {
        if self.port == 80 {
            format!("http://{}/", host)
        } else {
            format!("http://{}:{}/", host, self.port)
        }
    }
}

#[async_trait]
impl TakeoverProbe for HttpTakeoverProbe {
    async fn possible_takeover(&self, host: &str) -> bool {
        let url = self.url(host);

        let resp = match timeout(self.timeout, self.client.get(&url).send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                debug!(%url, error = %e, "takeover probe request failed");
                return false;
            }
            Err(_) => {
                debug!(%url, "takeover probe timed out");
                return false;
            }
        };

        if resp.status().as_u16() >= 400 {
            return false;
        }

        match timeout(self.timeout, resp.text()).await {
            Ok(Ok(body)) => matches_signature(&body, &self.signatures),
            _ => false,
        }
    }
}

/// Case-insensitive substring match; `signatures` must already be lower-case.
pub fn matches_signature(body: &str, signatures: &[String]) -> bool {
    let body = body.to_lowercase();
    signatures.iter().any(|sig| body.contains(sig.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnumConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn probe_against(server: &MockServer) -> HttpTakeoverProbe {
        let port = server.address().port();
        HttpTakeoverProbe::new(
            Client::new(),
            EnumConfig::default().takeover_signatures,
            port,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn signature_match_ignores_case() {
        let sigs = EnumConfig::default().takeover_signatures;
        assert!(matches_signature(
            "<h1>There isn't a GitHub Pages site here.</h1>",
            &sigs
        ));
        assert!(matches_signature("<Code>NoSuchBucket</Code> No Such Bucket", &sigs));
        assert!(!matches_signature("<h1>Welcome</h1>", &sigs));
    }

    #[tokio::test]
    async fn matching_body_with_success_status_is_flagged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("There isn't a GitHub Pages site here."),
            )
            .mount(&server)
            .await;

        assert!(probe_against(&server).possible_takeover("127.0.0.1").await);
    }

    #[tokio::test]
    async fn matching_body_with_error_status_is_not_flagged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Heroku | No such app"))
            .mount(&server)
            .await;

        assert!(!probe_against(&server).possible_takeover("127.0.0.1").await);
    }

    #[tokio::test]
    async fn clean_body_is_not_flagged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
            .mount(&server)
            .await;

        assert!(!probe_against(&server).possible_takeover("127.0.0.1").await);
    }

    #[tokio::test]
    async fn unreachable_host_is_not_flagged() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = HttpTakeoverProbe::new(
            Client::new(),
            EnumConfig::default().takeover_signatures,
            port,
            Duration::from_secs(2),
        );
        assert!(!probe.possible_takeover("127.0.0.1").await);
    }

    #[test]
    fn default_port_is_omitted_from_url() {
        let probe = HttpTakeoverProbe::new(Client::new(), Vec::new(), 80, Duration::from_secs(1));
        assert_eq!(probe.url("blog.example.com"), "http://blog.example.com/");
    }
}
