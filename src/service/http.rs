use reqwest::{Client, Method, RequestBuilder, Response};
use rocket::serde::json::serde_json::{self, Value};

use crate::config::PortalConfig;
use crate::error::{Error, Result};
use crate::logging::{log_failure, log_request, log_response, RequestId};
use crate::model::{AccessToken, ElectionId, VoteRequest, VoterId};

use super::{CatalogResponse, ElectionService};

/// Body fields the service uses to explain a failure, in order of preference.
const MESSAGE_FIELDS: &[&str] = &["error", "message", "detail"];

/// [`ElectionService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpElectionService {
    client: Client,
    base_url: String,
}

impl HttpElectionService {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.service_url().to_string(),
        })
    }

    fn eligible_url(&self, voter: VoterId) -> String {
        format!("{}/elections/voters/{voter}/eligible", self.base_url)
    }

    fn vote_url(&self, election: ElectionId) -> String {
        format!("{}/elections/{election}/vote", self.base_url)
    }

    /// Send a request, logging both ends, and turn non-success statuses into errors.
    async fn send(
        &self,
        method: Method,
        url: &str,
        credential: Option<&AccessToken>,
        what: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response> {
        let id = RequestId::next();
        log_request(id, &method, url);

        let mut request = build(self.client.request(method, url));
        if let Some(token) = credential {
            request = request.bearer_auth(token.secret());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                log_failure(id, what, &err);
                return Err(err.into());
            }
        };
        let status = response.status();
        log_response(id, status, what);

        if status.is_success() {
            Ok(response)
        } else {
            // The body is only used for the message; an unreadable body just means no message.
            let body = response.text().await.unwrap_or_default();
            Err(Error::Service {
                status: status.as_u16(),
                message: service_message(&body),
            })
        }
    }
}

#[rocket::async_trait]
impl ElectionService for HttpElectionService {
    async fn eligible_elections(
        &self,
        voter: VoterId,
        credential: Option<&AccessToken>,
    ) -> Result<CatalogResponse> {
        let url = self.eligible_url(voter);
        let response = self
            .send(Method::GET, &url, credential, "eligible elections", |r| r)
            .await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn cast_vote(
        &self,
        election: ElectionId,
        vote: &VoteRequest,
        credential: Option<&AccessToken>,
    ) -> Result<()> {
        let url = self.vote_url(election);
        self.send(Method::POST, &url, credential, "vote", |r| r.json(vote))
            .await?;
        Ok(())
    }
}

/// Extract a human-readable explanation from an error response body.
fn service_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if let Value::String(message) = value {
        return Some(message);
    }
    MESSAGE_FIELDS
        .iter()
        .find_map(|field| value.get(field)?.as_str())
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}
