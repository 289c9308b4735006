//! HTTP email API transport (Resend-style JSON `POST` with a bearer key).

use async_trait::async_trait;
use serde::Serialize;

use crate::error::TransportError;
use crate::transport::{EmailTransport, Envelope};

/// Longest provider error body kept in a [`TransportError::Rejected`].
const MAX_ERROR_BODY: usize = 512;

pub struct HttpApiTransport {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl HttpApiTransport {
    pub fn new(client: reqwest::Client, url: String, api_key: String) -> Self {
        Self {
            client,
            url,
            api_key,
        }
    }
}

#[async_trait]
impl EmailTransport for HttpApiTransport {
    fn name(&self) -> &'static str {
        "http_api"
    }

    async fn deliver(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let body = SendRequest {
            from: &envelope.from,
            to: [envelope.to.as_str()],
            subject: &envelope.subject,
            html: &envelope.html_body,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    TransportError::ConnectionFailed(e.to_string())
                } else {
                    TransportError::SendFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut text = response.text().await.unwrap_or_default();
        if text.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            Err(TransportError::AuthFailed(text))
        } else {
            Err(TransportError::Rejected {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}
