//! Incident retrieval over HTTP.

use async_trait::async_trait;
use safestreet_incident_models::IncidentRecord;

use crate::{FetchError, IncidentSource, decode_records};

/// Fetches incidents with a single `GET` to a fixed backend URL.
pub struct HttpIncidentSource {
    client: reqwest::Client,
    url: String,
}

impl HttpIncidentSource {
    #[must_use]
    pub const fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl IncidentSource for HttpIncidentSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<IncidentRecord>, FetchError> {
        log::debug!("Fetching incidents from {}", self.url);

        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            log::error!("Incident fetch from {} failed with {status}", self.url);
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let text = resp.text().await?;
        let records = decode_records(&self.url, &text)?;

        log::info!("Fetched {} incidents from {}", records.len(), self.url);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    /// Serves exactly one canned HTTP response and returns the base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut read = 0;
            loop {
                let n = socket.read(&mut buf[read..]).await.unwrap();
                read += n;
                if n == 0 || buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{addr}/api/incidents")
    }

    #[tokio::test]
    async fn fetches_and_decodes_records() {
        let url = serve_once(
            "200 OK",
            r#"[{"id":"1","incidentType":"Collision","date":"2024-03-09T04:05:00Z","vehicleType":"Car"}]"#,
        )
        .await;

        let source = HttpIncidentSource::new(reqwest::Client::new(), url);
        let records = source.fetch().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].incident_type, "Collision");
    }

    #[tokio::test]
    async fn server_error_is_a_fetch_error() {
        let url = serve_once("503 Service Unavailable", r#"{"error":"down"}"#).await;

        let source = HttpIncidentSource::new(reqwest::Client::new(), url);
        assert!(matches!(
            source.fetch().await,
            Err(FetchError::Status { status: 503 })
        ));
    }

    #[tokio::test]
    async fn non_array_body_is_rejected() {
        let url = serve_once("200 OK", r#"{"incidents":[]}"#).await;

        let source = HttpIncidentSource::new(reqwest::Client::new(), url);
        assert!(matches!(source.fetch().await, Err(FetchError::Json(_))));
    }
}
