//! Uptime check for the public site, alerting a Discord channel on failure.

use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{info, warn};

pub const DEFAULT_SITE_URL: &str = "https://mikomath.org/";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const EMBED_COLOR: u32 = 16_711_680;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("site is down: {0}")]
    SiteDown(String),
    #[error("webhook answered {0} instead of 204")]
    Webhook(StatusCode),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

pub struct Probe {
    pub site_url: String,
    pub webhook_url: String,
    pub role_id: String,
}

/// What went wrong with the site, as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Timeout,
    Status(u16),
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    url: String,
    color: u32,
}

#[derive(Debug, Serialize)]
struct Alert {
    content: String,
    embeds: Vec<Embed>,
}

impl Failure {
    fn embed(&self, site_url: &str, at: &str) -> Embed {
        let (title, detail) = match self {
            Failure::Timeout => (
                "Przekroczono limit czasu!".to_string(),
                "Nie można się połączyć ze stroną. Sprawdź, czy VPS działa poprawnie.".to_string(),
            ),
            Failure::Status(status) => (
                format!("Błąd {status}!"),
                format!(
                    "Oczekiwano statusu `200`, napotkano `{status}`. Sprawdź, czy strona działa poprawnie."
                ),
            ),
        };

        Embed {
            title,
            description: format!(
                "`{at}` Zautomatyzowany test wykrył błąd na {site_url}.\n{detail}"
            ),
            url: site_url.to_string(),
            color: EMBED_COLOR,
        }
    }
}

impl Probe {
    /// Checks the site once, alerting when it times out or answers with
    /// anything but 200. Other request errors are returned without an alert.
    pub async fn run(&self) -> Result<(), ProbeError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        let Some(failure) = self.check(&client).await? else {
            info!(url = %self.site_url, "site is up");
            return Ok(());
        };

        warn!(url = %self.site_url, ?failure, "site is down");
        self.alert(&client, &failure).await?;
        Err(ProbeError::SiteDown(match failure {
            Failure::Timeout => "timed out".to_string(),
            Failure::Status(status) => format!("status {status}"),
        }))
    }

    async fn check(&self, client: &Client) -> Result<Option<Failure>, ProbeError> {
        match client.get(&self.site_url).send().await {
            Ok(response) if response.status() == StatusCode::OK => Ok(None),
            Ok(response) => Ok(Some(Failure::Status(response.status().as_u16()))),
            Err(err) if err.is_timeout() => Ok(Some(Failure::Timeout)),
            Err(err) => Err(err.into()),
        }
    }

    async fn alert(&self, client: &Client, failure: &Failure) -> Result<(), ProbeError> {
        let at = warsaw_time(Utc::now().naive_utc()).format("%H:%M:%S").to_string();
        let alert = Alert {
            content: format!("<@&{}>", self.role_id),
            embeds: vec![failure.embed(&self.site_url, &at)],
        };

        let response = client.post(&self.webhook_url).json(&alert).send().await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            status => Err(ProbeError::Webhook(status)),
        }
    }
}

/// Europe/Warsaw wall-clock time for a UTC instant. Summer time runs from
/// 01:00 UTC on the last Sunday of March to 01:00 UTC on the last Sunday of
/// October.
pub fn warsaw_time(utc: NaiveDateTime) -> NaiveDateTime {
    let year = utc.year();
    let summer = match (last_sunday(year, 3), last_sunday(year, 10)) {
        (Some(start), Some(end)) => utc >= start && utc < end,
        _ => false,
    };

    utc + TimeDelta::hours(if summer { 2 } else { 1 })
}

fn last_sunday(year: i32, month: u32) -> Option<NaiveDateTime> {
    let last = NaiveDate::from_ymd_opt(year, month + 1, 1)?.pred_opt()?;
    let sunday = last - TimeDelta::days(last.weekday().num_days_from_sunday().into());
    sunday.and_hms_opt(1, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_shape() {
        let alert = Alert {
            content: "<@&42>".into(),
            embeds: vec![Failure::Status(502).embed("https://example.org/", "12:00:00")],
        };
        let json = serde_json::to_value(&alert).unwrap();

        assert_eq!(json["content"], "<@&42>");
        assert_eq!(json["embeds"][0]["title"], "Błąd 502!");
        assert_eq!(json["embeds"][0]["color"], 16711680);
        assert_eq!(json["embeds"][0]["url"], "https://example.org/");
        assert!(json["embeds"][0]["description"]
            .as_str()
            .unwrap()
            .starts_with("`12:00:00` Zautomatyzowany test"));
    }

    #[test]
    fn timeout_embed_mentions_the_server() {
        let embed = Failure::Timeout.embed("https://example.org/", "08:15:00");
        assert_eq!(embed.title, "Przekroczono limit czasu!");
        assert!(embed.description.contains("VPS"));
    }

    fn utc(date: (i32, u32, u32), time: (u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(time.0, time.1, 0)
            .unwrap()
    }

    #[test]
    fn warsaw_offsets() {
        let cases = [
            (utc((2024, 7, 1), (10, 0)), utc((2024, 7, 1), (12, 0))),
            (utc((2024, 1, 15), (10, 0)), utc((2024, 1, 15), (11, 0))),
            (utc((2024, 3, 31), (0, 59)), utc((2024, 3, 31), (1, 59))),
            (utc((2024, 3, 31), (1, 0)), utc((2024, 3, 31), (3, 0))),
            (utc((2024, 10, 27), (0, 59)), utc((2024, 10, 27), (2, 59))),
            (utc((2024, 10, 27), (1, 0)), utc((2024, 10, 27), (2, 0))),
        ];

        for (instant, expected) in cases {
            assert_eq!(warsaw_time(instant), expected, "{instant}");
        }
    }

    async fn serve(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });
        format!("http://{addr}/")
    }

    fn probe(site_url: String) -> Probe {
        Probe {
            site_url,
            webhook_url: "http://127.0.0.1:9/".into(),
            role_id: "42".into(),
        }
    }

    fn client() -> Client {
        Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn classifies_site_answers() {
        use axum::routing::get;

        let up = serve(axum::Router::new().route("/", get(|| async { "ok" }))).await;
        assert_eq!(probe(up).check(&client()).await.unwrap(), None);

        let broken = serve(
            axum::Router::new().route("/", get(|| async { axum::http::StatusCode::BAD_GATEWAY })),
        )
        .await;
        assert_eq!(
            probe(broken).check(&client()).await.unwrap(),
            Some(Failure::Status(502))
        );

        let slow = serve(axum::Router::new().route(
            "/",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;
        assert_eq!(
            probe(slow).check(&client()).await.unwrap(),
            Some(Failure::Timeout)
        );
    }

    #[tokio::test]
    async fn refused_connections_are_errors_not_timeouts() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = probe(format!("http://{addr}/")).check(&client()).await;
        assert!(matches!(outcome, Err(ProbeError::Request(ref err)) if !err.is_timeout()));
    }
}
