use analysis_core::AnalysisError;
use reqwest::{Client, RequestBuilder, Response};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Transport settings shared by the vendor clients
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    /// Pause before retrying after HTTP 429
    pub retry_wait: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_wait: Duration::from_secs(5),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) terminal-analysis/0.1".to_string(),
        }
    }
}

impl HttpConfig {
    pub fn build_client(&self) -> Client {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
pub(crate) struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub(crate) async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).duration_since(now) + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for an API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Send a request, retrying on HTTP 429 up to `max_retries` times.
///
/// With a `limiter`, every attempt (retries included) waits for its own slot.
pub(crate) async fn send_with_retry(
    client: &Client,
    builder: RequestBuilder,
    config: &HttpConfig,
    vendor: &str,
    limiter: Option<&RateLimiter>,
) -> Result<Response, AnalysisError> {
    let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

    for attempt in 0..config.max_retries.max(1) {
        let req_clone = request
            .try_clone()
            .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
        if let Some(limiter) = limiter {
            limiter.acquire().await;
        }
        let response = client
            .execute(req_clone)
            .await
            .map_err(|e| AnalysisError::ApiError(format!("{}: {}", vendor, e)))?;

        if response.status().as_u16() != 429 {
            return Ok(response);
        }

        tracing::warn!(
            "{} 429 rate limited, waiting {}s before retry {}/{}",
            vendor,
            config.retry_wait.as_secs(),
            attempt + 1,
            config.max_retries
        );
        tokio::time::sleep(config.retry_wait).await;
    }

    Err(AnalysisError::ApiError(format!(
        "Rate limited by {} after {} retries",
        vendor, config.max_retries
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const TOO_MANY: &str = "HTTP/1.1 429 Too Many Requests\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
    const OK: &str = "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}";

    // Answers each connection with the next canned response
    async fn serve(responses: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}/", addr)
    }

    fn local_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    fn fast_config() -> HttpConfig {
        HttpConfig {
            retry_wait: Duration::from_millis(0),
            ..HttpConfig::default()
        }
    }

    #[tokio::test]
    async fn test_rate_limiter_admits_within_budget() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.timestamps.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_each_retry_takes_a_limiter_slot() {
        let url = serve(vec![TOO_MANY, TOO_MANY, OK]).await;
        let config = fast_config();
        let client = local_client();
        let limiter = RateLimiter::new(10, Duration::from_secs(60));

        let response = send_with_retry(&client, client.get(&url), &config, "Test", Some(&limiter))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(limiter.timestamps.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let url = serve(vec![TOO_MANY, TOO_MANY, TOO_MANY]).await;
        let config = fast_config();
        let client = local_client();

        let err = send_with_retry(&client, client.get(&url), &config, "Test", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ApiError(msg) if msg.contains("Rate limited by Test")));
    }
}
