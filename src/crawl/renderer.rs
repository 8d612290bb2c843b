//! The web renderer contract (spec §6 "Web renderer contract") and its
//! default HTTP-based implementation.
//!
//! The crawl engine depends only on [`FetchRenderer`]; the browser engine
//! itself is an external collaborator (spec §1 Out of scope). A default
//! [`HttpRenderer`] satisfies the trait for sources with a JSON API or
//! server-rendered HTML. A feature-gated `BrowserRenderer` (see
//! `cfg(feature = "browser")`) satisfies it for JS-heavy sources (HIG,
//! some archive pages), mirroring the teacher's optional-backend pattern
//! used for its embedding providers.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::errors::CupertinoError;

/// `fetch(url) -> html` plus `recycle()`, as specified in spec §6.
#[async_trait]
pub trait FetchRenderer: Send + Sync {
    async fn fetch(&mut self, url: &str) -> Result<String, CupertinoError>;

    /// Discard and recreate any underlying session state. Called before
    /// retries and proactively every `renderer_recycle_every` fetches.
    async fn recycle(&mut self) -> Result<(), CupertinoError>;

    /// Fetch `url`'s JSON-API counterpart directly, bypassing HTML
    /// rendering entirely (spec §4.1, §4.3 step 3: "prefer the JSON
    /// endpoint for the URL if the source has one"). Renderers with no
    /// JSON-capable transport (the browser fallback) report that via the
    /// default implementation; the engine falls back to [`Self::fetch`].
    async fn fetch_json(&mut self, url: &str) -> Result<serde_json::Value, CupertinoError> {
        Err(CupertinoError::ContentParseError {
            source_id: url.to_string(),
            reason: "this renderer does not support JSON-API fetch".to_string(),
        })
    }
}

/// `HttpRenderer` is a plain `reqwest`-backed GET. It is the always-on
/// default, preferred whenever a source exposes static or JSON-API
/// content and a JS-executing render is unnecessary.
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new() -> Result<Self, CupertinoError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .user_agent("cupertino/0.1")
            .build()
            .map_err(|e| CupertinoError::TransientFetch {
                url: "<client build>".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchRenderer for HttpRenderer {
    async fn fetch(&mut self, url: &str) -> Result<String, CupertinoError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CupertinoError::TransientFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CupertinoError::NotFound(url.to_string()));
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            let remaining = resp
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok());
            if remaining == Some(0) {
                return Err(CupertinoError::RateLimited(url.to_string()));
            }
            return Err(CupertinoError::Forbidden(url.to_string()));
        }
        if status.is_server_error() {
            return Err(CupertinoError::TransientFetch {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        resp.text().await.map_err(|e| CupertinoError::TransientFetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn recycle(&mut self) -> Result<(), CupertinoError> {
        *self = Self::new()?;
        Ok(())
    }

    async fn fetch_json(&mut self, url: &str) -> Result<serde_json::Value, CupertinoError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CupertinoError::TransientFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CupertinoError::NotFound(url.to_string()));
        }
        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| CupertinoError::ContentParseError {
                source_id: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(feature = "browser")]
pub mod browser {
    use super::FetchRenderer;
    use crate::errors::CupertinoError;
    use async_trait::async_trait;
    use headless_chrome::Browser;

    /// JS-rendering fallback for sources without a JSON API (spec §4.3 step
    /// 3: "otherwise delegate to the web renderer"). Blocks until the DOM
    /// is quiet, then returns `document.documentElement.outerHTML`.
    pub struct BrowserRenderer {
        browser: Browser,
    }

    impl BrowserRenderer {
        pub fn new() -> Result<Self, CupertinoError> {
            let browser = Browser::default().map_err(|e| CupertinoError::TransientFetch {
                url: "<browser launch>".to_string(),
                reason: e.to_string(),
            })?;
            Ok(Self { browser })
        }
    }

    #[async_trait]
    impl FetchRenderer for BrowserRenderer {
        async fn fetch(&mut self, url: &str) -> Result<String, CupertinoError> {
            let tab = self
                .browser
                .new_tab()
                .map_err(|e| CupertinoError::TransientFetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
            tab.navigate_to(url)
                .and_then(|t| t.wait_until_navigated())
                .map_err(|e| CupertinoError::TransientFetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
            let html = tab
                .get_content()
                .map_err(|e| CupertinoError::TransientFetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(html)
        }

        async fn recycle(&mut self) -> Result<(), CupertinoError> {
            *self = Self::new()?;
            Ok(())
        }
    }
}
