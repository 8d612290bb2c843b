//! Fetch retry and renderer-recycling policy (spec §4.3 "Retry and
//! recycling").

use crate::crawl::renderer::FetchRenderer;
use crate::errors::CupertinoError;

/// Maximum number of retries after the initial attempt.
pub const MAX_FETCH_RETRIES: u32 = 2;

/// Fetch `url` through `renderer`, retrying transient failures up to
/// [`MAX_FETCH_RETRIES`] times. The renderer is recycled before each retry
/// to recover from memory bloat.
pub async fn fetch_with_retry(
    renderer: &mut dyn FetchRenderer,
    url: &str,
) -> Result<String, CupertinoError> {
    let mut attempt = 0;
    loop {
        match renderer.fetch(url).await {
            Ok(html) => return Ok(html),
            Err(e) if e.is_retryable() && attempt < MAX_FETCH_RETRIES => {
                attempt += 1;
                renderer.recycle().await?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `true` if the renderer should be recycled proactively after this many
/// successful fetches in the current session.
pub fn should_recycle_proactively(successful_fetches: u32, recycle_every: u32) -> bool {
    recycle_every > 0 && successful_fetches > 0 && successful_fetches % recycle_every == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycles_every_n_successful_fetches() {
        assert!(should_recycle_proactively(50, 50));
        assert!(!should_recycle_proactively(49, 50));
        assert!(should_recycle_proactively(100, 50));
    }

    #[test]
    fn zero_disables_proactive_recycling() {
        assert!(!should_recycle_proactively(50, 0));
    }
}
