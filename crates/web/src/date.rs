//! Cached `Date` header values.
//!
//! Formatting the date on every response is wasteful, so a background task
//! refreshes a shared value and responses just clone it.

use arc_swap::ArcSwap;
use bytes::Bytes;
use http::HeaderValue;
use std::sync::Arc;
use std::time::Duration;

/// Keeps the current HTTP date up to date.
///
/// The refresh task lives as long as the service; dropping the service
/// aborts it. Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct DateService {
    current: Arc<ArcSwap<Bytes>>,
    handle: tokio::task::JoinHandle<()>,
}

impl DateService {
    pub fn new() -> Self {
        Self::new_with_update_interval(Duration::from_millis(800))
    }

    pub fn new_with_update_interval(update_interval: Duration) -> Self {
        let current = Arc::new(ArcSwap::from_pointee(http_date_now()));
        let current_arc = Arc::clone(&current);

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(update_interval).await;
                current_arc.store(Arc::new(http_date_now()));
            }
        });

        DateService { current, handle }
    }

    /// The current date as a header value, `None` only if the formatted
    /// date is not a valid header value.
    pub fn http_date(&self) -> Option<HeaderValue> {
        let date = self.current.load().as_ref().clone();
        HeaderValue::from_maybe_shared(date).ok()
    }
}

impl Drop for DateService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn http_date_now() -> Bytes {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    Bytes::from_owner(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn formats_imf_fixdate() {
        let service = DateService::new();
        let date = service.http_date().unwrap();
        let date = date.to_str().unwrap();

        // e.g. "Sun, 06 Nov 1994 08:49:37 GMT"
        assert_eq!(date.len(), 29);
        assert!(date.ends_with(" GMT"));
    }
}
