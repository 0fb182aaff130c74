use crate::config::PublicEndpoint;

/// Path prefix under which generated audio is served.
pub const DOWNLOADS_PATH: &str = "/downloads";

/// returns url a client can fetch the file from
///
/// Relative to the server root unless a public base url is configured.
pub fn download_url(conf: &PublicEndpoint, filename: &str) -> String {
    let base = conf
        .base_url
        .as_deref()
        .map(|url| url.trim_end_matches('/'))
        .unwrap_or_default();
    format!("{base}{DOWNLOADS_PATH}/{filename}")
}

#[cfg(test)]
mod tests {
    use crate::{config::PublicEndpoint, public_endpoint::download_url};

    fn endpoint(base_url: &str) -> PublicEndpoint {
        PublicEndpoint {
            base_url: Some(base_url.to_string()),
        }
    }

    #[test]
    fn test_download_url_relative() {
        let url = download_url(&PublicEndpoint::default(), "track_1.mp3");

        assert_eq!(url, "/downloads/track_1.mp3");
    }

    #[test]
    fn test_download_url_with_base() {
        let url = download_url(&endpoint("http://music-box:8000"), "track_1.mp3");

        assert_eq!(url, "http://music-box:8000/downloads/track_1.mp3");
    }

    #[test]
    fn test_download_url_trailing_slash() {
        let url = download_url(&endpoint("http://music-box:8000/"), "track_1.mp3");

        assert_eq!(url, "http://music-box:8000/downloads/track_1.mp3");
    }
}
