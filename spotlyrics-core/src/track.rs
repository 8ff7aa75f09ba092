/// Return the trimmed input if it is a bare track ID rather than a URL or URI.
///
/// Handles the forms the lyrics backend accepts:
/// - `4iV5W9uYEdYUVa79Axb7Rh` (bare ID, returned as-is)
/// - `spotify:track:4iV5W9uYEdYUVa79Axb7Rh` (URI, `None`)
/// - `https://open.spotify.com/track/4iV5W9uYEdYUVa79Axb7Rh` (URL, `None`)
///
/// URLs and URIs are resolved by the backend itself, so no ID is extracted here.
#[must_use]
pub fn bare_track_id(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() || input.starts_with("http") || input.contains("spotify:") {
        return None;
    }
    Some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id() {
        assert_eq!(bare_track_id("abc123"), Some("abc123"));
    }

    #[test]
    fn test_bare_id_is_trimmed() {
        assert_eq!(bare_track_id("  abc123\n"), Some("abc123"));
    }

    #[test]
    fn test_spotify_uri() {
        assert_eq!(bare_track_id("spotify:track:abc"), None);
    }

    #[test]
    fn test_open_spotify_url() {
        assert_eq!(
            bare_track_id("https://open.spotify.com/track/4iV5W9uYEdYUVa79Axb7Rh?si=x"),
            None
        );
        assert_eq!(bare_track_id("http://example.com/track/abc"), None);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(bare_track_id("   "), None);
    }
}
