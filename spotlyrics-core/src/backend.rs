/// Trait for lyrics backends.
///
/// A backend is a single blocking call that resolves a track ID, URI or URL to a
/// UTF-8 JSON payload (see [`crate::response`]). `None` or an empty buffer
/// signals failure. The controller always runs it on a blocking worker thread.
///
/// The call offers no cancellation; a superseded call keeps running and its
/// result is dropped by the controller.
pub trait LyricsBackend: Send + Sync {
    /// Fetch the lyrics payload for `track_id_or_url` using the `sp_dc` credential
    fn get_lyrics_json(&self, sp_dc: &str, track_id_or_url: &str) -> Option<Vec<u8>>;
}

impl<F> LyricsBackend for F
where
    F: Fn(&str, &str) -> Option<Vec<u8>> + Send + Sync,
{
    fn get_lyrics_json(&self, sp_dc: &str, track_id_or_url: &str) -> Option<Vec<u8>> {
        self(sp_dc, track_id_or_url)
    }
}
