//! The end-to-end retrieval pipeline: fingerprint a local file, search,
//! rank, download the winner and save it next to the video.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::client::{ClientError, OsdbClient};
use crate::subtitle::select_best;

/// Outcome of a retrieval. Finding nothing is a valid result, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrieveOutcome {
    /// The best subtitle was downloaded and written to this path.
    Saved(PathBuf),
    NoSubtitleFound,
}

/// Find and save the best subtitle for `path` in the given languages.
///
/// The destination is the source path with its extension replaced by
/// `.srt`; an existing file there is overwritten.
pub async fn retrieve_to(
    client: &OsdbClient,
    path: &Path,
    langs: &[String],
) -> Result<RetrieveOutcome, ClientError> {
    let records = client.search_by_file(path, langs).await?;
    debug!(path = %path.display(), candidates = records.len(), "search complete");

    let Some(best) = select_best(&records) else {
        return Ok(RetrieveOutcome::NoSubtitleFound);
    };

    let mut files = client
        .download_subtitles(std::slice::from_ref(best))
        .await?;
    let Some(file) = files.first_mut() else {
        return Err(ClientError::MalformedResponse {
            operation: "DownloadSubtitles",
            detail: "no file matched the requested subtitle id".to_string(),
        });
    };

    let contents = file.contents()?;
    let dest = srt_destination(path);
    tokio::fs::write(&dest, contents).await?;

    info!(
        source = %path.display(),
        dest = %dest.display(),
        bytes = contents.len(),
        "subtitle saved"
    );
    Ok(RetrieveOutcome::Saved(dest))
}

/// Destination path for a video's subtitle: extension replaced by `.srt`.
pub fn srt_destination(path: &Path) -> PathBuf {
    path.with_extension("srt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srt_destination_replaces_extension() {
        assert_eq!(
            srt_destination(Path::new("/media/movie.mkv")),
            PathBuf::from("/media/movie.srt")
        );
    }

    #[test]
    fn test_srt_destination_without_extension() {
        assert_eq!(
            srt_destination(Path::new("/media/movie")),
            PathBuf::from("/media/movie.srt")
        );
    }
}
