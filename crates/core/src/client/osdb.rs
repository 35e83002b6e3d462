//! The OSDb session client.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::hash::{fingerprint_file, FileFingerprint};
use crate::subtitle::{resolve_encoding, upload, SubtitleFile, SubtitleRecord, UploadCandidate};
use crate::xmlrpc::{HttpTransport, Transport, Value};

use super::{ClientError, Movie, Session, STATUS_SUCCESS};

/// A client for the subtitle service.
///
/// Owns the session state and funnels every operation through one calling
/// discipline: token first, invoke, gate on the response's status field.
/// The session token is not designed for concurrent use; callers running
/// operations from multiple tasks must serialize them or use one client
/// per task.
pub struct OsdbClient {
    transport: Arc<dyn Transport>,
    session: Session,
}

impl OsdbClient {
    /// Create a client over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>, user_agent: impl Into<String>) -> Self {
        Self {
            transport,
            session: Session {
                user_agent: user_agent.into(),
                ..Session::default()
            },
        }
    }

    /// Create a client with an HTTP transport from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(
            &config.server_url,
            Duration::from_secs(config.timeout_secs as u64),
        )
        .map_err(|source| ClientError::Transport {
            operation: "connect",
            source,
        })?;
        Ok(Self::new(Arc::new(transport), config.user_agent.clone()))
    }

    /// Current session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Invoke and gate on the status field, without prepending a token.
    async fn invoke_checked(
        &self,
        operation: &'static str,
        params: Vec<Value>,
    ) -> Result<BTreeMap<String, Value>, ClientError> {
        let response = self
            .transport
            .invoke(operation, &params)
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;

        let map = response
            .into_struct()
            .ok_or_else(|| malformed(operation, "response is not a struct"))?;

        let status = map
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(operation, "response has no status field"))?;

        if status != STATUS_SUCCESS {
            warn!(operation, status, "remote call failed");
            return Err(ClientError::Status {
                operation,
                status: status.to_string(),
            });
        }

        Ok(map)
    }

    /// The authenticated call discipline: session token as the first
    /// positional parameter, then the operation's own parameters.
    async fn call(
        &self,
        operation: &'static str,
        params: Vec<Value>,
    ) -> Result<BTreeMap<String, Value>, ClientError> {
        let mut full = Vec::with_capacity(params.len() + 1);
        full.push(Value::string(
            self.session.token.clone().unwrap_or_default(),
        ));
        full.extend(params);
        self.invoke_checked(operation, full).await
    }

    /// Authenticate and store the returned session token.
    ///
    /// An empty user/password pair is a valid anonymous login. On success
    /// the new token replaces any prior one.
    pub async fn login(&mut self, user: &str, pass: &str, lang: &str) -> Result<(), ClientError> {
        let params = vec![
            Value::string(user),
            Value::string(pass),
            Value::string(lang),
            Value::string(&self.session.user_agent),
        ];
        let response = self.invoke_checked("LogIn", params).await?;

        let token = response
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| malformed("LogIn", "response carries no token"))?;

        self.session.token = Some(token.to_string());
        self.session.login = user.to_string();
        self.session.password = pass.to_string();
        self.session.language = lang.to_string();
        debug!(language = lang, anonymous = user.is_empty(), "logged in");
        Ok(())
    }

    /// Invalidate the session server-side and forget the token.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        self.call("LogOut", Vec::new()).await?;
        self.session.token = None;
        Ok(())
    }

    /// No-op call that only keeps the session from expiring.
    ///
    /// Failure is non-fatal to any pipeline; retrying is the caller's
    /// decision.
    pub async fn keep_alive(&self) -> Result<(), ClientError> {
        self.call("NoOperation", Vec::new()).await?;
        Ok(())
    }

    /// Search subtitles for a local video file.
    pub async fn search_by_file(
        &self,
        path: &Path,
        langs: &[String],
    ) -> Result<Vec<SubtitleRecord>, ClientError> {
        let fingerprint = fingerprint_file(path)?;
        debug!(
            path = %path.display(),
            hash = %fingerprint.hex(),
            size = fingerprint.size,
            "fingerprinted file"
        );
        self.search_by_hash(&fingerprint, langs).await
    }

    /// Search subtitles by a precomputed fingerprint.
    pub async fn search_by_hash(
        &self,
        fingerprint: &FileFingerprint,
        langs: &[String],
    ) -> Result<Vec<SubtitleRecord>, ClientError> {
        let mut query = BTreeMap::new();
        query.insert("moviehash".to_string(), Value::string(fingerprint.hex()));
        query.insert(
            "moviebytesize".to_string(),
            Value::Int(fingerprint.size as i64),
        );
        query.insert(
            "sublanguageid".to_string(),
            Value::string(langs.join(",")),
        );
        self.search(vec![Value::Struct(query)]).await
    }

    /// Search subtitles matching IMDB ids.
    pub async fn search_by_imdb(
        &self,
        ids: &[String],
        langs: &[String],
    ) -> Result<Vec<SubtitleRecord>, ClientError> {
        let queries = ids
            .iter()
            .map(|id| {
                let mut query = BTreeMap::new();
                query.insert("imdbid".to_string(), Value::string(id));
                query.insert(
                    "sublanguageid".to_string(),
                    Value::string(langs.join(",")),
                );
                Value::Struct(query)
            })
            .collect();
        self.search(queries).await
    }

    async fn search(&self, queries: Vec<Value>) -> Result<Vec<SubtitleRecord>, ClientError> {
        let mut response = self
            .call("SearchSubtitles", vec![Value::Array(queries)])
            .await?;

        match response.remove("data") {
            // An empty result set comes back as boolean false.
            None | Some(Value::Bool(_)) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| SubtitleRecord::from_value(item).map_err(ClientError::from))
                .collect(),
            Some(_) => Err(malformed(
                "SearchSubtitles",
                "data is neither an array nor empty",
            )),
        }
    }

    /// Download subtitle payloads by numeric file id.
    pub async fn download_by_ids(&self, ids: &[i64]) -> Result<Vec<SubtitleFile>, ClientError> {
        let params = Value::Array(ids.iter().map(|id| Value::Int(*id)).collect());
        let mut response = self.call("DownloadSubtitles", vec![params]).await?;

        let items = response
            .remove("data")
            .and_then(Value::into_array)
            .ok_or_else(|| malformed("DownloadSubtitles", "data is not an array"))?;

        items
            .into_iter()
            .map(|item| {
                let map = item
                    .into_struct()
                    .ok_or_else(|| malformed("DownloadSubtitles", "file entry is not a struct"))?;
                let id = map
                    .get("idsubtitlefile")
                    .and_then(Value::scalar_string)
                    .ok_or_else(|| malformed("DownloadSubtitles", "file entry has no id"))?;
                let data = map
                    .get("data")
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed("DownloadSubtitles", "file entry has no data"))?;
                Ok(SubtitleFile::new(id, data))
            })
            .collect()
    }

    /// Download the payloads for search records, pairing each with the
    /// record's character-encoding hint.
    ///
    /// A record whose file id does not parse as an integer is a
    /// data-integrity error; an encoding hint nobody recognizes fails the
    /// download rather than risking mojibake.
    pub async fn download_subtitles(
        &self,
        records: &[SubtitleRecord],
    ) -> Result<Vec<SubtitleFile>, ClientError> {
        let ids = records
            .iter()
            .map(SubtitleRecord::file_id)
            .collect::<Result<Vec<_>, _>>()?;

        let mut files = self.download_by_ids(&ids).await?;
        for (file, record) in files.iter_mut().zip(records) {
            if !record.sub_encoding.is_empty() {
                file.set_encoding(resolve_encoding(&record.sub_encoding)?);
            }
        }
        Ok(files)
    }

    /// Search movies on IMDB through the service.
    pub async fn imdb_search(&self, query: &str) -> Result<Vec<Movie>, ClientError> {
        let mut response = self
            .call("SearchMoviesOnIMDB", vec![Value::string(query)])
            .await?;

        let items = response
            .remove("data")
            .and_then(Value::into_array)
            .ok_or_else(|| malformed("SearchMoviesOnIMDB", "data is not an array"))?;

        items
            .into_iter()
            .map(|item| {
                Movie::from_value(item).map_err(|detail| malformed("SearchMoviesOnIMDB", detail))
            })
            .collect()
    }

    /// Fetch movie details for an IMDB id.
    pub async fn imdb_details(&self, id: &str) -> Result<Movie, ClientError> {
        let mut response = self
            .call("GetIMDBMovieDetails", vec![Value::string(id)])
            .await?;

        let data = response
            .remove("data")
            .ok_or_else(|| malformed("GetIMDBMovieDetails", "response has no data"))?;
        Movie::from_value(data).map_err(|detail| malformed("GetIMDBMovieDetails", detail))
    }

    /// Identify the best-matching movie for each fingerprint hash.
    ///
    /// Returns one entry per input hash, `None` where the service does not
    /// know the hash. Matches carry id, title and year only.
    pub async fn best_movies_by_hashes(
        &self,
        hashes: &[u64],
    ) -> Result<Vec<Option<Movie>>, ClientError> {
        let hex: Vec<String> = hashes.iter().map(|hash| format!("{hash:016x}")).collect();
        let params = Value::Array(hex.iter().map(Value::string).collect());
        let mut response = self.call("CheckMovieHash", vec![params]).await?;

        let data = response
            .remove("data")
            .and_then(Value::into_struct)
            .ok_or_else(|| malformed("CheckMovieHash", "data is not a struct"))?;

        hex.iter()
            .map(|hash| match data.get(hash) {
                // Unknown hashes come back as an empty array, not a null
                // or an empty struct.
                None | Some(Value::Array(_)) => Ok(None),
                Some(Value::Struct(map)) => Movie::from_hash_match(map)
                    .map(Some)
                    .map_err(|detail| malformed("CheckMovieHash", detail)),
                Some(_) => Err(malformed("CheckMovieHash", "unexpected hash match shape")),
            })
            .collect()
    }

    /// Check whether the given subtitles already exist in the database.
    pub async fn has_subtitles(
        &self,
        candidates: &[UploadCandidate],
    ) -> Result<bool, ClientError> {
        let params = upload::try_upload_params(candidates);
        let response = self.call("TryUploadSubtitles", vec![params]).await?;

        let exists = response
            .get("alreadyindb")
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed("TryUploadSubtitles", "response has no alreadyindb field"))?;
        Ok(exists == 1)
    }

    /// Build and validate the upload request, then refuse to send it.
    ///
    /// The request side (per-file `cdN` maps with compressed content) is
    /// fully constructed; the response side of `UploadSubtitles` (success
    /// confirmation, result URL parsing) is an unresolved contract, so the
    /// call is rejected instead of sent with guessed semantics.
    pub async fn upload_subtitles(
        &self,
        candidates: &[UploadCandidate],
    ) -> Result<String, ClientError> {
        let _params = upload::upload_params(candidates)?;
        Err(ClientError::UploadUnsupported)
    }
}

fn malformed(operation: &'static str, detail: impl Into<String>) -> ClientError {
    ClientError::MalformedResponse {
        operation,
        detail: detail.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockTransport};
    use crate::xmlrpc::TransportError;

    fn client_with(transport: &Arc<MockTransport>) -> OsdbClient {
        OsdbClient::new(transport.clone(), "subtitlino test")
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let transport = Arc::new(MockTransport::new());
        transport
            .enqueue("LogIn", fixtures::login_response("abc123"))
            .await;

        let mut client = client_with(&transport);
        client.login("", "", "en").await.unwrap();
        assert_eq!(client.session().token.as_deref(), Some("abc123"));

        // Login itself carries no token; the user agent rides fourth.
        let calls = transport.recorded_calls().await;
        assert_eq!(calls[0].method, "LogIn");
        assert_eq!(calls[0].params.len(), 4);
        assert_eq!(
            calls[0].params[3],
            Value::string("subtitlino test")
        );
    }

    #[tokio::test]
    async fn test_login_rejects_bad_status() {
        let transport = Arc::new(MockTransport::new());
        transport
            .enqueue("LogIn", fixtures::status_response("401 Unauthorized"))
            .await;

        let mut client = client_with(&transport);
        match client.login("user", "wrong", "en").await {
            Err(ClientError::Status { operation, status }) => {
                assert_eq!(operation, "LogIn");
                assert_eq!(status, "401 Unauthorized");
            }
            other => panic!("expected status error, got {other:?}"),
        }
        assert!(client.session().token.is_none());
    }

    #[tokio::test]
    async fn test_calls_prepend_session_token() {
        let transport = Arc::new(MockTransport::new());
        transport
            .enqueue("LogIn", fixtures::login_response("tok"))
            .await;
        transport
            .enqueue("NoOperation", fixtures::status_response(STATUS_SUCCESS))
            .await;

        let mut client = client_with(&transport);
        client.login("", "", "en").await.unwrap();
        client.keep_alive().await.unwrap();

        let calls = transport.recorded_calls().await;
        assert_eq!(calls[1].method, "NoOperation");
        assert_eq!(calls[1].params, vec![Value::string("tok")]);
    }

    #[tokio::test]
    async fn test_logout_clears_token() {
        let transport = Arc::new(MockTransport::new());
        transport
            .enqueue("LogIn", fixtures::login_response("tok"))
            .await;
        transport
            .enqueue("LogOut", fixtures::status_response(STATUS_SUCCESS))
            .await;

        let mut client = client_with(&transport);
        client.login("", "", "en").await.unwrap();
        client.logout().await.unwrap();
        assert!(client.session().token.is_none());
    }

    #[tokio::test]
    async fn test_transport_errors_stay_distinguishable() {
        let transport = Arc::new(MockTransport::new());
        transport
            .set_next_error(TransportError::Timeout)
            .await;

        let client = client_with(&transport);
        match client.keep_alive().await {
            Err(ClientError::Transport { operation, source }) => {
                assert_eq!(operation, "NoOperation");
                assert!(matches!(source, TransportError::Timeout));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_empty_result_is_boolean_false() {
        let transport = Arc::new(MockTransport::new());
        transport
            .enqueue("SearchSubtitles", fixtures::empty_search_response())
            .await;

        let client = client_with(&transport);
        let records = client.search_by_imdb(&["0403358".into()], &[]).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_search_by_hash_builds_query() {
        let transport = Arc::new(MockTransport::new());
        transport
            .enqueue("SearchSubtitles", fixtures::search_response(vec![]))
            .await;

        let client = client_with(&transport);
        let fingerprint = FileFingerprint {
            hash: 0x09a2c497663259cb,
            size: 735934464,
        };
        client
            .search_by_hash(&fingerprint, &["eng".to_string(), "rus".to_string()])
            .await
            .unwrap();

        let calls = transport.recorded_calls().await;
        let queries = calls[0].params[1].as_array().unwrap();
        let query = queries[0].as_struct().unwrap();
        assert_eq!(
            query.get("moviehash").and_then(Value::as_str),
            Some("09a2c497663259cb")
        );
        assert_eq!(
            query.get("moviebytesize").and_then(Value::as_i64),
            Some(735934464)
        );
        assert_eq!(
            query.get("sublanguageid").and_then(Value::as_str),
            Some("eng,rus")
        );
    }

    #[tokio::test]
    async fn test_download_subtitles_rejects_malformed_id() {
        let client = client_with(&Arc::new(MockTransport::new()));
        let record = SubtitleRecord {
            id_subtitle_file: "NaN".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            client.download_subtitles(&[record]).await,
            Err(ClientError::Record(_))
        ));
    }

    #[tokio::test]
    async fn test_download_subtitles_attaches_encoding_hint() {
        let transport = Arc::new(MockTransport::new());
        transport
            .enqueue(
                "DownloadSubtitles",
                fixtures::download_response("77", &fixtures::encoded_payload(b"abc")),
            )
            .await;

        let client = client_with(&transport);
        let record = SubtitleRecord {
            id_subtitle_file: "77".to_string(),
            sub_encoding: "CP1251".to_string(),
            ..Default::default()
        };
        let files = client.download_subtitles(&[record]).await.unwrap();
        assert_eq!(files[0].encoding().map(|e| e.name()), Some("windows-1251"));
    }

    #[tokio::test]
    async fn test_download_subtitles_unknown_encoding_fails() {
        let transport = Arc::new(MockTransport::new());
        transport
            .enqueue(
                "DownloadSubtitles",
                fixtures::download_response("77", &fixtures::encoded_payload(b"abc")),
            )
            .await;

        let client = client_with(&transport);
        let record = SubtitleRecord {
            id_subtitle_file: "77".to_string(),
            sub_encoding: "klingon-8".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            client.download_subtitles(&[record]).await,
            Err(ClientError::Payload(_))
        ));
    }

    #[tokio::test]
    async fn test_best_movies_by_hashes_empty_array_quirk() {
        let transport = Arc::new(MockTransport::new());
        transport
            .enqueue(
                "CheckMovieHash",
                fixtures::check_movie_hash_response(&[
                    (
                        "09a2c497663259cb",
                        Some(("0403358", "Nochnoy dozor", "2004")),
                    ),
                    ("46e33be00464c12e", None),
                ]),
            )
            .await;

        let client = client_with(&transport);
        let movies = client
            .best_movies_by_hashes(&[0x09a2c497663259cb, 0x46e33be00464c12e])
            .await
            .unwrap();

        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].as_ref().unwrap().title, "Nochnoy dozor");
        assert!(movies[1].is_none());
    }

    #[tokio::test]
    async fn test_upload_subtitles_is_a_documented_gap() {
        let dir = tempfile::TempDir::new().unwrap();
        let movie = dir.path().join("m.avi");
        std::fs::write(&movie, vec![0u8; 128 * 1024]).unwrap();
        let sub = dir.path().join("m.srt");
        std::fs::write(&sub, b"1\n").unwrap();

        let candidate = UploadCandidate::from_files(&movie, &sub).unwrap();
        let transport = Arc::new(MockTransport::new());
        let client = client_with(&transport);

        assert!(matches!(
            client.upload_subtitles(&[candidate]).await,
            Err(ClientError::UploadUnsupported)
        ));
        // Nothing was sent.
        assert_eq!(transport.call_count().await, 0);
    }
}
