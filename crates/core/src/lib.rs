//! Client library for the OpenSubtitles OSDb XML-RPC API.
//!
//! Fingerprints local video files without uploading their contents,
//! drives the session-token calling discipline of the service, ranks
//! returned subtitle candidates and decodes the base64+gzip payloads
//! back into readable text. See [`retrieve::retrieve_to`] for the
//! end-to-end pipeline the CLI builds on.

pub mod client;
pub mod config;
pub mod content;
pub mod hash;
pub mod retrieve;
pub mod subtitle;
pub mod testing;
pub mod xmlrpc;

pub use client::{
    ClientError, Movie, OsdbClient, Session, DEFAULT_SERVER, DEFAULT_USER_AGENT, SEARCH_LIMIT,
    STATUS_SUCCESS,
};
pub use config::{load_config, load_config_from_str, load_env_config, Config, ConfigError};
pub use hash::{fingerprint_file, FileFingerprint, HashError};
pub use retrieve::{retrieve_to, srt_destination, RetrieveOutcome};
pub use subtitle::{
    select_best, MalformedRecord, PayloadError, SubtitleFile, SubtitleRecord, UploadCandidate,
};
pub use xmlrpc::{HttpTransport, Transport, TransportError, Value};
