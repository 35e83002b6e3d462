//! Session state, movie records and client errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::HashError;
use crate::subtitle::{MalformedRecord, PayloadError};
use crate::xmlrpc::{TransportError, Value};

/// Authentication state for one client.
///
/// Either anonymous (no token) or bound to exactly one (login, language)
/// pair by a successful login. The token is opaque and attached unmodified
/// to every authenticated call; there is no automatic renewal.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Opaque session token; `None` until a successful login.
    pub token: Option<String>,
    pub user_agent: String,
    pub language: String,
    pub login: String,
    pub password: String,
}

/// Movie metadata from the IMDB-facing calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub cover: String,
    pub year: String,
    pub duration: String,
    pub tag_line: String,
    pub plot: String,
    pub goofs: String,
    pub trivia: String,
    pub cast: BTreeMap<String, String>,
    pub directors: BTreeMap<String, String>,
    pub writers: BTreeMap<String, String>,
    pub awards: Vec<String>,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
    pub languages: Vec<String>,
    pub certifications: Vec<String>,
}

impl Movie {
    /// Decode a full movie record (`GetIMDBMovieDetails`, search hits).
    pub fn from_value(value: Value) -> Result<Self, String> {
        let map = value
            .into_struct()
            .ok_or_else(|| "movie entry is not a struct".to_string())?;

        Ok(Self {
            id: scalar(&map, "id")?,
            title: scalar(&map, "title")?,
            cover: scalar(&map, "cover")?,
            year: scalar(&map, "year")?,
            duration: scalar(&map, "duration")?,
            tag_line: scalar(&map, "tagline")?,
            plot: scalar(&map, "plot")?,
            goofs: scalar(&map, "goofs")?,
            trivia: scalar(&map, "trivia")?,
            cast: string_map(&map, "cast")?,
            directors: string_map(&map, "directors")?,
            writers: string_map(&map, "writers")?,
            awards: string_list(&map, "awards")?,
            genres: string_list(&map, "genres")?,
            countries: string_list(&map, "country")?,
            languages: string_list(&map, "language")?,
            certifications: string_list(&map, "certification")?,
        })
    }

    /// Decode the id/title/year summary returned by `CheckMovieHash`.
    ///
    /// Unlike full records, the three fields are mandatory here: a hash
    /// match without them is malformed data.
    pub fn from_hash_match(map: &BTreeMap<String, Value>) -> Result<Self, String> {
        Ok(Self {
            id: required_scalar(map, "MovieImdbID")?,
            title: required_scalar(map, "MovieName")?,
            year: required_scalar(map, "MovieYear")?,
            ..Default::default()
        })
    }
}

fn scalar(map: &BTreeMap<String, Value>, key: &str) -> Result<String, String> {
    match map.get(key) {
        None => Ok(String::new()),
        Some(value) => value
            .scalar_string()
            .ok_or_else(|| format!("field {key} is not a scalar")),
    }
}

fn required_scalar(map: &BTreeMap<String, Value>, key: &str) -> Result<String, String> {
    map.get(key)
        .and_then(Value::scalar_string)
        .ok_or_else(|| format!("missing or malformed field {key}"))
}

fn string_map(
    map: &BTreeMap<String, Value>,
    key: &str,
) -> Result<BTreeMap<String, String>, String> {
    match map.get(key) {
        None => Ok(BTreeMap::new()),
        Some(Value::Struct(entries)) => entries
            .iter()
            .map(|(name, value)| {
                value
                    .scalar_string()
                    .map(|s| (name.clone(), s))
                    .ok_or_else(|| format!("field {key}.{name} is not a scalar"))
            })
            .collect(),
        Some(_) => Err(format!("field {key} is not a struct")),
    }
}

fn string_list(map: &BTreeMap<String, Value>, key: &str) -> Result<Vec<String>, String> {
    match map.get(key) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|value| {
                value
                    .scalar_string()
                    .ok_or_else(|| format!("field {key} has a non-scalar element"))
            })
            .collect(),
        Some(_) => Err(format!("field {key} is not an array")),
    }
}

/// Errors surfaced by client operations.
///
/// Transport failures and application-level status failures stay
/// distinguishable so callers can decide whether to retry, log or abort.
/// Nothing here is fatal: every failure is returned.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The RPC round trip itself failed (connection, timeout, bad XML).
    #[error("{operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    /// The call reached the service but its status field was not the
    /// canonical success code.
    #[error("{operation} failed: {status}")]
    Status {
        operation: &'static str,
        status: String,
    },

    /// A well-formed transport response with the wrong shape.
    #[error("{operation} returned malformed data: {detail}")]
    MalformedResponse {
        operation: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Record(#[from] MalformedRecord),

    #[error("fingerprint failed: {0}")]
    Hash(#[from] HashError),

    #[error("subtitle payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload request construction works; sending it does not, because
    /// the service's response contract for `UploadSubtitles` is an
    /// unresolved gap.
    #[error("subtitle upload is not supported")]
    UploadUnsupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_from_value_full_record() {
        let mut cast = BTreeMap::new();
        cast.insert("_0000001".to_string(), Value::string("Some Actor"));

        let mut map = BTreeMap::new();
        map.insert("id".to_string(), Value::string("0403358"));
        map.insert("title".to_string(), Value::string("Nochnoy dozor"));
        map.insert("year".to_string(), Value::string("2004"));
        map.insert("cast".to_string(), Value::Struct(cast));
        map.insert(
            "genres".to_string(),
            Value::Array(vec![Value::string("Fantasy"), Value::string("Thriller")]),
        );

        let movie = Movie::from_value(Value::Struct(map)).unwrap();
        assert_eq!(movie.id, "0403358");
        assert_eq!(movie.title, "Nochnoy dozor");
        assert_eq!(movie.year, "2004");
        assert_eq!(movie.cast.get("_0000001").unwrap(), "Some Actor");
        assert_eq!(movie.genres, vec!["Fantasy", "Thriller"]);
        assert!(movie.plot.is_empty());
    }

    #[test]
    fn test_movie_from_value_rejects_bad_shape() {
        let mut map = BTreeMap::new();
        map.insert("genres".to_string(), Value::string("not-a-list"));
        assert!(Movie::from_value(Value::Struct(map)).is_err());
    }

    #[test]
    fn test_movie_from_hash_match_requires_fields() {
        let mut map = BTreeMap::new();
        map.insert("MovieImdbID".to_string(), Value::string("0403358"));
        map.insert("MovieName".to_string(), Value::string("Nochnoy dozor"));
        assert!(Movie::from_hash_match(&map).is_err());

        map.insert("MovieYear".to_string(), Value::string("2004"));
        let movie = Movie::from_hash_match(&map).unwrap();
        assert_eq!(movie.title, "Nochnoy dozor");
    }
}
