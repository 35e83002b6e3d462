//! Subtitle records as returned by the search API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::xmlrpc::Value;

/// A field of a [`SubtitleRecord`] had the wrong shape: a data-integrity
/// error, never silently ignored.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed subtitle record: {0}")]
pub struct MalformedRecord(pub String);

/// One search hit: a flat record of the service's ~40 named fields.
///
/// The library interprets only three of them: [`sub_downloads_cnt`]
/// (ranking), [`id_subtitle_file`] (download requests) and
/// [`sub_encoding`] (payload transcoding); the rest ride along for
/// display and upload flows.
///
/// [`sub_downloads_cnt`]: SubtitleRecord::sub_downloads_cnt
/// [`id_subtitle_file`]: SubtitleRecord::id_subtitle_file
/// [`sub_encoding`]: SubtitleRecord::sub_encoding
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleRecord {
    pub id_movie: String,
    pub id_movie_imdb: String,
    pub id_sub_movie_file: String,
    pub id_subtitle: String,
    pub id_subtitle_file: String,
    pub iso639: String,
    pub language_name: String,
    pub matched_by: String,
    pub movie_byte_size: String,
    pub movie_fps: String,
    pub movie_hash: String,
    pub movie_imdb_rating: String,
    pub movie_kind: String,
    pub movie_name: String,
    pub movie_name_eng: String,
    pub movie_release_name: String,
    pub movie_time_ms: String,
    pub movie_year: String,
    pub query_number: String,
    pub series_episode: String,
    pub series_imdb_parent: String,
    pub series_season: String,
    pub sub_actual_cd: String,
    pub sub_add_date: String,
    pub sub_author_comment: String,
    pub sub_bad: String,
    pub sub_comments: String,
    pub sub_download_link: String,
    pub sub_downloads_cnt: String,
    pub sub_encoding: String,
    pub sub_featured: String,
    pub sub_file_name: String,
    pub sub_format: String,
    pub sub_hash: String,
    pub sub_hd: String,
    pub sub_hearing_impaired: String,
    pub sub_language_id: String,
    pub sub_rating: String,
    pub sub_size: String,
    pub sub_sum_cd: String,
    pub subtitles_link: String,
    pub user_id: String,
    pub user_nick_name: String,
    pub user_rank: String,
    pub zip_download_link: String,
}

impl SubtitleRecord {
    /// Decode a record from a wire struct.
    ///
    /// Absent fields default to empty; a present field that is not a
    /// scalar is malformed.
    pub fn from_value(value: Value) -> Result<Self, MalformedRecord> {
        let map = value
            .into_struct()
            .ok_or_else(|| MalformedRecord("search hit is not a struct".to_string()))?;

        Ok(Self {
            id_movie: scalar(&map, "IDMovie")?,
            id_movie_imdb: scalar(&map, "IDMovieImdb")?,
            id_sub_movie_file: scalar(&map, "IDSubMovieFile")?,
            id_subtitle: scalar(&map, "IDSubtitle")?,
            id_subtitle_file: scalar(&map, "IDSubtitleFile")?,
            iso639: scalar(&map, "ISO639")?,
            language_name: scalar(&map, "LanguageName")?,
            matched_by: scalar(&map, "MatchedBy")?,
            movie_byte_size: scalar(&map, "MovieByteSize")?,
            movie_fps: scalar(&map, "MovieFPS")?,
            movie_hash: scalar(&map, "MovieHash")?,
            movie_imdb_rating: scalar(&map, "MovieImdbRating")?,
            movie_kind: scalar(&map, "MovieKind")?,
            movie_name: scalar(&map, "MovieName")?,
            movie_name_eng: scalar(&map, "MovieNameEng")?,
            movie_release_name: scalar(&map, "MovieReleaseName")?,
            movie_time_ms: scalar(&map, "MovieTimeMS")?,
            movie_year: scalar(&map, "MovieYear")?,
            query_number: scalar(&map, "QueryNumber")?,
            series_episode: scalar(&map, "SeriesEpisode")?,
            series_imdb_parent: scalar(&map, "SeriesIMDBParent")?,
            series_season: scalar(&map, "SeriesSeason")?,
            sub_actual_cd: scalar(&map, "SubActualCD")?,
            sub_add_date: scalar(&map, "SubAddDate")?,
            sub_author_comment: scalar(&map, "SubAuthorComment")?,
            sub_bad: scalar(&map, "SubBad")?,
            sub_comments: scalar(&map, "SubComments")?,
            sub_download_link: scalar(&map, "SubDownloadLink")?,
            sub_downloads_cnt: scalar(&map, "SubDownloadsCnt")?,
            sub_encoding: scalar(&map, "SubEncoding")?,
            sub_featured: scalar(&map, "SubFeatured")?,
            sub_file_name: scalar(&map, "SubFileName")?,
            sub_format: scalar(&map, "SubFormat")?,
            sub_hash: scalar(&map, "SubHash")?,
            sub_hd: scalar(&map, "SubHD")?,
            sub_hearing_impaired: scalar(&map, "SubHearingImpaired")?,
            sub_language_id: scalar(&map, "SubLanguageID")?,
            sub_rating: scalar(&map, "SubRating")?,
            sub_size: scalar(&map, "SubSize")?,
            sub_sum_cd: scalar(&map, "SubSumCD")?,
            subtitles_link: scalar(&map, "SubtitlesLink")?,
            user_id: scalar(&map, "UserID")?,
            user_nick_name: scalar(&map, "UserNickName")?,
            user_rank: scalar(&map, "UserRank")?,
            zip_download_link: scalar(&map, "ZipDownloadLink")?,
        })
    }

    /// The numeric file identifier used by download calls.
    pub fn file_id(&self) -> Result<i64, MalformedRecord> {
        self.id_subtitle_file.parse().map_err(|_| {
            MalformedRecord(format!(
                "subtitle file id {:?} is not an integer",
                self.id_subtitle_file
            ))
        })
    }
}

fn scalar(map: &BTreeMap<String, Value>, key: &str) -> Result<String, MalformedRecord> {
    match map.get(key) {
        None => Ok(String::new()),
        Some(value) => value
            .scalar_string()
            .ok_or_else(|| MalformedRecord(format!("field {key} is not a scalar"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_value(fields: &[(&str, Value)]) -> Value {
        let map = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Value::Struct(map)
    }

    #[test]
    fn test_from_value_reads_known_fields() {
        let record = SubtitleRecord::from_value(record_value(&[
            ("IDSubtitleFile", Value::string("1951968569")),
            ("SubDownloadsCnt", Value::string("2810")),
            ("SubEncoding", Value::string("CP1251")),
            ("MovieName", Value::string("Nochnoy dozor")),
        ]))
        .unwrap();

        assert_eq!(record.id_subtitle_file, "1951968569");
        assert_eq!(record.sub_downloads_cnt, "2810");
        assert_eq!(record.sub_encoding, "CP1251");
        assert_eq!(record.movie_name, "Nochnoy dozor");
        assert_eq!(record.user_rank, "");
    }

    #[test]
    fn test_from_value_accepts_numeric_scalars() {
        // The service is inconsistent about typing counters.
        let record = SubtitleRecord::from_value(record_value(&[(
            "SubDownloadsCnt",
            Value::Int(2810),
        )]))
        .unwrap();
        assert_eq!(record.sub_downloads_cnt, "2810");
    }

    #[test]
    fn test_from_value_rejects_non_struct() {
        assert!(SubtitleRecord::from_value(Value::string("nope")).is_err());
    }

    #[test]
    fn test_from_value_rejects_aggregate_field() {
        let result = SubtitleRecord::from_value(record_value(&[(
            "MovieName",
            Value::Array(vec![Value::string("x")]),
        )]));
        assert!(result.is_err());
    }

    #[test]
    fn test_file_id_parses() {
        let record = SubtitleRecord {
            id_subtitle_file: "1954123031".to_string(),
            ..Default::default()
        };
        assert_eq!(record.file_id().unwrap(), 1954123031);
    }

    #[test]
    fn test_file_id_rejects_malformed() {
        let record = SubtitleRecord {
            id_subtitle_file: "not-a-number".to_string(),
            ..Default::default()
        };
        assert!(record.file_id().is_err());
    }
}
