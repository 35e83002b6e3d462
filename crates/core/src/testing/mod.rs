//! Testing utilities: a scripted transport and wire-shaped fixtures,
//! allowing end-to-end tests without a live service.

mod mock_transport;

pub use mock_transport::{MockTransport, RecordedCall};

/// Builders for wire-shaped response values.
pub mod fixtures {
    use std::collections::BTreeMap;

    use crate::client::STATUS_SUCCESS;
    use crate::subtitle::encode_payload;
    use crate::xmlrpc::Value;

    /// A response struct carrying only a status field.
    pub fn status_response(status: &str) -> Value {
        let mut map = BTreeMap::new();
        map.insert("status".to_string(), Value::string(status));
        Value::Struct(map)
    }

    fn ok_response(fields: Vec<(&str, Value)>) -> Value {
        let mut map = BTreeMap::new();
        map.insert("status".to_string(), Value::string(STATUS_SUCCESS));
        for (key, value) in fields {
            map.insert(key.to_string(), value);
        }
        Value::Struct(map)
    }

    /// A successful login response.
    pub fn login_response(token: &str) -> Value {
        ok_response(vec![("token", Value::string(token))])
    }

    /// A successful search response carrying the given record structs.
    pub fn search_response(records: Vec<Value>) -> Value {
        ok_response(vec![("data", Value::Array(records))])
    }

    /// An empty search result, the way the service reports it.
    pub fn empty_search_response() -> Value {
        ok_response(vec![("data", Value::Bool(false))])
    }

    /// A search-hit record with the fields the pipeline interprets.
    pub fn subtitle_record(file_id: &str, downloads: &str, encoding: &str) -> Value {
        let mut map = BTreeMap::new();
        map.insert("IDSubtitleFile".to_string(), Value::string(file_id));
        map.insert("SubDownloadsCnt".to_string(), Value::string(downloads));
        map.insert("SubEncoding".to_string(), Value::string(encoding));
        map.insert("SubFormat".to_string(), Value::string("srt"));
        map.insert("SubLanguageID".to_string(), Value::string("eng"));
        map.insert(
            "SubFileName".to_string(),
            Value::string(format!("fixture-{file_id}.srt")),
        );
        Value::Struct(map)
    }

    /// A successful download response with one payload entry.
    pub fn download_response(file_id: &str, data: &str) -> Value {
        let mut entry = BTreeMap::new();
        entry.insert("idsubtitlefile".to_string(), Value::string(file_id));
        entry.insert("data".to_string(), Value::string(data));
        ok_response(vec![("data", Value::Array(vec![Value::Struct(entry)]))])
    }

    /// A CheckMovieHash response; `None` produces the service's
    /// empty-array form for unknown hashes.
    pub fn check_movie_hash_response(
        matches: &[(&str, Option<(&str, &str, &str)>)],
    ) -> Value {
        let mut data = BTreeMap::new();
        for (hash, movie) in matches {
            let value = match movie {
                Some((id, title, year)) => {
                    let mut map = BTreeMap::new();
                    map.insert("MovieImdbID".to_string(), Value::string(*id));
                    map.insert("MovieName".to_string(), Value::string(*title));
                    map.insert("MovieYear".to_string(), Value::string(*year));
                    Value::Struct(map)
                }
                None => Value::Array(Vec::new()),
            };
            data.insert(hash.to_string(), value);
        }
        ok_response(vec![("data", Value::Struct(data))])
    }

    /// Gzip+base64 payload text for the given subtitle bytes.
    pub fn encoded_payload(bytes: &[u8]) -> String {
        encode_payload(bytes).unwrap_or_default()
    }
}
