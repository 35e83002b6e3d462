//! Upload parameter construction.
//!
//! The service takes uploads as a struct of `cd1`, `cd2`, ... members, one
//! per subtitle file, each carrying the subtitle's md5 hash and file name,
//! the movie's fingerprint fields and (for the real upload, not the
//! existence probe) the gzip+base64 subtitle content. Only the request
//! side is modeled here; see `OsdbClient::upload_subtitles` for the state
//! of the response contract.

use std::collections::BTreeMap;
use std::path::Path;

use crate::hash::{fingerprint_file, HashError};
use crate::xmlrpc::Value;

use super::payload::encode_payload;

/// A local movie/subtitle pair prepared for the upload calls.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    /// md5 of the subtitle file, lowercase hex.
    pub sub_hash: String,
    pub sub_file_name: String,
    pub movie_file_name: String,
    pub movie_byte_size: u64,
    /// 16-hex OSDb fingerprint of the movie file.
    pub movie_hash: String,
    /// Raw subtitle bytes, compressed+encoded on demand.
    sub_contents: Vec<u8>,
}

impl UploadCandidate {
    /// Build a candidate from a movie file and a subtitle file on disk.
    pub fn from_files(movie_path: &Path, sub_path: &Path) -> Result<Self, HashError> {
        let sub_contents = std::fs::read(sub_path)?;
        let sub_hash = format!("{:x}", md5::compute(&sub_contents));

        let fingerprint = fingerprint_file(movie_path)?;

        Ok(Self {
            sub_hash,
            sub_file_name: file_name(sub_path),
            movie_file_name: file_name(movie_path),
            movie_byte_size: fingerprint.size,
            movie_hash: fingerprint.hex(),
            sub_contents,
        })
    }

    fn base_params(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        map.insert("subhash".to_string(), Value::string(&self.sub_hash));
        map.insert(
            "subfilename".to_string(),
            Value::string(&self.sub_file_name),
        );
        map.insert("moviehash".to_string(), Value::string(&self.movie_hash));
        map.insert(
            "moviebytesize".to_string(),
            Value::string(self.movie_byte_size.to_string()),
        );
        map.insert(
            "moviefilename".to_string(),
            Value::string(&self.movie_file_name),
        );
        map
    }
}

/// Parameters for the existence probe (`TryUploadSubtitles`): `cdN` maps
/// without file content.
pub fn try_upload_params(candidates: &[UploadCandidate]) -> Value {
    let map = candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            (
                format!("cd{}", i + 1),
                Value::Struct(candidate.base_params()),
            )
        })
        .collect();
    Value::Struct(map)
}

/// Parameters for the real upload (`UploadSubtitles`): `cdN` maps with
/// gzip+base64 `subcontent` attached.
pub fn upload_params(candidates: &[UploadCandidate]) -> Result<Value, std::io::Error> {
    let mut map = BTreeMap::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let mut params = candidate.base_params();
        params.insert(
            "subcontent".to_string(),
            Value::String(encode_payload(&candidate.sub_contents)?),
        );
        map.insert(format!("cd{}", i + 1), Value::Struct(params));
    }
    Ok(Value::Struct(map))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
