//! Subtitle domain: search records, candidate ranking, payload codec and
//! upload parameter construction.

mod payload;
mod rank;
mod types;
pub mod upload;

pub use payload::{encode_payload, resolve_encoding, PayloadError, SubtitleFile};
pub use rank::select_best;
pub use types::{MalformedRecord, SubtitleRecord};
pub use upload::UploadCandidate;
