//! Session client for the OSDb XML-RPC API.
//!
//! One client holds one session: login populates the token, every
//! authenticated call carries it as the first positional parameter, and
//! every response is gated on the service's status field.

mod osdb;
mod types;

pub use osdb::OsdbClient;
pub use types::{ClientError, Movie, Session};

/// The service's API endpoint.
pub const DEFAULT_SERVER: &str = "https://api.opensubtitles.org:443/xml-rpc";

/// User agent reported on login. The service expects a registered one;
/// override via configuration.
pub const DEFAULT_USER_AGENT: &str = "subtitlino v0.1";

/// Maximum hits the service returns per search call.
pub const SEARCH_LIMIT: usize = 100;

/// The status value every successful response carries.
pub const STATUS_SUCCESS: &str = "200 OK";
