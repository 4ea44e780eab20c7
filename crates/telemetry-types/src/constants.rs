//! Feed-level wire constants.

/// Maximum accepted size for a single feed frame. Fleet snapshots carry
/// per-vehicle path polylines, so this is generous.
pub const FEED_MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Query parameter carrying the feed credential token.
pub const API_KEY_PARAM: &str = "api_key";
