/// Delimiter between owner id and list id in a composite list reference.
pub const COMPOSITE_DELIMITER: char = '_';

/// Delimiter between the fields of an invite code.  Chosen so it can never
/// appear in a user id and is distinct from [`COMPOSITE_DELIMITER`],
/// keeping the two id schemes unambiguous to parse.
pub const INVITE_DELIMITER: char = '|';

/// Minimum length of a store-generated user id.  Anything at least this
/// long and purely ASCII-alphanumeric is treated as a user id when a
/// composite reference is decomposed.
pub const USER_ID_MIN_LEN: usize = 20;

/// Default host used when building shareable invite links.
pub const DEFAULT_INVITE_HOST: &str = "handla.app";

/// Display name shown when a member's profile cannot be fetched.
pub const UNKNOWN_USER_NAME: &str = "Unknown user";
