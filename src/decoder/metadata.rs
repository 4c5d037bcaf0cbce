//! Error-correction level recovery from decode metadata.

use super::capability::{Metadata, MetadataKey};
use crate::models::ECLevel;

/// EC level reported for a decoded symbol, if any.
///
/// The dedicated key wins when its value is exactly `L`, `M`, `Q` or `H`.
/// Otherwise the first value (in key order) whose text is exactly one of
/// those letters is used. `None` is a normal answer: some backends do not
/// report the level.
pub fn extract_ec_level(metadata: &Metadata) -> Option<ECLevel> {
    if let Some(level) = metadata
        .get(&MetadataKey::ErrorCorrectionLevel)
        .and_then(|value| ECLevel::from_symbol(&value.to_string()))
    {
        return Some(level);
    }

    metadata
        .values()
        .find_map(|value| ECLevel::from_symbol(&value.to_string()))
}
