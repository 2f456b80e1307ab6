//! Layer reuse
//!
//! A layer can be reused when the checksum stored by its last install is
//! exactly the checksum of the newly resolved descriptor.

use crate::catalog::DependencyDescriptor;
use crate::error::NodeEngineResult;
use crate::layer::record::LayerRecord;
use tracing::debug;

/// Whether `record` already holds the extracted contents of `descriptor`.
///
/// Comparison is exact and case-sensitive. A missing checksum means the
/// layer must be installed.
pub fn cache_matches(record: &LayerRecord, descriptor: &DependencyDescriptor) -> NodeEngineResult<bool> {
    let Some(stored) = record.stored_checksum()? else {
        debug!("Layer {} has no stored checksum", record.name);
        return Ok(false);
    };

    let hit = stored == descriptor.checksum;
    debug!(
        "Layer {} stored checksum {} {} {}",
        record.name,
        stored,
        if hit { "matches" } else { "differs from" },
        descriptor.checksum
    );
    Ok(hit)
}
