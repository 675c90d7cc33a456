//! Helpers shared by the drivers.

use crate::error::{ProviderError, Result};
use crate::types::Size;

/// Rejects engines the driver does not offer.
pub fn require_engine(provider: &str, engines: &[String], engine: &str) -> Result<()> {
    if engines.iter().any(|e| e == engine) {
        Ok(())
    } else {
        Err(ProviderError::InvalidParameter {
            provider: provider.to_string(),
            param: "engine".to_string(),
            detail: format!("unsupported engine '{engine}'"),
        })
    }
}

/// Looks a size up in the driver's catalogue.
pub fn require_size(provider: &str, sizes: &[Size], size_id: &str) -> Result<Size> {
    sizes
        .iter()
        .find(|size| size.id == size_id)
        .cloned()
        .ok_or_else(|| ProviderError::InvalidParameter {
            provider: provider.to_string(),
            param: "size".to_string(),
            detail: format!("unknown size '{size_id}'"),
        })
}

/// Catalogue entry for `size_id`, or a bare size when the backend reports an
/// id the catalogue does not know.
pub fn size_or_bare(sizes: &[Size], size_id: &str) -> Size {
    sizes
        .iter()
        .find(|size| size.id == size_id)
        .cloned()
        .unwrap_or_else(|| Size::new(size_id, ""))
}

/// A required response field is absent.
pub fn missing_field(provider: &str, field: &str) -> ProviderError {
    ProviderError::ParseError {
        provider: provider.to_string(),
        detail: format!("response is missing '{field}'"),
    }
}
