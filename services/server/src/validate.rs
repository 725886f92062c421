//! Image request validation.
//!
//! A request path is accepted only if it names a known pass, one of the fixed
//! enhancements, and the served extension. Validation never touches the cache
//! or the object store.

use wxviewer_pass::{ImageKey, ImageKeyError};

use crate::catalog::CatalogSnapshot;

/// Parses `path` and checks its pass against the catalog.
pub fn validate_path(path: &str, catalog: &CatalogSnapshot) -> Result<ImageKey, ImageKeyError> {
    let key = ImageKey::parse_path(path)?;
    if !catalog.contains(key.pass()) {
        return Err(ImageKeyError::UnknownPass(key.pass().to_string()));
    }
    Ok(key)
}

/// Returns true if `path` is a servable image request.
pub fn validate(path: &str, catalog: &CatalogSnapshot) -> bool {
    validate_path(path, catalog).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use rstest::rstest;
    use wxviewer_object_store::MemoryObjectStore;

    use crate::catalog::{CatalogConfig, PassCatalog};

    const PASS: &str = "20230101000000-20230101001500-NOAA19";

    async fn snapshot() -> Arc<CatalogSnapshot> {
        let store = MemoryObjectStore::new();
        store.put(format!("{PASS}/{PASS}-mcir.webp"), vec![1u8]);
        PassCatalog::load(Arc::new(store), CatalogConfig::default())
            .await
            .unwrap()
            .snapshot()
    }

    #[rstest]
    #[case::well_formed(
        "20230101000000-20230101001500-NOAA19/20230101000000-20230101001500-NOAA19-mcir.webp",
        true
    )]
    #[case::other_enhancement(
        "20230101000000-20230101001500-NOAA19/20230101000000-20230101001500-NOAA19-hvct-precip-map.webp",
        true
    )]
    #[case::one_segment("20230101000000-20230101001500-NOAA19-mcir.webp", false)]
    #[case::three_segments(
        "20230101000000-20230101001500-NOAA19/x/20230101000000-20230101001500-NOAA19-mcir.webp",
        false
    )]
    #[case::trailing_slash(
        "20230101000000-20230101001500-NOAA19/20230101000000-20230101001500-NOAA19-mcir.webp/",
        false
    )]
    #[case::unknown_pass(
        "20230101000000-20230101001500-NOAA18/20230101000000-20230101001500-NOAA18-mcir.webp",
        false
    )]
    #[case::file_not_prefixed(
        "20230101000000-20230101001500-NOAA19/20230102000000-20230102001500-NOAA19-mcir.webp",
        false
    )]
    #[case::wrong_extension(
        "20230101000000-20230101001500-NOAA19/20230101000000-20230101001500-NOAA19-mcir.png",
        false
    )]
    #[case::double_extension(
        "20230101000000-20230101001500-NOAA19/20230101000000-20230101001500-NOAA19-mcir.webp.webp",
        false
    )]
    #[case::unknown_enhancement(
        "20230101000000-20230101001500-NOAA19/20230101000000-20230101001500-NOAA19-thermal.webp",
        false
    )]
    #[case::empty("", false)]
    #[tokio::test]
    async fn test_validate(#[case] path: &str, #[case] expected: bool) {
        let catalog = snapshot().await;
        assert_eq!(validate(path, &catalog), expected);
    }

    #[tokio::test]
    async fn test_unknown_pass_is_distinguished() {
        let catalog = snapshot().await;
        let err = validate_path(
            "20230101000000-20230101001500-NOAA18/20230101000000-20230101001500-NOAA18-mcir.webp",
            &catalog,
        )
        .unwrap_err();
        assert!(err.is_unknown_pass());
    }

    #[test]
    fn test_empty_catalog_rejects_everything() {
        let catalog = CatalogSnapshot::default();
        assert!(!validate(&format!("{PASS}/{PASS}-mcir.webp"), &catalog));
    }
}
