use crate::error::{FetchError, Result};

pub const IPFS_PREFIX: &str = "ipfs://";

/// Percent-decode then re-encode the path of an `ipfs://` URI.
///
/// Manifests in the wild carry both raw and pre-encoded paths; after this
/// they all look the same. `/` separators are kept as-is.
///
/// ```
/// use metaproc_fetch::normalize_ipfs_uri;
///
/// let uri = normalize_ipfs_uri("ipfs://bafy/my model.glb").unwrap();
/// assert_eq!(uri, "ipfs://bafy/my%20model.glb");
/// assert_eq!(normalize_ipfs_uri(&uri).unwrap(), uri);
/// ```
pub fn normalize_ipfs_uri(uri: &str) -> Result<String> {
    let path = uri
        .strip_prefix(IPFS_PREFIX)
        .ok_or_else(|| FetchError::InvalidUri(uri.to_string()))?;

    let decoded = urlencoding::decode(path).map_err(|_| FetchError::InvalidUri(uri.to_string()))?;
    let encoded: Vec<_> = decoded
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();

    Ok(format!("{IPFS_PREFIX}{}", encoded.join("/")))
}

/// Resolve an `ipfs://` URI against a gateway base URL.
pub fn gateway_link(uri: &str, gateway: &str) -> Result<String> {
    let path = uri
        .strip_prefix(IPFS_PREFIX)
        .ok_or_else(|| FetchError::InvalidUri(uri.to_string()))?;
    Ok(format!("{}/ipfs/{path}", gateway.trim_end_matches('/')))
}
