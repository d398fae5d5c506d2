//! Address classification and gateway URL construction.
//!
//! Addresses arrive loosely formed: a bare CID, a CID followed by a path, an
//! `ipfs://` or `ipns://` URI, a bare DNSLink name, or an already absolute
//! HTTP(S) URL. [`transform`] turns any of them into a URL served by a given
//! gateway.

use crate::error::{GatewayError, Result};
use crate::gateway::GatewayNode;

use cid::multibase::{self, Base};
use cid::Cid;
use url::Url;

const IPFS_PREFIX: &str = "ipfs://";
const IPNS_PREFIX: &str = "ipns://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// A CID given without any scheme, possibly followed by a path or query.
    RawIdentifier,
    IpfsUri,
    IpnsUri,
    /// Already an `http`/`https` URL; no gateway is involved.
    AbsoluteHttp,
}

impl AddressKind {
    /// Path segment under which a gateway serves this kind of address.
    pub fn namespace(&self) -> Option<&'static str> {
        match self {
            AddressKind::RawIdentifier | AddressKind::IpfsUri => Some("ipfs"),
            AddressKind::IpnsUri => Some("ipns"),
            AddressKind::AbsoluteHttp => None,
        }
    }
}

/// Outcome of classifying an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub kind: AddressKind,
    /// The normalized form: `ipfs://...`, `ipns://...` or the untouched HTTP URL.
    pub uri: String,
    /// CID or name for content addresses, with the original letter case.
    pub hostname: String,
    pub path: String,
    /// Either empty or a `?`-prefixed query string.
    pub query: String,
}

/// Returns true if `value` is exactly a CID of any version and base.
///
/// `Cid::try_from` accepts paths and keeps whatever follows `/ipfs/`, so
/// anything that looks like a URL or path is rejected up front.
pub fn is_cid(value: &str) -> bool {
    !value.is_empty()
        && !value.contains(['/', ':', '?', '#'])
        && Cid::try_from(value).is_ok()
}

/// Returns true for a CID encoded in lowercase base32, the only encoding that
/// survives being used as a DNS label.
pub fn is_base32_cid(value: &str) -> bool {
    is_cid(value) && matches!(multibase::decode(value), Ok((Base::Base32Lower, _)))
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Applies the classification rules without failing. The returned URI still
/// has to be decomposed for content addresses.
fn normalize(address: &str) -> (AddressKind, String) {
    let leading = address
        .split('/')
        .next()
        .and_then(|segment| segment.split('?').next())
        .unwrap_or_default();

    let (kind, mut uri) = if is_cid(address) || is_cid(leading) {
        (AddressKind::RawIdentifier, format!("{IPFS_PREFIX}{address}"))
    } else {
        if let Ok(url) = Url::parse(address) {
            if url.scheme().starts_with("http") {
                return (AddressKind::AbsoluteHttp, address.to_string());
            }
        }

        if starts_with_ignore_case(address, IPFS_PREFIX) {
            (AddressKind::IpfsUri, address.to_string())
        } else if starts_with_ignore_case(address, IPNS_PREFIX) {
            (AddressKind::IpnsUri, address.to_string())
        } else {
            // Anything else is taken to be a naming-system reference.
            (AddressKind::IpnsUri, format!("{IPNS_PREFIX}{address}"))
        }
    };

    if uri.ends_with('/') {
        uri.pop();
    }

    (kind, uri)
}

/// Version 0 CIDs are case sensitive base58. If the parsed hostname lost its
/// casing, re-locate it in the untouched URI and take the original slice.
fn recover_case(uri: &str, hostname: &str) -> String {
    if !starts_with_ignore_case(hostname, "qm") {
        return hostname.to_string();
    }

    let haystack = uri.to_ascii_lowercase();
    let needle = hostname.to_ascii_lowercase();
    match haystack.find(&needle) {
        Some(start) => uri[start..start + needle.len()].to_string(),
        None => hostname.to_string(),
    }
}

/// Classifies `address` and splits it into hostname, path and query.
pub fn classify(address: &str) -> Result<ResolvedAddress> {
    let (kind, uri) = normalize(address);

    let url = Url::parse(&uri).map_err(|_| GatewayError::invalid_address(address))?;
    let query = match url.query() {
        Some(q) if !q.is_empty() => format!("?{q}"),
        _ => String::new(),
    };

    if kind == AddressKind::AbsoluteHttp {
        return Ok(ResolvedAddress {
            kind,
            hostname: url.host_str().unwrap_or_default().to_string(),
            path: url.path().to_string(),
            query,
            uri,
        });
    }

    if !matches!(url.scheme(), "ipfs" | "ipns") {
        return Err(GatewayError::invalid_address(address));
    }

    let hostname = match url.host_str() {
        Some(host) if !host.is_empty() => recover_case(&uri, host),
        _ => return Err(GatewayError::invalid_address(address)),
    };

    Ok(ResolvedAddress {
        kind,
        hostname,
        path: url.path().to_string(),
        query,
        uri,
    })
}

/// Rewrites `address` into a URL served by `node`.
///
/// Absolute HTTP(S) URLs are returned unchanged. CIDs on a remote gateway use
/// subdomain addressing when they are base32 encoded, and path addressing
/// otherwise; names always use path addressing.
pub fn transform(address: &str, node: &GatewayNode) -> Result<String> {
    let resolved = classify(address)?;
    let scheme = node.scheme();
    let ResolvedAddress {
        kind,
        hostname,
        path,
        query,
        ..
    } = resolved;

    match kind {
        AddressKind::AbsoluteHttp => Ok(address.to_string()),
        AddressKind::RawIdentifier | AddressKind::IpfsUri => {
            if node.remote && is_base32_cid(&hostname) {
                Ok(format!(
                    "{scheme}://{hostname}.ipfs.{}{path}{query}",
                    node.host
                ))
            } else {
                Ok(format!(
                    "{scheme}://{}/ipfs/{hostname}{path}{query}",
                    node.host
                ))
            }
        }
        AddressKind::IpnsUri => Ok(format!(
            "{scheme}://{}/ipns/{hostname}{path}{query}",
            node.host
        )),
    }
}
