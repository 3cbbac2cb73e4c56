//! Location lookup: client address → country code.
//!
//! Matchbook doesn't ship a geolocation database. It defines the
//! [`LocationResolver`] trait and the lifecycle calls it whenever a
//! session's address is new or changed. Lookups are best-effort: a
//! resolver answers `None` for anything it can't place, and the caller
//! simply leaves `country` unset.

use std::collections::HashMap;
use std::net::IpAddr;

use matchbook_protocol::CountryCode;

/// Translates a client address into a country.
///
/// # Contract
///
/// - Never fails. Malformed, private, or unknown addresses resolve to
///   `None`.
/// - One attempt per call. Retrying is not the caller's concern either:
///   a miss just leaves the session without a country.
/// - `Send + Sync + 'static` so one resolver can serve every request
///   concurrently.
///
/// # Example
///
/// ```rust
/// use matchbook_protocol::CountryCode;
/// use matchbook_session::LocationResolver;
///
/// /// Places every public address in one country.
/// struct Everywhere(CountryCode);
///
/// impl LocationResolver for Everywhere {
///     async fn resolve(&self, address: &str) -> Option<CountryCode> {
///         address.parse::<std::net::IpAddr>().ok().map(|_| self.0)
///     }
/// }
/// ```
pub trait LocationResolver: Send + Sync + 'static {
    fn resolve(
        &self,
        address: &str,
    ) -> impl std::future::Future<Output = Option<CountryCode>> + Send;
}

/// A resolver that never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl LocationResolver for NullResolver {
    async fn resolve(&self, _address: &str) -> Option<CountryCode> {
        None
    }
}

/// A fixed table of addresses → countries.
///
/// Handy for tests and for small deployments behind a known set of
/// proxies. Addresses are compared as parsed IPs, so `"::1"` and
/// `"0:0:0:0:0:0:0:1"` are the same entry.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    table: HashMap<IpAddr, CountryCode>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. Entries that don't parse as an IP are ignored.
    pub fn with(mut self, address: &str, country: CountryCode) -> Self {
        match address.parse::<IpAddr>() {
            Ok(ip) => {
                self.table.insert(ip, country);
            }
            Err(_) => {
                tracing::warn!(address, "ignoring unparseable resolver entry");
            }
        }
        self
    }
}

impl LocationResolver for StaticResolver {
    async fn resolve(&self, address: &str) -> Option<CountryCode> {
        let ip = address.trim().parse::<IpAddr>().ok()?;
        self.table.get(&ip).copied()
    }
}

// ---------------------------------------------------------------------------
// GeoIpResolver
// ---------------------------------------------------------------------------

/// A resolver backed by a MaxMind GeoLite2/GeoIP2 country database.
///
/// Behind the `geoip` feature. The database is read fully into memory at
/// construction; lookups are in-process and don't block on I/O.
#[cfg(feature = "geoip")]
pub struct GeoIpResolver {
    reader: maxminddb::Reader<Vec<u8>>,
}

#[cfg(feature = "geoip")]
impl GeoIpResolver {
    /// Opens a `.mmdb` file.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, maxminddb::MaxMindDBError> {
        let reader = maxminddb::Reader::open_readfile(path)?;
        Ok(Self { reader })
    }

    fn lookup(&self, ip: IpAddr) -> Option<CountryCode> {
        let record: maxminddb::geoip2::Country = match self.reader.lookup(ip) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(%ip, error = %e, "geoip lookup missed");
                return None;
            }
        };
        let iso = record.country?.iso_code?;
        CountryCode::parse(iso).ok()
    }
}

#[cfg(feature = "geoip")]
impl LocationResolver for GeoIpResolver {
    async fn resolve(&self, address: &str) -> Option<CountryCode> {
        let ip = address.trim().parse::<IpAddr>().ok()?;
        self.lookup(ip)
    }
}
