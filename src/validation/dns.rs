//! MX lookups against real DNS servers.

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::Resolver;
use tracing::debug;

use super::email::MxResolver;

/// [`MxResolver`] backed by a blocking DNS client.
pub struct DnsMxResolver {
    resolver: Resolver,
}

impl DnsMxResolver {
    /// Create a resolver with explicit upstreams and options.
    pub fn new(config: ResolverConfig, options: ResolverOpts) -> std::io::Result<Self> {
        Ok(Self {
            resolver: Resolver::new(config, options)?,
        })
    }

    /// Use the host's resolver configuration (`/etc/resolv.conf` on Unix).
    pub fn from_system_conf() -> std::io::Result<Self> {
        Ok(Self {
            resolver: Resolver::from_system_conf()?,
        })
    }
}

impl std::fmt::Debug for DnsMxResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsMxResolver").finish_non_exhaustive()
    }
}

impl MxResolver for DnsMxResolver {
    fn has_mx_records(&self, domain: &str) -> std::io::Result<bool> {
        // Fully qualified, so search domains are never appended
        let name = format!("{}.", domain.trim_end_matches('.'));
        match self.resolver.mx_lookup(name.as_str()) {
            Ok(lookup) => Ok(lookup.iter().next().is_some()),
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => {
                    debug!(domain, "No MX records");
                    Ok(false)
                }
                _ => Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
            },
        }
    }
}
