use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::time::Duration;

use fleetsync_core::DiscoveryError;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::TokioAsyncResolver;

/// Source of raw TXT records.
pub trait TxtSource: Send + Sync {
    /// Look up the TXT records for `name` at `nameserver`.
    ///
    /// Each returned string is one record with its character-strings joined.
    fn lookup<'a>(
        &'a self,
        nameserver: IpAddr,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, DiscoveryError>> + Send + 'a>>;
}

/// TXT lookups over DNS against a single nameserver.
#[derive(Debug, Clone)]
pub struct DnsTxtSource {
    port: u16,
    timeout: Duration,
    attempts: usize,
}

impl DnsTxtSource {
    /// Create a new DNS TXT source.
    pub fn new(port: u16, timeout: Duration, attempts: usize) -> Self {
        Self {
            port,
            timeout,
            attempts: attempts.max(1),
        }
    }

    fn resolver(&self, nameserver: IpAddr) -> TokioAsyncResolver {
        let group = NameServerConfigGroup::from_ips_clear(&[nameserver], self.port, true);
        let config = ResolverConfig::from_parts(None, vec![], group);

        let mut opts = ResolverOpts::default();
        opts.timeout = self.timeout;
        opts.attempts = self.attempts;
        opts.cache_size = 0;
        opts.use_hosts_file = false;

        TokioAsyncResolver::tokio(config, opts)
    }

    /// Upper bound on one lookup, covering UDP and TCP attempts.
    fn deadline(&self) -> Duration {
        self.timeout.saturating_mul(2 * self.attempts as u32)
    }

    async fn lookup_txt(&self, nameserver: IpAddr, name: &str) -> Result<Vec<String>, DiscoveryError> {
        let resolver = self.resolver(nameserver);
        let timeout_ms = self.timeout.as_millis() as u64;

        let lookup = match tokio::time::timeout(self.deadline(), resolver.txt_lookup(name)).await {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(e)) => {
                return Err(match e.kind() {
                    ResolveErrorKind::Timeout => DiscoveryError::Timeout {
                        name: name.to_string(),
                        timeout_ms,
                    },
                    _ => DiscoveryError::Lookup {
                        name: name.to_string(),
                        message: e.to_string(),
                    },
                });
            }
            Err(_) => {
                return Err(DiscoveryError::Timeout {
                    name: name.to_string(),
                    timeout_ms,
                });
            }
        };

        let records = lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|chunk| String::from_utf8_lossy(chunk))
                    .collect::<String>()
            })
            .collect::<Vec<_>>();

        tracing::debug!(name, nameserver = %nameserver, records = records.len(), "TXT lookup complete");
        Ok(records)
    }
}

impl TxtSource for DnsTxtSource {
    fn lookup<'a>(
        &'a self,
        nameserver: IpAddr,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, DiscoveryError>> + Send + 'a>> {
        Box::pin(self.lookup_txt(nameserver, name))
    }
}

/// Parse a nameserver address, accepting bracketed IPv6.
pub fn parse_nameserver(raw: &str) -> Result<IpAddr, DiscoveryError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    trimmed
        .parse()
        .map_err(|_| DiscoveryError::InvalidNameserver(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nameserver() {
        assert_eq!(
            parse_nameserver("fdaa::3").unwrap(),
            "fdaa::3".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            parse_nameserver("[fdaa::3]").unwrap(),
            "fdaa::3".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            parse_nameserver(" 10.0.0.53 ").unwrap(),
            "10.0.0.53".parse::<IpAddr>().unwrap()
        );
        assert!(matches!(
            parse_nameserver("not-an-ip"),
            Err(DiscoveryError::InvalidNameserver(_))
        ));
    }

    #[test]
    fn test_deadline_covers_attempts() {
        let source = DnsTxtSource::new(53, Duration::from_secs(1), 2);
        assert_eq!(source.deadline(), Duration::from_secs(4));

        let source = DnsTxtSource::new(53, Duration::from_secs(1), 0);
        assert_eq!(source.deadline(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_nameserver_fails() {
        // TEST-NET-1 is never routed.
        let source = DnsTxtSource::new(53, Duration::from_millis(100), 1);
        let result = source
            .lookup("192.0.2.1".parse().unwrap(), "vms.x.internal")
            .await;
        assert!(result.is_err());
    }
}
