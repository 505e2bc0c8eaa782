use xxhash_rust::xxh3::xxh3_64;

/// Derives the opaque identity used to count unique visitors.
///
/// Implementations must be deterministic: the same client seen twice on the
/// same day has to map to the same fingerprint for set-based deduplication.
pub trait VisitorFingerprint: Send + Sync {
    fn fingerprint(&self, client_ip: &str, user_agent: &str) -> String;
}

/// Non-cryptographic hash of client IP and user agent.
///
/// Cheap and privacy-light: no persistent visitor identity is stored, and
/// visitors behind one NAT with identical browsers collapse into one.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpUserAgentFingerprint;

impl VisitorFingerprint for IpUserAgentFingerprint {
    fn fingerprint(&self, client_ip: &str, user_agent: &str) -> String {
        let input = format!("{client_ip}\n{user_agent}");
        let hash = xxh3_64(input.as_bytes());
        format!("{hash:016x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let fp = IpUserAgentFingerprint;
        let a = fp.fingerprint("203.0.113.7", "Mozilla/5.0");
        let b = fp.fingerprint("203.0.113.7", "Mozilla/5.0");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_fingerprint_varies_with_ip_and_agent() {
        let fp = IpUserAgentFingerprint;
        let base = fp.fingerprint("203.0.113.7", "Mozilla/5.0");
        assert_ne!(base, fp.fingerprint("203.0.113.8", "Mozilla/5.0"));
        assert_ne!(base, fp.fingerprint("203.0.113.7", "curl/8.0"));
    }

    #[test]
    fn test_fields_do_not_run_together() {
        let fp = IpUserAgentFingerprint;
        assert_ne!(fp.fingerprint("1.2.3.4", "5abc"), fp.fingerprint("1.2.3.45", "abc"));
    }
}
