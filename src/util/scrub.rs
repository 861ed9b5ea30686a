use url::Url;

/// Reduces a URL to `scheme://host` for safe logging.
///
/// Ledger API and RPC endpoint URLs often carry embedded credentials or
/// API keys in the path or query string (`https://node.example/v2/<api-key>`).
/// Every place a URL lands in a log line or error message goes through this
/// first so a leaked log never leaks a secret alongside it.
pub fn scrub_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let scheme = url.scheme();
            match url.host_str() {
                Some(host) => match url.port() {
                    Some(port) => format!("{scheme}://{host}:{port}/***"),
                    None => format!("{scheme}://{host}/***"),
                },
                None => format!("{scheme}://***"),
            }
        }
        Err(_) => "<unparseable-url>/***".to_string(),
    }
}

/// Masks all but the last `keep` characters of a secret-shaped string, for
/// log lines that want to confirm a value is non-empty and plausible
/// (e.g. a signer address or key id) without printing it whole.
pub fn mask_tail(value: &str, keep: usize) -> String {
    if value.len() <= keep {
        return "*".repeat(value.len());
    }
    let (masked, tail) = value.split_at(value.len() - keep);
    format!("{}{}", "*".repeat(masked.len()), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_path_and_query() {
        let scrubbed = scrub_url("https://node.example.com/v2/abcd1234?key=shh");
        assert_eq!(scrubbed, "https://node.example.com/***");
    }

    #[test]
    fn keeps_explicit_port() {
        let scrubbed = scrub_url("http://127.0.0.1:7575/v2/state/ledger-end");
        assert_eq!(scrubbed, "http://127.0.0.1:7575/***");
    }

    #[test]
    fn mask_tail_keeps_only_suffix() {
        assert_eq!(mask_tail("0xabcdef1234567890", 4), "**************7890");
    }

    #[test]
    fn mask_tail_handles_short_values() {
        assert_eq!(mask_tail("abc", 8), "***");
    }
}
