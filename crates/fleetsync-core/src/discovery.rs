//! Directory naming and TXT record parsing.
//!
//! The directory publishes one or more TXT records under
//! `vms.<app>.internal`, each a comma-separated list of `<id> <facts>`
//! entries. Only the id is used; it maps to `<id>.vm.<app>.internal`.

/// TXT query name listing the machines of `app_name`.
pub fn directory_query_name(app_name: &str) -> String {
    format!("vms.{}.internal", app_name)
}

/// Canonical private host name of machine `id` in `app_name`.
pub fn peer_hostname(id: &str, app_name: &str) -> String {
    format!("{}.vm.{}.internal", id, app_name)
}

/// Extract peer host names from raw TXT record strings.
///
/// Entries without a space-separated facts field, or with an empty id,
/// are skipped.
pub fn parse_peer_records<I, S>(records: I, app_name: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut peers = Vec::new();

    for record in records {
        for entry in record.as_ref().split(',') {
            match parse_entry(entry) {
                Some(id) => peers.push(peer_hostname(id, app_name)),
                None => {
                    tracing::debug!(entry = %entry, "Skipping malformed directory entry");
                }
            }
        }
    }

    peers
}

fn parse_entry(entry: &str) -> Option<&str> {
    let (id, _facts) = entry.trim().split_once(' ')?;
    if id.is_empty() {
        return None;
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(directory_query_name("my-app"), "vms.my-app.internal");
        assert_eq!(peer_hostname("abc123", "my-app"), "abc123.vm.my-app.internal");
    }

    #[test]
    fn test_parse_single_record() {
        let peers = parse_peer_records(["1857 ams,3d8d lhr"], "x");
        assert_eq!(peers, vec!["1857.vm.x.internal", "3d8d.vm.x.internal"]);
    }

    #[test]
    fn test_parse_multiple_records_preserves_order() {
        let peers = parse_peer_records(vec!["b ams".to_string(), "a lhr,c fra".to_string()], "x");
        assert_eq!(
            peers,
            vec!["b.vm.x.internal", "a.vm.x.internal", "c.vm.x.internal"]
        );
    }

    #[test]
    fn test_malformed_entry_skipped() {
        let peers = parse_peer_records(["a ams,garbage,b lhr"], "x");
        assert_eq!(peers, vec!["a.vm.x.internal", "b.vm.x.internal"]);
    }

    #[test]
    fn test_malformed_record_skipped() {
        let peers = parse_peer_records(["nofacts", "a ams", "b lhr"], "x");
        assert_eq!(peers, vec!["a.vm.x.internal", "b.vm.x.internal"]);
    }

    #[test]
    fn test_whitespace_around_entries() {
        let peers = parse_peer_records(["a ams, b lhr , ,"], "x");
        assert_eq!(peers, vec!["a.vm.x.internal", "b.vm.x.internal"]);
    }

    #[test]
    fn test_facts_may_contain_spaces() {
        let peers = parse_peer_records(["a ams extra fields"], "x");
        assert_eq!(peers, vec!["a.vm.x.internal"]);
    }

    #[test]
    fn test_empty_records() {
        let peers = parse_peer_records(Vec::<String>::new(), "x");
        assert!(peers.is_empty());
    }
}
