//! Name normalisation rules that feed job identity (§3 invariant 1, §9 open question on
//! server-name case sensitivity).

/// Strip everything but ASCII alphanumerics from a server/producer name.
///
/// Two distinct names that differ only in punctuation collide after this
/// transform; callers that mint job ids from the result are expected to log a
/// clash when that happens rather than silently overwrite one job with another.
pub fn clean_server_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Normalise a producer name for display/logging purposes: non-alphanumeric characters
/// are stripped, and an empty result falls back to the literal `Producer`.
pub fn normalise_producer_name(name: &str) -> String {
    let cleaned = clean_server_name(name);
    if cleaned.is_empty() {
        "Producer".to_string()
    } else {
        cleaned
    }
}

/// `job_id = clean_server_name(producer.name) + "-" + product.topic`.
pub fn job_id(producer_name: &str, topic: &str) -> String {
    format!("{}-{}", clean_server_name(producer_name), topic)
}

/// The offset-store key for a `(clientKey, serverName, resource)` triple, per §6's
/// persisted state layout. `resource` is the topic name for topic jobs and the
/// destination path for file jobs.
pub fn offset_key(client_key: &str, server_name: &str, resource: &str) -> String {
    format!("topic:{client_key}-{server_name}-{resource}:offset")
}

/// Strip a leading `http://` or `https://` scheme from a server host, as §3 requires for
/// `ConnectionTarget::server_host`.
pub fn strip_scheme(host: &str) -> &str {
    host.strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation() {
        assert_eq!(clean_server_name("prod-node.01!"), "prodnode01");
    }

    #[test]
    fn normalise_falls_back_to_producer() {
        assert_eq!(normalise_producer_name("---"), "Producer");
        assert_eq!(normalise_producer_name("Acme-1"), "Acme1");
    }

    #[test]
    fn clashing_names_collide() {
        assert_eq!(clean_server_name("node-1"), clean_server_name("node.1"));
    }

    #[test]
    fn job_id_concatenates_cleaned_name_and_topic() {
        assert_eq!(job_id("Acme-Corp", "orders"), "AcmeCorp-orders");
    }

    #[test]
    fn strip_scheme_removes_either_prefix() {
        assert_eq!(strip_scheme("https://host.example"), "host.example");
        assert_eq!(strip_scheme("http://host.example"), "host.example");
        assert_eq!(strip_scheme("host.example"), "host.example");
    }

    #[test]
    fn offset_key_follows_the_persisted_state_layout() {
        assert_eq!(offset_key("client-a", "server-b", "orders"), "topic:client-a-server-b-orders:offset");
    }
}
