//! Authorising a caller against a producer's configured consumers, resolving which
//! attribute filters (if any) apply to an authorised consumer for a given topic, and
//! evaluating a record's headers against them. All `idpClientId` comparisons are
//! case-insensitive per the spec.

use federator_common::config_model::{AttributeFilter, ProducerConfig};

/// `true` iff `client_id` appears as a consumer of *any* product under the config's
/// first producer. Only the first producer is consulted: a caller listed only against a
/// later producer is not authorised, per the server-side auth invariant.
pub fn is_authorized(config: &ProducerConfig, client_id: &str) -> bool {
    config
        .producers
        .first()
        .into_iter()
        .flat_map(|producer| producer.products.iter())
        .flat_map(|product| product.configurations.iter())
        .flat_map(|configuration| configuration.consumers.iter())
        .any(|consumer| consumer.idp_client_id.eq_ignore_ascii_case(client_id))
}

/// The attribute filters configured for `client_id` on `address`, if the management
/// plane lists that consumer for it. `address` is matched against either a topic
/// product's `topic` name or a file product's `source` path, whichever the caller is
/// asking to stream. `None` means the consumer isn't configured for this address at all
/// (caller should reject the call with an invalid-topic error); `Some(&[])` means
/// configured with no filter (every record passes).
pub fn filters_for<'a>(
    config: &'a ProducerConfig,
    address: &str,
    client_id: &str,
) -> Option<&'a [AttributeFilter]> {
    config
        .producers
        .iter()
        .flat_map(|producer| producer.products.iter())
        .filter(|product| {
            product.topic.as_deref() == Some(address) || product.source.as_deref() == Some(address)
        })
        .flat_map(|product| product.configurations.iter())
        .flat_map(|configuration| configuration.consumers.iter())
        .find(|consumer| consumer.idp_client_id.eq_ignore_ascii_case(client_id))
        .map(|consumer| consumer.attributes.as_slice())
}

/// A record passes if there are no filters configured, or if every filter matches its
/// headers (logical AND, not OR: a record must satisfy all configured attributes).
pub fn record_passes(filters: &[AttributeFilter], headers: &[(String, String)]) -> bool {
    filters.iter().all(|filter| filter.matches(headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use federator_common::config_model::{
        ConsumerDescriptor, ProductConsumerDescriptor, ProductDescriptor, ProducerDescriptor,
        ProductType, ScheduleType,
    };

    fn producer(name: &str, consumer_ids: &[&str]) -> ProducerDescriptor {
        ProducerDescriptor {
            name: name.to_string(),
            host: Some(format!("{name}.internal")),
            port: None,
            tls: None,
            idp_client_id: None,
            products: vec![ProductDescriptor {
                name: "orders".to_string(),
                topic: Some("orders".to_string()),
                product_type: ProductType::Topic,
                source: None,
                configurations: vec![ProductConsumerDescriptor {
                    destination: None,
                    schedule_type: ScheduleType::Interval,
                    schedule_expression: Some("PT1M".to_string()),
                    consumers: consumer_ids
                        .iter()
                        .map(|id| ConsumerDescriptor {
                            idp_client_id: id.to_string(),
                            attributes: vec![AttributeFilter {
                                name: Some("region".to_string()),
                                value: Some("eu".to_string()),
                                attribute_type: None,
                            }],
                        })
                        .collect(),
                }],
            }],
        }
    }

    fn sample_config() -> ProducerConfig {
        ProducerConfig {
            client_id: "producer-a".to_string(),
            producers: vec![producer("Producer A", &["consumer-a"])],
        }
    }

    #[test]
    fn unknown_consumer_has_no_filters() {
        let config = sample_config();
        assert!(filters_for(&config, "orders", "consumer-b").is_none());
    }

    #[test]
    fn known_consumer_filters_must_all_match() {
        let config = sample_config();
        let filters = filters_for(&config, "orders", "consumer-a").unwrap();
        assert!(record_passes(filters, &[("region".to_string(), "eu".to_string())]));
        assert!(!record_passes(filters, &[("region".to_string(), "us".to_string())]));
    }

    #[test]
    fn multiple_filters_require_every_attribute_to_match() {
        let filters = vec![
            AttributeFilter {
                name: Some("tenant".to_string()),
                value: Some("alpha".to_string()),
                attribute_type: None,
            },
            AttributeFilter {
                name: Some("region".to_string()),
                value: Some("eu".to_string()),
                attribute_type: None,
            },
        ];
        assert!(!record_passes(&filters, &[("tenant".to_string(), "alpha".to_string())]));
        assert!(record_passes(
            &filters,
            &[
                ("tenant".to_string(), "alpha".to_string()),
                ("region".to_string(), "eu".to_string()),
            ]
        ));
    }

    #[test]
    fn no_filters_means_everything_passes() {
        assert!(record_passes(&[], &[]));
    }

    #[test]
    fn idp_client_id_match_is_case_insensitive() {
        let config = sample_config();
        assert!(filters_for(&config, "orders", "Consumer-A").is_some());
        assert!(is_authorized(&config, "CONSUMER-A"));
    }

    #[test]
    fn authorisation_only_consults_the_first_producer() {
        let config = ProducerConfig {
            client_id: "producer-a".to_string(),
            producers: vec![producer("First", &["consumer-a"]), producer("Second", &["consumer-b"])],
        };
        assert!(is_authorized(&config, "consumer-a"));
        assert!(!is_authorized(&config, "consumer-b"));
    }
}
