//! The producer/consumer configuration documents served by the management plane.
//!
//! `ProducerConfig` and `ConsumerConfig` share the same shape (§3 of the design doc);
//! they are kept as distinct types because a caller should never accidentally use a
//! producer-scoped document as if it described what this process consumes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub client_id: String,
    #[serde(default)]
    pub producers: Vec<ProducerDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub client_id: String,
    #[serde(default)]
    pub producers: Vec<ProducerDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerDescriptor {
    pub name: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<bool>,
    pub idp_client_id: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDescriptor {
    pub name: String,
    pub topic: Option<String>,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub source: Option<String>,
    #[serde(default)]
    pub configurations: Vec<ProductConsumerDescriptor>,
}

impl ProductDescriptor {
    /// The one configuration that governs this product. Any entry beyond the first is
    /// silently ignored per the configuration-scope invariant; callers that need to
    /// surface the ignored-entries warning should check `configurations.len() > 1`
    /// themselves before calling this.
    pub fn primary_configuration(&self) -> Option<&ProductConsumerDescriptor> {
        self.configurations.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Topic,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductConsumerDescriptor {
    pub destination: Option<String>,
    pub schedule_type: ScheduleType,
    pub schedule_expression: Option<String>,
    /// Present when the consumer-facing document additionally carries the per-product
    /// consumer list (used by the server-side filter evaluator); absent on client-facing
    /// documents fetched purely to drive scheduling.
    #[serde(default)]
    pub consumers: Vec<ConsumerDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Interval,
    Cron,
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleType::Interval => write!(f, "interval"),
            ScheduleType::Cron => write!(f, "cron"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerDescriptor {
    pub idp_client_id: String,
    #[serde(default)]
    pub attributes: Vec<AttributeFilter>,
}

/// A single `(name, value)` header predicate a record's headers must satisfy.
///
/// `attribute_type` is carried through for forward compatibility with richer predicate
/// kinds (e.g. regex) but this implementation only ever evaluates equality, per §4.8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub name: Option<String>,
    pub value: Option<String>,
    #[serde(default, rename = "type")]
    pub attribute_type: Option<String>,
}

impl AttributeFilter {
    /// `true` iff `headers` contains a case-insensitive key match for `name` whose first
    /// occurrence's value equals `value`, case-insensitively. A missing `name` or `value`
    /// always evaluates to `false` (§8 property 7).
    pub fn matches(&self, headers: &[(String, String)]) -> bool {
        let (Some(name), Some(value)) = (self.name.as_deref(), self.value.as_deref()) else {
            return false;
        };

        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .is_some_and(|(_, v)| v.eq_ignore_ascii_case(value))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseProductTypeError(pub String);

impl FromStr for ProductType {
    type Err = ParseProductTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "topic" => Ok(ProductType::Topic),
            "file" => Ok(ProductType::File),
            other => Err(ParseProductTypeError(other.to_owned())),
        }
    }
}
