//! The dynamic-config job: fetches this client's consumer configuration from the
//! management plane and reconciles the scheduler's topic/file jobs against it. Runs on
//! its own schedule (typically every minute) so newly published producers and products
//! show up without a restart.

use std::sync::Arc;

use federator_common::config_model::ProductType;
use federator_common::{
    ConnectionTarget, DynamicConfigJobParams, FederatorError, FileJobParams, JobBase, JobParams,
    TopicJobParams,
};
use federator_common::naming;
use federator_scheduler::FederatorScheduler;

use crate::runtime::ClientRuntime;

pub async fn run(
    runtime: &ClientRuntime,
    scheduler: Option<Arc<FederatorScheduler>>,
    params: &DynamicConfigJobParams,
) -> Result<(), FederatorError> {
    let Some(scheduler) = scheduler else {
        return Err(FederatorError::Configuration(
            "dynamic config job ran before the scheduler was attached".to_string(),
        ));
    };

    let config = runtime
        .consumer_config_service
        .get_config(&params.base.management_node_id)
        .await?;
    metrics::counter!("config_fetch_total").increment(1);

    let mut desired = Vec::new();
    for producer in &config.producers {
        let Some(host) = producer.host.as_deref() else {
            tracing::warn!(producer = %producer.name, "producer has no host configured, skipping");
            continue;
        };

        for product in &producer.products {
            let Some(consumer_params) = product.primary_configuration() else {
                continue;
            };
            if product.configurations.len() > 1 {
                tracing::warn!(
                    producer = %producer.name,
                    product = %product.name,
                    "product has multiple configuration entries, only the first is honoured"
                );
            }

            let target = ConnectionTarget::new(
                config.client_id.clone(),
                producer.idp_client_id.clone().unwrap_or_default(),
                &producer.name,
                host,
                producer.port,
                producer.tls,
            );

            let base = JobBase {
                job_id: String::new(),
                job_name: product.name.clone(),
                schedule_type: consumer_params.schedule_type,
                schedule_expression: consumer_params
                    .schedule_expression
                    .clone()
                    .unwrap_or_else(|| "PT1M".to_string()),
                amount_of_retries: 3,
                management_node_id: params.base.management_node_id.clone(),
                require_immediate_trigger: false,
            };

            match product.product_type {
                ProductType::Topic => {
                    let Some(topic) = product.topic.clone() else {
                        tracing::warn!(product = %product.name, "topic product missing a topic name");
                        continue;
                    };
                    let job_id = naming::job_id(&producer.name, &topic);
                    desired.push(JobParams::Topic(TopicJobParams {
                        base: JobBase { job_id, ..base },
                        topic,
                        connection_target: target,
                    }));
                }
                ProductType::File => {
                    let Some(source_path) = product.source.clone() else {
                        tracing::warn!(product = %product.name, "file product missing a source path");
                        continue;
                    };
                    let destination_path = consumer_params
                        .destination
                        .clone()
                        .unwrap_or_else(|| format!("./received/{}", product.name));
                    let job_id = naming::job_id(&producer.name, &source_path);
                    desired.push(JobParams::File(FileJobParams {
                        base: JobBase { job_id, ..base },
                        connection_target: target,
                        source_path,
                        destination_path,
                    }));
                }
            }
        }
    }

    scheduler
        .reload_recurrent_jobs(&params.base.management_node_id, desired)
        .await
}
