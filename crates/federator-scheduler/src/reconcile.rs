//! The reconcile algorithm: given the desired job set from the management plane and the
//! jobs currently registered with the scheduler, compute what to remove and what to add.
//! A job whose parameters changed is removed and re-added rather than updated in place,
//! since `tokio-cron-scheduler` has no notion of "replace this job's body." Reconcile is
//! always scoped to a single management node: `present` jobs belonging to any other node
//! are left untouched, so reloading one node's desired set never disturbs another's.

use std::collections::HashMap;

use federator_common::{ids::ManagementNodeId, JobParams};

#[derive(Debug, Default, Clone)]
pub struct ReconcilePlan {
    pub to_remove: Vec<String>,
    pub to_add: Vec<JobParams>,
}

/// `present` is keyed by job id and may contain jobs belonging to other management nodes
/// (the scheduler tracks every node's jobs in one map); only entries whose
/// `management_node_id` matches `management_node_id` are considered. The node's own
/// bootstrap `DynamicConfig` job is also excluded from consideration: it is registered
/// once outside this reconcile and must never be removed by its own reload. A job present
/// with identical params to its desired counterpart is left untouched; everything else is
/// either removed, added, or both (changed params: old job id is in `to_remove`, new
/// params are in `to_add`).
pub fn plan(
    management_node_id: &ManagementNodeId,
    desired: &[JobParams],
    present: &HashMap<String, JobParams>,
) -> ReconcilePlan {
    let present_for_node: HashMap<&str, &JobParams> = present
        .iter()
        .filter(|(_, params)| params.management_node_id() == management_node_id)
        .filter(|(_, params)| !matches!(params, JobParams::DynamicConfig(_)))
        .map(|(id, params)| (id.as_str(), params))
        .collect();

    let desired_by_id: HashMap<&str, &JobParams> =
        desired.iter().map(|params| (params.job_id(), params)).collect();

    let mut to_remove = Vec::new();
    for (id, present_params) in &present_for_node {
        match desired_by_id.get(id) {
            Some(desired_params) if *desired_params == *present_params => {}
            _ => to_remove.push((*id).to_string()),
        }
    }

    let mut to_add = Vec::new();
    for params in desired {
        let unchanged = present_for_node.get(params.job_id()).is_some_and(|p| *p == params);
        if !unchanged {
            to_add.push(params.clone());
        }
    }

    ReconcilePlan { to_remove, to_add }
}

#[cfg(test)]
mod tests {
    use super::*;
    use federator_common::{
        config_model::ScheduleType, ids::ManagementNodeId, ConnectionTarget, DynamicConfigJobParams,
        JobBase,
    };

    fn dynamic_job_for(node: &ManagementNodeId, job_id: &str, schedule_expression: &str) -> JobParams {
        JobParams::DynamicConfig(DynamicConfigJobParams {
            base: JobBase {
                job_id: job_id.to_string(),
                job_name: job_id.to_string(),
                schedule_type: ScheduleType::Interval,
                schedule_expression: schedule_expression.to_string(),
                amount_of_retries: 3,
                management_node_id: node.clone(),
                require_immediate_trigger: false,
            },
        })
    }

    fn dynamic_job(job_id: &str, schedule_expression: &str) -> JobParams {
        dynamic_job_for(&ManagementNodeId::default_node(), job_id, schedule_expression)
    }

    #[test]
    fn adds_new_jobs_only() {
        let node = ManagementNodeId::default_node();
        let desired = vec![dynamic_job("a", "PT5M")];
        let present = HashMap::new();
        let result = plan(&node, &desired, &present);
        assert_eq!(result.to_add.len(), 1);
        assert!(result.to_remove.is_empty());
    }

    #[test]
    fn removes_jobs_no_longer_desired() {
        let node = ManagementNodeId::default_node();
        let desired = vec![];
        let mut present = HashMap::new();
        present.insert("a".to_string(), dynamic_job("a", "PT5M"));
        let result = plan(&node, &desired, &present);
        assert_eq!(result.to_remove, vec!["a".to_string()]);
        assert!(result.to_add.is_empty());
    }

    #[test]
    fn leaves_unchanged_jobs_alone() {
        let node = ManagementNodeId::default_node();
        let desired = vec![dynamic_job("a", "PT5M")];
        let mut present = HashMap::new();
        present.insert("a".to_string(), dynamic_job("a", "PT5M"));
        let result = plan(&node, &desired, &present);
        assert!(result.to_add.is_empty());
        assert!(result.to_remove.is_empty());
    }

    #[test]
    fn changed_params_remove_then_add() {
        let node = ManagementNodeId::default_node();
        let desired = vec![dynamic_job("a", "PT10M")];
        let mut present = HashMap::new();
        present.insert("a".to_string(), dynamic_job("a", "PT5M"));
        let result = plan(&node, &desired, &present);
        assert_eq!(result.to_remove, vec!["a".to_string()]);
        assert_eq!(result.to_add.len(), 1);
    }

    #[test]
    fn other_management_nodes_jobs_are_never_touched() {
        let node_a = ManagementNodeId::new("node-a");
        let node_b = ManagementNodeId::new("node-b");
        let desired = vec![];
        let mut present = HashMap::new();
        present.insert("b-job".to_string(), dynamic_job_for(&node_b, "b-job", "PT5M"));
        let result = plan(&node_a, &desired, &present);
        assert!(result.to_remove.is_empty());
        assert!(result.to_add.is_empty());
    }

    #[test]
    fn bootstrap_dynamic_config_job_is_never_reconciled() {
        let node = ManagementNodeId::default_node();
        let desired = vec![];
        let mut present = HashMap::new();
        present.insert("dynamic-config".to_string(), dynamic_job("dynamic-config", "PT1M"));
        let result = plan(&node, &desired, &present);
        assert!(result.to_remove.is_empty());
        assert!(result.to_add.is_empty());
    }

    #[test]
    fn connection_target_is_part_of_identity() {
        let target_a = ConnectionTarget::new("c", "k", "server", "host", None, None);
        let mut target_b = target_a.clone();
        target_b.server_port = 9999;
        assert_ne!(target_a, target_b);
    }
}
