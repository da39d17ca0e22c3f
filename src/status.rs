//! # Status Reconciliation
//!
//! Maps application names following the `<kind>:<group>:<label>` convention
//! back to module deployment ids, and folds per-instance platform state into
//! module status snapshots.

use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::constants::{attributes, naming, platform};
use crate::error::{DeployerError, DeployerResult};
use crate::models::{CloudAppType, InstanceInfo, ModuleDeploymentId, ModuleInstanceStatus, ModuleStatus};

/// Encode `id` as `<kind>:<group>:<label>`.
///
/// Group and label must be non-empty and free of the delimiter, otherwise the
/// name could not be decoded back into the same id.
pub fn encode_app_name(app_type: CloudAppType, id: &ModuleDeploymentId) -> DeployerResult<String> {
    for (field, value) in [("group", &id.group), ("label", &id.label)] {
        if value.is_empty() || value.contains(naming::DELIMITER) {
            return Err(DeployerError::InvalidNameError(format!(
                "{field} '{value}' of module {id} must be non-empty and must not contain '{}'",
                naming::DELIMITER
            )));
        }
    }

    Ok(format!(
        "{kind}{d}{group}{d}{label}",
        kind = app_type.name_kind(),
        d = naming::DELIMITER,
        group = id.group,
        label = id.label
    ))
}

/// Decode a `<kind>:<group>:<label>` name produced for `app_type`
pub fn decode_app_name(app_type: CloudAppType, name: &str) -> DeployerResult<ModuleDeploymentId> {
    let segments: Vec<&str> = name.split(naming::DELIMITER).collect();
    if segments.len() != naming::SEGMENTS {
        return Err(DeployerError::InvalidNameError(format!(
            "expected {} segments in '{name}', found {}",
            naming::SEGMENTS,
            segments.len()
        )));
    }
    if segments[0] != app_type.name_kind() {
        return Err(DeployerError::InvalidNameError(format!(
            "'{name}' is not a {} name",
            app_type.name_kind()
        )));
    }
    if segments[1].is_empty() || segments[2].is_empty() {
        return Err(DeployerError::InvalidNameError(format!(
            "'{name}' has an empty group or label"
        )));
    }

    Ok(ModuleDeploymentId::new(segments[1], segments[2]))
}

/// True when `name` carries the naming-convention prefix for `app_type`
pub fn has_kind_prefix(app_type: CloudAppType, name: &str) -> bool {
    name.strip_prefix(app_type.name_kind())
        .is_some_and(|rest| rest.starts_with(naming::DELIMITER))
}

/// Build per-module status from reported instances.
///
/// Instances without the kind prefix are ignored; instances whose name cannot
/// be decoded are logged and skipped.
pub fn reconcile_instances<'a>(
    app_type: CloudAppType,
    instances: impl IntoIterator<Item = &'a InstanceInfo>,
) -> HashMap<ModuleDeploymentId, ModuleStatus> {
    let mut statuses: HashMap<ModuleDeploymentId, ModuleStatus> = HashMap::new();

    for instance in instances {
        if !has_kind_prefix(app_type, &instance.name) {
            continue;
        }

        let id = match decode_app_name(app_type, &instance.name) {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    app_type = %app_type,
                    application_id = %instance.application_id,
                    error = %e,
                    "Skipping instance with malformed name"
                );
                continue;
            }
        };

        let instance_status = ModuleInstanceStatus::new(id.to_string(), instance.is_running())
            .with_attribute(attributes::APPLICATION_ID, instance.application_id.clone())
            .with_attribute(attributes::ADDRESS, instance.address.clone())
            .with_attribute(attributes::STATE, instance.state.clone());

        statuses
            .entry(id.clone())
            .or_insert_with(|| ModuleStatus::new(id))
            .instances
            .push(instance_status);
    }

    statuses
}

/// Fold partition states, keyed by cluster id, into stream module statuses
pub fn merge_partition_states(
    statuses: &mut HashMap<ModuleDeploymentId, ModuleStatus>,
    partition_states: &BTreeMap<String, String>,
) {
    for (cluster_id, state) in partition_states {
        let id = match decode_app_name(CloudAppType::Stream, cluster_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(cluster_id = %cluster_id, error = %e, "Skipping partition with malformed id");
                continue;
            }
        };

        let instance_status =
            ModuleInstanceStatus::new(id.to_string(), state == platform::STATE_RUNNING)
                .with_attribute(attributes::CLUSTER_ID, cluster_id.clone())
                .with_attribute(attributes::STATE, state.clone());

        statuses
            .entry(id.clone())
            .or_insert_with(|| ModuleStatus::new(id))
            .instances
            .push(instance_status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeploymentState;

    #[test]
    fn test_encode_decode() {
        let id = ModuleDeploymentId::new("ticktock", "time");
        let name = encode_app_name(CloudAppType::Stream, &id).unwrap();
        assert_eq!(name, "scdstream:ticktock:time");
        assert_eq!(decode_app_name(CloudAppType::Stream, &name).unwrap(), id);

        let task_name = encode_app_name(CloudAppType::Task, &id).unwrap();
        assert_eq!(task_name, "scdtask:ticktock:time");
    }

    #[test]
    fn test_delimiter_in_group_is_rejected() {
        let id = ModuleDeploymentId::new("tick:tock", "time");
        assert!(matches!(
            encode_app_name(CloudAppType::Task, &id),
            Err(DeployerError::InvalidNameError(_))
        ));
    }

    #[test]
    fn test_decode_requires_three_segments() {
        assert!(decode_app_name(CloudAppType::Stream, "scdstream:app").is_err());
        assert!(decode_app_name(CloudAppType::Stream, "scdstream:a:b:c").is_err());
        assert!(decode_app_name(CloudAppType::Stream, "scdtask:a:b").is_err());
    }

    #[test]
    fn test_reconcile_skips_malformed_and_foreign_names() {
        let instances = vec![
            InstanceInfo::new("application_1_0001", "scdtask:timestamp:ts", "RUNNING", "http://h1"),
            InstanceInfo::new("application_1_0002", "scdtask:broken", "RUNNING", "http://h2"),
            InstanceInfo::new("application_1_0003", "someone-else", "RUNNING", "http://h3"),
            InstanceInfo::new("application_1_0004", "scdtask:timestamp:old", "KILLED", "http://h4"),
        ];

        let statuses = reconcile_instances(CloudAppType::Task, &instances);
        assert_eq!(statuses.len(), 2);

        let running = &statuses[&ModuleDeploymentId::new("timestamp", "ts")];
        assert_eq!(running.state(), DeploymentState::Deployed);
        assert_eq!(
            running.instances[0].attributes.get("applicationId").map(String::as_str),
            Some("application_1_0001")
        );

        let killed = &statuses[&ModuleDeploymentId::new("timestamp", "old")];
        assert_eq!(killed.state(), DeploymentState::Undeployed);
    }

    #[test]
    fn test_merge_partition_states() {
        let mut statuses = HashMap::new();
        let mut partitions = BTreeMap::new();
        partitions.insert("scdstream:ticktock:time".to_string(), "RUNNING".to_string());
        partitions.insert("scdstream:ticktock:log".to_string(), "STOPPED".to_string());

        merge_partition_states(&mut statuses, &partitions);

        assert!(statuses[&ModuleDeploymentId::new("ticktock", "time")].is_running());
        assert!(!statuses[&ModuleDeploymentId::new("ticktock", "log")].is_running());
    }
}
