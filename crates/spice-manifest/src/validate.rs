use std::time::Duration;

use thiserror::Error;

use crate::{FieldSpec, PodManifest};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("pod name must not be empty")]
    EmptyName,
    #[error("pod name '{name}' must not contain whitespace")]
    InvalidName { name: String },
    #[error("pod {pod} data source #{index} must set both 'from' and 'name'")]
    IncompleteDataSource { pod: String, index: usize },
    #[error("pod {pod} data source {group} declares no fields")]
    EmptyDataSource { pod: String, group: String },
    #[error("pod {pod} {scope} has a field with an invalid name '{field}'")]
    InvalidFieldName {
        pod: String,
        scope: String,
        field: String,
    },
    #[error("pod {pod} training {setting} must be greater than zero")]
    ZeroDuration { pod: String, setting: &'static str },
    #[error("pod {pod} {kind} name must not be empty")]
    EmptyExpressionName { pod: String, kind: &'static str },
}

/// Structural checks applied after a manifest parses.
pub fn validate_manifest(manifest: &PodManifest) -> Result<(), ValidationError> {
    let pod = manifest.name.as_str();
    if pod.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if pod.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidName {
            name: pod.to_string(),
        });
    }

    for (index, group) in manifest.data_sources.iter().enumerate() {
        if group.from.trim().is_empty() || group.name.trim().is_empty() {
            return Err(ValidationError::IncompleteDataSource {
                pod: pod.to_string(),
                index,
            });
        }
        if group.fields.is_empty() {
            return Err(ValidationError::EmptyDataSource {
                pod: pod.to_string(),
                group: group.prefix(),
            });
        }
        check_fields(pod, &group.prefix(), &group.fields)?;
    }
    check_fields(pod, "fields", &manifest.fields)?;

    if let Some(training) = &manifest.training {
        for (setting, value) in [
            ("period", training.period),
            ("interval", training.interval),
            ("granularity", training.granularity),
        ] {
            if value == Some(Duration::ZERO) {
                return Err(ValidationError::ZeroDuration {
                    pod: pod.to_string(),
                    setting,
                });
            }
        }
    }

    for (kind, names) in [
        ("reward", manifest.rewards.keys().collect::<Vec<_>>()),
        ("action", manifest.actions.keys().collect::<Vec<_>>()),
    ] {
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(ValidationError::EmptyExpressionName {
                pod: pod.to_string(),
                kind,
            });
        }
    }

    Ok(())
}

fn check_fields(pod: &str, scope: &str, fields: &[FieldSpec]) -> Result<(), ValidationError> {
    for field in fields {
        let name = field.name.as_str();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidFieldName {
                pod: pod.to_string(),
                scope: scope.to_string(),
                field: name.to_string(),
            });
        }
    }
    Ok(())
}
