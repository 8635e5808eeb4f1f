use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scheme prefix kubelet puts in front of Azure resource IDs.
pub const PROVIDER_ID_PREFIX: &str = "azure://";

/// Address of a single VM inside a virtual machine scale set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct VirtualMachineScaleSetVmId {
    pub subscription_id: String,
    pub resource_group: String,
    pub scale_set_name: String,
    pub instance_id: String,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("Resource ID {0:?} does not start with /")]
    NotAbsolute(String),
    #[error("Resource ID {id:?} has {found} segments, expected {expected}")]
    SegmentCount {
        id: String,
        found: usize,
        expected: usize,
    },
    #[error("Resource ID {id:?} has segment {found:?} where {expected:?} was expected")]
    UnexpectedSegment {
        id: String,
        found: String,
        expected: &'static str,
    },
    #[error("Resource ID {id:?} has an empty value for {segment}")]
    EmptyValue { id: String, segment: &'static str },
}

// Static segments, `None` marks the value positions.
const SEGMENTS: [Option<&str>; 10] = [
    Some("subscriptions"),
    None,
    Some("resourceGroups"),
    None,
    Some("providers"),
    Some("Microsoft.Compute"),
    Some("virtualMachineScaleSets"),
    None,
    Some("virtualMachines"),
    None,
];

const VALUE_NAMES: [&str; 4] = [
    "subscription_id",
    "resource_group",
    "scale_set_name",
    "instance_id",
];

/// Strips the `azure://` prefix from a node provider ID.
///
/// `azure:///subscriptions/s/...` becomes `/subscriptions/s/...`.
pub fn strip_provider_prefix(provider_id: &str) -> &str {
    provider_id
        .strip_prefix(PROVIDER_ID_PREFIX)
        .unwrap_or(provider_id)
}

impl FromStr for VirtualMachineScaleSetVmId {
    type Err = ResourceIdError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let path = id
            .strip_prefix('/')
            .ok_or_else(|| ResourceIdError::NotAbsolute(id.to_owned()))?;
        let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();

        if segments.len() != SEGMENTS.len() {
            return Err(ResourceIdError::SegmentCount {
                id: id.to_owned(),
                found: segments.len(),
                expected: SEGMENTS.len(),
            });
        }

        let mut values = Vec::with_capacity(VALUE_NAMES.len());
        for (segment, expected) in segments.iter().zip(SEGMENTS) {
            match expected {
                Some(expected) if !segment.eq_ignore_ascii_case(expected) => {
                    return Err(ResourceIdError::UnexpectedSegment {
                        id: id.to_owned(),
                        found: (*segment).to_owned(),
                        expected,
                    })
                }
                Some(_) => (),
                None if segment.is_empty() => {
                    return Err(ResourceIdError::EmptyValue {
                        id: id.to_owned(),
                        segment: VALUE_NAMES[values.len()],
                    })
                }
                None => values.push((*segment).to_owned()),
            }
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();

        Ok(Self {
            subscription_id: next(),
            resource_group: next(),
            scale_set_name: next(),
            instance_id: next(),
        })
    }
}

impl fmt::Display for VirtualMachineScaleSetVmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachineScaleSets/{}/virtualMachines/{}",
            self.subscription_id, self.resource_group, self.scale_set_name, self.instance_id
        )
    }
}
