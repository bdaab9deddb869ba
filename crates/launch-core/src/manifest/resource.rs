//! Generic Kubernetes resource assembly

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Name prefix and `app` label shared by every resource
pub const PROJECT: &str = "weavescope";

/// Label key identifying the component a resource belongs to
pub const COMPONENT_LABEL: &str = "weavescope-component";

pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceKind {
    ReplicationController,
    Service,
    DaemonSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectMeta {
    pub name: String,
    pub labels: Labels,
}

/// A single Kubernetes resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub api_version: String,
    pub kind: ResourceKind,
    pub metadata: ObjectMeta,
    pub spec: Value,
}

/// `weavescope-<component>`
pub fn resource_name(component: &str) -> String {
    format!("{PROJECT}-{component}")
}

/// Labels attached to a resource and, for controllers, to its pods
pub fn component_labels(name: &str) -> Labels {
    Labels::from([
        ("app".to_string(), PROJECT.to_string()),
        (COMPONENT_LABEL.to_string(), name.to_string()),
    ])
}

/// Build a resource for `component`.
///
/// Controllers get `spec_fragment` wrapped into a pod template carrying the
/// component labels. Services ignore the fragment and select those same
/// labels, so a Service always matches the pods of the controller built
/// from the same component. `params` is merged into the spec either way.
pub fn make_resource(
    api_version: &str,
    kind: ResourceKind,
    component: &str,
    spec_fragment: Value,
    params: Value,
) -> Resource {
    let name = resource_name(component);
    let labels = component_labels(&name);

    let shaped = match kind {
        ResourceKind::ReplicationController | ResourceKind::DaemonSet => json!({
            "template": merge(json!({ "metadata": { "labels": labels } }), spec_fragment),
        }),
        ResourceKind::Service => json!({ "selector": labels }),
    };

    Resource {
        api_version: api_version.to_string(),
        kind,
        metadata: ObjectMeta { name, labels },
        spec: merge(params, shaped),
    }
}

/// Deep-merge `overlay` into `base`. Objects merge key by key; any other
/// overlay value replaces the base value. Nulls in the overlay are skipped.
pub fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => merge(Value::Null, value),
                };
                if !merged.is_null() {
                    base.insert(key, merged);
                }
            }
            Value::Object(base)
        }
        (base, Value::Null) => base,
        (Value::Null, Value::Object(overlay)) => {
            merge(Value::Object(Map::new()), Value::Object(overlay))
        }
        (_, overlay) => overlay,
    }
}
