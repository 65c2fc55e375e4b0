//! Test-only models shared among multiple test modules.

use std::sync::atomic::{AtomicUsize, Ordering};

use stet_derive::Model;

use crate::{Either, Extensions, MapKey, OrderedMap, Value};

/// HTTP method used as a typed mapping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl MapKey for HttpMethod {
    fn to_scalar(&self) -> String {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
        }
        .to_owned()
    }

    fn from_scalar(text: &str) -> Option<Self> {
        Some(match text {
            "get" => Self::Get,
            "post" => Self::Post,
            "put" => Self::Put,
            "delete" => Self::Delete,
            _ => return None,
        })
    }

    fn expecting() -> &'static str {
        "an HTTP method (get/post/put/delete)"
    }
}

#[derive(Debug, Clone, Model)]
#[stet(crate = crate)]
pub(crate) struct Workflow {
    #[stet(key = "workflowId")]
    pub workflow_id: String,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub steps: Vec<Step>,
    pub inputs: OrderedMap<String, Value>,
    #[stet(key = "maxRetries")]
    pub max_retries: Option<Either<i64, String>>,
    #[stet(extensions)]
    pub extensions: Extensions,
    #[stet(core)]
    pub core: WorkflowCore,
}

#[derive(Debug, Clone, Model)]
#[stet(crate = crate)]
pub(crate) struct Step {
    #[stet(key = "stepId")]
    pub step_id: String,
    #[stet(key = "operationId")]
    pub operation_id: Option<String>,
    pub enabled: Option<bool>,
    #[stet(extensions)]
    pub extensions: Extensions,
    #[stet(core)]
    pub core: StepCore,
}

impl Step {
    pub(crate) fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            operation_id: None,
            enabled: None,
            extensions: Extensions::new(),
            core: StepCore::default(),
        }
    }
}

#[derive(Debug, Clone, Model)]
#[stet(crate = crate)]
pub(crate) struct PathItem {
    pub path: String,
    pub operations: OrderedMap<HttpMethod, String>,
    #[stet(core)]
    pub core: PathItemCore,
}

/// Exercises the custom-syncer opt-in: delegates to the default walker but
/// counts invocations.
#[derive(Debug, Clone, Model)]
#[stet(crate = crate, sync_with = sync_tracked)]
pub(crate) struct Tracked {
    pub name: String,
    #[stet(core)]
    pub core: TrackedCore,
}

pub(crate) static SYNC_CALLS: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn sync_tracked(
    model: &mut Tracked,
    cx: &mut crate::SyncContext<'_>,
    node: Option<crate::NodeId>,
    skip_required: bool,
) -> Result<crate::NodeId, crate::Error> {
    SYNC_CALLS.fetch_add(1, Ordering::Relaxed);
    crate::sync::sync_model(model, cx, node, skip_required)
}
