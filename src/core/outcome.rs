use crate::error::{Error, FailedTaskDetails, Result};

/// Terminal result of running a node.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success,
    Failure(Failure),
}

/// Why a node failed.
///
/// Composite variants record which child failed so the leaf that caused
/// the failure can always be traced from the root.
#[derive(Debug, Clone)]
pub enum Failure {
    Leaf {
        task: String,
        error: Error,
    },
    /// First failing child of a series; later children never started.
    Series {
        node: String,
        child: Box<Failure>,
    },
    /// Every failing child of a parallel node, in definition order.
    Parallel {
        node: String,
        failures: Vec<Failure>,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Outcome::Success => Ok(()),
            Outcome::Failure(failure) => Err(failure.to_error()),
        }
    }
}

impl Failure {
    pub fn leaf(task: impl Into<String>, error: Error) -> Self {
        Failure::Leaf {
            task: task.into(),
            error,
        }
    }

    /// Label of the node this failure belongs to.
    pub fn node(&self) -> &str {
        match self {
            Failure::Leaf { task, .. } => task,
            Failure::Series { node, .. } | Failure::Parallel { node, .. } => node,
        }
    }

    /// Names of the leaf tasks the failure is attributed to.
    pub fn attributed_to(&self) -> Vec<&str> {
        match self {
            Failure::Leaf { task, .. } => vec![task.as_str()],
            Failure::Series { child, .. } => child.attributed_to(),
            Failure::Parallel { failures, .. } => {
                failures.iter().flat_map(|f| f.attributed_to()).collect()
            }
        }
    }

    /// Failed leaves with the composite path leading to each of them.
    pub fn leaves(&self) -> Vec<FailedTaskDetails> {
        let mut out = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut out);
        out
    }

    fn collect_leaves(&self, path: &mut Vec<String>, out: &mut Vec<FailedTaskDetails>) {
        match self {
            Failure::Leaf { task, error } => out.push(FailedTaskDetails {
                task: task.clone(),
                path: path.clone(),
                code: error.code.as_str().to_string(),
                message: error.to_string(),
            }),
            Failure::Series { node, child } => {
                path.push(node.clone());
                child.collect_leaves(path, out);
                path.pop();
            }
            Failure::Parallel { node, failures } => {
                path.push(node.clone());
                for failure in failures {
                    failure.collect_leaves(path, out);
                }
                path.pop();
            }
        }
    }

    pub fn to_error(&self) -> Error {
        match self {
            Failure::Leaf { task, error } => Error::task_failed(task.clone(), error),
            _ => Error::composition_failed(self.node(), self.leaves()),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Leaf { task, error } => write!(f, "{}: {}", task, error),
            _ => {
                let leaves = self.leaves();
                write!(f, "{} failed", self.node())?;
                for leaf in leaves {
                    write!(f, "\n  {}: {}", leaf.task, leaf.message)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn nested() -> Failure {
        Failure::Series {
            node: "test".to_string(),
            child: Box::new(Failure::Parallel {
                node: "<parallel>".to_string(),
                failures: vec![
                    Failure::leaf("gen-scala", Error::other("scala")),
                    Failure::leaf("test-typescript", Error::other("mocha")),
                ],
            }),
        }
    }

    #[test]
    fn attribution_walks_to_leaves() {
        assert_eq!(nested().attributed_to(), vec!["gen-scala", "test-typescript"]);
    }

    #[test]
    fn leaves_carry_composite_path() {
        let leaves = nested().leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].path, vec!["test", "<parallel>"]);
        assert_eq!(leaves[1].code, "internal.unexpected");
    }

    #[test]
    fn leaf_failure_converts_to_task_error() {
        let err = Failure::leaf("clean", Error::internal_io("busy", None)).to_error();
        assert_eq!(err.code, ErrorCode::TaskFailed);
    }

    #[test]
    fn composite_failure_converts_to_composition_error() {
        let err = Outcome::Failure(nested()).into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::CompositionFailed);
        assert_eq!(err.details["failed"].as_array().map(Vec::len), Some(2));
        assert!(err.message.contains("gen-scala, test-typescript"));
    }
}
