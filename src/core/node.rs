//! Composition tree.
//!
//! Trees are built once when pipelines are defined and never mutated.
//! Children are owned by value.

use crate::error::Result;
use crate::task::{self, Task, TaskContext};

pub enum Node {
    Leaf(Box<dyn Task>),
    Series {
        name: Option<String>,
        children: Vec<Node>,
    },
    Parallel {
        name: Option<String>,
        children: Vec<Node>,
    },
    /// Runs `child` with a scratch directory that is removed afterwards,
    /// whatever the outcome.
    Scoped {
        name: Option<String>,
        prefix: String,
        child: Box<Node>,
    },
}

pub fn leaf(task: impl Task + 'static) -> Node {
    Node::Leaf(Box::new(task))
}

pub fn series(children: Vec<Node>) -> Node {
    Node::Series {
        name: None,
        children,
    }
}

pub fn parallel(children: Vec<Node>) -> Node {
    Node::Parallel {
        name: None,
        children,
    }
}

pub fn scoped(prefix: impl Into<String>, child: Node) -> Node {
    Node::Scoped {
        name: None,
        prefix: prefix.into(),
        child: Box::new(child),
    }
}

impl Node {
    /// Shorthand for a leaf built from a `Result`-returning closure.
    pub fn from_fn<F>(name: impl Into<String>, body: F) -> Node
    where
        F: Fn(&TaskContext) -> Result<()> + Send + Sync + 'static,
    {
        leaf(task::from_fn(name, body))
    }

    /// Name a composite node. Leaves keep their task name.
    pub fn named(self, label: impl Into<String>) -> Node {
        let label = Some(label.into());
        match self {
            Node::Leaf(task) => Node::Leaf(task),
            Node::Series { children, .. } => Node::Series {
                name: label,
                children,
            },
            Node::Parallel { children, .. } => Node::Parallel {
                name: label,
                children,
            },
            Node::Scoped { prefix, child, .. } => Node::Scoped {
                name: label,
                prefix,
                child,
            },
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Leaf(task) => Some(task.name()),
            Node::Series { name, .. } | Node::Parallel { name, .. } | Node::Scoped { name, .. } => {
                name.as_deref()
            }
        }
    }

    /// Display label; anonymous composites are labelled by kind.
    pub fn label(&self) -> String {
        if let Some(name) = self.name() {
            return name.to_string();
        }
        match self {
            Node::Leaf(_) => "<task>".to_string(),
            Node::Series { .. } => "<series>".to_string(),
            Node::Parallel { .. } => "<parallel>".to_string(),
            Node::Scoped { prefix, .. } => format!("<scratch:{}>", prefix),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Series { children, .. } | Node::Parallel { children, .. } => {
                children.iter().map(Node::leaf_count).sum()
            }
            Node::Scoped { child, .. } => child.leaf_count(),
        }
    }

    /// Leaf task names in definition order.
    pub fn task_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_task_names(&mut names);
        names
    }

    fn collect_task_names(&self, out: &mut Vec<String>) {
        match self {
            Node::Leaf(task) => out.push(task.name().to_string()),
            Node::Series { children, .. } | Node::Parallel { children, .. } => {
                for child in children {
                    child.collect_task_names(out);
                }
            }
            Node::Scoped { child, .. } => child.collect_task_names(out),
        }
    }

    /// Indented tree rendering, one node per line.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        self.render_into(0, &mut lines);
        lines.join("\n")
    }

    fn render_into(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        match self {
            Node::Leaf(task) => lines.push(format!("{}- {}", indent, task.name())),
            Node::Series { name, children } => {
                lines.push(format!("{}{}", indent, heading("series", name.as_deref())));
                for child in children {
                    child.render_into(depth + 1, lines);
                }
            }
            Node::Parallel { name, children } => {
                lines.push(format!("{}{}", indent, heading("parallel", name.as_deref())));
                for child in children {
                    child.render_into(depth + 1, lines);
                }
            }
            Node::Scoped {
                name,
                prefix,
                child,
            } => {
                let kind = format!("scratch[{}]", prefix);
                lines.push(format!("{}{}", indent, heading(&kind, name.as_deref())));
                child.render_into(depth + 1, lines);
            }
        }
    }
}

fn heading(kind: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{} ({})", kind, name),
        None => kind.to_string(),
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
