//! # Tree Walker
//!
//! Depth-first traversal of an [`OperationTree`] driving an
//! [`OpTreeVisitor`].
//!
//! ## Visiting order
//!
//! Leaves are reported when reached and operations after all of their
//! children. Binary operations walk the right child before the left one
//! and batch operations walk their list from last to first. A consumer
//! that pushes one result per leaf or operation onto a LIFO stack therefore
//! pops an operation's operands left to right, first to last.
//!
//! The walk uses an explicit stack, so tree depth is bounded by memory
//! rather than the call stack.

use crate::error::{ProtocolError, ProtocolResult};
use crate::tree::{FinalQuery, Job, Operation, OperationTree, Primitive};

/// Callbacks invoked by [`iterate_op_tree`]. Every callback defaults to a
/// no-op so visitors only implement the node kinds they care about.
pub trait OpTreeVisitor<M> {
    type Error;

    fn mesh(&mut self, _mesh: &M) -> Result<(), Self::Error> {
        Ok(())
    }

    fn primitive(&mut self, _primitive: &Primitive) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called after every child of `operation` was visited.
    fn operation(&mut self, _operation: &Operation<M>) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once, after the queried tree was visited.
    fn final_operation(&mut self, _query: FinalQuery) -> Result<(), Self::Error> {
        Ok(())
    }
}

enum Step<'a, M> {
    Enter(&'a OperationTree<M>),
    Exit(&'a Operation<M>),
}

/// Walks `tree`, stopping at the first callback error.
pub fn iterate_op_tree<M, V>(tree: &OperationTree<M>, visitor: &mut V) -> Result<(), V::Error>
where
    V: OpTreeVisitor<M> + ?Sized,
{
    let mut stack = vec![Step::Enter(tree)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(OperationTree::Mesh(mesh)) => visitor.mesh(mesh)?,
            Step::Enter(OperationTree::Primitive(primitive)) => visitor.primitive(primitive)?,
            Step::Enter(OperationTree::Operation(operation)) => {
                stack.push(Step::Exit(operation));
                match operation {
                    Operation::Boolean { left, right, .. } => {
                        stack.push(Step::Enter(left));
                        stack.push(Step::Enter(right));
                    }
                    Operation::BatchBoolean { manifolds, .. } => {
                        stack.extend(manifolds.iter().map(Step::Enter));
                    }
                    Operation::Unary { child, .. } => stack.push(Step::Enter(child)),
                    Operation::Extrude(_) | Operation::Revolve(_) => {}
                }
            }
            Step::Exit(operation) => visitor.operation(operation)?,
        }
    }
    Ok(())
}

/// Walks the tree of `job`, then reports its query if it has one.
pub fn iterate_job<M, V>(job: &Job<M>, visitor: &mut V) -> Result<(), V::Error>
where
    V: OpTreeVisitor<M> + ?Sized,
{
    match job {
        Job::Tree(tree) => iterate_op_tree(tree, visitor),
        Job::Final(final_op) => {
            iterate_op_tree(&final_op.manifold, visitor)?;
            visitor.final_operation(final_op.query)
        }
    }
}

/// Rebuilds a walked tree with converted leaves.
///
/// Each leaf or operation pushes one subtree; an operation pops its
/// operands first to last, mirroring the worker's stack machine.
struct LeafMapper<F, N> {
    convert: F,
    stack: Vec<OperationTree<N>>,
    query: Option<FinalQuery>,
}

impl<F, N> LeafMapper<F, N> {
    fn pop(&mut self, operation: &'static str) -> ProtocolResult<OperationTree<N>> {
        self.stack.pop().ok_or_else(|| {
            ProtocolError::invalid_operation(format!("{operation} is missing an operand"))
        })
    }
}

impl<M, N, E, F> OpTreeVisitor<M> for LeafMapper<F, N>
where
    F: FnMut(&M) -> Result<N, E>,
    E: From<ProtocolError>,
{
    type Error = E;

    fn mesh(&mut self, mesh: &M) -> Result<(), E> {
        let converted = (self.convert)(mesh)?;
        self.stack.push(OperationTree::Mesh(converted));
        Ok(())
    }

    fn primitive(&mut self, primitive: &Primitive) -> Result<(), E> {
        self.stack.push(OperationTree::Primitive(primitive.clone()));
        Ok(())
    }

    fn operation(&mut self, operation: &Operation<M>) -> Result<(), E> {
        let name = operation.name();
        let rebuilt = match operation {
            Operation::Boolean { op, .. } => {
                let left = self.pop(name)?;
                let right = self.pop(name)?;
                OperationTree::boolean(*op, left, right)
            }
            Operation::BatchBoolean { op, manifolds } => {
                let manifolds = (0..manifolds.len())
                    .map(|_| self.pop(name))
                    .collect::<ProtocolResult<Vec<_>>>()?;
                OperationTree::batch(*op, manifolds)
            }
            Operation::Unary { transform, .. } => {
                let child = self.pop(name)?;
                OperationTree::unary(transform.clone(), child)
            }
            Operation::Extrude(extrusion) => {
                OperationTree::Operation(Operation::Extrude(extrusion.clone()))
            }
            Operation::Revolve(revolution) => {
                OperationTree::Operation(Operation::Revolve(revolution.clone()))
            }
        };
        self.stack.push(rebuilt);
        Ok(())
    }

    fn final_operation(&mut self, query: FinalQuery) -> Result<(), E> {
        self.query = Some(query);
        Ok(())
    }
}

impl<M> Job<M> {
    /// Copies the job with every mesh leaf converted by `convert`.
    ///
    /// Leaves are converted in visiting order, through the same walk the
    /// worker evaluates.
    ///
    /// ## Errors
    ///
    /// The first error returned by `convert`.
    pub fn try_map_leaves<N, E>(&self, convert: impl FnMut(&M) -> Result<N, E>) -> Result<Job<N>, E>
    where
        E: From<ProtocolError>,
    {
        let mut mapper = LeafMapper {
            convert,
            stack: Vec::new(),
            query: None,
        };
        iterate_job(self, &mut mapper)?;
        let tree = mapper.pop("job")?;
        if !mapper.stack.is_empty() {
            return Err(ProtocolError::invalid_operation(format!(
                "job left {} extra subtrees",
                mapper.stack.len()
            ))
            .into());
        }
        Ok(match mapper.query {
            Some(query) => tree.query(query),
            None => Job::Tree(tree),
        })
    }
}
