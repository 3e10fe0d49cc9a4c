use super::parser::Node;
use crate::config::OperationTimes;
use crate::store::types::{Operand, Operation};

/// A task in planner-local id space.
///
/// Local ids are the 1-based ordinal of the task in emission order.
/// `TaskRef` operands and `dependencies` name local ids until the store
/// translates the whole batch into global id space.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTask {
    pub local_id: u64,
    pub arg1: Operand,
    pub arg2: Operand,
    pub operation: Operation,
    pub operation_time_ms: u64,
    pub dependencies: Vec<u64>,
}

/// Lowers an expression tree into an ordered task list.
///
/// Post-order traversal: both children of a node are emitted before the
/// node itself, so every `res:` reference points backwards and the root
/// lands last. The expression's final value is the last task's result.
pub fn lower(root: &Node, op_times: &OperationTimes) -> Vec<PlannedTask> {
    let mut tasks = Vec::new();
    emit(root, op_times, &mut tasks);
    tasks
}

fn emit(node: &Node, op_times: &OperationTimes, tasks: &mut Vec<PlannedTask>) -> Operand {
    match node {
        Node::Number(value) => Operand::Literal(*value),
        Node::BinaryOp {
            operation,
            left,
            right,
        } => {
            let arg1 = emit(left, op_times, tasks);
            let arg2 = emit(right, op_times, tasks);

            let mut dependencies = Vec::new();
            if let Operand::TaskRef(id) = arg1 {
                dependencies.push(id);
            }
            if let Operand::TaskRef(id) = arg2 {
                dependencies.push(id);
            }

            let local_id = tasks.len() as u64 + 1;
            tasks.push(PlannedTask {
                local_id,
                arg1,
                arg2,
                operation: *operation,
                operation_time_ms: op_times.for_operation(*operation),
                dependencies,
            });

            Operand::TaskRef(local_id)
        }
    }
}
