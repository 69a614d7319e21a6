//! # Execution Planner Module / 执行计划模块
//!
//! Restricts a resolved matrix to the share one CI runner executes when a run
//! is split across several runners.
//!
//! 当一次运行被拆分到多个运行器上时，将解析后的矩阵限制为单个 CI 运行器执行的部分。

use crate::core::error::MatrixError;
use crate::core::models::Matrix;

/// Represents a complete execution plan for a resolved matrix.
/// 表示已解析矩阵的完整执行计划。
#[derive(Debug)]
pub struct ExecutionPlan {
    /// The matrix this runner executes. `None` when its shard is empty.
    /// 此运行器执行的矩阵。当其分片为空时为 `None`。
    pub matrix_to_run: Option<Matrix>,
    /// Number of environments in the resolved matrix before sharding.
    /// 分片前已解析矩阵中的环境数量。
    pub total_environments: usize,
    /// Whether the matrix is distributed across multiple runners (CI environment).
    /// 矩阵是否分布在多个运行器上（CI 环境）。
    pub is_distributed: bool,
}

/// Creates an execution plan for `matrix`.
///
/// With both `total_runners` and `runner_index`, the runner keeps every
/// environment whose position `i` satisfies `i % total_runners == runner_index`,
/// in declaration order.
///
/// 为 `matrix` 创建执行计划。
///
/// 同时提供 `total_runners` 和 `runner_index` 时，运行器按声明顺序保留所有
/// 满足 `i % total_runners == runner_index` 的环境。
pub fn plan_execution(
    matrix: Matrix,
    total_runners: Option<usize>,
    runner_index: Option<usize>,
) -> Result<ExecutionPlan, MatrixError> {
    let total_environments = matrix.len();

    match (total_runners, runner_index) {
        (Some(total), Some(index)) => {
            if total == 0 {
                return Err(MatrixError::InvalidShard(
                    "total runners must be at least 1".to_string(),
                ));
            }
            if index >= total {
                return Err(MatrixError::InvalidShard(format!(
                    "runner index {index} must be less than total runners {total}"
                )));
            }
            Ok(ExecutionPlan {
                matrix_to_run: matrix.subset(|i, _| i % total == index),
                total_environments,
                is_distributed: true,
            })
        }
        (None, None) => Ok(ExecutionPlan {
            matrix_to_run: Some(matrix),
            total_environments,
            is_distributed: false,
        }),
        _ => Err(MatrixError::InvalidShard(
            "both --total-runners and --runner-index must be provided".to_string(),
        )),
    }
}
