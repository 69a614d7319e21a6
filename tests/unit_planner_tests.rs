//! # Planner Unit Tests / 执行计划单元测试
//!
//! Tests for splitting a matrix across CI runners.
//!
//! 将矩阵拆分到多个 CI 运行器的测试。

mod common;

use browser_matrix::core::error::MatrixError;
use browser_matrix::core::planner::plan_execution;
use common::matrix;
use std::collections::HashSet;

const FIVE: &[&str] = &["P/a", "P/b", "P/c", "P/d", "P/e"];

#[test]
fn test_single_runner_keeps_everything() {
    let plan = plan_execution(matrix("m", FIVE), None, None).unwrap();
    assert!(!plan.is_distributed);
    assert_eq!(plan.total_environments, 5);
    assert_eq!(plan.matrix_to_run.unwrap().len(), 5);
}

#[test]
fn test_shards_partition_the_matrix() {
    let mut seen = HashSet::new();
    let mut total = 0;
    for index in 0..2 {
        let plan = plan_execution(matrix("m", FIVE), Some(2), Some(index)).unwrap();
        assert!(plan.is_distributed);
        let shard = plan.matrix_to_run.unwrap();
        total += shard.len();
        for environment in shard.environments() {
            assert!(seen.insert(environment.to_string()), "{environment} assigned twice");
        }
    }
    assert_eq!(total, 5);
    assert_eq!(seen.len(), 5);
}

#[test]
fn test_shard_keeps_declaration_order() {
    let plan = plan_execution(matrix("m", FIVE), Some(2), Some(0)).unwrap();
    let names: Vec<String> = plan
        .matrix_to_run
        .unwrap()
        .environments()
        .iter()
        .map(|e| e.to_string())
        .collect();
    assert_eq!(names, vec!["P/a", "P/c", "P/e"]);
}

#[test]
fn test_empty_shard_is_none() {
    let plan = plan_execution(matrix("m", &["P/a"]), Some(3), Some(2)).unwrap();
    assert!(plan.matrix_to_run.is_none());
    assert_eq!(plan.total_environments, 1);
}

#[test]
fn test_invalid_shards_are_rejected() {
    for (total, index) in [(Some(0), Some(0)), (Some(2), Some(2)), (Some(2), None), (None, Some(0))] {
        assert!(matches!(
            plan_execution(matrix("m", FIVE), total, index),
            Err(MatrixError::InvalidShard(_))
        ));
    }
}
