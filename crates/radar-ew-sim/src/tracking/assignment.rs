//! Optimal track/detection assignment.
//!
//! The association stage builds a cost matrix of gated Euclidean distances
//! (infeasible pairs carry `f64::INFINITY`) and needs the minimum-cost
//! one-to-one matching. This is the Hungarian algorithm in its
//! potentials/shortest-augmenting-path form, O(n²·m) for an n×m matrix.
//!
//! Infeasible pairs are never part of the returned matching: internally they
//! are priced at a sentinel far above any feasible total, so the solver first
//! maximizes the number of feasible pairs, then minimizes their summed cost,
//! and sentinel-priced assignments are stripped from the result.

/// Sentinel standing in for an infeasible (infinite-cost) pair.
const BIG: f64 = 1e15;

/// Minimum-cost one-to-one assignment of rows to columns.
///
/// Returns, for each row, `Some(column)` or `None` when the row has no
/// feasible partner in the optimal matching. Every column appears at most
/// once.
pub fn min_cost_assignment(costs: &[Vec<f64>]) -> Vec<Option<usize>> {
    let n_rows = costs.len();
    let n_cols = costs.first().map_or(0, Vec::len);
    if n_rows == 0 || n_cols == 0 {
        return vec![None; n_rows];
    }

    if n_rows <= n_cols {
        solve(costs, n_rows, n_cols)
    } else {
        // The solver needs rows <= cols; transpose and invert the result.
        let transposed: Vec<Vec<f64>> = (0..n_cols)
            .map(|c| (0..n_rows).map(|r| costs[r][c]).collect())
            .collect();
        let col_to_row = solve(&transposed, n_cols, n_rows);
        let mut assignment = vec![None; n_rows];
        for (col, row) in col_to_row.iter().enumerate() {
            if let Some(r) = row {
                assignment[*r] = Some(col);
            }
        }
        assignment
    }
}

fn price(cost: f64) -> f64 {
    if cost.is_finite() {
        cost
    } else {
        BIG
    }
}

/// Shortest-augmenting-path Hungarian solver; requires `n <= m`.
///
/// Internally 1-indexed with a virtual column 0, following the classic
/// potentials formulation: `u`/`v` are the row/column potentials, `p[j]` is
/// the row currently matched to column `j`, and `way[j]` remembers the
/// alternating path for augmentation.
fn solve(costs: &[Vec<f64>], n: usize, m: usize) -> Vec<Option<usize>> {
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    let mut p = vec![0usize; m + 1];

    for i in 1..=n {
        let mut way = vec![0usize; m + 1];
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];
        p[0] = i;
        let mut j0 = 0usize;

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = price(costs[i0 - 1][j - 1]) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Augment along the recorded alternating path.
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![None; n];
    for j in 1..=m {
        let row = p[j];
        if row > 0 && costs[row - 1][j - 1].is_finite() {
            assignment[row - 1] = Some(j - 1);
        }
    }
    assignment
}

/// Total cost of an assignment over the original matrix.
#[cfg(test)]
fn total_cost(costs: &[Vec<f64>], assignment: &[Option<usize>]) -> f64 {
    assignment
        .iter()
        .enumerate()
        .filter_map(|(r, c)| c.map(|c| costs[r][c]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_one_to_one(assignment: &[Option<usize>]) {
        let mut seen = std::collections::HashSet::new();
        for col in assignment.iter().flatten() {
            assert!(seen.insert(*col), "column {col} assigned twice");
        }
    }

    #[test]
    fn empty_inputs() {
        assert!(min_cost_assignment(&[]).is_empty());
        let rows: Vec<Vec<f64>> = vec![vec![], vec![]];
        assert_eq!(min_cost_assignment(&rows), vec![None, None]);
    }

    #[test]
    fn beats_greedy_on_the_classic_counterexample() {
        // Greedy grabs (0,0)=1 then is forced into (1,1)=1000; the optimum
        // is the anti-diagonal with total 4.
        let costs = vec![vec![1.0, 2.0], vec![2.0, 1000.0]];
        let assignment = min_cost_assignment(&costs);
        assert_eq!(assignment, vec![Some(1), Some(0)]);
        assert!((total_cost(&costs, &assignment) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn diagonal_is_optimal_when_cheapest() {
        let costs = vec![
            vec![1.0, 50.0, 50.0],
            vec![50.0, 1.0, 50.0],
            vec![50.0, 50.0, 1.0],
        ];
        let assignment = min_cost_assignment(&costs);
        assert_eq!(assignment, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn infeasible_pairs_are_never_assigned() {
        let inf = f64::INFINITY;
        let costs = vec![vec![inf, 3.0], vec![inf, inf]];
        let assignment = min_cost_assignment(&costs);
        assert_eq!(assignment, vec![Some(1), None]);
        assert_one_to_one(&assignment);
    }

    #[test]
    fn feasible_cardinality_is_preferred_over_cheap_blocking() {
        // Row 0 could take column 0 cheaply, but that starves row 1; the
        // optimal feasible matching pairs both rows.
        let inf = f64::INFINITY;
        let costs = vec![vec![1.0, 10.0], vec![2.0, inf]];
        let assignment = min_cost_assignment(&costs);
        assert_eq!(assignment, vec![Some(1), Some(0)]);
    }

    #[test]
    fn rectangular_more_columns() {
        let costs = vec![vec![9.0, 1.0, 5.0], vec![4.0, 8.0, 2.0]];
        let assignment = min_cost_assignment(&costs);
        assert_eq!(assignment, vec![Some(1), Some(2)]);
        assert_one_to_one(&assignment);
    }

    #[test]
    fn rectangular_more_rows_leaves_someone_out() {
        let costs = vec![vec![5.0], vec![1.0], vec![3.0]];
        let assignment = min_cost_assignment(&costs);
        assert_eq!(assignment, vec![None, Some(0), None]);
    }

    #[test]
    fn optimality_on_a_known_4x4() {
        let costs = vec![
            vec![82.0, 83.0, 69.0, 92.0],
            vec![77.0, 37.0, 49.0, 92.0],
            vec![11.0, 69.0, 5.0, 86.0],
            vec![8.0, 9.0, 98.0, 23.0],
        ];
        let assignment = min_cost_assignment(&costs);
        assert_one_to_one(&assignment);
        // Known optimum for this matrix is 140: (0,2), (1,1), (2,0), (3,3).
        assert!((total_cost(&costs, &assignment) - 140.0).abs() < 1e-9);
    }
}
