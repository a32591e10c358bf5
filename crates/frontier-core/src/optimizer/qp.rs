//! Dense convex quadratic programs solved with Clarabel.
//!
//! minimize    ½ x'Px + q'x
//! subject to  A_eq x  = b_eq
//!             A_in x <= b_in

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};

use crate::error::FrontierError;
use crate::FrontierResult;

/// Coarse outcome of a solve.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QpStatus {
    Solved,
    AlmostSolved,
    Infeasible,
    /// Iteration limit, numerical trouble, etc. The iterate may still be usable.
    Stalled(String),
}

impl From<SolverStatus> for QpStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => QpStatus::Solved,
            SolverStatus::AlmostSolved => QpStatus::AlmostSolved,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                QpStatus::Infeasible
            }
            other => QpStatus::Stalled(format!("{:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct QpSolution {
    pub status: QpStatus,
    pub x: Vec<f64>,
    pub iterations: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct QuadraticProgram {
    n: usize,
    p: Vec<Vec<f64>>,
    q: Vec<f64>,
    eq: Vec<(Vec<f64>, f64)>,
    ineq: Vec<(Vec<f64>, f64)>,
}

impl QuadraticProgram {
    /// Objective ½ x'Px + q'x; only the upper triangle of `p` is read.
    pub fn new(p: Vec<Vec<f64>>, q: Vec<f64>) -> Self {
        let n = q.len();
        QuadraticProgram {
            n,
            p,
            q,
            eq: Vec::new(),
            ineq: Vec::new(),
        }
    }

    pub fn equality(mut self, row: Vec<f64>, rhs: f64) -> Self {
        self.eq.push((row, rhs));
        self
    }

    /// row · x <= rhs
    pub fn inequality(mut self, row: Vec<f64>, rhs: f64) -> Self {
        self.ineq.push((row, rhs));
        self
    }

    /// lower <= x_i <= upper for every coordinate in `range`.
    pub fn bounds(mut self, range: std::ops::Range<usize>, lower: &[f64], upper: &[f64]) -> Self {
        for (k, i) in range.enumerate() {
            let mut lo = vec![0.0; self.n];
            lo[i] = -1.0;
            self.ineq.push((lo, -lower[k]));
            let mut hi = vec![0.0; self.n];
            hi[i] = 1.0;
            self.ineq.push((hi, upper[k]));
        }
        self
    }

    pub fn solve(&self) -> FrontierResult<QpSolution> {
        let p = upper_triangle_csc(&self.p, self.n);
        let rows: Vec<&Vec<f64>> = self
            .eq
            .iter()
            .map(|(r, _)| r)
            .chain(self.ineq.iter().map(|(r, _)| r))
            .collect();
        let a = dense_rows_csc(&rows, self.n);
        let b: Vec<f64> = self
            .eq
            .iter()
            .map(|(_, v)| *v)
            .chain(self.ineq.iter().map(|(_, v)| *v))
            .collect();

        let mut cones = Vec::with_capacity(2);
        if !self.eq.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(self.eq.len()));
        }
        if !self.ineq.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(self.ineq.len()));
        }

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .max_iter(200)
            .build()
            .map_err(|e| solver_setup_error(format!("Failed to build settings: {}", e)))?;

        let mut solver = DefaultSolver::new(&p, &self.q, &a, &b, &cones, settings)
            .map_err(|e| solver_setup_error(format!("Failed to create solver: {:?}", e)))?;
        solver.solve();

        Ok(QpSolution {
            status: solver.solution.status.into(),
            x: solver.solution.x.clone(),
            iterations: solver.info.iterations,
        })
    }
}

fn solver_setup_error(reason: String) -> FrontierError {
    FrontierError::Optimization {
        objective: "quadratic program".into(),
        constraints: "n/a".into(),
        reason,
    }
}

/// Upper triangle of a dense symmetric matrix in CSC form.
fn upper_triangle_csc(m: &[Vec<f64>], n: usize) -> CscMatrix<f64> {
    let mut colptr = Vec::with_capacity(n + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for j in 0..n {
        for i in 0..=j {
            let v = m.get(i).and_then(|row| row.get(j)).copied().unwrap_or(0.0);
            if v != 0.0 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr.push(nzval.len());
    }
    CscMatrix::new(n, n, colptr, rowval, nzval)
}

/// Stack dense rows into a CSC matrix.
fn dense_rows_csc(rows: &[&Vec<f64>], n: usize) -> CscMatrix<f64> {
    let m = rows.len();
    let mut colptr = Vec::with_capacity(n + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);
    for j in 0..n {
        for (i, row) in rows.iter().enumerate() {
            let v = row[j];
            if v != 0.0 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr.push(nzval.len());
    }
    CscMatrix::new(m, n, colptr, rowval, nzval)
}
