//! Linear and logistic regression

use crate::error::{FeatForgeError, Result};
use crate::model::Model;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Solve the symmetric system `a x = b` by Gaussian elimination with
/// partial pivoting. A small ridge term keeps near-singular normal
/// equations solvable.
fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    let mut m = a.clone();
    let mut rhs = b.clone();

    let ridge = 1e-10
        * (0..n).map(|i| m[[i, i]].abs()).sum::<f64>().max(1.0)
        / n as f64;
    for i in 0..n {
        m[[i, i]] += ridge;
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| {
                m[[i, col]]
                    .abs()
                    .partial_cmp(&m[[j, col]].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap();
        if m[[pivot_row, col]].abs() < 1e-14 {
            return Err(FeatForgeError::DataError(
                "singular design matrix".to_string(),
            ));
        }
        if pivot_row != col {
            for k in 0..n {
                m.swap([col, k], [pivot_row, k]);
            }
            rhs.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = m[[row, col]] / m[[col, col]];
            for k in col..n {
                m[[row, k]] -= factor * m[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let mut sum = rhs[row];
        for k in (row + 1)..n {
            sum -= m[[row, k]] * x[k];
        }
        x[row] = sum / m[[row, row]];
    }
    Ok(x)
}

/// Ordinary least squares via the normal equations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }
}

impl Model for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        let p = x.ncols();
        if n != y.len() {
            return Err(FeatForgeError::ShapeError {
                expected: format!("{n} targets"),
                actual: format!("{} targets", y.len()),
            });
        }
        if n == 0 {
            return Err(FeatForgeError::DataError(
                "cannot fit on an empty matrix".to_string(),
            ));
        }

        // Augment with an intercept column, then solve X'X w = X'y
        let d = p + 1;
        let mut xtx = Array2::zeros((d, d));
        let mut xty = Array1::zeros(d);

        for row in 0..n {
            for i in 0..d {
                let xi = if i < p { x[[row, i]] } else { 1.0 };
                xty[i] += xi * y[row];
                for j in 0..d {
                    let xj = if j < p { x[[row, j]] } else { 1.0 };
                    xtx[[i, j]] += xi * xj;
                }
            }
        }

        let w = solve_linear_system(&xtx, &xty)?;
        self.intercept = w[p];
        self.coefficients = Some(w.slice(ndarray::s![..p]).to_owned());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coef = self
            .coefficients
            .as_ref()
            .ok_or(FeatForgeError::NotFitted)?;
        Ok(x.dot(coef) + self.intercept)
    }

    fn clone_unfitted(&self) -> Box<dyn Model> {
        Box::new(Self::new())
    }
}

/// Binary logistic regression fitted by gradient descent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    learning_rate: f64,
    max_iter: usize,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 500,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }

    /// Class probabilities for the positive class.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coef = self
            .coefficients
            .as_ref()
            .ok_or(FeatForgeError::NotFitted)?;
        let z = x.dot(coef) + self.intercept;
        Ok(z.mapv(Self::sigmoid))
    }
}

impl Model for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        let p = x.ncols();
        if n != y.len() {
            return Err(FeatForgeError::ShapeError {
                expected: format!("{n} targets"),
                actual: format!("{} targets", y.len()),
            });
        }
        if n == 0 {
            return Err(FeatForgeError::DataError(
                "cannot fit on an empty matrix".to_string(),
            ));
        }

        let mut coef = Array1::<f64>::zeros(p);
        let mut intercept = 0.0f64;
        let n_f = n as f64;

        for _ in 0..self.max_iter {
            let z = x.dot(&coef) + intercept;
            let probs = z.mapv(Self::sigmoid);
            let residual = &probs - y;

            let grad_coef = x.t().dot(&residual) / n_f;
            let grad_intercept = residual.sum() / n_f;

            coef = coef - self.learning_rate * &grad_coef;
            intercept -= self.learning_rate * grad_intercept;
        }

        self.coefficients = Some(coef);
        self.intercept = intercept;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|prob| if prob > 0.5 { 1.0 } else { 0.0 }))
    }

    fn clone_unfitted(&self) -> Box<dyn Model> {
        Box::new(Self {
            learning_rate: self.learning_rate,
            max_iter: self.max_iter,
            coefficients: None,
            intercept: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_linear_regression_recovers_slope() {
        let x = Array2::from_shape_vec((5, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let y = array![3.0, 5.0, 7.0, 9.0, 11.0]; // y = 2x + 1

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-6);
        assert!((model.intercept - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_logistic_separates_classes() {
        let x = Array2::from_shape_vec(
            (8, 1),
            vec![-4.0, -3.0, -2.0, -1.0, 1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new().with_max_iter(2000);
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();

        assert_eq!(preds, y);
    }
}
