//! Provides struct for representing an optimization problem's objective

/// Represents the linear objective of an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Terms included in the objective (See [`ObjectiveTerm`])
    terms: Vec<ObjectiveTerm>,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: Vec::new(),
            sense,
        }
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Add a new Linear term to the objective
    pub fn add_linear_term(&mut self, variable: usize, coefficient: f64) {
        self.terms.push(ObjectiveTerm {
            variable,
            coefficient,
        });
    }

    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Remove all terms from the objective
    pub fn remove_all_terms(&mut self) {
        self.terms.clear();
    }

    /// Dense coefficient vector of the objective over `num_variables` columns
    pub fn coefficients(&self, num_variables: usize) -> Vec<f64> {
        let mut c = vec![0.; num_variables];
        for term in &self.terms {
            c[term.variable] += term.coefficient;
        }
        c
    }

    /// Value of the objective at a point
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|t| t.coefficient * x[t.variable])
            .sum()
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

/// A linear term of the objective
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveTerm {
    /// Column of the variable in the term
    pub variable: usize,
    pub coefficient: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_accumulate() {
        let mut objective = Objective::new(ObjectiveSense::Maximize);
        objective.add_linear_term(2, 1.5);
        objective.add_linear_term(0, -1.);
        objective.add_linear_term(2, 0.5);
        assert_eq!(objective.coefficients(3), vec![-1., 0., 2.]);
        assert!((objective.evaluate(&[1., 7., 2.]) - 3.).abs() < 1e-12);
        objective.remove_all_terms();
        assert!(objective.terms().is_empty());
    }
}
