pub const BETA1: f64 = 0.9;
pub const BETA2: f64 = 0.999;
pub const EPSILON: f64 = 1.0e-8;

/// Adam state for one flat parameter buffer.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    steps: u32,
}

impl Adam {
    pub fn new(learning_rate: f64, len: usize) -> Self {
        Self {
            learning_rate,
            m: vec![0.0; len],
            v: vec![0.0; len],
            steps: 0,
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// One bias-corrected update, in place. `params` and `grads` must match the
    /// length the state was created with.
    pub fn step(&mut self, params: &mut [f64], grads: &[f64]) {
        debug_assert_eq!(params.len(), self.m.len());
        debug_assert_eq!(grads.len(), self.m.len());
        self.steps += 1;
        let correction1 = 1.0 - BETA1.powi(self.steps as i32);
        let correction2 = 1.0 - BETA2.powi(self.steps as i32);

        for (((param, grad), m), v) in params
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = BETA1 * *m + (1.0 - BETA1) * grad;
            *v = BETA2 * *v + (1.0 - BETA2) * grad * grad;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *param -= self.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Adam;

    #[test]
    fn first_step_moves_by_learning_rate_against_gradient_sign() {
        let mut adam = Adam::new(1.0e-3, 3);
        let mut params = vec![1.0, 1.0, 1.0];
        adam.step(&mut params, &[250.0, -0.004, 0.0]);
        assert!((params[0] - (1.0 - 1.0e-3)).abs() < 1.0e-9);
        assert!((params[1] - (1.0 + 1.0e-3)).abs() < 1.0e-8);
        assert_eq!(params[2], 1.0);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn constant_gradient_keeps_constant_step() {
        let mut adam = Adam::new(0.01, 1);
        let mut params = vec![0.0];
        for _ in 0..5 {
            adam.step(&mut params, &[2.0]);
        }
        assert!((params[0] + 0.05).abs() < 1.0e-8);
    }
}
