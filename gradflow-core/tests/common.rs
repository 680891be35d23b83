use gradflow_core::{Backend, Element, Variable};
use gradflow_core::num_traits::ToPrimitive;

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Helper to create a host variable for testing.
#[allow(dead_code)]
pub fn create_test_variable<T: Element, const R: usize>(data: Vec<T>, shape: [usize; R], requires_grad: bool) -> Variable<T, R> {
    Variable::from_vec(data, shape, requires_grad).expect("Test variable creation failed")
}

#[allow(dead_code)]
pub fn grad_f64<T: Element, const R: usize, B: Backend>(v: &Variable<T, R, B>) -> Vec<f64> {
    v.grad_to_vec()
        .expect("Reading the gradient failed")
        .into_iter()
        .map(|g| g.to_f64().expect("gradient not representable as f64"))
        .collect()
}
