use runtime::{Engine, Error, Value};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install a subscriber once per test binary. Later calls are no-ops.
pub fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Evaluate on a fresh restricted engine and render the result.
#[allow(dead_code)]
pub fn render(source: &str) -> String {
    eval(source).to_string()
}

#[allow(dead_code)]
pub fn eval(source: &str) -> Value {
    init_tracing();
    Engine::new()
        .eval(source)
        .unwrap_or_else(|e| panic!("{source:?} failed: {}", e.render()))
}

#[allow(dead_code)]
pub fn eval_err(source: &str) -> Error {
    init_tracing();
    match Engine::new().eval(source) {
        Ok(value) => panic!("{source:?} unexpectedly produced {value}"),
        Err(err) => err,
    }
}
