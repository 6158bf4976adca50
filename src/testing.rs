/// Float equality up to rounding.
pub(crate) fn close(a: f64, b: f64) -> bool {
    a - b < 1e-6 && b - a < 1e-6
}
