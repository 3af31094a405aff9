/// Index returned for keys or values that are not defined.
pub const UNDEFINED_INDEX: usize = usize::MAX;
/// Symbol printed for keys or values that are not defined.
pub const UNDEFINED_STRING: &str = "<undef>";
/// Order of a node that was never numbered by the trainer.
pub const INVALID_ORDER: u32 = u32::MAX;
/// Negative gains above this value are rounding noise, not a scorer fault.
pub const NEGATIVE_GAIN_TOLERANCE: f64 = -1e-9;
/// Value assumed when a question has no values, i.e. is a predicate.
pub const PREDICATE_VALUE: &str = "true";
