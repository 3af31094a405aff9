use crate::errors::CartError;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

pub fn fmt_vec_output(v: &[f64]) -> String {
    let mut res = String::new();
    if let Some(last) = v.len().checked_sub(1) {
        if last == 0 {
            return format!("{:.4}", v[0]);
        }
        for n in &v[..last] {
            res.push_str(format!("{:.4}", n).as_str());
            res.push_str(", ");
        }
        res.push_str(format!("{:.4}", &v[last]).as_str());
    }
    res
}

// Validation
pub fn validate_positive_float_parameter(value: f64, parameter: &str) -> Result<(), CartError> {
    validate_float_parameter(value, 0.0, f64::INFINITY, parameter)
}

pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), CartError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within rang {} and {}", min, max);
        Err(CartError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_count_parameter(value: usize, min: usize, parameter: &str) -> Result<(), CartError> {
    if value < min {
        Err(CartError::InvalidParameter(
            parameter.to_string(),
            format!("integer of at least {}", min),
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Sum that tolerates summands of wildly different magnitude,
/// used for observation masses accumulated over many examples.
#[inline]
pub fn kahan_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.0;
    let mut c = 0.0;
    for v in values {
        let y = v - c;
        let t = sum + y;
        c = (t - sum) - y;
        sum = t;
    }
    sum
}

/// Binary entropy contribution `-p * log2(p)`, zero for empty cells.
#[inline]
pub fn entropy_term(count: f64, total: f64) -> f64 {
    if count <= 0.0 || total <= 0.0 {
        return 0.0;
    }
    let p = count / total;
    -p * p.log2()
}

#[inline]
pub fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round() {
        assert_eq!(0.3, precision_round(0.3333, 1));
        assert_eq!(0.2343, precision_round(0.2343123123123, 4));
    }

    #[test]
    fn test_validate_float_parameter() {
        assert!(validate_positive_float_parameter(0.0, "min_obs").is_ok());
        assert!(validate_positive_float_parameter(3.5, "min_obs").is_ok());
        assert!(validate_positive_float_parameter(-1.0, "min_obs").is_err());
        assert!(validate_positive_float_parameter(f64::NAN, "min_obs").is_err());
        assert!(validate_float_parameter(2.0, 0.0, 1.0, "p").is_err());
    }

    #[test]
    fn test_validate_count_parameter() {
        assert!(validate_count_parameter(1, 1, "randomize").is_ok());
        match validate_count_parameter(0, 1, "randomize") {
            Err(CartError::InvalidParameter(name, _, passed)) => {
                assert_eq!(name, "randomize");
                assert_eq!(passed, "0");
            }
            _ => panic!("expected an invalid parameter error"),
        }
    }

    #[test]
    fn test_kahan_sum() {
        assert_eq!(kahan_sum(vec![1.0, 2.0, 3.5]), 6.5);
        assert_eq!(precision_round(kahan_sum(vec![0.1; 10]), 12), 1.0);
        assert_eq!(kahan_sum(Vec::new()), 0.0);
    }

    #[test]
    fn test_entropy_term() {
        assert_eq!(entropy_term(0.0, 4.0), 0.0);
        assert_eq!(entropy_term(4.0, 4.0), 0.0);
        assert_eq!(precision_round(entropy_term(2.0, 4.0), 6), 0.5);
    }

    #[test]
    fn test_fmt_vec_output() {
        assert_eq!(fmt_vec_output(&[]), "");
        assert_eq!(fmt_vec_output(&[1.0]), "1.0000");
        assert_eq!(fmt_vec_output(&[1.0, 0.5]), "1.0000, 0.5000");
    }
}
