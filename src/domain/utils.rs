//! Shared formatting helpers for tool output

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Largest integer a double represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Renders a double the way JSON clients expect: integral values as integers
/// (`5`, not `5.0`), everything else with shortest round-trip digits.
/// Non-finite values have no JSON form and become `null`.
///
/// Integral values beyond 2^53 stay doubles; `rpc::encode_json` writes them
/// as plain digits.
pub fn js_number(value: f64) -> Value {
    if !value.is_finite() {
        return Value::Null;
    }

    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        return Value::from(value as i64);
    }

    Value::from(value)
}

pub fn serialize_js_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    js_number(*value).serialize(serializer)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::js_number;
    use crate::mcp::rpc::encode_json_string;

    #[test]
    fn integral_doubles_render_as_integers() {
        assert_eq!(js_number(5.0).to_string(), "5");
        assert_eq!(js_number(-12.0).to_string(), "-12");
        assert_eq!(js_number(-0.0).to_string(), "0");
    }

    #[test]
    fn fractional_doubles_keep_shortest_digits() {
        assert_eq!(js_number(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(js_number(2.5), json!(2.5));
    }

    #[test]
    fn non_finite_values_become_null() {
        assert_eq!(js_number(f64::INFINITY), Value::Null);
        assert_eq!(js_number(f64::NAN), Value::Null);
    }

    #[test]
    fn large_integral_doubles_encode_as_digits() {
        let encoded = encode_json_string(&js_number(1e20)).expect("finite number encodes");

        assert_eq!(encoded, "100000000000000000000");
    }
}
