use serde_json::Value;

/// Returns whether `candidate` structurally contains `predicate`.
///
/// Every field of an object predicate must be present on the candidate
/// with a recursively matching value; candidate fields the predicate
/// does not mention are ignored. At non-object predicate positions the
/// two values are compared for plain equality, so arrays must match
/// exactly.
pub fn matches_subset(candidate: &Value, predicate: &Value) -> bool {
    match (candidate, predicate) {
        (Value::Object(candidate), Value::Object(predicate)) => {
            predicate.iter().all(|(field, expected)| {
                match candidate.get(field) {
                    Some(actual) => matches_subset(actual, expected),
                    None => false,
                }
            })
        }
        _ => candidate == predicate,
    }
}
