//! Prefix scan helpers for composite index keys.

/// Exclusive upper bound for keys starting with `prefix`.
///
/// `"task-7:"` becomes `"task-7;"`, so `range(prefix..bound)` covers exactly
/// the keys sharing the prefix.
pub fn prefix_end_bound(prefix: &str) -> String {
    if prefix.is_empty() {
        return String::new();
    }

    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = last.saturating_add(1);
    }

    String::from_utf8(bytes).unwrap_or_else(|_| format!("{}\x7F", prefix))
}

/// Index key prefix for all entries owned by `task_id`.
pub fn task_prefix(task_id: &str) -> String {
    format!("{}:", task_id)
}

/// Lexically sortable encoding of a signed plan order.
pub fn order_key(order: i32) -> String {
    format!("{:010}", i64::from(order) - i64::from(i32::MIN))
}

/// Lexically sortable encoding of a millisecond timestamp.
pub fn timestamp_key(millis: i64) -> String {
    format!("{:020}", millis.max(0))
}
