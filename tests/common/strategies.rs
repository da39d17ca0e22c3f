use proptest::prelude::*;

/// Group or label segment: never empty, never contains the name delimiter
pub fn name_segment_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.-]{1,32}"
}

/// Segment guaranteed to contain at least one delimiter
pub fn delimited_segment_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{0,8}", "[a-z]{0,8}").prop_map(|(head, tail)| format!("{head}:{tail}"))
}
