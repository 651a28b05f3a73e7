use super::*;
use serde_json::json;

#[test]
fn heuristic_returns_one_for_empty_input() {
    let tokenizer = HeuristicTokenizer;
    assert_eq!(tokenizer.count_tokens(""), 1);
    assert_eq!(tokenizer.count_tokens("   \n\t  "), 1);
}

#[test]
fn heuristic_never_returns_zero() {
    let tokenizer = HeuristicTokenizer;
    assert!(tokenizer.count_tokens("a") >= 1);
    assert!(tokenizer.count_tokens(".") >= 1);
}

#[test]
fn heuristic_uses_max_of_words_and_chars() {
    let tokenizer = HeuristicTokenizer;

    // "hello world": 2 words, 11 chars -> max(2, 2) + 10
    assert_eq!(tokenizer.count_tokens("hello world"), 12);

    // one long unbroken token: 1 word, 40 chars -> max(1, 10) + 10
    let long_word = "a".repeat(40);
    assert_eq!(tokenizer.count_tokens(&long_word), 20);
}

#[test]
fn heuristic_trims_before_counting() {
    let tokenizer = HeuristicTokenizer;
    assert_eq!(
        tokenizer.count_tokens("  hello world  "),
        tokenizer.count_tokens("hello world")
    );
}

#[test]
fn parses_list_of_lists_shape() {
    let value = json!([[101, 7592, 2088, 102]]);
    assert_eq!(parse_tokenize_response(&value), Some(4));
}

#[test]
fn parses_list_of_objects_shape() {
    let value = json!([{"id": 101}, {"id": 7592}, {"id": 102}]);
    assert_eq!(parse_tokenize_response(&value), Some(3));
}

#[test]
fn parses_input_ids_object_shape() {
    let value = json!({"input_ids": [101, 7592, 2088, 1012, 102]});
    assert_eq!(parse_tokenize_response(&value), Some(5));
}

#[test]
fn rejects_unrecognized_shapes() {
    assert_eq!(parse_tokenize_response(&json!("five")), None);
    assert_eq!(parse_tokenize_response(&json!(5)), None);
    assert_eq!(parse_tokenize_response(&json!([1, 2, 3])), None);
    assert_eq!(parse_tokenize_response(&json!({"tokens": 5})), None);
    assert_eq!(parse_tokenize_response(&json!([])), None);
}
