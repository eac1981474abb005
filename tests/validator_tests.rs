// tests/validator_tests.rs

use opgw_expr::catalogue::{ChannelCatalogue, ChannelInfo};
use opgw_expr::validate::{
    FieldError, FunctionForm, REQUIRED_MESSAGE, ValidationError, validate_filter, validate_filters,
    validate_functions, validate_name,
};
use opgw_expr::{FunctionSet, ValueType};

fn channels() -> ChannelCatalogue {
    ChannelCatalogue::new()
        .with("temperature", ChannelInfo::scalar("Temperature"))
        .with("humidity", ChannelInfo::scalar("Humidity"))
        .with("shot_type", ChannelInfo::text("Shot type"))
        .with("trace", ChannelInfo::waveform("Trace"))
        .with("camera", ChannelInfo::image("Camera"))
}

fn forms(pairs: &[(&str, &str)]) -> Vec<FunctionForm> {
    pairs.iter().map(|(n, e)| FunctionForm::new(*n, *e)).collect()
}

fn function_errors(pairs: &[(&str, &str)]) -> Vec<FieldError> {
    validate_functions(&forms(pairs), &channels()).unwrap_err()
}

fn filter_messages(text: &str) -> Vec<String> {
    validate_filter(text, &channels(), &FunctionSet::default())
        .unwrap_err()
        .iter()
        .map(ToString::to_string)
        .collect()
}

// ============================================================================
// Names
// ============================================================================

#[test]
fn test_bad_name_message() {
    let err = validate_name("b@d_n@m3").unwrap_err();
    assert_eq!(
        err.to_string(),
        "name 'b@d_n@m3' must start with a letter, and can only contain letters, digits, '-' or '_' characters"
    );
}

#[test]
fn test_good_names() {
    for name in ["Channel_A1", "peak-width", "x"] {
        assert!(validate_name(name).is_ok(), "rejected {}", name);
    }
    for name in ["1st", "_hidden", "a b", ""] {
        assert!(validate_name(name).is_err(), "accepted {:?}", name);
    }
}

#[test]
fn test_bad_name_in_form() {
    let errors = function_errors(&[("b@d_n@m3", "1")]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field_path, "functions.0.name");
}

#[test]
fn test_duplicate_names() {
    let errors = function_errors(&[("a", "1"), ("a", "2")]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field_path, "functions.1.name");
    assert_eq!(errors[0].message, ValidationError::DuplicateName("a".into()).to_string());
}

#[test]
fn test_name_clashes_with_channel() {
    let errors = function_errors(&[("temperature", "1")]);
    assert_eq!(errors[0].field_path, "functions.0.name");
}

// ============================================================================
// Required fields
// ============================================================================

#[test]
fn test_required_fields_reported_independently() {
    let errors = function_errors(&[("", "1"), ("b", ""), ("", "")]);
    let paths: Vec<&str> = errors.iter().map(|e| e.field_path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "functions.0.name",
            "functions.2.name",
            "functions.1.expression",
            "functions.2.expression",
        ]
    );
    assert!(errors.iter().all(|e| e.message == REQUIRED_MESSAGE));
}

#[test]
fn test_filling_a_field_clears_only_its_error() {
    let before = function_errors(&[("", ""), ("c", "")]);
    assert_eq!(before.len(), 3);

    let after = function_errors(&[("a", ""), ("c", "")]);
    let paths: Vec<&str> = after.iter().map(|e| e.field_path.as_str()).collect();
    assert_eq!(paths, vec!["functions.0.expression", "functions.1.expression"]);
}

#[test]
fn test_empty_filter_required() {
    assert_eq!(filter_messages("   "), vec![REQUIRED_MESSAGE.to_string()]);
}

// ============================================================================
// Syntax
// ============================================================================

#[test]
fn test_open_bracket_in_form() {
    let errors = function_errors(&[("a", "( ")]);
    assert_eq!(errors[0].field_path, "functions.0.expression");
    assert_eq!(
        errors[0].message,
        "expression '(' has unexpected end-of-input, check all brackets are closed"
    );
}

#[test]
fn test_filter_syntax_error_path() {
    let errors = validate_filters(&["temperature > 21", "humidity >"], &channels(), &FunctionSet::default())
        .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field_path, "filters.1");
}

// ============================================================================
// References and cycles
// ============================================================================

#[test]
fn test_unknown_names_reported_individually() {
    let messages = filter_messages("pressure > 1 and flow > 2 and pressure < 5");
    assert_eq!(
        messages,
        vec![
            "'pressure' is not a known channel or function".to_string(),
            "'flow' is not a known channel or function".to_string(),
        ]
    );
}

#[test]
fn test_self_reference_is_a_cycle() {
    let errors = function_errors(&[("c", "c + 1")]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field_path, "functions.0.expression");
    assert!(errors[0].message.contains("c -> c"), "{}", errors[0].message);
}

#[test]
fn test_transitive_cycle() {
    let errors = function_errors(&[("a", "b + 1"), ("b", "a * 2")]);
    let paths: Vec<&str> = errors.iter().map(|e| e.field_path.as_str()).collect();
    assert_eq!(paths, vec!["functions.0.expression", "functions.1.expression"]);
    assert!(errors.iter().all(|e| e.message.contains("cycle")));
}

#[test]
fn test_forward_reference() {
    let errors = function_errors(&[("a", "b + 1"), ("b", "2")]);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        ValidationError::ForwardReference {
            function: "a".into(),
            reference: "b".into(),
        }
        .to_string()
    );
}

#[test]
fn test_error_in_dependency_not_repeated() {
    // b is only wrong because a is; a carries the error
    let errors = function_errors(&[("a", "nope + 1"), ("b", "a * 2")]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field_path, "functions.0.expression");
}

#[test]
fn test_dependencies() {
    let set = validate_functions(
        &forms(&[("a", "1"), ("b", "a + 1"), ("c", "a + b + temperature")]),
        &channels(),
    )
    .unwrap();
    assert_eq!(set.dependencies("c"), vec!["a", "b"]);
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
}

// ============================================================================
// Types
// ============================================================================

#[test]
fn test_function_types() {
    let set = validate_functions(
        &forms(&[
            ("scaled", "trace * 2"),
            ("peak", "centre ( trace )"),
            ("dark", "camera - mean ( camera )"),
            ("biggest", "max ( temperature , humidity , 3 )"),
        ]),
        &channels(),
    )
    .unwrap();
    let types: Vec<ValueType> = set.iter().map(|def| def.value_type).collect();
    assert_eq!(
        types,
        vec![ValueType::Waveform, ValueType::Number, ValueType::Image, ValueType::Number]
    );
}

#[test]
fn test_function_must_be_numeric() {
    let errors = function_errors(&[("flag", "temperature > 1")]);
    assert_eq!(
        errors[0].message,
        ValidationError::NotNumeric(ValueType::Boolean).to_string()
    );
}

#[test]
fn test_filter_must_be_boolean() {
    assert_eq!(
        filter_messages("temperature + 1"),
        vec![ValidationError::NotBoolean(ValueType::Number).to_string()]
    );
}

#[test]
fn test_boolean_operator_needs_conditions() {
    let messages = filter_messages("temperature and humidity > 1");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("'and'"), "{}", messages[0]);
    assert!(messages[0].contains("temperature"), "{}", messages[0]);
}

#[test]
fn test_text_comparisons() {
    let set = FunctionSet::default();
    assert!(validate_filter("shot_type == \"main\"", &channels(), &set).is_ok());
    assert!(validate_filter("shot_type != 'test'", &channels(), &set).is_ok());
    assert!(validate_filter("shot_type > \"main\"", &channels(), &set).is_err());
    assert!(validate_filter("shot_type == 1", &channels(), &set).is_err());
}

#[test]
fn test_waveform_and_image_do_not_mix() {
    let errors = function_errors(&[("bad", "trace + camera")]);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("waveform"), "{}", errors[0].message);
}

#[test]
fn test_builtin_argument_kind() {
    let errors = function_errors(&[("bad", "centroid_x ( trace )")]);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("centroid_x"), "{}", errors[0].message);
}

#[test]
fn test_filter_may_use_functions() {
    let set = validate_functions(&forms(&[("peak", "centre ( trace )")]), &channels()).unwrap();
    assert!(validate_filter("peak > 2", &channels(), &set).is_ok());
}

#[test]
fn test_field_error_serialises_camel_case() {
    let error = FieldError {
        field_path: "filters.0".into(),
        message: "m".into(),
    };
    assert_eq!(
        serde_json::to_string(&error).unwrap(),
        r#"{"fieldPath":"filters.0","message":"m"}"#
    );
}
