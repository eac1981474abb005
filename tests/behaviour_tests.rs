// End-to-end behaviour of the expression engine
//
// Each section exercises one user-visible guarantee through the public API:
// validation, evaluation and the stored text form.

use opgw_expr::{
    ChannelCatalogue, ChannelInfo, Evaluator, FunctionSet, Record, Truth, Value,
    apply::{apply_filters, apply_functions},
    output::to_text,
    parser::parse_text,
    validate::{FunctionForm, validate_filter, validate_filters, validate_functions, validate_name},
    value::Waveform,
};

fn channels() -> ChannelCatalogue {
    ChannelCatalogue::new()
        .with("temperature", ChannelInfo::scalar("Temperature"))
        .with("humidity", ChannelInfo::scalar("Humidity"))
        .with("trace", ChannelInfo::waveform("Trace"))
        .with("FE-204-NSO-P1-CAM-1", ChannelInfo::image("Camera 1"))
}

fn full_row(temperature: f64, humidity: f64) -> Record {
    Record::new()
        .with("temperature", Value::Number(temperature))
        .with("humidity", Value::Number(humidity))
        .with(
            "trace",
            Value::Waveform(Waveform::new(vec![0.0, 1.0, 2.0], vec![1.0, 3.0, 1.0])),
        )
}

const FILTERS: &[&str] = &[
    "temperature > 21",
    "not ( humidity > 55 or not humidity > 53 ) and temperature > 21",
    "temperature > 21 or temperature > 21.95",
    "not not humidity == 50",
    "( temperature + humidity ) / 2 >= 30 and humidity != 0",
    "centre ( trace ) == 1 or - temperature < -30",
    "max ( temperature , humidity ) > 2 ^ 3 ^ 0.5",
];

const FUNCTIONS: &[&str] = &[
    "centre ( trace ) + Mean ( trace )",
    "( temperature - humidity ) * 2",
    "trace * 2 - background ( trace )",
    "- temperature ^ 2",
    "temperature / ( humidity - 50 )",
    "integrate ( trace * trace ) / fwhm ( trace )",
];

// ============================================================================
// Validation messages
// ============================================================================

#[test]
fn name_validation() {
    assert_eq!(
        validate_name("b@d_n@m3").unwrap_err().to_string(),
        "name 'b@d_n@m3' must start with a letter, and can only contain letters, digits, '-' or '_' characters"
    );
    assert!(validate_name("Channel_A1").is_ok());
}

#[test]
fn lone_open_bracket() {
    let errors = validate_filter("( ", &channels(), &FunctionSet::default()).unwrap_err();
    assert_eq!(
        errors[0].to_string(),
        "expression '(' has unexpected end-of-input, check all brackets are closed"
    );
}

#[test]
fn unmatched_open_bracket_always_fails() {
    for text in ["( temperature > 21", "( ( humidity > 1 )", "max ( temperature , humidity"] {
        let err = parse_text(text, &channels()).unwrap_err();
        assert!(
            err.to_string().contains("check all brackets are closed"),
            "{}: {}",
            text,
            err
        );
    }
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn functions_build_on_earlier_functions() {
    let forms = [FunctionForm::new("a", "1"), FunctionForm::new("b", "a + 1")];
    let functions = validate_functions(&forms, &channels()).unwrap();
    let records = apply_functions(&functions, vec![Record::new(), full_row(1.0, 2.0)]);
    for record in &records {
        assert_eq!(record.get("b"), Some(&Value::Number(2.0)));
    }
}

#[test]
fn self_reference_rejected_before_evaluation() {
    let errors = validate_functions(&[FunctionForm::new("c", "c + 1")], &channels()).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("cycle"));
}

#[test]
fn example_functions_validate() {
    let forms: Vec<FunctionForm> = FUNCTIONS
        .iter()
        .enumerate()
        .map(|(i, text)| FunctionForm::new(format!("f{}", i), *text))
        .collect();
    assert!(validate_functions(&forms, &channels()).is_ok());
}

#[test]
fn hyphenated_channel_names() {
    let forms = [FunctionForm::new("spot", "centroid_x ( FE-204-NSO-P1-CAM-1 )")];
    assert!(validate_functions(&forms, &channels()).is_ok());
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn redundant_or_with_missing_channel() {
    let filters = validate_filters(
        &["temperature > 21 or temperature > 21.95"],
        &channels(),
        &FunctionSet::default(),
    )
    .unwrap();

    let evaluator = Evaluator::new();
    let present = Record::new().with("temperature", Value::Number(21.98));
    assert_eq!(evaluator.eval_filter(&filters[0].tree, &present).unwrap(), Truth::True);

    let kept = apply_filters(&filters, vec![present.clone(), Record::new()]);
    assert_eq!(kept, vec![present]);
}

#[test]
fn complete_rows_are_always_determinate() {
    let filters = validate_filters(FILTERS, &channels(), &FunctionSet::default()).unwrap();
    let evaluator = Evaluator::new();
    for (temperature, humidity) in [(21.98, 54.0), (15.0, 50.0), (-40.0, 0.0), (30.0, 80.0)] {
        let row = full_row(temperature, humidity);
        for filter in &filters {
            let truth = evaluator.eval_filter(&filter.tree, &row).unwrap();
            assert_ne!(truth, Truth::Indeterminate, "{} on {:?}", filter.tree, row);
        }
    }
}

#[test]
fn example_filter_evaluates() {
    let text = "not ( humidity > 55 or not humidity > 53 ) and temperature > 21";
    let expr = parse_text(text, &channels()).unwrap();
    let evaluator = Evaluator::new();
    assert_eq!(evaluator.eval_filter(&expr, &full_row(22.0, 54.0)).unwrap(), Truth::True);
    assert_eq!(evaluator.eval_filter(&expr, &full_row(22.0, 56.0)).unwrap(), Truth::False);
    assert_eq!(evaluator.eval_filter(&expr, &full_row(22.0, 52.0)).unwrap(), Truth::False);
    assert_eq!(evaluator.eval_filter(&expr, &full_row(20.0, 54.0)).unwrap(), Truth::False);
}

// ============================================================================
// Stored text form
// ============================================================================

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => a == b,
    }
}

#[test]
fn text_form_round_trips() {
    let rows = [
        full_row(21.98, 54.0),
        full_row(0.0, 50.0),
        full_row(-3.5, 100.0),
        Record::new().with("humidity", Value::Number(60.0)),
    ];
    let evaluator = Evaluator::new();

    for text in FILTERS.iter().chain(FUNCTIONS) {
        let original = parse_text(text, &channels()).unwrap();
        let stored = to_text(&original);
        let reparsed = parse_text(&stored, &channels()).unwrap();

        // Printing is stable once canonical
        assert_eq!(to_text(&reparsed), stored, "{}", text);

        for row in &rows {
            let before = evaluator.eval_value(&original, row).unwrap();
            let after = evaluator.eval_value(&reparsed, row).unwrap();
            assert!(same_value(&before, &after), "{}: {:?} vs {:?}", text, before, after);
        }
    }
}

#[test]
fn canonical_text_spacing() {
    let expr = parse_text("centre(trace)+Mean(trace)", &channels()).unwrap();
    assert_eq!(to_text(&expr), "centre ( trace ) + mean ( trace )");
}
