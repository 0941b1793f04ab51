use serde_json::{Value, json};

use form_spec::{
    CompileError, CustomOutcome, CustomRuleError, FieldSpec, FieldType, FormSchema,
    MessageCatalog, MessageOverrides, RequiredRule, ValidationRules, async_rule,
    create_field_validation_schema, create_form_validation_schema, sync_rule,
    validate_field_value, validate_form_data, validate_single,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "signup_form" => include_str!("../tests/fixtures/signup_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn signup() -> FormSchema {
    serde_json::from_str(fixture("signup_form")).expect("deserialize")
}

fn field(value: Value) -> FieldSpec {
    serde_json::from_value(value).expect("field spec")
}

#[tokio::test]
async fn min_rule_reports_bound() {
    let age = field(json!({ "name": "age", "type": "number", "validation": { "min": 18 } }));
    let validator = create_field_validation_schema(&age, None).expect("compile");
    let values = json!({});
    assert_eq!(
        validator.validate(Some(&json!(15)), &values).await.as_deref(),
        Some("Must be at least 18")
    );
    assert_eq!(validator.validate(Some(&json!(21)), &values).await, None);
    assert_eq!(
        validator.validate(Some(&json!("abc")), &values).await.as_deref(),
        Some("Must be a number")
    );
}

#[tokio::test]
async fn required_wins_over_min_length_for_empty_strings() {
    let name = field(json!({
        "name": "name",
        "type": "text",
        "required": true,
        "validation": { "minLength": 2 }
    }));
    let message = validate_field_value("name", &json!(""), &name, None, None)
        .await
        .expect("compile");
    assert_eq!(message.as_deref(), Some("This field is required"));

    let short = validate_field_value("name", &json!("a"), &name, None, None)
        .await
        .expect("compile");
    assert_eq!(short.as_deref(), Some("Must be at least 2 characters"));
}

#[tokio::test]
async fn optional_empty_values_skip_rules() {
    let zip = field(json!({
        "name": "zip",
        "type": "text",
        "validation": { "pattern": "^[0-9]{5}$" }
    }));
    let message = validate_single(&zip, &json!(""), &json!({}), &MessageCatalog::default())
        .await
        .expect("compile");
    assert_eq!(message, None);
}

#[tokio::test]
async fn cross_field_custom_rule() {
    let end = FieldSpec::new("end", FieldType::Number).with_custom(async_rule(
        |end: Value, all: Value| async move {
            let after_start = match (end.as_f64(), all["start"].as_f64()) {
                (Some(end), Some(start)) => end > start,
                _ => false,
            };
            Ok::<_, CustomRuleError>(if after_start {
                CustomOutcome::Valid
            } else {
                CustomOutcome::invalid("must be after start")
            })
        },
    ));
    let validator = create_field_validation_schema(&end, None).expect("compile");

    let values = json!({ "start": 10 });
    assert_eq!(
        validator.validate(Some(&json!(5)), &values).await.as_deref(),
        Some("must be after start")
    );
    assert_eq!(validator.validate(Some(&json!(15)), &values).await, None);
}

#[tokio::test]
async fn custom_failure_without_message_uses_default() {
    let code = FieldSpec::new("code", FieldType::Text)
        .with_custom(sync_rule(|value: &Value, _all: &Value| value == "secret"));
    let validator = create_field_validation_schema(&code, None).expect("compile");
    assert_eq!(
        validator.validate(Some(&json!("guess")), &json!({})).await.as_deref(),
        Some("Validation failed")
    );
    assert_eq!(validator.validate(Some(&json!("secret")), &json!({})).await, None);
}

#[tokio::test]
async fn custom_errors_do_not_abort_the_form() {
    let mut schema = FormSchema::from_fields([
        FieldSpec::new("username", FieldType::Text),
        FieldSpec::new("age", FieldType::Number).with_validation(ValidationRules {
            min: Some(18.0),
            ..ValidationRules::default()
        }),
    ]);
    let attached = schema.attach_custom(
        "username",
        async_rule(|_value: Value, _all: Value| async move {
            Err::<CustomOutcome, _>(CustomRuleError::Unavailable("lookup service down".into()))
        }),
    );
    assert!(attached);

    let overrides =
        MessageOverrides::from([("custom".to_string(), "Could not verify".to_string())]);
    let data = json!({ "username": "ada", "age": 3 });
    let errors = validate_form_data(&data, &schema, Some(&overrides))
        .await
        .expect("compile");
    assert_eq!(errors.get("username").map(String::as_str), Some("Could not verify"));
    assert_eq!(errors.get("age").map(String::as_str), Some("Must be at least 18"));
}

#[tokio::test]
async fn whole_form_reports_every_failure() {
    let validator = create_form_validation_schema(&signup(), None).expect("compile");
    let data = json!({
        "email": "not-an-email",
        "age": 15,
        "country": "uk",
        "accountType": "personal",
        "address": { "zip": "12" },
        "contacts": [ { "phone": "1" } ]
    });
    let errors = validator.validate(&data).await;

    assert_eq!(errors["email"], "Invalid email address");
    assert_eq!(errors["age"], "Must be at least 18");
    assert_eq!(errors["state"], "This field is required");
    assert_eq!(errors["companyName"], "This field is required");
    assert_eq!(errors["address.city"], "This field is required");
    assert_eq!(errors["address.zip"], "Invalid format");
    assert_eq!(errors["contacts.0.name"], "This field is required");
    assert!(!errors.contains_key("contacts"));
    assert!(!errors.contains_key("country"));
}

#[tokio::test]
async fn visible_validation_skips_hidden_fields() {
    let validator = create_form_validation_schema(&signup(), None).expect("compile");
    let data = json!({
        "email": "ada@example.com",
        "country": "uk",
        "accountType": "personal",
        "address": { "city": "London" },
        "contacts": [ { "name": "Grace" } ]
    });
    let errors = validator.validate_visible(&data).await;
    assert!(errors.is_empty(), "{errors:?}");

    let everything = validator.validate(&data).await;
    assert_eq!(everything["state"], "This field is required");
    assert_eq!(everything["companyName"], "This field is required");

    let business = json!({
        "email": "ada@example.com",
        "country": "us",
        "accountType": "business",
        "companyName": "A",
        "address": { "city": "Boston" },
        "contacts": [ { "name": "Grace" } ]
    });
    let errors = validator.validate_visible(&business).await;
    assert_eq!(errors["state"], "This field is required");
    assert_eq!(errors["companyName"], "Must be at least 2 characters");
    assert_eq!(errors.len(), 2, "{errors:?}");
}

#[tokio::test]
async fn validate_at_reaches_nested_paths() {
    let validator = create_form_validation_schema(&signup(), None).expect("compile");
    let data = json!({ "address": { "zip": "abc" }, "contacts": [ { "name": "" } ] });
    assert_eq!(
        validator.validate_at("address.zip", &data).await.as_deref(),
        Some("Invalid format")
    );
    assert_eq!(
        validator.validate_at("contacts.0.name", &data).await.as_deref(),
        Some("This field is required")
    );
    assert_eq!(validator.validate_at("contacts.3.name", &data).await, None);
    assert_eq!(validator.validate_at("nope", &data).await, None);
}

#[tokio::test]
async fn required_can_depend_on_other_fields() {
    let declarative = field(json!({
        "name": "vat",
        "type": "text",
        "validation": {
            "required": { "field": "kind", "operator": "equals", "value": "business" }
        }
    }));
    let validator = create_field_validation_schema(&declarative, None).expect("compile");
    assert!(validator.validate(None, &json!({ "kind": "business" })).await.is_some());
    assert!(validator.validate(None, &json!({ "kind": "personal" })).await.is_none());

    let computed = FieldSpec::new("guardian", FieldType::Text).with_validation(ValidationRules {
        required: Some(RequiredRule::computed(|values| {
            values["age"].as_f64().is_some_and(|age| age < 18.0)
        })),
        ..ValidationRules::default()
    });
    let validator = create_field_validation_schema(&computed, None).expect("compile");
    assert!(validator.is_required(&json!({ "age": 12 })));
    assert!(!validator.is_required(&json!({ "age": 40 })));
}

#[tokio::test]
async fn message_layers_resolve_field_first() {
    let schema: FormSchema = serde_json::from_value(json!({
        "fields": [
            { "name": "a", "type": "text", "required": true },
            {
                "name": "b",
                "type": "text",
                "required": true,
                "validationMessages": { "required": "{{label}} please" },
                "label": "Bee"
            }
        ]
    }))
    .expect("schema");
    let overrides = MessageOverrides::from([("required".to_string(), "Needed".to_string())]);
    let errors = validate_form_data(&json!({}), &schema, Some(&overrides))
        .await
        .expect("compile");
    assert_eq!(errors["a"], "Needed");
    assert_eq!(errors["b"], "Bee please");
}

#[tokio::test]
async fn date_like_fields_parse_values() {
    let cases = [
        (FieldType::Date, json!("2024-02-29"), true),
        (FieldType::Date, json!("2023-02-29"), false),
        (FieldType::Date, json!("yesterday"), false),
        (FieldType::Datetime, json!("2024-05-01T10:30"), true),
        (FieldType::Datetime, json!("2024-05-01T10:30:00Z"), true),
        (FieldType::Time, json!("23:59"), true),
        (FieldType::Time, json!("25:00"), false),
    ];
    for (kind, value, ok) in cases {
        let validator =
            create_field_validation_schema(&FieldSpec::new("when", kind), None).expect("compile");
        let result = validator.validate(Some(&value), &json!({})).await;
        assert_eq!(result.is_none(), ok, "{kind:?} {value}");
    }
}

#[tokio::test]
async fn type_routing_covers_collections_and_urls() {
    let site = create_field_validation_schema(&FieldSpec::new("site", FieldType::Url), None)
        .expect("compile");
    assert_eq!(site.validate(Some(&json!("https://example.com")), &json!({})).await, None);
    assert_eq!(
        site.validate(Some(&json!("example")), &json!({})).await.as_deref(),
        Some("Invalid URL")
    );

    let agree = create_field_validation_schema(&FieldSpec::new("agree", FieldType::Checkbox), None)
        .expect("compile");
    assert_eq!(
        agree.validate(Some(&json!("yes")), &json!({})).await.as_deref(),
        Some("Must be true or false")
    );

    let pick = create_field_validation_schema(&FieldSpec::new("pick", FieldType::Select), None)
        .expect("compile");
    assert_eq!(pick.validate(Some(&json!({ "id": 1 })), &json!({})).await, None);

    let tags = field(json!({ "name": "tags", "type": "array", "validation": { "maxItems": 1 } }));
    let tags = create_field_validation_schema(&tags, None).expect("compile");
    assert_eq!(
        tags.validate(Some(&json!(["a", "b"])), &json!({})).await.as_deref(),
        Some("Must have at most 1 items")
    );
}

#[test]
fn structural_errors_fail_at_compile_time() {
    let missing = FormSchema::from_fields([FieldSpec::new("rows", FieldType::Array)]);
    assert!(matches!(
        create_form_validation_schema(&missing, None),
        Err(CompileError::MissingItemSchema { field }) if field == "rows"
    ));

    let bad_pattern =
        field(json!({ "name": "p", "type": "text", "validation": { "pattern": "(" } }));
    assert!(matches!(
        create_field_validation_schema(&bad_pattern, None),
        Err(CompileError::InvalidPattern { .. })
    ));

    let duplicate = FormSchema::from_fields([
        FieldSpec::new("a", FieldType::Text),
        FieldSpec::new("a", FieldType::Number),
    ]);
    assert!(matches!(
        create_form_validation_schema(&duplicate, None),
        Err(CompileError::DuplicateField { path }) if path == "a"
    ));

    let inverted =
        field(json!({ "name": "n", "type": "number", "validation": { "min": 5, "max": 1 } }));
    assert!(matches!(
        create_field_validation_schema(&inverted, None),
        Err(CompileError::ConflictingBounds { .. })
    ));
}

#[tokio::test]
async fn dependencies_are_metadata_only() {
    let schema: FormSchema = serde_json::from_value(json!({
        "fields": [
            { "name": "start", "type": "number" },
            {
                "name": "end",
                "type": "number",
                "validation": { "custom": { "dependencies": ["start"] } }
            }
        ]
    }))
    .expect("schema");
    let validator = create_form_validation_schema(&schema, None).expect("compile");
    assert_eq!(
        validator.dependencies(),
        vec![("end".to_string(), vec!["start".to_string()])]
    );
    assert!(validator.validate(&json!({ "start": 10, "end": 5 })).await.is_empty());
}

#[tokio::test]
async fn repeated_validation_is_stable() {
    let validator = create_form_validation_schema(&signup(), None).expect("compile");
    let data = json!({ "email": "x", "contacts": [ {} ] });
    let first = validator.validate(&data).await;
    let second = validator.validate(&data).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn optional_empty_arrays_still_check_cardinality() {
    let tags = field(json!({ "name": "tags", "type": "array", "validation": { "minItems": 1 } }));
    let validator = create_field_validation_schema(&tags, None).expect("compile");
    assert_eq!(
        validator.validate(Some(&json!([])), &json!({})).await.as_deref(),
        Some("Must have at least 1 items")
    );
    assert_eq!(validator.validate(None, &json!({})).await, None);
    assert_eq!(validator.validate(Some(&Value::Null), &json!({})).await, None);

    let form = create_form_validation_schema(&signup(), None).expect("compile");
    let errors = form.validate(&json!({ "contacts": [] })).await;
    assert_eq!(errors["contacts"], "Must have at least 1 items");
}

#[tokio::test]
async fn custom_rules_run_for_blank_values() {
    let vat = FieldSpec::new("vat", FieldType::Text).with_custom(sync_rule(
        |value: &Value, all: &Value| {
            let blank = value.is_null() || value == "";
            if all["kind"] == "business" && blank {
                Err("VAT number is required for businesses".to_string())
            } else {
                Ok(())
            }
        },
    ));
    let validator = create_field_validation_schema(&vat, None).expect("compile");
    let business = json!({ "kind": "business" });
    for value in [None, Some(json!("")), Some(Value::Null)] {
        assert_eq!(
            validator.validate(value.as_ref(), &business).await.as_deref(),
            Some("VAT number is required for businesses"),
            "{value:?}"
        );
    }
    assert_eq!(validator.validate(None, &json!({ "kind": "personal" })).await, None);
    assert_eq!(validator.validate(Some(&json!("GB123")), &business).await, None);
}

#[tokio::test]
async fn item_rules_see_the_whole_form() {
    let mut schema: FormSchema = serde_json::from_value(json!({
        "fields": [
            { "name": "stock", "type": "number" },
            {
                "name": "lines",
                "type": "array",
                "itemSchema": [
                    { "name": "sku", "type": "text" },
                    {
                        "name": "note",
                        "type": "text",
                        "validation": {
                            "required": { "field": "strict", "operator": "equals", "value": true }
                        }
                    },
                    { "name": "qty", "type": "number" }
                ]
            },
            { "name": "strict", "type": "checkbox" }
        ]
    }))
    .expect("schema");
    let attached = schema.attach_custom(
        "lines.qty",
        sync_rule(|qty: &Value, all: &Value| {
            match (qty.as_f64(), all["stock"].as_f64()) {
                (Some(qty), Some(stock)) if qty > stock => Err(format!("Only {stock} in stock")),
                _ => Ok(()),
            }
        }),
    );
    assert!(attached);

    let validator = create_form_validation_schema(&schema, None).expect("compile");
    let data = json!({
        "stock": 3,
        "strict": true,
        "lines": [ { "sku": "a", "qty": 2 }, { "sku": "b", "qty": 5, "note": "rush" } ]
    });
    let errors = validator.validate(&data).await;
    assert_eq!(errors["lines.1.qty"], "Only 3 in stock");
    assert_eq!(errors["lines.0.note"], "This field is required");
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert_eq!(
        validator.validate_at("lines.1.qty", &data).await.as_deref(),
        Some("Only 3 in stock")
    );
}
