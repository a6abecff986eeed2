mod common;

use chrono::NaiveDate;
use common::ScriptedCompletion;
use tkr_receipts::Error;
use tkr_receipts::ai::{self, ChatSession, Role};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

#[test]
fn scope_extraction_accepts_fenced_json() {
    common::init_logging();
    let body = serde_json::to_string(&common::scope_items()).unwrap();
    let service = ScriptedCompletion::replying(&format!("```json\n{body}\n```"));

    let items = ai::extract_scope(&service, b"%PDF-1.7", "plans.pdf").unwrap();
    assert_eq!(items, common::scope_items());

    let requests = service.requests.borrow();
    let request = &requests[0];
    assert!(request.json_response);
    assert_eq!(request.temperature, Some(0.1));
    let doc = request.document.as_ref().expect("document attached");
    assert_eq!(doc.mime_type, "application/pdf");
    assert_eq!(doc.data, b"%PDF-1.7");
}

#[test]
fn prose_around_array_is_a_parse_error_with_raw_text() {
    let raw = "Sure! Here are the items:\n[{\"category\":\"painting\"}]\nLet me know.";
    let service = ScriptedCompletion::replying(raw);

    let err = ai::extract_scope(&service, b"", "plans.pdf").unwrap_err();
    assert!(matches!(err, Error::AiInvalidJson { .. }), "got {err:?}");
    assert_eq!(err.raw_response(), Some(raw));
}

#[test]
fn transport_failures_are_wrapped() {
    let service = ScriptedCompletion::with(vec![Err(Error::Ai("HTTP 503".into()))]);
    let err = ai::extract_scope(&service, b"", "plans.pdf").unwrap_err();
    match err {
        Error::Ai(message) => {
            assert!(message.contains("plans.pdf"));
            assert!(message.contains("HTTP 503"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn quotation_fields_are_repaired() {
    let response = r#"{
        "title": "Painting Services Quotation for plans",
        "clientInfo": {"name": "[Client Name]", "address": "[Client Address]", "date": "[Date]", "projectId": "P-1"},
        "companyInfo": {"name": "X", "address": "Y", "phone": "Z", "email": "e@x"},
        "introductionText": "Hello",
        "items": [
            {"id": 1, "category": "", "description": "Paint lobby walls", "quantity": "120 SQM", "materialOrFinish": "", "pricePlaceholder": "$[ITEM_PRICE_1]"},
            {"id": 2, "category": "cladding", "description": "Granite", "quantity": "50 SQM", "materialOrFinish": "Granite 30mm", "unitOfMeasure": "SQM", "pricePlaceholder": "$[ITEM_PRICE_2]"}
        ],
        "subtotalPlaceholder": "$[SUBTOTAL_PRICE]",
        "taxPlaceholder": "$[TAX_AMOUNT]",
        "totalPricePlaceholder": "$[GRAND_TOTAL_PRICE]",
        "termsAndConditions": ["Valid 30 days"],
        "conclusionText": "Thanks"
    }"#;
    let service = ScriptedCompletion::replying(response);
    let q = ai::build_quotation(&service, &common::scope_items(), "docs/plans.pdf", today());

    assert_eq!(q.title, "Construction Services Quotation for plans");
    assert_eq!(q.client_info.date, "2025-06-01");
    assert_eq!(q.client_info.project_id, "Project: plans");
    assert_eq!(q.items[0].category, "painting");
    assert_eq!(q.items[0].material_or_finish, "Eggshell latex");
    assert_eq!(q.items[0].unit_of_measure.as_deref(), Some("SQM"));
    assert_eq!(q.introduction_text, "Hello");

    let requests = service.requests.borrow();
    assert_eq!(requests[0].temperature, Some(0.3));
    assert!(requests[0].prompt.contains("$[ITEM_PRICE_2]"));
}

#[test]
fn unusable_answer_falls_back_to_template() {
    let service = ScriptedCompletion::replying("I could not do that.");
    let q = ai::build_quotation(&service, &common::scope_items(), "plans.pdf", today());

    assert_eq!(q.title, "Construction Services Quotation for plans");
    assert!(q.introduction_text.contains("fallback"));
    assert_eq!(q.items.len(), 2);
    assert_eq!(q.items[1].page_ref.as_deref(), Some("7"));
    assert_eq!(q.items[1].price_placeholder, "$[ITEM_PRICE_2]");
    assert_eq!(q.tax_placeholder.as_deref(), Some("$[TAX_AMOUNT]"));
    assert_eq!(q.terms_and_conditions.len(), 4);
}

#[test]
fn no_items_skips_the_model() {
    let service = ScriptedCompletion::default();
    let q = ai::build_quotation(&service, &[], "plans.pdf", today());
    assert_eq!(service.request_count(), 0);
    assert!(q.items.is_empty());
    assert!(q.tax_placeholder.is_none());
    assert_eq!(q.client_info.project_id, "Project: plans");
}

#[test]
fn chat_keeps_history_of_successful_turns() {
    let service = ScriptedCompletion::with(vec![
        Ok("**Granite** is durable.".into()),
        Err(Error::Ai("timeout".into())),
        Ok("About 50 SQM.".into()),
    ]);
    let context = ai::chat_context("plans.pdf", &common::scope_items()).unwrap();
    let mut chat = ChatSession::new(&service, &context);

    assert_eq!(chat.send("Is granite good?").unwrap(), "**Granite** is durable.");
    let err = chat.send("How much?").unwrap_err();
    assert!(err.to_string().contains("AI chat error"));
    assert_eq!(chat.send("How much cladding?").unwrap(), "About 50 SQM.");

    let history = chat.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[3].text, "About 50 SQM.");

    let requests = service.requests.borrow();
    assert_eq!(requests[2].history.len(), 2);
    let system = requests[2].system_instruction.as_deref().unwrap();
    assert!(system.contains("plans.pdf"));
    assert!(system.contains("Markdown"));
}
