#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use tkr_receipts::ai::{CompletionRequest, CompletionService};
use tkr_receipts::fonts::FaceRole;
use tkr_receipts::model::ScopeItem;
use tkr_receipts::pdf::{Document, DrawOp};
use tkr_receipts::{Error, ReceiptDetails, Result};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A filled-in receipt form with both Latin and Arabic values.
pub fn sample_details() -> ReceiptDetails {
    ReceiptDetails {
        receipt_date: "2025-05-12".into(),
        received_from_name: "Karim Haddad".into(),
        amount: "$1,250.50".into(),
        tent_number: "T12".into(),
        usage_purpose: "مطعم".into(),
        description: "Food stand, corner spot".into(),
        electricity_available: true,
        table_available: true,
        ads_zone_b: true,
        ads_zone_e: true,
        ads_total_quantity: "4".into(),
        car_flags_count: "2".into(),
        banner_flags_count: "2".into(),
        notes: "Paid in cash".into(),
        receiver_name: "Karim Haddad".into(),
        payer_name: "سامي".into(),
        ..ReceiptDetails::default()
    }
}

pub fn scope_items() -> Vec<ScopeItem> {
    serde_json::from_str(
        r#"[
            {"category":"painting","itemDescription":"Paint lobby walls","quantity":"120 SQM","materialOrFinish":"Eggshell latex","pageNumber":"A-101","unitOfMeasure":"SQM"},
            {"category":"cladding","itemDescription":"Granite panels, north elevation","quantity":"50 SQM","materialOrFinish":"Granite 30mm","pageNumber":7,"unitOfMeasure":"SQM"}
        ]"#,
    )
    .expect("valid scope fixture")
}

/// Completion service that replays queued answers and records every request.
#[derive(Default)]
pub struct ScriptedCompletion {
    responses: RefCell<VecDeque<Result<String>>>,
    pub requests: RefCell<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn with(responses: Vec<Result<String>>) -> Self {
        ScriptedCompletion {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with(vec![Ok(text.to_string())])
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl CompletionService for ScriptedCompletion {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Ai("no scripted response left".into())))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub face: FaceRole,
    pub x: f32,
    pub y: f32,
}

pub fn texts_on(doc: &Document, page: usize) -> Vec<PlacedText> {
    doc.pages[page]
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Text { x, y, face, text, .. } => Some(PlacedText {
                text: text.clone(),
                face: *face,
                x: *x,
                y: *y,
            }),
            _ => None,
        })
        .collect()
}

/// Dashed lines on `page` as `(x1, x2, y)`.
pub fn dotted_lines_on(doc: &Document, page: usize) -> Vec<(f32, f32, f32)> {
    doc.pages[page]
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Line { x1, x2, y1, dash: Some(_), .. } => Some((*x1, *x2, *y1)),
            _ => None,
        })
        .collect()
}
