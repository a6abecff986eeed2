//! Generative AI assistance for quotations: scope extraction from a project
//! document, quotation structure building, and a free-form chat.
//!
//! The model sits behind [`CompletionService`] so everything here can be
//! driven by a canned responder in tests. [`GeminiClient`] is the real one.

use std::path::Path;

use base64::Engine as _;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{ClientDetails, CompanyDetails, Quotation, QuotationItem, ScopeItem, TextOrNumber};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SUBTOTAL_PLACEHOLDER: &str = "$[SUBTOTAL_PRICE]";
const TAX_PLACEHOLDER: &str = "$[TAX_AMOUNT]";
const TOTAL_PLACEHOLDER: &str = "$[GRAND_TOTAL_PRICE]";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// A file sent along with the prompt.
#[derive(Clone, Debug)]
pub struct InlineDocument {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineDocument {
    pub fn pdf(data: Vec<u8>) -> Self {
        InlineDocument {
            mime_type: "application/pdf".to_string(),
            data,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CompletionRequest {
    pub system_instruction: Option<String>,
    /// Earlier turns of a conversation, oldest first.
    pub history: Vec<Turn>,
    pub prompt: String,
    pub document: Option<InlineDocument>,
    /// Ask the model for `application/json` output.
    pub json_response: bool,
    pub temperature: Option<f32>,
}

/// An opaque text-completion backend.
pub trait CompletionService {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

// Gemini generateContent wire format

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn text_part(text: &str) -> Part {
    Part {
        text: Some(text.to_string()),
        inline_data: None,
    }
}

fn request_body(request: &CompletionRequest) -> GenerateContentRequest {
    let mut contents: Vec<Content> = request
        .history
        .iter()
        .map(|turn| Content {
            role: Some(match turn.role {
                Role::User => "user".to_string(),
                Role::Model => "model".to_string(),
            }),
            parts: vec![text_part(&turn.text)],
        })
        .collect();

    let mut parts = vec![text_part(&request.prompt)];
    if let Some(doc) = &request.document {
        parts.push(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: doc.mime_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&doc.data),
            }),
        });
    }
    contents.push(Content {
        role: Some("user".to_string()),
        parts,
    });

    GenerateContentRequest {
        contents,
        system_instruction: request.system_instruction.as_deref().map(|s| Content {
            role: None,
            parts: vec![text_part(s)],
        }),
        generation_config: GenerationConfig {
            response_mime_type: request.json_response.then_some("application/json"),
            temperature: request.temperature,
        },
    }
}

/// Blocking client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("tkr-receipts/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(GeminiClient {
            http,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionService for GeminiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{GEMINI_ENDPOINT}/{}:generateContent", self.model);
        let t0 = std::time::Instant::now();
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(request))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Ai(format!("HTTP {status}: {body}")));
        }
        let parsed: GenerateContentResponse = response.json()?;
        log::debug!("Gemini {} answered in {:.0?}", self.model, t0.elapsed());
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(Error::Ai("empty response from model".to_string()));
        }
        Ok(text)
    }
}

/// Strip one surrounding code fence (optionally tagged, e.g. `json`).
fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return text;
    };
    let body = inner
        .trim_start_matches(|c: char| c.is_alphanumeric() || c == '_')
        .trim();
    if body.is_empty() { text } else { body }
}

/// Parse a model response as JSON. Only code fences are tolerated around the
/// payload; anything else yields [`Error::AiInvalidJson`] with the raw text.
pub fn parse_json_response<T: DeserializeOwned>(raw: &str, context: Option<&str>) -> Result<T> {
    let candidate = strip_code_fence(raw.trim());
    serde_json::from_str(candidate).map_err(|e| {
        log::warn!(
            "Failed to parse JSON response{}: {e}",
            context.map(|c| format!(" for {c}")).unwrap_or_default()
        );
        Error::AiInvalidJson {
            context: context.map(str::to_string),
            message: e.to_string(),
            raw: raw.to_string(),
        }
    })
}

const SCOPE_PROMPT: &str = r#"You are a senior quantity surveyor and facade designer. Analyse the attached PDF (bids, quotations, architectural drawings, specifications, notes) on every page, focusing on:
1. Painting works, interior and exterior.
2. Facade cladding: natural and engineered stone, terracotta, metal panels (ACM, zinc, copper), GFRC, precast, brick slips, timber, HPL and other cladding systems.
3. Other facade elements: curtain walling, windows, louvers, sunshades, facade waterproofing and significant features.

Return a JSON array with one object per distinct scope item:
{
  "category": "painting" | "cladding" | "facade_element" | "other",
  "itemDescription": "concise, complete description including location",
  "quantity": "numeric value AND unit, e.g. \"120 SQM\"; calculate from drawings where possible",
  "materialOrFinish": "material, product, finish, thickness, panel size, or \"N/A\"",
  "dimensions": "stated or \"Calculated: ...\" or \"N/A\"",
  "pageNumber": "exact page or sheet reference(s), e.g. \"A-101\"",
  "calculationDetails": "how any derived value was calculated, or null",
  "unitOfMeasure": "normalised uppercase unit: SQM, SQFT, LM, LF, EACH, ITEM, ALLOWANCE, LUMPSUM, TONNE, KG"
}

Rules: quantities must include their unit; unitOfMeasure is the normalised unit of that quantity; page references are mandatory; do not answer "as per drawing" without extracting the data. If nothing relevant is found return []. The response must be ONLY the JSON array."#;

/// Ask the model for the scope items contained in a project document.
pub fn extract_scope(service: &dyn CompletionService, document: &[u8], file_name: &str) -> Result<Vec<ScopeItem>> {
    log::info!("Extracting scope items from {file_name}");
    let request = CompletionRequest {
        prompt: SCOPE_PROMPT.to_string(),
        document: Some(InlineDocument::pdf(document.to_vec())),
        json_response: true,
        temperature: Some(0.1),
        ..Default::default()
    };
    let raw = service.complete(&request).map_err(|e| match e {
        Error::AiInvalidJson { .. } => e,
        other => Error::Ai(format!("Failed to process PDF {file_name} with AI. Details: {other}")),
    })?;
    let items: Vec<ScopeItem> = parse_json_response(&raw, Some(file_name))?;
    log::info!("Extracted {} scope item(s) from {file_name}", items.len());
    Ok(items)
}

/// File name without directory and final extension.
pub fn base_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Scope items as quotation rows, numbered from 1 with per-item price
/// placeholders.
pub fn quotation_items(items: &[ScopeItem]) -> Vec<QuotationItem> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| QuotationItem {
            id: TextOrNumber::Number((i as u64 + 1).into()),
            category: item.category.clone(),
            description: item.item_description.clone(),
            quantity: item.quantity.clone(),
            material_or_finish: item.material_or_finish.clone(),
            dimensions: item.dimensions.clone(),
            page_ref: item.page_number.as_ref().map(ToString::to_string),
            unit_of_measure: item.unit_of_measure.clone(),
            price_placeholder: format!("$[ITEM_PRICE_{}]", i + 1),
            unit_price: None,
            price: None,
        })
        .collect()
}

fn client_info(base: &str, today: NaiveDate) -> ClientDetails {
    ClientDetails {
        name: "[Client Name]".to_string(),
        address: "[Client Address]".to_string(),
        date: today.format("%Y-%m-%d").to_string(),
        project_id: format!("Project: {base}"),
    }
}

fn quotation_title(base: &str) -> String {
    format!("Construction Services Quotation for {base}")
}

fn empty_quotation(base: &str, today: NaiveDate) -> Quotation {
    Quotation {
        title: quotation_title(base),
        client_info: client_info(base, today),
        company_info: CompanyDetails::default(),
        introduction_text: "No scope items were available to generate a detailed quotation. Please verify the PDF processing.".to_string(),
        items: Vec::new(),
        subtotal_placeholder: SUBTOTAL_PLACEHOLDER.to_string(),
        tax_placeholder: None,
        total_price_placeholder: TOTAL_PLACEHOLDER.to_string(),
        subtotal: None,
        tax_amount: None,
        grand_total: None,
        terms_and_conditions: vec![
            "Standard terms apply.".to_string(),
            "This quotation is valid for 30 days.".to_string(),
        ],
        conclusion_text: "We look forward to the opportunity to work with you.".to_string(),
    }
}

/// Used when the model could not produce a usable structure.
pub fn template_quotation(items: Vec<QuotationItem>, base: &str, today: NaiveDate) -> Quotation {
    Quotation {
        title: quotation_title(base),
        client_info: client_info(base, today),
        company_info: CompanyDetails::default(),
        introduction_text: "We are pleased to provide this quotation for the construction services as detailed below. Note: This is a fallback due to an error in dynamic content generation.".to_string(),
        items,
        subtotal_placeholder: SUBTOTAL_PLACEHOLDER.to_string(),
        tax_placeholder: Some(TAX_PLACEHOLDER.to_string()),
        total_price_placeholder: TOTAL_PLACEHOLDER.to_string(),
        subtotal: None,
        tax_amount: None,
        grand_total: None,
        terms_and_conditions: vec![
            "All work to be completed in a workmanlike manner according to standard practices.".to_string(),
            "Any alteration or deviation from scope involving extra costs will be executed only upon written orders, and will become an extra charge over and above the estimate.".to_string(),
            "Payment to be made as follows: [Payment Terms Placeholder, e.g., 50% deposit, 50% upon completion].".to_string(),
            "This quotation is valid for 30 days.".to_string(),
        ],
        conclusion_text: "We appreciate the opportunity to provide this quotation and look forward to working with you.".to_string(),
    }
}

fn quotation_prompt(items: &[QuotationItem], file_name: &str, base: &str, today: &str) -> Result<String> {
    let items_json = serde_json::to_string_pretty(items)?;
    let company_json = serde_json::to_string(&CompanyDetails::default())?;
    Ok(format!(
        r#"Generate the JSON structure of a professional construction quotation.
Source file: "{file_name}" (project base name "{base}"). Today's date: {today}.

Scope items, already extracted. Use them AS IS for "items"; keep every id, category, materialOrFinish, unitOfMeasure and pricePlaceholder unchanged:
{items_json}

Return one JSON object with these fields:
- "title": e.g. "Construction Services Quotation for {base}"
- "clientInfo": {{"name": "[Client Name]", "address": "[Client Address]", "date": "{today}", "projectId": "Project: {base}"}}
- "companyInfo": exactly {company_json}
- "introductionText": a brief professional opening that acknowledges the scope may cover several kinds of work
- "items": the scope items above
- "subtotalPlaceholder": "{SUBTOTAL_PLACEHOLDER}"
- "taxPlaceholder": "{TAX_PLACEHOLDER}"
- "totalPricePlaceholder": "{TOTAL_PLACEHOLDER}"
- "termsAndConditions": 3 or 4 standard professional terms
- "conclusionText": a polite closing statement

The response must be ONLY that JSON object."#
    ))
}

/// Repair the fields the model tends to get wrong.
fn fix_up(quotation: &mut Quotation, input: &[QuotationItem], base: &str, today: &str) {
    let info = &mut quotation.client_info;
    if info.date.is_empty() || info.date.starts_with('[') {
        info.date = today.to_string();
    }
    if !info.project_id.contains(base) {
        info.project_id = format!("Project: {base}");
    }
    if quotation.title.is_empty()
        || !quotation.title.contains(base)
        || quotation.title.to_lowercase().contains("painting services")
    {
        quotation.title = quotation_title(base);
    }
    for (item, source) in quotation.items.iter_mut().zip(input) {
        if item.unit_of_measure.as_deref().unwrap_or("").is_empty() && source.unit_of_measure.is_some() {
            item.unit_of_measure = source.unit_of_measure.clone();
        }
        if item.category.is_empty() {
            item.category = source.category.clone();
        }
        if item.material_or_finish.is_empty() {
            item.material_or_finish = source.material_or_finish.clone();
        }
    }
}

/// Turn extracted scope items into a full quotation structure. Never fails:
/// when the model errors or answers with unusable JSON a template built
/// from `items` is returned instead.
pub fn build_quotation(
    service: &dyn CompletionService,
    items: &[ScopeItem],
    file_name: &str,
    today: NaiveDate,
) -> Quotation {
    let base = base_name(file_name);
    if items.is_empty() {
        return empty_quotation(&base, today);
    }
    let today_str = today.format("%Y-%m-%d").to_string();
    let input = quotation_items(items);

    let result = quotation_prompt(&input, file_name, &base, &today_str).and_then(|prompt| {
        let request = CompletionRequest {
            prompt,
            json_response: true,
            temperature: Some(0.3),
            ..Default::default()
        };
        let raw = service.complete(&request)?;
        parse_json_response::<Quotation>(&raw, Some(&format!("Quotation for {file_name}")))
    });

    match result {
        Ok(mut quotation) => {
            fix_up(&mut quotation, &input, &base, &today_str);
            log::info!("Built quotation \"{}\" with {} item(s)", quotation.title, quotation.items.len());
            quotation
        }
        Err(e) => {
            log::warn!("Quotation generation failed, using template: {e}");
            if let Some(raw) = e.raw_response() {
                log::warn!("Raw model response: {raw}");
            }
            template_quotation(input, &base, today)
        }
    }
}

const CHAT_GUIDELINES: &str = "You are an assistant with expertise in quantity surveying, facade design, painting specifications and facade cladding systems (natural stone, metal panels, terracotta and similar). Structure answers clearly using Markdown: **bold** for emphasis or headings, *italics* for terms, bullet or numbered lists, short tables for comparisons, and ## sub-headings for long answers. Aim for technically accurate, well organised responses.";

/// System context describing the document under discussion.
pub fn chat_context(file_name: &str, items: &[ScopeItem]) -> Result<String> {
    Ok(format!(
        "The user uploaded \"{file_name}\". These scope items were extracted from it:\n{}",
        serde_json::to_string_pretty(items)?
    ))
}

/// A multi-turn conversation. The history only grows on successful turns.
pub struct ChatSession<'a> {
    service: &'a dyn CompletionService,
    system_instruction: String,
    history: Vec<Turn>,
}

impl<'a> ChatSession<'a> {
    pub fn new(service: &'a dyn CompletionService, context: &str) -> Self {
        ChatSession {
            service,
            system_instruction: format!("{context}\n\n{CHAT_GUIDELINES}"),
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn send(&mut self, message: &str) -> Result<String> {
        let request = CompletionRequest {
            system_instruction: Some(self.system_instruction.clone()),
            history: self.history.clone(),
            prompt: message.to_string(),
            ..Default::default()
        };
        let reply = self
            .service
            .complete(&request)
            .map_err(|e| Error::Ai(format!("AI chat error: {e}")))?;
        self.history.push(Turn {
            role: Role::User,
            text: message.to_string(),
        });
        self.history.push(Turn {
            role: Role::Model,
            text: reply.clone(),
        });
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fence("```[]```"), "[]");
        assert_eq!(strip_code_fence("[3]"), "[3]");
        let v: Vec<u32> = parse_json_response("  ```json\n[1,2,3]\n```  ", None).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn prose_is_rejected_with_raw_text() {
        let raw = "Here you go: [1, 2]";
        let err = parse_json_response::<Vec<u32>>(raw, Some("plans.pdf")).unwrap_err();
        assert_eq!(err.raw_response(), Some(raw));
        assert!(err.to_string().contains("for plans.pdf"));
    }

    #[test]
    fn base_name_drops_extension_and_dirs() {
        assert_eq!(base_name("docs/Villa Plans.v2.pdf"), "Villa Plans.v2");
        assert_eq!(base_name("scope"), "scope");
    }

    #[test]
    fn request_body_shape() {
        let request = CompletionRequest {
            system_instruction: Some("sys".into()),
            history: vec![Turn { role: Role::Model, text: "hi".into() }],
            prompt: "extract".into(),
            document: Some(InlineDocument::pdf(b"%PDF".to_vec())),
            json_response: true,
            temperature: Some(0.1),
        };
        let json = serde_json::to_value(request_body(&request)).unwrap();
        assert_eq!(json["contents"][0]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "extract");
        assert_eq!(json["contents"][1]["parts"][1]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(json["contents"][1]["parts"][1]["inlineData"]["data"], "JVBERg==");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn items_are_numbered_with_placeholders() {
        let items: Vec<ScopeItem> = serde_json::from_str(
            r#"[{"category":"painting","itemDescription":"Walls","quantity":"10 SQM","materialOrFinish":"Latex","pageNumber":5}]"#,
        )
        .unwrap();
        let rows = quotation_items(&items);
        assert_eq!(rows[0].id.to_string(), "1");
        assert_eq!(rows[0].price_placeholder, "$[ITEM_PRICE_1]");
        assert_eq!(rows[0].page_ref.as_deref(), Some("5"));
    }
}
