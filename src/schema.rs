//! Field schema construction: the contract a record is validated against.
//!
//! Two lifecycles exist. The *inspection* schema is a fixed, versioned field
//! table for building-inspection reports. The *sampled* schema is rebuilt per
//! document from a language-specific candidate pool — heterogeneous corpora
//! (arbitrary financial filings) would be over- or under-fit by any fixed
//! field set, so every document gets its own subset and downstream consumers
//! reconcile via field union.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};

use crate::language::Language;

/// Semantic type tag for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    /// A date rendered as a string; validated like text, typed distinctly
    /// so the provider schema can request a date format.
    Date,
    TextList,
}

/// One field descriptor: name, semantic type, and the human-readable
/// description embedded in the provider schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
}

/// An ordered field table. Generated instances are never reused across
/// documents.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub fields: Vec<FieldSpec>,
}

impl FieldSchema {
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Render as a JSON Schema object for the provider's constrained-output
    /// request and for embedding in the prompt text.
    pub fn to_response_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for field in &self.fields {
            let prop = match field.kind {
                FieldKind::Text => json!({
                    "type": "string",
                    "description": field.description,
                }),
                FieldKind::Number => json!({
                    "type": "number",
                    "description": field.description,
                }),
                FieldKind::Date => json!({
                    "type": "string",
                    "format": "date",
                    "description": field.description,
                }),
                FieldKind::TextList => json!({
                    "type": "array",
                    "items": { "type": "string" },
                    "description": field.description,
                }),
            };
            properties.insert(field.name.clone(), prop);
        }
        json!({
            "type": "object",
            "properties": Value::Object(properties),
        })
    }
}

/// Version tag of the fixed inspection field table. Bump when the table
/// changes shape so downstream consumers can tell batches apart.
pub const INSPECTION_SCHEMA_VERSION: &str = "1";

/// The fixed field table for building-inspection records.
pub fn inspection_schema() -> FieldSchema {
    let fields = [
        ("building_id", FieldKind::Text, "Unique building identifier"),
        ("city_name", FieldKind::Text, "City name"),
        ("building_category", FieldKind::Text, "Building category (needs reinforcement, collapsing, etc.)"),
        ("building_type", FieldKind::Text, "Building type (residential, government, commercial, etc.)"),
        ("building_name", FieldKind::Text, "Building name or address"),
        ("neighborhood", FieldKind::Text, "Neighborhood or area"),
        ("construction_year", FieldKind::Number, "Year of construction"),
        ("building_age", FieldKind::Number, "Building age in years"),
        ("floors_count", FieldKind::Number, "Number of floors"),
        ("total_area", FieldKind::Number, "Total building area in square meters"),
        ("structural_condition", FieldKind::Text, "Current structural condition"),
        ("maintenance_status", FieldKind::Text, "Maintenance status"),
        ("safety_issues", FieldKind::TextList, "List of safety issues identified"),
        ("required_repairs", FieldKind::TextList, "Required repairs and maintenance"),
        ("estimated_cost", FieldKind::Number, "Estimated repair cost in USD"),
        ("priority_level", FieldKind::Text, "Priority level (high, medium, low)"),
        ("last_inspection_date", FieldKind::Date, "Last inspection date"),
        ("inspector_name", FieldKind::Text, "Name of inspector"),
        ("report_date", FieldKind::Date, "Report date"),
    ];
    FieldSchema {
        fields: fields
            .into_iter()
            .map(|(name, kind, description)| FieldSpec {
                name: name.to_string(),
                kind,
                description: description.to_string(),
            })
            .collect(),
    }
}

/// English candidate pool for sampled schemas (financial filings corpus).
const ENGLISH_POOL: &[(&str, &str)] = &[
    ("company_name", "Company name as reported"),
    ("document_type", "Type of document (10-K, Annual Report, etc.)"),
    ("filing_date", "Date when document was filed"),
    ("fiscal_year", "Fiscal year end"),
    ("total_revenue", "Total revenue in USD"),
    ("net_income", "Net income in USD"),
    ("total_assets", "Total assets in USD"),
    ("employee_count", "Number of employees"),
    ("auditor_name", "External auditor name"),
    ("ceo_name", "CEO name"),
    ("industry_sector", "Industry sector"),
    ("business_summary", "Business description summary"),
    ("risk_count", "Number of risk factors identified"),
    ("page_count", "Total pages in document"),
    ("image_count", "Number of images extracted"),
    ("processing_timestamp", "When document was processed"),
    ("confidence_score", "AI confidence in extraction"),
    ("document_size_mb", "Document file size"),
    ("extraction_status", "Status of extraction process"),
    ("key_metrics", "Key financial metrics summary"),
];

/// Arabic candidate pool, mirroring the English one field-for-field.
const ARABIC_POOL: &[(&str, &str)] = &[
    ("اسم_الشركة", "اسم الشركة كما هو مذكور في التقرير"),
    ("نوع_المستند", "نوع المستند (تقرير سنوي، 10-K، إلخ)"),
    ("تاريخ_التقديم", "تاريخ تقديم المستند"),
    ("السنة_المالية", "نهاية السنة المالية"),
    ("إجمالي_الإيرادات", "إجمالي الإيرادات بالدولار الأمريكي"),
    ("صافي_الدخل", "صافي الدخل بالدولار الأمريكي"),
    ("إجمالي_الأصول", "إجمالي الأصول بالدولار الأمريكي"),
    ("عدد_الموظفين", "عدد الموظفين"),
    ("اسم_المدقق", "اسم المدقق الخارجي"),
    ("اسم_الرئيس_التنفيذي", "اسم الرئيس التنفيذي"),
    ("قطاع_الصناعة", "قطاع الصناعة"),
    ("ملخص_الأعمال", "ملخص وصف الأعمال"),
    ("عدد_المخاطر", "عدد عوامل المخاطر المحددة"),
    ("عدد_الصفحات", "إجمالي صفحات المستند"),
    ("عدد_الصور", "عدد الصور المستخرجة"),
    ("وقت_المعالجة", "وقت معالجة المستند"),
    ("درجة_الثقة", "درجة ثقة الذكاء الاصطناعي في الاستخراج"),
    ("حجم_المستند_ميجابايت", "حجم ملف المستند"),
    ("حالة_الاستخراج", "حالة عملية الاستخراج"),
    ("المقاييس_الرئيسية", "ملخص المقاييس المالية الرئيسية"),
];

/// Name tokens that mark a field as date-typed.
const DATE_TOKENS: &[&str] = &["date", "تاريخ"];

/// Name tokens that mark a field as number-typed.
const NUMERIC_TOKENS: &[&str] = &[
    "revenue", "income", "assets", "count", "score", "size",
    "إيرادات", "دخل", "أصول", "عدد", "درجة", "حجم",
];

/// Infer a field's semantic type from its name.
pub fn infer_kind(name: &str) -> FieldKind {
    let lower = name.to_lowercase();
    if DATE_TOKENS.iter().any(|t| lower.contains(t)) {
        return FieldKind::Date;
    }
    if NUMERIC_TOKENS.iter().any(|t| lower.contains(t)) {
        return FieldKind::Number;
    }
    FieldKind::Text
}

/// Build a per-document schema by sampling `min_fields..=max_fields` entries
/// from the language's candidate pool. `max_fields` is clamped to the pool
/// size. The result is specific to one document and never reused.
pub fn sampled_schema<R: Rng>(
    language: Language,
    min_fields: usize,
    max_fields: usize,
    rng: &mut R,
) -> FieldSchema {
    let pool = match language {
        Language::Arabic => ARABIC_POOL,
        Language::English => ENGLISH_POOL,
    };
    let max = max_fields.min(pool.len());
    let min = min_fields.min(max);
    let count = rng.gen_range(min..=max);

    let selected: Vec<&(&str, &str)> = pool.choose_multiple(rng, count).collect();
    FieldSchema {
        fields: selected
            .into_iter()
            .map(|(name, description)| FieldSpec {
                name: name.to_string(),
                kind: infer_kind(name),
                description: description.to_string(),
            })
            .collect(),
    }
}
