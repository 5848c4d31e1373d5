//! Prompts for chunked extraction and summaries.
//!
//! Centralising every prompt here keeps wording changes out of the retry and
//! merge logic, and lets unit tests inspect prompts without a live model.
//!
//! Callers can override the extraction system prompt via
//! [`crate::config::ExtractionConfig::system_prompt`]; the JSON schema is
//! appended to an override as well, so the parser contract never goes missing.

use crate::config::ChunkAttachment;
use crate::pipeline::split::Chunk;
use crate::record::ExtractionRecord;
use once_cell::sync::Lazy;

/// Role and rules for the extraction model. The schema is appended at runtime.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a professional legal expert specialised in analysing Indonesian Supreme Court (Mahkamah Agung) decision documents.

Your task is to extract structured information from court decision documents. You will receive:
1. The current extraction result (may be empty or partially filled)
2. A range of pages from the court decision

You must:
1. Carefully read all text on the provided pages
2. Extract any information that matches the required fields
3. Update the extraction result with newly found information
4. Preserve existing information unless you find more accurate or complete data
5. Return the updated extraction result as valid JSON

Guidelines:
- Only extract information that is explicitly stated in the document
- Use null for fields you looked for but could not find
- Dates use the YYYY-MM-DD format
- Monetary values are plain numbers without currency symbols or separators
- Convert prison terms to months ("1 tahun 6 bulan" = 18)
- Distinguish the prosecution demand (tuntutan) from the final verdict (putusan)
- When a list field is updated, return the complete list, not only new items
- Always provide extraction_confidence between 0.0 and 1.0
- Extract tables completely and accurately
- Return ONLY valid JSON, no markdown code blocks or explanations"#;

static SCHEMA_BLOCK: Lazy<String> = Lazy::new(|| {
    format!(
        "# OUTPUT JSON SCHEMA\n{}",
        ExtractionRecord::json_schema_string()
    )
});

/// The full extraction system prompt: `custom` (or the default) plus schema.
pub fn extraction_system_prompt(custom: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        custom.unwrap_or(EXTRACTION_SYSTEM_PROMPT),
        SCHEMA_BLOCK.as_str()
    )
}

/// The per-chunk user prompt.
///
/// The current accumulator is embedded verbatim so the model can see what is
/// already known; an empty accumulator is shown as `{}`.
pub fn chunk_prompt(
    current: &ExtractionRecord,
    chunk: &Chunk,
    total_chunks: usize,
    attachment: ChunkAttachment,
) -> String {
    let current_json = serde_json::to_string_pretty(current).unwrap_or_else(|_| "{}".to_string());
    let carrier = match attachment {
        ChunkAttachment::Pdf => "The attached PDF contains the actual document pages.",
        ChunkAttachment::PageImages => "The attached images are the document pages, in order.",
    };
    format!(
        "# CURRENT EXTRACTION RESULT\n\
This is the current state of extracted information (update it with new findings):\n\n\
{current_json}\n\n\
# DOCUMENT PAGES\n\
You are viewing pages {start} to {end} (chunk {number} of {total_chunks}) of the court decision document.\n\
{carrier} Extract all relevant information from these pages.\n\n\
# INSTRUCTIONS\n\
1. Read every page provided\n\
2. Extract any relevant information for the structured fields\n\
3. Update the extraction result with the new information\n\
4. Preserve existing data unless you find more accurate information\n\
5. Provide an extraction_confidence score (0.0-1.0)\n\
6. Return the complete updated extraction result as valid JSON",
        start = chunk.start_page,
        end = chunk.end_page,
        number = chunk.number(),
    )
}

/// Language of a generated summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLanguage {
    Indonesian,
    English,
}

pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You are a legal analyst who writes concise, neutral summaries of Indonesian court decisions for a case-law search index.
Use only the facts present in the structured record you are given. Do not speculate.
Write plain prose in a single paragraph of 4 to 8 sentences, no headings, no lists, no markdown."#;

/// The user prompt asking for a summary of `record_json` in `language`.
pub fn summary_prompt(record_json: &str, language: SummaryLanguage) -> String {
    let instruction = match language {
        SummaryLanguage::Indonesian => {
            "Tulis ringkasan putusan berikut dalam Bahasa Indonesia. Sebutkan terdakwa, \
pengadilan dan nomor putusan, dakwaan, tuntutan, amar putusan beserta hukumannya, \
serta kerugian negara bila ada."
        }
        SummaryLanguage::English => {
            "Write a summary of the following decision in English. Mention the defendant, \
the court and decision number, the charges, the prosecution demand, the ruling with \
its sentence, and any state loss."
        }
    };
    format!("{instruction}\n\n# STRUCTURED RECORD\n{record_json}")
}
