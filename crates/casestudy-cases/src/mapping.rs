//! CourtListener responses and their mapping to case summaries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CasesError;

const SITE_URL: &str = "https://www.courtlistener.com";
const NO_SEARCH_SUMMARY: &str =
    "Summary not available. Click \"View Full Case\" to read the complete decision.";
const NO_CLUSTER_SUMMARY: &str =
    "Summary not available. View the full case on Court Listener for complete details.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpinionSnippet {
    #[serde(default)]
    pub snippet: Option<String>,
}

/// One opinion-cluster hit from `/search/?type=o`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchHit {
    pub cluster_id: Option<u64>,
    #[serde(rename = "caseName")]
    pub case_name: Option<String>,
    #[serde(rename = "caseNameFull")]
    pub case_name_full: Option<String>,
    pub citation: Option<Vec<String>>,
    #[serde(rename = "neutralCite")]
    pub neutral_cite: Option<String>,
    pub court: Option<String>,
    #[serde(rename = "dateFiled")]
    pub date_filed: Option<String>,
    pub status: Option<String>,
    pub syllabus: Option<String>,
    pub procedural_history: Option<String>,
    pub opinions: Option<Vec<OpinionSnippet>>,
    pub absolute_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// A number, or occasionally a string.
    #[serde(default)]
    pub count: Value,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

/// `/clusters/{id}/`, reduced to the fields used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Cluster {
    pub id: u64,
    pub absolute_url: Option<String>,
    pub case_name: Option<String>,
    pub case_name_short: Option<String>,
    pub court: Option<String>,
    pub date_filed: Option<String>,
    pub date_created: Option<String>,
    pub precedential_status: Option<String>,
    pub summary: Option<String>,
    pub syllabus: Option<String>,
    pub headnotes: Option<String>,
    pub sub_opinions: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub id: String,
    pub title: String,
    pub citation: String,
    pub court: String,
    pub date: Option<String>,
    pub jurisdiction: String,
    pub topics: Vec<String>,
    pub summary: String,
    pub url: String,
    pub full_text_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResults {
    pub cases: Vec<CaseSummary>,
    pub total: u64,
    pub has_more: bool,
}

/// First value that is present and not blank.
fn first_of<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|s| !s.trim().is_empty())
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref()
}

/// Readable name for a court id; unknown ids are returned as given.
pub fn court_name(code: &str) -> String {
    let name = match code.to_ascii_lowercase().as_str() {
        "" => "Unknown Court",
        "scotus" => "Supreme Court of the United States",
        "ca1" => "U.S. Court of Appeals for the First Circuit",
        "ca2" => "U.S. Court of Appeals for the Second Circuit",
        "ca3" => "U.S. Court of Appeals for the Third Circuit",
        "ca4" => "U.S. Court of Appeals for the Fourth Circuit",
        "ca5" => "U.S. Court of Appeals for the Fifth Circuit",
        "ca6" => "U.S. Court of Appeals for the Sixth Circuit",
        "ca7" => "U.S. Court of Appeals for the Seventh Circuit",
        "ca8" => "U.S. Court of Appeals for the Eighth Circuit",
        "ca9" => "U.S. Court of Appeals for the Ninth Circuit",
        "ca10" => "U.S. Court of Appeals for the Tenth Circuit",
        "ca11" => "U.S. Court of Appeals for the Eleventh Circuit",
        "cadc" => "U.S. Court of Appeals for the D.C. Circuit",
        "cafc" => "U.S. Court of Appeals for the Federal Circuit",
        "tax" => "U.S. Tax Court",
        "cc" => "U.S. Court of Claims",
        _ => return code.to_string(),
    };
    name.to_string()
}

/// Coarse federal/state classification from a court id.
pub fn jurisdiction(code: &str) -> &'static str {
    let code = code.to_ascii_lowercase();
    match code.as_str() {
        "" => "Unknown",
        "scotus" => "Federal (Supreme Court)",
        "cafc" => "Federal (Circuit - Federal)",
        "cavc" => "Federal (Veterans Appeals)",
        "com" | "ccpa" => "Federal (Commerce)",
        "cusc" => "Federal (Customs)",
        "bap" => "Federal (Bankruptcy Appellate)",
        "b" => "Federal (Bankruptcy)",
        "mc" => "Federal (Military Court)",
        "tax" => "Federal (Tax Court)",
        c if is_circuit(c) => "Federal (Circuit Court)",
        c if c.starts_with('d') => "Federal (District Court)",
        _ => "State",
    }
}

/// `cadc` or `ca` plus a circuit number. State codes such as `cal` do not match.
fn is_circuit(code: &str) -> bool {
    code == "cadc"
        || code
            .strip_prefix("ca")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Cluster id from a summary id (`cl-123` or `cl-123-4`) or a bare number.
pub fn parse_case_id(id: &str) -> Result<u64, CasesError> {
    let id = id.trim();
    let digits = id.strip_prefix("cl-").unwrap_or(id);
    let digits = digits.split('-').next().unwrap_or_default();
    digits
        .parse()
        .map_err(|_| CasesError::InvalidCaseId(id.to_string()))
}

impl CaseSummary {
    /// Map the `index`-th search hit. Hits without a cluster id are dropped.
    pub fn from_hit(hit: &SearchHit, index: usize) -> Option<Self> {
        let cluster_id = hit.cluster_id?;
        let court = text(&hit.court).unwrap_or_default();
        let citation = hit
            .citation
            .as_ref()
            .and_then(|c| c.first())
            .map(String::as_str);
        let snippet = hit
            .opinions
            .as_ref()
            .and_then(|o| o.first())
            .and_then(|o| o.snippet.as_deref());
        Some(Self {
            id: format!("cl-{cluster_id}-{index}"),
            title: first_of(&[text(&hit.case_name), text(&hit.case_name_full)])
                .unwrap_or("Untitled Case")
                .to_string(),
            citation: first_of(&[citation, text(&hit.neutral_cite)])
                .unwrap_or("No citation available")
                .to_string(),
            court: court_name(court),
            date: first_of(&[text(&hit.date_filed)]).map(String::from),
            jurisdiction: jurisdiction(court).to_string(),
            topics: first_of(&[text(&hit.status)]).map(String::from).into_iter().collect(),
            summary: first_of(&[text(&hit.syllabus), text(&hit.procedural_history), snippet])
                .unwrap_or(NO_SEARCH_SUMMARY)
                .to_string(),
            url: format!("{SITE_URL}{}", text(&hit.absolute_url).unwrap_or_default()),
            full_text_available: hit.opinions.as_ref().is_some_and(|o| !o.is_empty()),
        })
    }

    pub fn from_cluster(cluster: &Cluster) -> Self {
        let status = text(&cluster.precedential_status);
        Self {
            id: format!("cl-{}", cluster.id),
            title: first_of(&[text(&cluster.case_name), text(&cluster.case_name_short)])
                .unwrap_or("Untitled Case")
                .to_string(),
            citation: first_of(&[text(&cluster.case_name_short), text(&cluster.case_name)])
                .unwrap_or("No citation available")
                .to_string(),
            court: first_of(&[text(&cluster.court)])
                .map(court_name)
                .unwrap_or_else(|| "Unknown Court".to_string()),
            date: first_of(&[text(&cluster.date_filed), text(&cluster.date_created)])
                .map(String::from),
            jurisdiction: if status == Some("Published") { "Federal" } else { "State" }.to_string(),
            topics: first_of(&[status]).map(String::from).into_iter().collect(),
            summary: first_of(&[
                text(&cluster.summary),
                text(&cluster.syllabus),
                text(&cluster.headnotes),
            ])
            .unwrap_or(NO_CLUSTER_SUMMARY)
            .to_string(),
            url: format!("{SITE_URL}{}", text(&cluster.absolute_url).unwrap_or_default()),
            full_text_available: cluster.sub_opinions.as_ref().is_some_and(|o| !o.is_empty()),
        }
    }
}

impl CaseResults {
    pub fn from_response(response: &SearchResponse) -> Self {
        // Hits without a cluster are dropped before numbering.
        let cases = response
            .results
            .iter()
            .filter(|hit| hit.cluster_id.is_some())
            .enumerate()
            .filter_map(|(index, hit)| CaseSummary::from_hit(hit, index))
            .collect();
        Self {
            cases,
            total: response.count.as_u64().unwrap_or(0),
            has_more: response.next.is_some(),
        }
    }
}
