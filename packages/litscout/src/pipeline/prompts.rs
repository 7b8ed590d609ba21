//! Prompt construction for every oracle call in the pipeline.
//!
//! Prompts ask for strict JSON but the parse side never trusts that; see
//! `oracle::repair`.

use crate::types::page::CandidatePage;
use crate::types::record::AgencyKnowledge;

/// Closed audience vocabulary. Classification output is filtered to these
/// exact labels; anything else the model invents is dropped.
pub const AUDIENCE_VOCABULARY: [&str; 6] = [
    "Picture Book",
    "Chapter Book",
    "Middle Grade",
    "Young Adult",
    "New Adult",
    "Adult",
];

/// Broad-response fields that must be scalar strings; arrays under these
/// keys are collapsed during JSON repair.
pub const SCALAR_FIELDS: [&str; 9] = [
    "name",
    "role",
    "organization",
    "organization_evidence",
    "email",
    "website",
    "country",
    "genres_raw",
    "bio",
];

/// Prompt for the broad extraction phase.
pub fn format_broad_prompt(
    page: &CandidatePage,
    known: Option<&AgencyKnowledge>,
    max_text: usize,
) -> String {
    let mut prompt = String::from(
        "You are extracting literary-agent contact details from a web page.\n\
         Return ONLY a JSON object with exactly these keys:\n\
         name, role, organization, organization_evidence, email, website, country,\n\
         genres_raw, open_to_submissions, wants_query_letter, wants_synopsis,\n\
         wants_sample_pages, bio, keywords.\n\n\
         Rules:\n\
         - Use the string \"Unknown\" for any text field not present in the page.\n\
         - genres_raw is one comma-separated string quoting the page's own genre wording.\n\
         - open_to_submissions and the wants_* fields are true, false, or null when unstated.\n\
         - keywords is a JSON array of short strings.\n\
         - Quote organization_evidence verbatim from the page.\n\
         - Do not invent information that is not in the text.\n",
    );

    if let Some(known) = known {
        prompt.push_str(&format!(
            "\nAlready-established facts for this site. Use them as given, do not re-derive:\n\
             organization: {}\ncountry: {}\n",
            known.organization,
            if known.country.is_empty() {
                "Unknown"
            } else {
                &known.country
            }
        ));
    }

    let text: String = page.text.chars().take(max_text).collect();
    prompt.push_str(&format!(
        "\nPage URL: {}\nPage title: {}\n\nPage text:\n{}\n\nJSON:",
        page.url, page.title, text
    ));

    prompt
}

/// Prompt for exclusion-term classification, constrained to the registry's
/// current term set.
pub fn format_exclusion_prompt(text: &str, terms: &[String]) -> String {
    format!(
        "The text below describes a literary agent's interests. Identify which of the\n\
         following genres the agent explicitly does NOT want to receive.\n\
         Allowed genres: {}\n\n\
         Return ONLY a JSON object: {{\"excluded\": [\"...\"]}}. Use only genres from the\n\
         allowed list; return an empty array if nothing is excluded.\n\n\
         Text:\n{}\n\nJSON:",
        terms.join(", "),
        text
    )
}

/// Prompt for audience/age-bracket classification against the closed
/// vocabulary.
pub fn format_audience_prompt(text: &str) -> String {
    format!(
        "The text below describes a literary agent's interests. Identify which audience\n\
         age brackets the agent represents.\n\
         Allowed brackets: {}\n\n\
         Return ONLY a JSON object: {{\"audiences\": [\"...\"]}}. Use only brackets from\n\
         the allowed list; return an empty array if none are stated.\n\n\
         Text:\n{}\n\nJSON:",
        AUDIENCE_VOCABULARY.join(", "),
        text
    )
}

/// Prompt for the batched relevance triage over fetched pages.
pub fn format_triage_prompt(previews: &[String]) -> String {
    let mut prompt = String::from(
        "Below are numbered previews of pages from one website. Identify which pages\n\
         likely contain literary-agent profiles or submission/contact information.\n\
         Return ONLY a JSON object: {\"relevant\": [0, 2]} listing the page numbers.\n\n",
    );
    for (i, preview) in previews.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i, preview));
    }
    prompt.push_str("\nJSON:");
    prompt
}

/// Prompt for relevance ranking of candidate URLs.
pub fn format_ranking_prompt(urls: &[String]) -> String {
    let mut prompt = String::from(
        "Below are numbered URLs from one website. Order them from most to least\n\
         likely to contain literary-agent profiles or submission guidelines.\n\
         Return ONLY a JSON object: {\"ranked\": [3, 0, 1]} with the page numbers in\n\
         preference order.\n\n",
    );
    for (i, url) in urls.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i, url));
    }
    prompt.push_str("\nJSON:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broad_prompt_injects_knowledge() {
        let page = CandidatePage::new("https://agency.com/jane", "Jane represents crime fiction.")
            .with_title("Jane Doe");
        let known = AgencyKnowledge {
            organization: "Acme Literary".to_string(),
            organization_evidence: "footer".to_string(),
            country: "UK".to_string(),
        };

        let prompt = format_broad_prompt(&page, Some(&known), 8000);
        assert!(prompt.contains("organization: Acme Literary"));
        assert!(prompt.contains("country: UK"));
        assert!(prompt.contains("Jane represents crime fiction."));
    }

    #[test]
    fn test_broad_prompt_bounds_text() {
        let page = CandidatePage::new("https://agency.com", "x".repeat(500));
        let prompt = format_broad_prompt(&page, None, 100);
        assert!(!prompt.contains(&"x".repeat(101)));
        assert!(prompt.contains(&"x".repeat(100)));
    }

    #[test]
    fn test_triage_prompt_numbers_previews() {
        let previews = vec!["About us".to_string(), "Jane Doe: agent".to_string()];
        let prompt = format_triage_prompt(&previews);
        assert!(prompt.contains("[0] About us"));
        assert!(prompt.contains("[1] Jane Doe: agent"));
    }
}
