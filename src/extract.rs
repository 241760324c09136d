//! Field extraction from Elsevier article XML.

use crate::tree::{flatten_text, Tag, XmlNode};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

pub const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
pub const NS_DCTERMS: &str = "http://purl.org/dc/terms/";
pub const NS_PRISM: &str = "http://prismstandard.org/namespaces/basic/2.0/";
pub const NS_CE: &str = "http://www.elsevier.com/xml/common/dtd";
pub const NS_SA: &str = "http://www.elsevier.com/xml/common/struct-aff/dtd";

pub const DC_TITLE: Tag = Tag::new(NS_DC, "title");
pub const DC_DESCRIPTION: Tag = Tag::new(NS_DC, "description");
pub const DC_CREATOR: Tag = Tag::new(NS_DC, "creator");
pub const DCTERMS_SUBJECT: Tag = Tag::new(NS_DCTERMS, "subject");
pub const PRISM_COVER_DATE: Tag = Tag::new(NS_PRISM, "coverDate");
pub const CE_PARA: Tag = Tag::new(NS_CE, "para");
pub const CE_AFFILIATION: Tag = Tag::new(NS_CE, "affiliation");
pub const CE_SOURCE_TEXT: Tag = Tag::new(NS_CE, "source-text");
pub const CE_CROSS_REF: Tag = Tag::new(NS_CE, "cross-ref");
pub const CE_DOI: Tag = Tag::new(NS_CE, "doi");
pub const SA_AFFILIATION: Tag = Tag::new(NS_SA, "affiliation");
pub const SA_ORGANIZATION: Tag = Tag::new(NS_SA, "organization");

// Placeholders for absent fields. NO_BODY and NO_ABSTRACT are also the values
// `count_words` must treat as empty.
pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const NO_ABSTRACT: &str = "No abstract";
pub const NO_BODY: &str = "No body text";
pub const UNKNOWN_DATE: &str = "Unknown";
pub const UNKNOWN_INSTITUTION: &str = "Unknown Institution";

const UNCOUNTED_SENTINELS: [&str; 2] = [NO_BODY, NO_ABSTRACT];

// `\w` is Unicode-aware and includes combining marks, so decomposed text
// ("e\u{301}te\u{301}") counts as one word, same as its precomposed form.
lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\b\w+\b").unwrap();
}

/// One converted article. Field order is the key order of the JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub body: String,
    pub citations: Vec<String>,
    pub references: Vec<String>,
    /// Taken from `ce:doi` elements, which is what the corpus labels as datasets.
    pub datasets: Vec<String>,
    pub authors: Vec<String>,
    #[serde(rename = "publication date")]
    pub publication_date: String,
    pub keywords: Vec<String>,
    pub institution: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WordCounts {
    pub body: usize,
    pub abstract_words: usize,
}

impl WordCounts {
    pub fn total(&self) -> usize {
        self.body + self.abstract_words
    }
}

impl ArticleRecord {
    pub fn word_counts(&self) -> WordCounts {
        WordCounts {
            body: count_words(&self.body),
            abstract_words: count_words(&self.abstract_text),
        }
    }
}

pub fn count_words(text: &str) -> usize {
    if text.is_empty() || UNCOUNTED_SENTINELS.contains(&text) {
        return 0;
    }
    WORD_RE.find_iter(text).count()
}

pub fn extract_record(root: &XmlNode) -> ArticleRecord {
    ArticleRecord {
        title: first_text(root, DC_TITLE).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        abstract_text: first_text(root, DC_DESCRIPTION).unwrap_or_else(|| NO_ABSTRACT.to_string()),
        body: extract_body(root),
        citations: all_texts(root, CE_CROSS_REF),
        references: all_texts(root, CE_SOURCE_TEXT),
        datasets: all_texts(root, CE_DOI),
        authors: all_texts(root, DC_CREATOR),
        publication_date: first_text(root, PRISM_COVER_DATE).unwrap_or_else(|| UNKNOWN_DATE.to_string()),
        keywords: all_texts(root, DCTERMS_SUBJECT),
        institution: extract_institution(root).unwrap_or_else(|| UNKNOWN_INSTITUTION.to_string()),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn first_text(root: &XmlNode, tag: Tag) -> Option<String> {
    root.find_first(tag).and_then(|node| non_empty(&node.text))
}

fn all_texts(root: &XmlNode, tag: Tag) -> Vec<String> {
    root.find_all(tag).filter_map(|node| non_empty(&node.text)).collect()
}

fn extract_body(root: &XmlNode) -> String {
    let paragraphs: Vec<String> = root
        .find_all(CE_PARA)
        .map(|para| flatten_text(Some(para)))
        .filter(|text| !text.is_empty())
        .collect();
    if paragraphs.is_empty() {
        NO_BODY.to_string()
    } else {
        paragraphs.join(" ")
    }
}

/// A structured `sa:affiliation` takes precedence. When one exists, the
/// `ce:affiliation` fallback is not consulted even if it has no organization.
fn extract_institution(root: &XmlNode) -> Option<String> {
    match root.find_first(SA_AFFILIATION) {
        Some(affiliation) => affiliation
            .find_first(SA_ORGANIZATION)
            .and_then(|org| non_empty(&org.text)),
        None => root
            .find_first(CE_AFFILIATION)
            .and_then(|affiliation| non_empty(&flatten_text(Some(affiliation)))),
    }
}
