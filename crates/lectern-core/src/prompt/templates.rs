//! Built-in prompt templates.
//!
//! Structured templates take a `{format_instructions}` variable rendered
//! from the extraction schema, so the JSON shape is described in one place.

use super::PromptTemplate;

/// Question answering over a document: abstract and retrieved passages go
/// into the system text, the question is the user turn.
pub const CHAT: PromptTemplate = PromptTemplate::from_static_with_system(
    "chat",
    "You are an assistant answering questions about a document with the following abstract:

Abstract:
{abstract}

Use the abstract and the retrieved context below to answer the question.
If you don't know the answer, say that you don't know.

Context:
{context}
",
    "{input}",
);

/// One step of the sequential fold.
pub const FOLD_SUMMARY: PromptTemplate = PromptTemplate::from_static(
    "fold_summary",
    "Update the summary of this document using the new page below.
If the new page is empty or only contains references, return the last summary unchanged.

New page:
{page}

Last summary:
{last_summary}
",
);

pub const MAP_SUMMARY: PromptTemplate = PromptTemplate::from_static_with_system(
    "map_summary",
    "You are a helpful assistant.",
    "Summarize the following chunk of a document by extracting its main points clearly and concisely in at most 250 words.

Chunk:
{chunk}
",
);

pub const REDUCE_SUMMARY: PromptTemplate = PromptTemplate::from_static_with_system(
    "reduce_summary",
    "You are a helpful assistant.",
    "Given the following partial summaries of a document, extract the main conclusions and points clearly and concisely in at most 250 words.

Summaries:
{summaries}
",
);

pub const PAPER_INFO: PromptTemplate = PromptTemplate::from_static(
    "paper_info",
    "Extract the title, the authors and the publication year from the first page of a document.
If a value cannot be found, use null for it.

{format_instructions}
First page:
{page}
",
);

pub const ABSTRACT_CHECK: PromptTemplate = PromptTemplate::from_static(
    "abstract_check",
    "Does the following text contain an abstract or summary of an article?
Answer with true or false only.

Text:
{text}
",
);

pub const ABSTRACT_EXTRACT: PromptTemplate = PromptTemplate::from_static(
    "abstract_extract",
    "Extract the abstract from the following page, in at least 200 and at most 500 words.
Output only the abstract text.

Page:
{page}
",
);

pub const CHUNK_KEYWORDS: PromptTemplate = PromptTemplate::from_static(
    "chunk_keywords",
    "Extract at most {max} scientific and technical keywords from the following text.
Write abbreviations out in full (e.g. \"machine learning\" rather than \"ML\").

{format_instructions}
Text:
{text}
",
);

pub const UNIQUE_KEYWORDS: PromptTemplate = PromptTemplate::from_static(
    "unique_keywords",
    "Remove duplicates and near-duplicates from the following list of keywords.

{format_instructions}
Keywords:
{keywords}
",
);

pub const GIST_KEYWORDS: PromptTemplate = PromptTemplate::from_static(
    "gist_keywords",
    "From the following keywords of a document, select at most {max} unique keywords that capture its main theme.
Leave out general terms such as \"Science\" or \"Technology\"; prefer specific technical ones.

{format_instructions}
Keywords:
{keywords}
",
);

pub const SUMMARY_KEYWORDS: PromptTemplate = PromptTemplate::from_static(
    "summary_keywords",
    "Given the abstract and summary of a document, extract its most important technical keywords.
Write abbreviations out in full.

{format_instructions}
Abstract:
{abstract}

Summary:
{summary}
",
);

pub const THEME: PromptTemplate = PromptTemplate::from_static(
    "theme",
    "The following keywords were extracted from a document. Identify the overarching theme or area of advancement they represent together.
Look for commonalities and related concepts, and consider the broader technological, scientific or social context.
Describe the main theme in 3 to 5 sentences and output only that description.

Keywords:
{keywords}
",
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_variables() {
        assert_eq!(CHAT.variables(), vec!["abstract", "context", "input"]);
        assert_eq!(FOLD_SUMMARY.variables(), vec!["page", "last_summary"]);
        assert_eq!(MAP_SUMMARY.variables(), vec!["chunk"]);
        assert_eq!(REDUCE_SUMMARY.variables(), vec!["summaries"]);
        assert_eq!(
            CHUNK_KEYWORDS.variables(),
            vec!["max", "format_instructions", "text"]
        );
        assert_eq!(THEME.variables(), vec!["keywords"]);
    }

    #[test]
    fn test_template_names_are_unique() {
        let names = [
            CHAT.name().to_string(),
            FOLD_SUMMARY.name().to_string(),
            MAP_SUMMARY.name().to_string(),
            REDUCE_SUMMARY.name().to_string(),
            PAPER_INFO.name().to_string(),
            ABSTRACT_CHECK.name().to_string(),
            ABSTRACT_EXTRACT.name().to_string(),
            CHUNK_KEYWORDS.name().to_string(),
            UNIQUE_KEYWORDS.name().to_string(),
            GIST_KEYWORDS.name().to_string(),
            SUMMARY_KEYWORDS.name().to_string(),
            THEME.name().to_string(),
        ];
        let mut sorted = names.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
    }
}
