//! Fixed prompt templates for context augmentation and answer synthesis.

pub const CONTEXT_SYSTEM_PROMPT: &str = "\
You are an expert in document analysis.

Your task is to analyze the provided text chunk and extract key contextual \
information from the entire document. The extracted context should situate \
the chunk within the document: what the document is, what the chunk covers, \
and any identifying references (titles, numbers, dates, issuing bodies) \
that appear.

The output must be:
- Short, clear, and concise
- Written in the same language as the input text
- Strictly factual, without interpretation or additional commentary";

pub fn context_user_prompt(chunk: &str, document: &str) -> String {
    format!(
        "Provide the context for this text chunk, in the language of the chunk.\n\n\
         Chunk to analyze:\n{}\n\n\
         Full document content:\n{}",
        chunk, document
    )
}

pub const ANSWER_SYSTEM_PROMPT: &str = "\
You are an expert in document analysis.

Answer the user's question exclusively based on the information provided \
in the supplied passages.
- If the answer can be determined, provide a clear, concise, and \
professional response.
- If the passages do not contain sufficient information, explicitly state \
that the answer cannot be determined from the provided sources.

Your response must be fact-based, with no assumptions or external \
information, and written in the language of the source passages.";

pub fn answer_user_prompt(query: &str, passages: &[String]) -> String {
    let documents = passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] {}", i + 1, p))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Can you answer the following question:\n\n\
         Question:\n{}\n\n\
         Provided passages:\n{}",
        query, documents
    )
}
