use pdfqa_core::domain::INSUFFICIENT_CONTEXT_SENTINEL;

pub const SYSTEM_PROMPT: &str =
    "You are an intelligent assistant that provides answers based on given context.";

/// Grounded answer prompt. The instruction block is fixed; only the length directive varies.
pub fn grounded_answer_prompt(
    evidence_texts: &[String],
    query: &str,
    length_directive: &str,
) -> String {
    let context = evidence_texts.join(" ");
    format!(
        r#"Context: {context}

User Query: {query}

Task:
- {length_directive}
- Analyze the provided Context to address the User Query effectively.
- Use bullet points for clarity if multiple aspects are present.
- If needed, combine all of the given Context to answer the User Query.
- If the Context provides indirect or scattered details, synthesize them to form a coherent answer.
- If the Context does not explicitly mention the answer, provide reasonable inferences based on the available details.
- If the Context contains no relevant information, respond with: '{INSUFFICIENT_CONTEXT_SENTINEL}'
- Ensure that sentences with the same meaning are not repeated in the response.

Note: Ensure that the response is **strictly based on the provided Context** and avoid introducing external information.
"#
    )
}
