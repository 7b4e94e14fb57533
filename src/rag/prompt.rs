const ANSWER_TEMPLATE: &str = r#"You are an expert UTD academic assistant. Your goal is to answer a student's question accurately, concisely, and directly.

Use the provided context to find the answer. Synthesize the information from all relevant context pieces to form a complete answer.

**CRITICAL RULES:**
1.  **NEVER** mention the "context", "provided documents", or "information provided". Act as if you know this information innately.
2.  **NEVER** say "Based on the context..." or "According to the document...".
3.  If the context does not contain the answer, simply state: "I do not have that information."
4.  Do not make up any information that is not in the context.
5.  Be direct. If the user asks for a list, provide a list. If they ask a yes/no question, answer it directly.
6.  DO NOT MENTION OR REFERENCE ANY DATA SOURCES OR METADATA FROM THE CONTEXT.
7.  Keep your answers brief and to the point. Be natural and human like. Be polite and professional.
8.  DO NOT share any internal information about the data sources, data content, UTD systems, processes, or data handling.

---
HERE IS THE CONTEXT:
{context}

HERE IS THE QUESTION:
Question: {question}

YOUR ANSWER:
"#;

/// Fills the assistant template. The context is substituted first so a
/// literal `{question}` inside retrieved text is left alone.
pub fn render_answer_prompt(context: &str, question: &str) -> String {
    let (head, tail) = ANSWER_TEMPLATE
        .split_once("{question}")
        .unwrap_or((ANSWER_TEMPLATE, ""));
    format!("{}{}{}", head.replace("{context}", context), question, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_both_slots_and_keeps_refusal_rule() {
        let prompt = render_answer_prompt("CS 6363 meets MW.", "When does CS 6363 meet?");

        assert!(prompt.contains("HERE IS THE CONTEXT:\nCS 6363 meets MW.\n"));
        assert!(prompt.contains("Question: When does CS 6363 meet?\n"));
        assert!(prompt.contains("\"I do not have that information.\""));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn placeholders_inside_context_are_not_expanded() {
        let prompt = render_answer_prompt("literal {question} in a syllabus", "Q?");

        assert!(prompt.contains("literal {question} in a syllabus"));
        assert!(prompt.contains("Question: Q?"));
    }
}
