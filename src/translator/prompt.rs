use crate::course::schema;
use crate::llm::Prompt;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant for building Elasticsearch queries.";

const RULES: &str = "\
Rules:
1. Use a `nested` query with path \"availability\" for any condition on availability.term, availability.enrolled, availability.capacity, or availability.available.
2. Combine conditions with a `bool` query using `must`, `filter`, `should`, and `must_not` as appropriate.
3. Use `term` or `terms` for keyword fields, `match`, `match_phrase`, or `multi_match` for text fields, `range` for integers and dates, and `exists` to require a field.
4. Only use the field names listed above, exactly as written. Do not use sub-fields such as subject.keyword.
5. The body may contain only \"query\", \"size\", \"from\", and \"sort\". Do not include aggs.
6. Output only the JSON query body: no explanations, no markdown, no ```json fences.";

const EXAMPLES: &str = "\
Example questions:
- \"Find all graduate-level courses in the Computer Science department with at least 3 credits.\"
- \"List all courses available on the Tempe campus in term 2247.\"";

/// Prompt pair asking the model to turn `question` into a search body.
pub fn build(question: &str) -> Prompt {
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user: user_prompt(question),
    }
}

fn user_prompt(question: &str) -> String {
    format!(
        "Convert the user's question about university courses into an Elasticsearch query.\n\n\
         Indexed fields:\n{fields}\n{RULES}\n\n{EXAMPLES}\n\n\
         User question:\n\"{question}\"\n\n\
         Elasticsearch query:",
        fields = schema::describe(),
    )
}
