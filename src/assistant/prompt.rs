//! Prompt assembly.
//!
//! A SQL prompt is a system message carrying the retrieved context (table
//! structure, documentation, response guidelines) followed by few-shot
//! question/SQL exchanges and finally the user's question. Context is added
//! in similarity order until the token budget is spent.

use crate::llm::ChatMessage;
use crate::models::TrainingEntry;

/// Rough token estimate: four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

fn message_tokens(messages: &[ChatMessage]) -> usize {
    messages.iter().map(|m| estimate_tokens(&m.content)).sum()
}

/// Builds the conversations sent to the chat model.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    dialect: String,
    max_tokens: usize,
}

impl PromptBuilder {
    pub fn new(dialect: impl Into<String>, max_tokens: usize) -> Self {
        Self {
            dialect: dialect.into(),
            max_tokens,
        }
    }

    /// Conversation asking for SQL that answers `question`.
    ///
    /// `examples` are question/SQL entries; `ddl` and `documentation` are
    /// entries of those kinds. All are expected best match first.
    pub fn sql_prompt(
        &self,
        question: &str,
        examples: &[TrainingEntry],
        ddl: &[TrainingEntry],
        documentation: &[TrainingEntry],
    ) -> Vec<ChatMessage> {
        let mut system = format!(
            "You are a {} expert. Please help to generate a SQL query to answer the question. \
             Your response should ONLY be based on the given context and follow the response \
             guidelines and format instructions.",
            self.dialect
        );

        self.append_section(&mut system, "===Tables", ddl);
        self.append_section(&mut system, "===Additional Context", documentation);

        system.push_str(&format!(
            "\n===Response Guidelines\n\
             1. If the provided context is sufficient, please generate a valid SQL query without \
             any explanations for the question.\n\
             2. If the provided context is almost sufficient but requires knowledge of a specific \
             string in a particular column, please generate an intermediate SQL query to find the \
             distinct strings in that column. Prepend the query with a comment saying \
             intermediate_sql\n\
             3. If the provided context is insufficient, please explain why it can't be \
             generated.\n\
             4. Please use the most relevant table(s).\n\
             5. If the question has been asked and answered before, please repeat the answer \
             exactly as it was given before.\n\
             6. Ensure that the output SQL is {}-compliant and executable, and free of syntax \
             errors.\n",
            self.dialect
        ));

        let mut messages = vec![ChatMessage::system(system)];
        let question_message = ChatMessage::user(question);
        let mut used = message_tokens(&messages) + estimate_tokens(&question_message.content);

        for example in examples {
            let Some(example_question) = example.question.as_deref() else {
                continue;
            };
            let cost = estimate_tokens(example_question) + estimate_tokens(&example.content);
            if used + cost > self.max_tokens {
                break;
            }
            used += cost;
            messages.push(ChatMessage::user(example_question));
            messages.push(ChatMessage::assistant(example.content.as_str()));
        }

        messages.push(question_message);
        messages
    }

    /// Conversation asking which business question `sql` answers.
    pub fn question_prompt(&self, sql: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(
                "The user will give you SQL and you will try to guess what the business question \
                 this query is answering. Return just the question without any additional \
                 explanation. Do not reference the table name in the question.",
            ),
            ChatMessage::user(sql),
        ]
    }

    /// Conversation asking for follow-up questions given past ones.
    pub fn suggestion_prompt(&self, known_questions: &[String], n: usize) -> Vec<ChatMessage> {
        let mut system = format!(
            "You are a {} expert. Suggest {} short questions a user could ask about this \
             database. Return one question per line without numbering or explanation.",
            self.dialect, n
        );
        if !known_questions.is_empty() {
            system.push_str("\nQuestions that have been answered before:\n");
            for question in known_questions {
                system.push_str(question);
                system.push('\n');
            }
        }
        vec![
            ChatMessage::system(system),
            ChatMessage::user("Suggest questions."),
        ]
    }

    /// Append a titled section, one entry at a time, while within budget.
    ///
    /// The title is only written once an entry fits.
    fn append_section(&self, prompt: &mut String, title: &str, entries: &[TrainingEntry]) {
        let header = format!("\n{} \n", title);
        let mut started = false;
        for entry in entries {
            let pending = if started { 0 } else { estimate_tokens(&header) };
            if estimate_tokens(prompt) + pending + estimate_tokens(&entry.content) < self.max_tokens {
                if !started {
                    prompt.push_str(&header);
                    started = true;
                }
                prompt.push_str(&entry.content);
                prompt.push_str("\n\n");
            }
        }
    }
}
