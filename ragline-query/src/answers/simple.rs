//! Generate an answer based on the retrieved documents
use std::sync::Arc;

use ragline_core::{
    prelude::*,
    prompt::Prompt,
    querying::{states, Answer, Query},
    SimplePrompt,
};

const DOCUMENT_SEPARATOR: &str = "\n---\n";

/// Generate an answer based on the retrieved documents
///
/// Feeds the retrieved chunks as context, together with the _original_ question, to an llm. The
/// default prompt instructs the model to state that the question cannot be answered when the
/// context does not support an answer.
///
/// Optionally, a custom document template can be provided to render the documents in a specific
/// way. The template receives `text`, `score`, `path` and `metadata`.
#[derive(Clone, Builder)]
pub struct Simple {
    #[builder(setter(custom))]
    client: Arc<dyn SimplePrompt>,
    #[builder(default = "default_prompt()", setter(into))]
    prompt_template: Prompt,
    #[builder(default, setter(into, strip_option))]
    document_template: Option<Prompt>,
}

impl std::fmt::Debug for Simple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simple")
            .field("client", &self.client.name())
            .field("prompt_template", &self.prompt_template)
            .field("document_template", &self.document_template)
            .finish()
    }
}

impl Simple {
    pub fn builder() -> SimpleBuilder {
        SimpleBuilder::default()
    }

    /// Builds a new simple answer generator from a client that implements [`SimplePrompt`].
    pub fn from_client(client: impl SimplePrompt + 'static) -> Simple {
        Simple::new(Arc::new(client))
    }

    pub fn new(client: Arc<dyn SimplePrompt>) -> Simple {
        Simple {
            client,
            prompt_template: default_prompt(),
            document_template: None,
        }
    }

    fn render_documents(&self, query: &Query<states::Retrieved>) -> Result<String> {
        let Some(template) = &self.document_template else {
            return Ok(query.contexts().join(DOCUMENT_SEPARATOR));
        };

        let mut rendered_documents = Vec::new();
        for document in query.documents() {
            let mut context = tera::Context::new();
            context.insert("text", document.text());
            context.insert("score", &document.score);
            context.insert("path", &document.chunk.path.to_string_lossy());
            context.insert("metadata", &document.chunk.metadata);

            rendered_documents.push(template.clone().with_context(context).render()?);
        }

        Ok(rendered_documents.join(DOCUMENT_SEPARATOR))
    }
}

impl SimpleBuilder {
    pub fn client(&mut self, client: impl SimplePrompt + 'static) -> &mut Self {
        self.client = Some(Arc::new(client) as Arc<dyn SimplePrompt>);
        self
    }
}

fn default_prompt() -> Prompt {
    indoc::indoc! {"
    Answer the following question based on the context provided:
    {{ question }}

    ## Constraints
    * Do not include any information that is not in the provided context.
    * If the question cannot be answered by the provided context, state that it cannot be answered.
    * Answer the question completely and format it as markdown.

    ## Context

    ---
    {{ documents }}
    ---
    "}
    .into()
}

#[async_trait]
impl Answer for Simple {
    #[tracing::instrument(skip_all)]
    async fn answer(&self, query: Query<states::Retrieved>) -> Result<Query<states::Answered>> {
        let mut context = tera::Context::new();

        context.insert("question", query.original());
        context.insert("documents", &self.render_documents(&query)?);

        let answer = self
            .client
            .prompt(self.prompt_template.clone().with_context(context))
            .await?;

        Ok(query.answered(answer))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use ragline_core::{
        test_utils::ScriptedPrompt, vector_store::ScoredChunk, Chunk, MockSimplePrompt,
    };
    use serde_json::json;

    use super::*;

    fn retrieved(question: &str) -> Query<states::Retrieved> {
        let documents = [("First document", 0.9), ("Second document", 0.5)]
            .into_iter()
            .map(|(text, score)| {
                let chunk = Chunk::new(text).with_metadata([("page_number", json!(1))]);
                ScoredChunk {
                    id: chunk.id().to_string(),
                    chunk,
                    score,
                }
            })
            .collect();

        Query::from(question).retrieved_documents(documents)
    }

    #[tokio::test]
    async fn test_default_prompt_contains_question_and_documents() {
        let mut mock_client = MockSimplePrompt::new();

        let received_prompt = Arc::new(Mutex::new(None));
        let cloned = received_prompt.clone();
        mock_client
            .expect_prompt()
            .withf(move |prompt| {
                cloned.lock().unwrap().replace(prompt.clone());
                true
            })
            .once()
            .returning(|_| Ok("It is a document.".to_string()));

        let answered = Simple::builder()
            .client(mock_client)
            .build()
            .unwrap()
            .answer(retrieved("What is it?"))
            .await
            .unwrap();

        assert_eq!(answered.answer(), "It is a document.");
        assert_eq!(answered.documents().len(), 2);

        let rendered = received_prompt
            .lock()
            .unwrap()
            .take()
            .unwrap()
            .render()
            .unwrap();
        assert!(rendered.starts_with(
            "Answer the following question based on the context provided:\nWhat is it?\n"
        ));
        assert!(rendered.contains("state that it cannot be answered"));
        assert!(rendered.contains("---\nFirst document\n---\nSecond document\n---"));
    }

    #[tokio::test]
    async fn test_custom_document_template() {
        let client = ScriptedPrompt::new().reply("ok");

        let transformer = Simple::builder()
            .client(client.clone())
            .document_template("[{{ metadata.page_number }}] {{ text }}")
            .build()
            .unwrap();

        transformer.answer(retrieved("What?")).await.unwrap();

        let received = client.received();
        assert!(received[0].contains("[1] First document\n---\n[1] Second document"));
    }

    #[tokio::test]
    async fn test_custom_prompt_template() {
        let client = ScriptedPrompt::new().reply("ok");

        Simple::builder()
            .client(client.clone())
            .prompt_template("Q: {{ question }}")
            .build()
            .unwrap()
            .answer(retrieved("Why?"))
            .await
            .unwrap();

        assert_eq!(client.received(), vec!["Q: Why?".to_string()]);
    }

    #[tokio::test]
    async fn test_prompt_failure_is_an_error() {
        let client = ScriptedPrompt::new().fail("connection reset");

        let err = Simple::from_client(client)
            .answer(retrieved("Why?"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("connection reset"));
    }
}
