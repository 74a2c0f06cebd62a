use crate::query::{states, Query};

/// Wraps a query for evaluation. Used by the [`crate::query_traits::EvaluateQuery`] trait.
pub enum QueryEvaluation {
    /// Documents were retrieved
    RetrieveDocuments(Query<states::Retrieved>),
    /// The query was answered
    AnswerQuery(Query<states::Answered>),
}

impl std::fmt::Debug for QueryEvaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryEvaluation::RetrieveDocuments(query) => {
                write!(f, "RetrieveDocuments({query:?})")
            }
            QueryEvaluation::AnswerQuery(query) => write!(f, "AnswerQuery({query:?})"),
        }
    }
}

impl From<Query<states::Retrieved>> for QueryEvaluation {
    fn from(val: Query<states::Retrieved>) -> Self {
        QueryEvaluation::RetrieveDocuments(val)
    }
}

impl From<Query<states::Answered>> for QueryEvaluation {
    fn from(val: Query<states::Answered>) -> Self {
        QueryEvaluation::AnswerQuery(val)
    }
}

impl QueryEvaluation {
    pub fn retrieve_documents_query(self) -> Option<Query<states::Retrieved>> {
        if let QueryEvaluation::RetrieveDocuments(query) = self {
            Some(query)
        } else {
            None
        }
    }

    pub fn answer_query(self) -> Option<Query<states::Answered>> {
        if let QueryEvaluation::AnswerQuery(query) = self {
            Some(query)
        } else {
            None
        }
    }

    /// The question as originally asked
    pub fn question(&self) -> &str {
        match self {
            QueryEvaluation::RetrieveDocuments(query) => query.original(),
            QueryEvaluation::AnswerQuery(query) => query.original(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_retrieved() {
        let query = Query::from("what sat").retrieved_documents(vec![]);
        let evaluation = QueryEvaluation::from(query);

        assert_eq!(evaluation.question(), "what sat");
        assert!(evaluation.retrieve_documents_query().is_some());
    }

    #[test]
    fn test_from_answered() {
        let query = Query::from("what sat")
            .retrieved_documents(vec![])
            .answered("the cat");
        let evaluation = QueryEvaluation::from(query);

        assert!(matches!(evaluation, QueryEvaluation::AnswerQuery(_)));
        assert_eq!(evaluation.answer_query().unwrap().answer(), "the cat");
    }
}
