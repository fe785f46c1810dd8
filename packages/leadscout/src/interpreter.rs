//! Query interpretation with an unconditional deterministic fallback.

use std::sync::Arc;

use crate::progress::Progress;
use crate::traits::analyst::{Analyst, InterpretedQuery};
use crate::types::Channel;

/// Turns a free-text query into a structured search intent.
///
/// The oracle is optional and best-effort: any failure (missing credentials,
/// network, unparseable reply) falls back to the deterministic default
/// without retrying, so interpretation can never block the pipeline.
pub struct QueryInterpreter {
    analyst: Option<Arc<dyn Analyst>>,
    default_region: String,
}

impl QueryInterpreter {
    pub fn new(analyst: Option<Arc<dyn Analyst>>, default_region: impl Into<String>) -> Self {
        Self {
            analyst,
            default_region: default_region.into(),
        }
    }

    pub async fn interpret(
        &self,
        query: &str,
        channel: Channel,
        progress: &Progress,
    ) -> InterpretedQuery {
        let Some(analyst) = &self.analyst else {
            return InterpretedQuery::fallback(query, &self.default_region);
        };

        match analyst.interpret_query(query, channel).await {
            Ok(interpreted) => {
                progress.log(format!(
                    "Interpreted query: \"{}\" targeting {} in {}",
                    interpreted.search_query,
                    interpreted.target_roles.join("/"),
                    interpreted.location
                ));
                interpreted
            }
            Err(err) => {
                tracing::debug!(error = %err, "Query interpretation failed, using fallback");
                InterpretedQuery::fallback(query, &self.default_region)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::analyst::MockAnalyst;

    #[tokio::test]
    async fn no_analyst_means_fallback() {
        let interpreter = QueryInterpreter::new(None, "Spain");
        let interpreted = interpreter
            .interpret("gyms madrid", Channel::Maps, &Progress::disabled())
            .await;
        assert_eq!(interpreted, InterpretedQuery::fallback("gyms madrid", "Spain"));
    }

    #[tokio::test]
    async fn failing_analyst_means_fallback() {
        let analyst = Arc::new(MockAnalyst::new().failing_interpretation());
        let interpreter = QueryInterpreter::new(Some(analyst), "Spain");
        let interpreted = interpreter
            .interpret("gyms madrid", Channel::Maps, &Progress::disabled())
            .await;
        assert_eq!(interpreted, InterpretedQuery::fallback("gyms madrid", "Spain"));
    }

    #[tokio::test]
    async fn healthy_analyst_result_is_used() {
        let scripted = InterpretedQuery {
            search_query: "boutique gyms".into(),
            industry: "fitness".into(),
            target_roles: vec!["Owner".into()],
            location: "Madrid".into(),
        };
        let analyst = Arc::new(MockAnalyst::new().with_interpretation(scripted.clone()));
        let interpreter = QueryInterpreter::new(Some(analyst), "Spain");
        let interpreted = interpreter
            .interpret("gyms madrid", Channel::Maps, &Progress::disabled())
            .await;
        assert_eq!(interpreted, scripted);
    }
}
