//! OpenAI implementation of the [`Analyst`] trait.
//!
//! Uses the chat-completions API with low temperatures and small token
//! budgets; both calls ask for a bare JSON object and the parser tolerates
//! fenced or prose-wrapped replies.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::traits::analyst::{AnalysisResponse, Analyst, InterpretedQuery};
use crate::types::{ActivitySignal, Channel, Lead};

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-backed analyst.
pub struct OpenAiAnalyst {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiAnalyst {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::from(api_key.into()),
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| SearchError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn chat(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: AssistantMessage,
        }

        #[derive(Deserialize)]
        struct AssistantMessage {
            content: Option<String>,
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(SearchError::oracle)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::oracle(format!(
                "OpenAI API error ({status}): {body}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(SearchError::oracle)?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Analyst for OpenAiAnalyst {
    async fn interpret_query(&self, query: &str, channel: Channel) -> Result<InterpretedQuery> {
        let system = r#"You are a B2B prospecting expert. Interpret the search to find company OWNERS and DECISION MAKERS.
Respond ONLY with JSON:
{
  "searchQuery": "optimized search term",
  "industry": "detected sector",
  "targetRoles": ["CEO", "Founder", ...],
  "location": "location, or the caller's default region"
}"#;
        let user = format!("Search: \"{query}\" (channel: {channel})");

        let content = self.chat(system, &user, 0.3, 150).await?;
        let json = extract_json_object(&content).ok_or_else(|| {
            SearchError::oracle("interpretation reply contained no JSON object")
        })?;

        #[derive(Deserialize)]
        struct InterpretationWire {
            #[serde(rename = "searchQuery", default)]
            search_query: String,
            #[serde(default)]
            industry: String,
            #[serde(rename = "targetRoles", default)]
            target_roles: Vec<String>,
            #[serde(default)]
            location: String,
        }

        let wire: InterpretationWire = serde_json::from_str(json)?;
        let fallback = InterpretedQuery::fallback(query, "");
        Ok(InterpretedQuery {
            search_query: non_empty_or(wire.search_query, fallback.search_query),
            industry: non_empty_or(wire.industry, fallback.industry),
            target_roles: if wire.target_roles.is_empty() {
                fallback.target_roles
            } else {
                wire.target_roles
            },
            location: wire.location,
        })
    }

    async fn analyze_lead(&self, lead: &Lead, research: &str) -> Result<AnalysisResponse> {
        let system = r#"You are an expert business analyst qualifying leads for a growth agency.
Do NOT invent data; deduce from the provided information.

ANALYZE:
1. Executive summary: one clear sentence on what the company does.
2. Bottleneck (pain point): what is failing for them.
3. Activity validation: deduce whether they likely run ads (adStatus) and keep active social profiles (socialStatus): Active/Inactive/Unknown.
4. Decision maker: if the research names a person (CEO, founder), put the name in detectedOwner.

Respond ONLY with JSON:
{
  "executiveSummary": "one-sentence company summary",
  "bottleneck": "the main problem detected",
  "psychologicalProfile": "owner profile, if inferable",
  "businessMoment": "company phase (Expansion/Survival)",
  "salesAngle": "unique selling argument",
  "personalizedMessage": "cold-outreach message (~100 words) mentioning the bottleneck",
  "adStatus": "Active" | "Inactive" | "Unknown",
  "socialStatus": "Active" | "Inactive" | "Unknown",
  "detectedOwner": "detected name or null"
}"#;

        let context = format!(
            "=== LEAD DATA ===\nCompany: {}\nWebsite: {}\nLocation: {}\nEmail: {}\nReviews: {}\n\n=== ONLINE RESEARCH ===\n{}",
            lead.company_name,
            lead.website.as_deref().unwrap_or("not available"),
            lead.location.as_deref().unwrap_or("not available"),
            lead.decision_maker.email.as_deref().unwrap_or("not available"),
            lead.analysis.summary,
            if research.is_empty() {
                "No additional data"
            } else {
                research
            }
        );
        let user = format!("Analyze this lead:\n\n{context}");

        let content = self.chat(system, &user, 0.5, 800).await?;
        let json = extract_json_object(&content)
            .ok_or_else(|| SearchError::oracle("analysis reply contained no JSON object"))?;
        let wire: AnalysisWire = serde_json::from_str(json)?;
        Ok(wire.into())
    }
}

#[derive(Debug, Deserialize)]
struct AnalysisWire {
    #[serde(rename = "executiveSummary", default)]
    executive_summary: String,
    #[serde(default)]
    bottleneck: String,
    #[serde(rename = "psychologicalProfile", default)]
    psychological_profile: String,
    #[serde(rename = "businessMoment", default)]
    business_moment: String,
    #[serde(rename = "salesAngle", default)]
    sales_angle: String,
    #[serde(rename = "personalizedMessage", default)]
    personalized_message: String,
    #[serde(rename = "adStatus", default)]
    ad_status: String,
    #[serde(rename = "socialStatus", default)]
    social_status: String,
    #[serde(rename = "detectedOwner", default)]
    detected_owner: Option<String>,
}

impl From<AnalysisWire> for AnalysisResponse {
    fn from(wire: AnalysisWire) -> Self {
        Self {
            executive_summary: wire.executive_summary,
            bottleneck: wire.bottleneck,
            psychological_profile: wire.psychological_profile,
            business_moment: wire.business_moment,
            sales_angle: wire.sales_angle,
            outreach_message: wire.personalized_message,
            ad_status: ActivitySignal::parse(&wire.ad_status),
            social_status: ActivitySignal::parse(&wire.social_status),
            detected_owner: wire.detected_owner.filter(|n| !n.is_empty()),
        }
    }
}

fn non_empty_or(value: String, fallback: String) -> String {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Find the JSON object embedded in a model reply, tolerating code fences
/// and surrounding prose.
fn extract_json_object(content: &str) -> Option<&str> {
    static OBJECT: OnceLock<Regex> = OnceLock::new();
    let regex = OBJECT.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));
    regex.find(content).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json() {
        let reply = "Sure! Here you go:\n```json\n{\"searchQuery\": \"gyms\"}\n```";
        let json = extract_json_object(reply).unwrap();
        assert_eq!(json, "{\"searchQuery\": \"gyms\"}");
    }

    #[test]
    fn extraction_fails_without_object() {
        assert!(extract_json_object("no json here").is_none());
    }

    #[test]
    fn analysis_wire_maps_fields_and_signals() {
        let wire: AnalysisWire = serde_json::from_str(
            r#"{
                "executiveSummary": "Physio clinic for athletes",
                "bottleneck": "Outdated website",
                "adStatus": "Active",
                "socialStatus": "whatever",
                "detectedOwner": ""
            }"#,
        )
        .unwrap();
        let response: AnalysisResponse = wire.into();
        assert_eq!(response.executive_summary, "Physio clinic for athletes");
        assert_eq!(response.ad_status, ActivitySignal::Active);
        assert_eq!(response.social_status, ActivitySignal::Unknown);
        assert_eq!(response.detected_owner, None);
    }

    #[test]
    fn interpretation_wire_tolerates_missing_fields() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(rename = "searchQuery", default)]
            search_query: String,
        }
        let probe: Probe = serde_json::from_str("{}").unwrap();
        assert!(probe.search_query.is_empty());
    }
}
