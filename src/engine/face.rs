use crate::config::Config;
use crate::engine::error::{AttendanceError, Result};
use crate::model::photo::ReferencePhoto;
use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// A comparison is trusted only above this confidence, exclusive.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Upper bound on the captured photo payload (data URL, base64 inflated).
const MAX_PHOTO_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FaceVerification {
    pub verified: bool,
    #[schema(example = 0.92)]
    pub confidence: f64,
    pub reason: String,
    /// True when this attempt enrolled the captured photo as the reference.
    pub enrolled_now: bool,
}

/// Structured judgment requested from the comparison model.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ComparisonVerdict {
    #[serde(rename = "match")]
    pub is_match: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
}

impl ComparisonVerdict {
    fn fail_closed(reason: &str) -> Self {
        ComparisonVerdict {
            is_match: false,
            confidence: 0.0,
            reason: reason.to_string(),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.is_match && self.confidence > CONFIDENCE_THRESHOLD
    }
}

pub fn validate_photo(photo: &str) -> Result<()> {
    if photo.is_empty() {
        return Err(AttendanceError::InvalidInput("photo is empty".to_string()));
    }
    if !photo.starts_with("data:image/") {
        return Err(AttendanceError::InvalidInput(
            "photo must be a data:image/* URL".to_string(),
        ));
    }
    if photo.len() > MAX_PHOTO_BYTES {
        return Err(AttendanceError::InvalidInput(format!(
            "photo exceeds {MAX_PHOTO_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Pull the first JSON object out of a free-form model reply and parse it.
/// Anything unparseable becomes a non-match with confidence 0.
pub fn parse_verdict(raw: &str) -> ComparisonVerdict {
    let Some(start) = raw.find('{') else {
        return ComparisonVerdict::fail_closed("no JSON object in comparison response");
    };
    let Some(end) = raw.rfind('}') else {
        return ComparisonVerdict::fail_closed("no JSON object in comparison response");
    };
    if end < start {
        return ComparisonVerdict::fail_closed("no JSON object in comparison response");
    }
    match serde_json::from_str::<ComparisonVerdict>(&raw[start..=end]) {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!(error = %e, "Unparseable comparison response");
            ComparisonVerdict::fail_closed("invalid comparison response format")
        }
    }
}

/// Client for the external multimodal comparison gateway.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct FaceVerifier {
    client: Client,
    gateway_url: String,
    api_key: String,
    model: String,
}

impl FaceVerifier {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ai_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            gateway_url: config.ai_gateway_url.trim_end_matches('/').to_string(),
            api_key: config.ai_api_key.clone(),
            model: config.ai_model.clone(),
        })
    }

    /// Two paths: enrollment-by-use when no reference photo exists yet for
    /// (user, company), comparison against the stored reference otherwise.
    /// The reference photo is never replaced here.
    pub async fn verify_identity(
        &self,
        pool: &MySqlPool,
        user_id: u64,
        company_id: u64,
        captured_photo: &str,
    ) -> Result<FaceVerification> {
        let reference: Option<ReferencePhoto> = sqlx::query_as(
            r#"
            SELECT id, user_id, company_id, photo, is_primary, created_at
            FROM attendance_photos
            WHERE user_id = ? AND company_id = ? AND is_primary = 1
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(pool)
        .await?;

        let Some(reference) = reference else {
            // Trust-on-first-use: the first captured photo becomes the
            // baseline for every later comparison.
            sqlx::query(
                r#"
                INSERT INTO attendance_photos (user_id, company_id, photo, is_primary)
                VALUES (?, ?, ?, 1)
                "#,
            )
            .bind(user_id)
            .bind(company_id)
            .bind(captured_photo)
            .execute(pool)
            .await?;

            info!(user_id, company_id, "No reference photo on file, enrolled captured photo");
            return Ok(FaceVerification {
                verified: true,
                confidence: 1.0,
                reason: "First photo registered successfully".to_string(),
                enrolled_now: true,
            });
        };

        let verdict = self.compare(&reference.photo, captured_photo).await?;
        debug!(
            user_id,
            company_id,
            is_match = verdict.is_match,
            confidence = verdict.confidence,
            "Face comparison verdict"
        );

        Ok(FaceVerification {
            verified: verdict.is_verified(),
            confidence: verdict.confidence,
            reason: verdict.reason,
            enrolled_now: false,
        })
    }

    async fn compare(&self, reference: &str, captured: &str) -> Result<ComparisonVerdict> {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a face verification system. Compare the two face images and determine if they are the same person. Respond with ONLY a JSON object with fields: match (boolean), confidence (0-1 number), reason (string)."
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "Compare these two face images. Are they the same person?" },
                        { "type": "image_url", "image_url": { "url": reference } },
                        { "type": "image_url", "image_url": { "url": captured } }
                    ]
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.gateway_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AttendanceError::Upstream(format!(
                "comparison call returned {status}: {}",
                text.chars().take(200).collect::<String>()
            )));
        }

        let data: serde_json::Value = resp.json().await?;
        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();

        Ok(parse_verdict(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_clean_verdict() {
        let v = parse_verdict(r#"{"match": true, "confidence": 0.95, "reason": "same person"}"#);
        assert!(v.is_match);
        assert_eq!(v.confidence, 0.95);
        assert_eq!(v.reason, "same person");
    }

    #[test]
    fn parses_a_verdict_embedded_in_prose() {
        let raw = "Sure! Here is my judgment:\n```json\n{\"match\": false, \"confidence\": 0.2, \"reason\": \"different jawline\"}\n```\nLet me know if you need more.";
        let v = parse_verdict(raw);
        assert!(!v.is_match);
        assert_eq!(v.confidence, 0.2);
    }

    #[test]
    fn garbage_fails_closed() {
        let v = parse_verdict("I cannot compare these images.");
        assert!(!v.is_match);
        assert_eq!(v.confidence, 0.0);
        assert!(!v.is_verified());
    }

    #[test]
    fn malformed_json_fails_closed() {
        let v = parse_verdict(r#"{"match": "maybe", "confidence": }"#);
        assert!(!v.is_match);
        assert_eq!(v.confidence, 0.0);
    }

    #[test]
    fn missing_optional_fields_default() {
        let v = parse_verdict(r#"{"match": true}"#);
        assert!(v.is_match);
        assert_eq!(v.confidence, 0.0);
        assert!(!v.is_verified());
    }

    #[test]
    fn threshold_is_exclusive() {
        let below = ComparisonVerdict {
            is_match: true,
            confidence: 0.69,
            reason: String::new(),
        };
        let at = ComparisonVerdict {
            is_match: true,
            confidence: 0.7,
            reason: String::new(),
        };
        let above = ComparisonVerdict {
            is_match: true,
            confidence: 0.71,
            reason: String::new(),
        };
        assert!(!below.is_verified());
        assert!(!at.is_verified());
        assert!(above.is_verified());
    }

    #[test]
    fn high_confidence_non_match_is_not_verified() {
        let v = ComparisonVerdict {
            is_match: false,
            confidence: 0.99,
            reason: "different person".into(),
        };
        assert!(!v.is_verified());
    }

    #[test]
    fn photo_validation() {
        assert!(validate_photo("").is_err());
        assert!(validate_photo("hello").is_err());
        assert!(validate_photo("data:image/jpeg;base64,/9j/4AAQ").is_ok());
        let oversized = format!("data:image/png;base64,{}", "A".repeat(MAX_PHOTO_BYTES));
        assert!(validate_photo(&oversized).is_err());
    }
}
