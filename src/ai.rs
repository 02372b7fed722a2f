use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::{
    config::Config,
    db::now_sec,
    entities::assist_log,
    error::{AppError, AppResult},
    models::RewriteMode,
};

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 350;
const MAX_ITEMS: usize = 6;
const MAX_ERROR_CHARS: usize = 255;

/// Chat-completions client with a primary/fallback model pair. The fallback
/// is tried once when the primary call fails.
pub struct AiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    primary_model: String,
    fallback_model: String,
}

impl AiClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_key: config.assist_api_key.clone(),
            base_url: config.assist_base_url.clone(),
            primary_model: config.assist_primary_model.clone(),
            fallback_model: config.assist_fallback_model.clone(),
        }
    }

    /// Rewrite the user's review text in the requested mode. Empty text with
    /// a movie title asks for a fresh review instead.
    pub async fn rewrite(
        &self,
        text: &str,
        mode: RewriteMode,
        movie_title: &str,
        movie_overview: &str,
    ) -> AppResult<String> {
        let text = clean_text(text);

        let messages = if text.is_empty() {
            if movie_title.trim().is_empty() {
                return Err(AppError::validation("movie context missing"));
            }
            vec![
                ChatMessage::system("You write movie reviews. Output only the final review text."),
                ChatMessage::user(fresh_review_prompt(movie_title, movie_overview)),
            ]
        } else {
            vec![
                ChatMessage::system(
                    "You write movie reviews. Output only the final rewritten review text.",
                ),
                ChatMessage::user(build_prompt(&text, mode, movie_title, movie_overview)),
            ]
        };

        self.chat(&messages).await
    }

    pub async fn extract_pros_cons(&self, text: &str) -> AppResult<ProsCons> {
        let text = clean_text(text);
        if text.is_empty() {
            return Err(AppError::validation("review is empty"));
        }

        let messages = vec![
            ChatMessage::system("Extract pros and cons from reviews. Return JSON only."),
            ChatMessage::user(format!(
                "User review:\n{text}\n\n\
                 Extract Pros and Cons from this review.\n\
                 Return JSON only in this format:\n\
                 {{\"pros\":[\"...\"],\"cons\":[\"...\"]}}\n\
                 No extra text."
            )),
        ];

        let raw = self.chat(&messages).await?;
        Ok(parse_pros_cons(&raw))
    }

    async fn chat(&self, messages: &[ChatMessage]) -> AppResult<String> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Assist("no assist API key configured".to_string()));
        }

        match self.call_model(&self.primary_model, messages).await {
            Ok(out) => Ok(out),
            Err(err) => {
                warn!(error = %err, "primary model failed, trying fallback");
                self.call_model(&self.fallback_model, messages).await
            },
        }
    }

    async fn call_model(&self, model: &str, messages: &[ChatMessage]) -> AppResult<String> {
        let payload = json!({
            "model": model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let resp = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| AppError::Assist(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Assist(format!("model {model} returned {status}")));
        }

        let body: ChatResponse =
            resp.json().await.map_err(|err| AppError::Assist(err.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| AppError::Assist("empty completion".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn build_prompt(
    text: &str,
    mode: RewriteMode,
    movie_title: &str,
    movie_overview: &str,
) -> String {
    let movie_title = movie_title.trim();
    let movie_overview = movie_overview.trim();

    let mut context = String::new();
    if !movie_title.is_empty() {
        context.push_str(&format!("Movie title: {movie_title}\n"));
    }
    if !movie_overview.is_empty() {
        context.push_str(&format!("Movie overview: {movie_overview}\n"));
    }

    let base = format!("{context}\nUser review:\n{text}\n\n");
    let title_or_default = if movie_title.is_empty() { "this movie" } else { movie_title };

    match mode {
        RewriteMode::Rewrite => {
            base + "Rewrite this review in clean, polished English. Keep the meaning."
        },
        RewriteMode::Shorten => base + "Shorten this review under 180 characters. Keep it sharp.",
        RewriteMode::Funny => {
            base + &format!(
                "Write a funny review about {title_or_default} based on the user review."
            )
        },
        RewriteMode::Roast => {
            base + &format!(
                "Roast {title_or_default} in a humorous way. Not abusive. No slurs."
            )
        },
        RewriteMode::Professional => {
            base + "Rewrite this review in a professional and formal tone."
        },
        RewriteMode::Hype => {
            base + &format!("Rewrite this as an excited, hyped review for {title_or_default}.")
        },
        RewriteMode::Savage1star => {
            base + &format!(
                "Rewrite as a savage brutal 1-star review for {title_or_default}. No hate speech."
            )
        },
    }
}

fn fresh_review_prompt(movie_title: &str, movie_overview: &str) -> String {
    format!(
        "Movie title: {}\nMovie overview: {}\n\n\
         Write a fresh movie review.\n\
         Keep it realistic, human-like, not robotic.\n\
         Length: 5-8 lines.\n",
        movie_title.trim(),
        movie_overview.trim()
    )
}

#[derive(Debug, Default, Serialize)]
pub struct ProsCons {
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// The model is asked for JSON only, but output is untrusted: anything that
/// fails to parse yields empty lists, and each list is capped.
pub(crate) fn parse_pros_cons(raw: &str) -> ProsCons {
    #[derive(Deserialize)]
    struct Raw {
        #[serde(default)]
        pros: Vec<String>,
        #[serde(default)]
        cons: Vec<String>,
    }

    match serde_json::from_str::<Raw>(raw) {
        Ok(mut parsed) => {
            parsed.pros.truncate(MAX_ITEMS);
            parsed.cons.truncate(MAX_ITEMS);
            ProsCons { pros: parsed.pros, cons: parsed.cons }
        },
        Err(_) => ProsCons::default(),
    }
}

/// Sliding-window limit over the audit log: at most `limit` attempts per
/// (user, action) within the window.
pub async fn within_rate_limit(
    db: &DatabaseConnection,
    user_id: i32,
    action: &str,
    window_minutes: i64,
    limit: u64,
) -> AppResult<bool> {
    let since = now_sec() - window_minutes * 60;
    let count = assist_log::Entity::find()
        .filter(assist_log::Column::UserId.eq(user_id))
        .filter(assist_log::Column::Action.eq(action))
        .filter(assist_log::Column::CreatedAt.gte(since))
        .count(db)
        .await?;
    Ok(count < limit)
}

/// Every attempt is logged before the external call; the row is updated
/// with the outcome afterwards.
pub async fn log_attempt(
    db: &DatabaseConnection,
    user_id: i32,
    movie_id: Option<i32>,
    action: &str,
    input_text: &str,
) -> AppResult<assist_log::Model> {
    let entry = assist_log::ActiveModel {
        id: Default::default(),
        user_id: Set(user_id),
        movie_id: Set(movie_id),
        action: Set(action.to_string()),
        input_text: Set(input_text.to_string()),
        output_text: Set(None),
        success: Set(false),
        error_message: Set(None),
        created_at: Set(now_sec()),
    }
    .insert(db)
    .await?;
    Ok(entry)
}

pub async fn log_success(
    db: &DatabaseConnection,
    entry: assist_log::Model,
    output: &str,
) -> AppResult<()> {
    assist_log::ActiveModel {
        id: Set(entry.id),
        output_text: Set(Some(output.to_string())),
        success: Set(true),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

pub async fn log_failure(
    db: &DatabaseConnection,
    entry: assist_log::Model,
    error: &str,
) -> AppResult<()> {
    let truncated: String = error.chars().take(MAX_ERROR_CHARS).collect();
    assist_log::ActiveModel {
        id: Set(entry.id),
        error_message: Set(Some(truncated)),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::entities::user;
    use sea_orm::Set;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  loved   it\n\nso much  "), "loved it so much");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn prompts_carry_mode_instructions() {
        let p = build_prompt("great film", RewriteMode::Shorten, "Heat", "");
        assert!(p.contains("Movie title: Heat"));
        assert!(p.contains("under 180 characters"));

        let p = build_prompt("great film", RewriteMode::Roast, "", "");
        assert!(p.contains("Roast this movie"));
        assert!(!p.contains("Movie title:"));

        let p = build_prompt("great film", RewriteMode::Savage1star, "Heat", "A heist.");
        assert!(p.contains("1-star review for Heat"));
        assert!(p.contains("Movie overview: A heist."));
    }

    #[test]
    fn pros_cons_parsing_tolerates_bad_model_output() {
        let parsed = parse_pros_cons(r#"{"pros":["acting"],"cons":["pacing","length"]}"#);
        assert_eq!(parsed.pros, vec!["acting"]);
        assert_eq!(parsed.cons, vec!["pacing", "length"]);

        let parsed = parse_pros_cons("Sure! Here are the pros and cons:");
        assert!(parsed.pros.is_empty());
        assert!(parsed.cons.is_empty());

        let many: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();
        let raw = serde_json::to_string(&serde_json::json!({ "pros": many, "cons": [] })).unwrap();
        let parsed = parse_pros_cons(&raw);
        assert_eq!(parsed.pros.len(), 6);
    }

    #[tokio::test]
    async fn rate_limit_counts_only_matching_window_and_action() {
        let db = test_db().await;
        let user = user::ActiveModel {
            id: Default::default(),
            username: Set("zoe".to_string()),
            created_at: Set(0),
        }
        .insert(&db)
        .await
        .unwrap();

        assert!(within_rate_limit(&db, user.id, "rewrite", 10, 2).await.unwrap());

        let first = log_attempt(&db, user.id, None, "rewrite", "text").await.unwrap();
        log_success(&db, first, "out").await.unwrap();
        assert!(within_rate_limit(&db, user.id, "rewrite", 10, 2).await.unwrap());

        let second = log_attempt(&db, user.id, None, "rewrite", "text").await.unwrap();
        log_failure(&db, second, "boom").await.unwrap();
        assert!(!within_rate_limit(&db, user.id, "rewrite", 10, 2).await.unwrap());

        // A different action has its own window.
        assert!(within_rate_limit(&db, user.id, "pros_cons", 10, 2).await.unwrap());

        // Old attempts fall out of the window.
        let stale = assist_log::Entity::find().one(&db).await.unwrap().unwrap();
        assist_log::ActiveModel {
            id: Set(stale.id),
            created_at: Set(now_sec() - 3600),
            ..Default::default()
        }
        .update(&db)
        .await
        .unwrap();
        assert!(within_rate_limit(&db, user.id, "rewrite", 10, 2).await.unwrap());
    }
}
