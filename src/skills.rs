//! Skill matching: one-shot advisory hints for an instruction.

use async_trait::async_trait;

/// Reply a matcher may use to say it found nothing.
pub const NO_SKILL_MATCH: &str = "NO_MATCH";

/// Looks up a shortcut procedure or target app for an instruction.
#[async_trait]
pub trait SkillMatcher: Send + Sync {
    /// Called exactly once per run, before the first step.
    async fn generate_context(&self, instruction: &str) -> Option<String>;
}

/// Turn a raw matcher reply into an advisory, dropping empty and "no match" replies.
pub fn normalize_advisory(raw: Option<String>) -> Option<String> {
    let text = raw?;
    let trimmed = text.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case(NO_SKILL_MATCH)
        || trimmed.to_lowercase().starts_with("no matching skill")
    {
        return None;
    }
    Some(trimmed.to_string())
}

/// Matcher that never has an advisory.
#[derive(Debug, Default, Clone)]
pub struct NoSkills;

#[async_trait]
impl SkillMatcher for NoSkills {
    async fn generate_context(&self, _instruction: &str) -> Option<String> {
        None
    }
}

/// A known procedure triggered by keywords in the instruction.
#[derive(Debug, Clone)]
pub struct Skill {
    pub name: String,
    pub keywords: Vec<String>,
    pub advisory: String,
}

impl Skill {
    pub fn new(name: impl Into<String>, keywords: &[&str], advisory: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            advisory: advisory.into(),
        }
    }

    fn score(&self, instruction: &str) -> usize {
        self.keywords
            .iter()
            .filter(|k| instruction.contains(k.as_str()))
            .count()
    }
}

/// Keyword matcher over a fixed skill list; the skill with most keyword hits wins.
#[derive(Debug, Default, Clone)]
pub struct StaticSkillMatcher {
    skills: Vec<Skill>,
}

impl StaticSkillMatcher {
    pub fn new(skills: Vec<Skill>) -> Self {
        Self { skills }
    }

    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skills.push(skill);
        self
    }

    fn best_match(&self, instruction: &str) -> Option<&Skill> {
        let lower = instruction.to_lowercase();
        self.skills
            .iter()
            .map(|s| (s.score(&lower), s))
            .filter(|(score, _)| *score > 0)
            .max_by_key(|(score, _)| *score)
            .map(|(_, s)| s)
    }
}

#[async_trait]
impl SkillMatcher for StaticSkillMatcher {
    async fn generate_context(&self, instruction: &str) -> Option<String> {
        match self.best_match(instruction) {
            Some(skill) => {
                tracing::info!(skill = %skill.name, "Matched skill");
                Some(format!("Skill \"{}\": {}", skill.name, skill.advisory))
            }
            None => Some(NO_SKILL_MATCH.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_advisory() {
        assert_eq!(normalize_advisory(None), None);
        assert_eq!(normalize_advisory(Some("  ".to_string())), None);
        assert_eq!(normalize_advisory(Some("no_match".to_string())), None);
        assert_eq!(
            normalize_advisory(Some("No matching skill found".to_string())),
            None
        );
        assert_eq!(
            normalize_advisory(Some(" Use the search tab ".to_string())),
            Some("Use the search tab".to_string())
        );
    }

    #[tokio::test]
    async fn test_static_matcher_picks_best_skill() {
        let matcher = StaticSkillMatcher::default()
            .with_skill(Skill::new("music", &["play", "song"], "Open Spotify first"))
            .with_skill(Skill::new("alarm", &["alarm"], "Use the Clock app"));

        let hit = matcher.generate_context("Play my favourite song").await;
        assert_eq!(
            normalize_advisory(hit),
            Some("Skill \"music\": Open Spotify first".to_string())
        );

        let miss = matcher.generate_context("check the weather").await;
        assert_eq!(miss.as_deref(), Some(NO_SKILL_MATCH));
        assert_eq!(normalize_advisory(miss), None);
    }
}
